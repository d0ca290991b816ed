use juniper::graphql_object;

use crate::model::{Author, Book};
use super::{
    Context,
    Id,
    err::{ApiResult, invalid_input},
};


/// The root query object.
pub(crate) struct Query;

#[graphql_object(name = "RootQueryType", Context = Context)]
impl Query {
    /// Returns a single book, looked up either by ID or by exact title.
    /// Exactly one of the two arguments has to be given. If several books
    /// have the requested title, the one with the lowest ID is returned.
    async fn book(id: Option<Id>, title: Option<String>, context: &Context) -> ApiResult<Option<Book>> {
        match (id, title) {
            (Some(id), None) => Book::load_by_id(id, context).await,
            (None, Some(title)) => Book::load_by_title(&title, context).await,
            _ => Err(invalid_input!(
                key = "query.ambiguous-lookup",
                "exactly one of 'id' and 'title' has to be specified",
            )),
        }
    }

    /// Returns all books. `null` only if the store failed to answer.
    async fn books(context: &Context) -> ApiResult<Option<Vec<Book>>> {
        Book::load_all(context).await.map(Some)
    }

    /// Returns a single author, looked up either by exact name or by ID.
    /// Exactly one of the two arguments has to be given. If several authors
    /// have the requested name, the one with the lowest ID is returned.
    async fn author(name: Option<String>, id: Option<Id>, context: &Context) -> ApiResult<Option<Author>> {
        match (name, id) {
            (Some(name), None) => Author::load_by_name(&name, context).await,
            (None, Some(id)) => Author::load_by_id(id, context).await,
            _ => Err(invalid_input!(
                key = "query.ambiguous-lookup",
                "exactly one of 'name' and 'id' has to be specified",
            )),
        }
    }

    /// Returns all authors. `null` only if the store failed to answer.
    async fn authors(context: &Context) -> ApiResult<Option<Vec<Author>>> {
        Author::load_all(context).await.map(Some)
    }
}
