use juniper::graphql_object;

use crate::model::{Author, Book};
use super::{Context, Id, err::ApiResult};


/// The root mutation object.
pub(crate) struct Mutation;

#[graphql_object(Context = Context)]
impl Mutation {
    /// Creates a new author.
    async fn add_author(name: String, age: i32, context: &Context) -> ApiResult<Author> {
        Author::create(name, age, context).await
    }

    /// Creates a new book. The author does not need to exist: the book's
    /// `author` field is `null` in that case.
    async fn add_book(
        title: String,
        genre: Option<String>,
        #[graphql(name = "authorID")]
        author_id: Id,
        context: &Context,
    ) -> ApiResult<Book> {
        Book::create(title, genre, author_id, context).await
    }
}
