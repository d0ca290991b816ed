use juniper::graphql_object;

use crate::{
    api::{Context, Id, err::{ApiResult, invalid_input}},
    model::{Author, Book, NewAuthor},
    prelude::*,
};
use super::non_blank;


#[graphql_object(Context = Context)]
impl Author {
    fn id(&self) -> Id {
        Id::from(self.key)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn age(&self) -> i32 {
        self.age
    }

    /// All books referring to this author. Empty if there are none; `null`
    /// only if the store failed to answer.
    async fn books(&self, context: &Context) -> ApiResult<Option<Vec<Book>>> {
        Ok(Some(context.store.books_by_author(self.key).await?))
    }
}

impl Author {
    pub(crate) async fn load_by_id(id: Id, context: &Context) -> ApiResult<Option<Self>> {
        let Some(key) = id.key() else {
            return Ok(None);
        };
        Ok(context.store.author_by_key(key).await?)
    }

    pub(crate) async fn load_by_name(name: &str, context: &Context) -> ApiResult<Option<Self>> {
        Ok(context.store.author_by_name(name).await?)
    }

    pub(crate) async fn load_all(context: &Context) -> ApiResult<Vec<Self>> {
        Ok(context.store.authors().await?)
    }

    pub(crate) async fn create(name: String, age: i32, context: &Context) -> ApiResult<Self> {
        let name = non_blank("name", name)?;
        if age < 0 {
            return Err(invalid_input!(key = "author.negative-age", "'age' must not be negative"));
        }

        let author = context.store.create_author(NewAuthor { name, age }).await?;
        debug!("Created author {:?} ('{}')", author.key, author.name);
        Ok(author)
    }
}
