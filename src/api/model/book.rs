use juniper::graphql_object;

use crate::{
    api::{Context, Id, err::{ApiResult, invalid_input}},
    model::{Author, Book, NewBook},
    prelude::*,
};
use super::non_blank;


#[graphql_object(Context = Context)]
impl Book {
    fn id(&self) -> Id {
        Id::from(self.key)
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn genre(&self) -> Option<&str> {
        self.genre.as_deref()
    }

    /// The author of this book. `null` if the book refers to an author that
    /// does not exist.
    async fn author(&self, context: &Context) -> ApiResult<Option<Author>> {
        Ok(context.store.author_by_key(self.author).await?)
    }
}

impl Book {
    pub(crate) async fn load_by_id(id: Id, context: &Context) -> ApiResult<Option<Self>> {
        let Some(key) = id.key() else {
            return Ok(None);
        };
        Ok(context.store.book_by_key(key).await?)
    }

    pub(crate) async fn load_by_title(title: &str, context: &Context) -> ApiResult<Option<Self>> {
        Ok(context.store.book_by_title(title).await?)
    }

    pub(crate) async fn load_all(context: &Context) -> ApiResult<Vec<Self>> {
        Ok(context.store.books().await?)
    }

    /// Validates the input and creates a new book. The author is not required
    /// to exist.
    pub(crate) async fn create(
        title: String,
        genre: Option<String>,
        author: Id,
        context: &Context,
    ) -> ApiResult<Self> {
        let title = non_blank("title", title)?;
        let author = author.key().ok_or_else(|| {
            invalid_input!(key = "book.invalid-author-id", "'authorID' is not a valid ID")
        })?;

        let book = context.store.create_book(NewBook { title, genre, author }).await?;
        debug!("Created book {:?} ('{}')", book.key, book.title);
        Ok(book)
    }
}
