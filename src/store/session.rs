use std::sync::{Arc, atomic::{AtomicU32, Ordering}};

use crate::{
    model::{Author, Book, Key, NewAuthor, NewBook},
    prelude::*,
};
use super::{Store, StoreResult};


/// The store as seen by one API request.
///
/// Forwards everything to the shared store, but counts the calls. Nested
/// cross-reference fields each cost one call (there is no batching), so this
/// number is the thing to watch for expensive queries. A per-request cache
/// would go here as well.
pub(crate) struct Session {
    inner: Arc<dyn Store>,
    num_calls: AtomicU32,
}

impl Session {
    pub(crate) fn new(inner: Arc<dyn Store>) -> Self {
        Self { inner, num_calls: AtomicU32::new(0) }
    }

    pub(crate) fn num_calls(&self) -> u32 {
        self.num_calls.load(Ordering::SeqCst)
    }

    fn count(&self, operation: &str, arg: &dyn std::fmt::Debug) {
        trace!("Store call '{operation}' with {arg:?}");
        self.num_calls.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) async fn book_by_key(&self, key: Key) -> StoreResult<Option<Book>> {
        self.count("book_by_key", &key);
        self.inner.book_by_key(key).await
    }

    pub(crate) async fn book_by_title(&self, title: &str) -> StoreResult<Option<Book>> {
        self.count("book_by_title", &title);
        self.inner.book_by_title(title).await
    }

    pub(crate) async fn books(&self) -> StoreResult<Vec<Book>> {
        self.count("books", &());
        self.inner.books().await
    }

    pub(crate) async fn books_by_author(&self, author: Key) -> StoreResult<Vec<Book>> {
        self.count("books_by_author", &author);
        self.inner.books_by_author(author).await
    }

    pub(crate) async fn author_by_key(&self, key: Key) -> StoreResult<Option<Author>> {
        self.count("author_by_key", &key);
        self.inner.author_by_key(key).await
    }

    pub(crate) async fn author_by_name(&self, name: &str) -> StoreResult<Option<Author>> {
        self.count("author_by_name", &name);
        self.inner.author_by_name(name).await
    }

    pub(crate) async fn authors(&self) -> StoreResult<Vec<Author>> {
        self.count("authors", &());
        self.inner.authors().await
    }

    pub(crate) async fn create_author(&self, author: NewAuthor) -> StoreResult<Author> {
        self.count("create_author", &author);
        self.inner.create_author(author).await
    }

    pub(crate) async fn create_book(&self, book: NewBook) -> StoreResult<Book> {
        self.count("create_book", &book);
        self.inner.create_book(book).await
    }
}
