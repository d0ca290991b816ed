use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    model::{Author, Book, Key, NewAuthor, NewBook},
    prelude::*,
};
use super::{Fixtures, Store, StoreError, StoreResult};


/// A store keeping all records in memory. Used for the fixture mode and in
/// tests.
pub(crate) struct MemoryStore {
    tables: RwLock<Tables>,
    writable: bool,
}

#[derive(Default)]
struct Tables {
    books: BTreeMap<Key, Book>,
    authors: BTreeMap<Key, Author>,
}

impl MemoryStore {
    /// A store serving exactly the given fixtures. All writes fail with
    /// [`StoreError::ReadOnly`].
    pub(crate) fn read_only(fixtures: Fixtures) -> Self {
        Self::new(fixtures, false)
    }

    /// A store starting with the given fixtures that also accepts new records.
    pub(crate) fn writable(fixtures: Fixtures) -> Self {
        Self::new(fixtures, true)
    }

    fn new(fixtures: Fixtures, writable: bool) -> Self {
        let tables = Tables {
            books: fixtures.books.into_iter().map(|b| (b.key, b)).collect(),
            authors: fixtures.authors.into_iter().map(|a| (a.key, a)).collect(),
        };

        Self { tables: RwLock::new(tables), writable }
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.writable {
            Ok(())
        } else {
            Err(StoreError::ReadOnly)
        }
    }

    #[cfg(test)]
    pub(crate) async fn num_books(&self) -> usize {
        self.tables.read().await.books.len()
    }

    #[cfg(test)]
    pub(crate) async fn num_authors(&self) -> usize {
        self.tables.read().await.authors.len()
    }
}

/// Returns a key not used in `map` yet. Keys are never reused: as there is no
/// deletion, one past the largest key is always fresh.
fn fresh_key<T>(map: &BTreeMap<Key, T>) -> Key {
    map.keys().next_back().map_or(Key(1), |k| k.next())
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &'static str {
        if self.writable { "memory" } else { "fixtures" }
    }

    async fn book_by_key(&self, key: Key) -> StoreResult<Option<Book>> {
        Ok(self.tables.read().await.books.get(&key).cloned())
    }

    async fn book_by_title(&self, title: &str) -> StoreResult<Option<Book>> {
        let tables = self.tables.read().await;
        Ok(tables.books.values().find(|b| b.title == title).cloned())
    }

    async fn books(&self) -> StoreResult<Vec<Book>> {
        Ok(self.tables.read().await.books.values().cloned().collect())
    }

    async fn books_by_author(&self, author: Key) -> StoreResult<Vec<Book>> {
        let tables = self.tables.read().await;
        Ok(tables.books.values().filter(|b| b.author == author).cloned().collect())
    }

    async fn author_by_key(&self, key: Key) -> StoreResult<Option<Author>> {
        Ok(self.tables.read().await.authors.get(&key).cloned())
    }

    async fn author_by_name(&self, name: &str) -> StoreResult<Option<Author>> {
        let tables = self.tables.read().await;
        Ok(tables.authors.values().find(|a| a.name == name).cloned())
    }

    async fn authors(&self) -> StoreResult<Vec<Author>> {
        Ok(self.tables.read().await.authors.values().cloned().collect())
    }

    async fn create_author(&self, author: NewAuthor) -> StoreResult<Author> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let author = author.into_author(fresh_key(&tables.authors));
        trace!("Inserting {author:?} into memory store");
        tables.authors.insert(author.key, author.clone());
        Ok(author)
    }

    async fn create_book(&self, book: NewBook) -> StoreResult<Book> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let book = book.into_book(fresh_key(&tables.books));
        trace!("Inserting {book:?} into memory store");
        tables.books.insert(book.key, book.clone());
        Ok(book)
    }
}
