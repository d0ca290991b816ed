//! The entity store: persistence of books and authors.
//!
//! Everything above this module only talks to the [`Store`] trait. There are
//! two implementations: [`MemoryStore`], holding a fixed fixture dataset, and
//! [`PgStore`], backed by PostgreSQL.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;

use crate::{
    config::Config,
    db,
    model::{Author, Book, Key, NewAuthor, NewBook},
    prelude::*,
};


mod fixtures;
mod memory;
mod postgres;
mod session;

pub(crate) use self::{
    fixtures::Fixtures,
    memory::MemoryStore,
    postgres::PgStore,
    session::Session,
};


#[derive(Debug, confique::Config)]
pub(crate) struct StoreConfig {
    /// Where books and authors are stored.
    ///
    /// - "fixtures": a fixed in-memory dataset that is loaded on startup.
    ///   This mode is read-only: all mutations fail.
    /// - "postgres": the PostgreSQL database configured in `[db]`.
    #[config(default = "fixtures")]
    pub(crate) backend: Backend,

    /// Path to a YAML file containing the fixture dataset. Only used by the
    /// "fixtures" backend and the `import-fixtures` command. If not set, a
    /// small built-in dataset is used.
    pub(crate) fixtures: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum Backend {
    Fixtures,
    Postgres,
}

/// A fault of the store itself, i.e. not "record not found", which is not an
/// error at all.
#[derive(Debug, thiserror::Error)]
pub(crate) enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] tokio_postgres::Error),

    #[error("could not obtain database connection: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("the store is read-only")]
    ReadOnly,
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;

/// Access to all books and authors.
///
/// Lookups return `Ok(None)` (or an empty list) if nothing matches. `Err` is
/// reserved for actual failures of the backend. Listings are ordered by key.
#[async_trait]
pub(crate) trait Store: Send + Sync {
    /// A short name of the backend, used in logs.
    fn name(&self) -> &'static str;

    async fn book_by_key(&self, key: Key) -> StoreResult<Option<Book>>;

    /// Returns the first book with exactly the given title. If several books
    /// share that title, the one with the lowest key is returned.
    async fn book_by_title(&self, title: &str) -> StoreResult<Option<Book>>;

    async fn books(&self) -> StoreResult<Vec<Book>>;

    /// Returns all books referencing the given author.
    async fn books_by_author(&self, author: Key) -> StoreResult<Vec<Book>>;

    async fn author_by_key(&self, key: Key) -> StoreResult<Option<Author>>;

    async fn author_by_name(&self, name: &str) -> StoreResult<Option<Author>>;

    async fn authors(&self) -> StoreResult<Vec<Author>>;

    /// Stores a new author under a fresh key and returns it.
    async fn create_author(&self, author: NewAuthor) -> StoreResult<Author>;

    /// Stores a new book under a fresh key and returns it. Does not check
    /// whether the referenced author exists.
    async fn create_book(&self, book: NewBook) -> StoreResult<Book>;
}

/// Opens the store configured in `config`. For PostgreSQL, this also runs
/// outstanding DB migrations.
pub(crate) async fn open(config: &Config) -> Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match config.store.backend {
        Backend::Fixtures => {
            let fixtures = Fixtures::load(config.store.fixtures.as_deref())?;
            Arc::new(MemoryStore::read_only(fixtures))
        }
        Backend::Postgres => {
            let pool = db::create_pool(&config.db).await
                .context("failed to create database connection pool (database not running?)")?;
            db::migrate(&mut *pool.get().await?).await
                .context("failed to check/run DB migrations")?;
            Arc::new(PgStore::new(pool))
        }
    };

    info!("Opened '{}' store", store.name());
    Ok(store)
}
