use async_trait::async_trait;
use deadpool_postgres::Pool;
use postgres_types::ToSql;
use tokio_postgres::Row;

use crate::{
    model::{Author, Book, Key, NewAuthor, NewBook},
    prelude::*,
};
use super::{Store, StoreResult};


/// A store backed by the tables `books` and `authors` in PostgreSQL.
///
/// Every call checks out its own connection from the pool. Statements are
/// prepared once per connection and cached.
pub(crate) struct PgStore {
    pool: Pool,
}

const BOOK_COLS: &str = "id, title, genre, author_id";
const AUTHOR_COLS: &str = "id, name, age";

impl PgStore {
    pub(crate) fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn query_opt(
        &self,
        query: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> StoreResult<Option<Row>> {
        trace!("Executing SQL query: \"{}\" with {:?}", query, params);
        let conn = self.pool.get().await?;
        let statement = conn.prepare_cached(query).await?;
        Ok(conn.query_opt(&statement, params).await?)
    }

    async fn query_one(&self, query: &str, params: &[&(dyn ToSql + Sync)]) -> StoreResult<Row> {
        trace!("Executing SQL query: \"{}\" with {:?}", query, params);
        let conn = self.pool.get().await?;
        let statement = conn.prepare_cached(query).await?;
        Ok(conn.query_one(&statement, params).await?)
    }

    async fn query_all<const N: usize>(
        &self,
        query: &str,
        params: [&(dyn ToSql + Sync); N],
    ) -> StoreResult<Vec<Row>> {
        trace!("Executing SQL query: \"{}\" with {:?}", query, params);
        let conn = self.pool.get().await?;
        let statement = conn.prepare_cached(query).await?;
        Ok(conn.query_raw(&statement, params).await?.try_collect().await?)
    }
}

fn book_from_row(row: Row) -> Book {
    Book {
        key: row.get(0),
        title: row.get(1),
        genre: row.get(2),
        author: row.get(3),
    }
}

fn author_from_row(row: Row) -> Author {
    Author {
        key: row.get(0),
        name: row.get(1),
        age: row.get(2),
    }
}

#[async_trait]
impl Store for PgStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn book_by_key(&self, key: Key) -> StoreResult<Option<Book>> {
        let query = format!("select {BOOK_COLS} from books where id = $1");
        Ok(self.query_opt(&query, &[&key]).await?.map(book_from_row))
    }

    async fn book_by_title(&self, title: &str) -> StoreResult<Option<Book>> {
        let query = format!("select {BOOK_COLS} from books where title = $1 order by id limit 1");
        Ok(self.query_opt(&query, &[&title]).await?.map(book_from_row))
    }

    async fn books(&self) -> StoreResult<Vec<Book>> {
        let query = format!("select {BOOK_COLS} from books order by id");
        Ok(self.query_all(&query, dbargs![]).await?.into_iter().map(book_from_row).collect())
    }

    async fn books_by_author(&self, author: Key) -> StoreResult<Vec<Book>> {
        let query = format!("select {BOOK_COLS} from books where author_id = $1 order by id");
        Ok(self.query_all(&query, dbargs![&author]).await?.into_iter().map(book_from_row).collect())
    }

    async fn author_by_key(&self, key: Key) -> StoreResult<Option<Author>> {
        let query = format!("select {AUTHOR_COLS} from authors where id = $1");
        Ok(self.query_opt(&query, &[&key]).await?.map(author_from_row))
    }

    async fn author_by_name(&self, name: &str) -> StoreResult<Option<Author>> {
        let query = format!("select {AUTHOR_COLS} from authors where name = $1 order by id limit 1");
        Ok(self.query_opt(&query, &[&name]).await?.map(author_from_row))
    }

    async fn authors(&self) -> StoreResult<Vec<Author>> {
        let query = format!("select {AUTHOR_COLS} from authors order by id");
        Ok(self.query_all(&query, dbargs![]).await?.into_iter().map(author_from_row).collect())
    }

    async fn create_author(&self, author: NewAuthor) -> StoreResult<Author> {
        let query = format!(
            "insert into authors (name, age) values ($1, $2) returning {AUTHOR_COLS}",
        );
        let row = self.query_one(&query, &[&author.name, &author.age]).await?;
        Ok(author_from_row(row))
    }

    async fn create_book(&self, book: NewBook) -> StoreResult<Book> {
        let query = format!(
            "insert into books (title, genre, author_id) values ($1, $2, $3) \
                returning {BOOK_COLS}",
        );
        let row = self.query_one(&query, &[&book.title, &book.genre, &book.author]).await?;
        Ok(book_from_row(row))
    }
}
