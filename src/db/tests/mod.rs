use crate::{
    prelude::*,
    model::{Key, NewAuthor, NewBook},
    store::{PgStore, Store, Fixtures},
};
use self::util::TestDb;

mod util;


// These tests need a running PostgreSQL server as configured in the dev
// config. Run them with `cargo test -- --ignored`.

#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn migrations_create_tables() -> Result<()> {
    let db = TestDb::with_migrations().await?;
    let conn = db.get().await?;
    let mut tables = super::query::all_table_names(&**conn).await?;
    tables.sort();
    assert_eq!(tables, ["__db_migrations", "authors", "books"]);

    let row = conn.query_one("select count(*) from __db_migrations", &[]).await?;
    assert_eq!(row.get::<_, i64>(0), 2);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn migrating_twice_is_noop() -> Result<()> {
    let db = TestDb::with_migrations().await?;
    crate::db::migrate(&mut *db.get().await?).await?;

    let conn = db.get().await?;
    let row = conn.query_one("select count(*) from __db_migrations", &[]).await?;
    assert_eq!(row.get::<_, i64>(0), 2);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn clearing_drops_everything_and_migrating_restores() -> Result<()> {
    let db = TestDb::with_migrations().await?;
    let conn = db.get().await?;
    let tables = super::query::all_table_names(&**conn).await?;
    super::cmd::drop_tables(&**conn, &tables).await?;
    assert!(super::query::all_table_names(&**conn).await?.is_empty());
    drop(conn);

    crate::db::migrate(&mut *db.get().await?).await?;
    let mut tables = super::query::all_table_names(&**db.get().await?).await?;
    tables.sort();
    assert_eq!(tables, ["__db_migrations", "authors", "books"]);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn empty_store() -> Result<()> {
    let db = TestDb::with_migrations().await?;
    let store = PgStore::new((*db).clone());

    assert!(store.books().await?.is_empty());
    assert!(store.authors().await?.is_empty());
    assert_eq!(store.book_by_key(Key(1)).await?, None);
    assert_eq!(store.author_by_name("Nobody").await?, None);
    assert!(store.books_by_author(Key(1)).await?.is_empty());

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn create_and_look_up() -> Result<()> {
    let db = TestDb::with_migrations().await?;
    let store = PgStore::new((*db).clone());

    let author = store.create_author(NewAuthor { name: "Ursula K. Le Guin".into(), age: 88 })
        .await?;
    assert_eq!(author.name, "Ursula K. Le Guin");
    assert_eq!(author.age, 88);

    let first = store.create_book(NewBook {
        title: "A Wizard of Earthsea".into(),
        genre: Some("Fantasy".into()),
        author: author.key,
    }).await?;
    let second = store.create_book(NewBook {
        title: "The Dispossessed".into(),
        genre: None,
        author: author.key,
    }).await?;
    assert_ne!(first.key, second.key);
    assert_eq!(second.genre, None);

    assert_eq!(store.book_by_key(first.key).await?, Some(first.clone()));
    assert_eq!(store.book_by_title("The Dispossessed").await?, Some(second.clone()));
    assert_eq!(store.author_by_key(author.key).await?, Some(author.clone()));
    assert_eq!(store.author_by_name("Ursula K. Le Guin").await?, Some(author.clone()));
    assert_eq!(store.books_by_author(author.key).await?, [first.clone(), second.clone()]);
    assert_eq!(store.books().await?, [first, second]);
    assert_eq!(store.authors().await?, [author]);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn dangling_author_is_allowed() -> Result<()> {
    let db = TestDb::with_migrations().await?;
    let store = PgStore::new((*db).clone());

    let book = store.create_book(NewBook {
        title: "Orphan".into(),
        genre: None,
        author: Key(4242),
    }).await?;
    assert_eq!(book.author, Key(4242));
    assert_eq!(store.author_by_key(book.author).await?, None);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn import_builtin_fixtures() -> Result<()> {
    let db = TestDb::with_migrations().await?;
    let store = PgStore::new((*db).clone());
    let fixtures = Fixtures::load(None)?;

    crate::cmd::import_fixtures::import(&store, &fixtures).await?;

    assert_eq!(store.authors().await?.len(), fixtures.authors.len());
    assert_eq!(store.books().await?.len(), fixtures.books.len());

    for fixture_book in &fixtures.books {
        let fixture_author = fixtures.authors.iter()
            .find(|a| a.key == fixture_book.author)
            .expect("builtin fixtures have no dangling authors");
        let book = store.book_by_title(&fixture_book.title).await?.expect("book was imported");
        let author = store.author_by_key(book.author).await?.expect("author was imported");
        assert_eq!(author.name, fixture_author.name);
    }

    Ok(())
}
