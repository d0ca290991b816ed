//! Copies a fixture dataset into the PostgreSQL database.

use std::{collections::{HashMap, HashSet}, path::PathBuf};

use crate::{
    config::Config,
    db,
    model::{Key, NewAuthor, NewBook},
    prelude::*,
    store::{Fixtures, PgStore, Store},
};


#[derive(Debug, clap::Args)]
pub(crate) struct Args {
    /// YAML file containing the dataset. Defaults to `store.fixtures` from the
    /// configuration or, if that's not set either, the built-in dataset.
    file: Option<PathBuf>,
}

pub(crate) async fn run(args: &Args, config: &Config) -> Result<()> {
    let path = args.file.as_deref().or(config.store.fixtures.as_deref());
    let fixtures = Fixtures::load(path)?;

    let pool = db::create_pool(&config.db).await
        .context("failed to create database connection pool (database not running?)")?;
    db::migrate(&mut *pool.get().await?).await
        .context("failed to check/run DB migrations")?;

    import(&PgStore::new(pool), &fixtures).await
}

/// Creates all authors and books of `fixtures` in `store`. The store assigns
/// new keys, so the author reference of each book is translated to the key
/// its author received. A reference to an author outside the dataset cannot
/// be translated: after import, it could name any of the new authors. Such
/// datasets are rejected before anything is written.
pub(crate) async fn import(store: &dyn Store, fixtures: &Fixtures) -> Result<()> {
    let known = fixtures.authors.iter().map(|a| a.key).collect::<HashSet<_>>();
    if let Some(book) = fixtures.books.iter().find(|b| !known.contains(&b.author)) {
        bail!(
            "book '{}' references author {} which is not part of the dataset",
            book.title,
            book.author,
        );
    }

    info!(
        "Importing {} authors and {} books into '{}' store",
        fixtures.authors.len(),
        fixtures.books.len(),
        store.name(),
    );

    let mut new_keys = HashMap::<Key, Key>::new();
    for author in &fixtures.authors {
        let created = store.create_author(NewAuthor {
            name: author.name.clone(),
            age: author.age,
        }).await.with_context(|| format!("failed to import author '{}'", author.name))?;

        trace!("Imported author {} as {}", author.key, created.key);
        new_keys.insert(author.key, created.key);
    }

    for book in &fixtures.books {
        store.create_book(NewBook {
            title: book.title.clone(),
            genre: book.genre.clone(),
            author: new_keys[&book.author],
        }).await.with_context(|| format!("failed to import book '{}'", book.title))?;
    }

    info!("Finished importing fixtures");
    Ok(())
}
