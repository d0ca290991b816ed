use std::ops::Deref;
use deadpool_postgres::Pool;

use crate::{prelude::*, config::Config};
use super::super::{create_pool, DbConfig};


/// A temporary DB used for a single unit test. Is removed on drop.
///
/// Be sure to use the multi threaded Tokio runtime or else `drop` will hang
/// indefinitely!
pub(super) struct TestDb {
    pool: Option<Pool>,
    controller: Pool,
    db_name: String,
}

impl TestDb {
    /// Creates a new temporary database with connection data from the dev config.
    pub(super) async fn new() -> Result<Self> {
        let config = Config::load_from("util/dev-config/config.toml")
            .context("failed to load config")?;

        // Create connection to original database and create a new temporary one.
        let controller = create_pool(&config.db).await?;
        let db_name = format!("libris_test_{}", rand::random::<u64>());
        controller.get().await?
            .execute(&format!("create database {db_name}"), &[]).await
            .context("failed to create temporary test DB")?;

        let pool = create_pool(&DbConfig { database: db_name.clone(), ..config.db }).await?;

        Ok(Self {
            controller,
            pool: Some(pool),
            db_name,
        })
    }

    pub(super) async fn with_migrations() -> Result<Self> {
        let out = Self::new().await?;
        crate::db::migrate(&mut *out.get().await?).await
            .context("failed to run migrations on test DB")?;

        Ok(out)
    }
}

impl Deref for TestDb {
    type Target = Pool;

    fn deref(&self) -> &Self::Target {
        self.pool.as_ref().unwrap()
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        // There is no "async drop", so the pool of the temporary database is
        // closed first and then the database is dropped within `block_on`.
        //
        // This code requires the multi threaded Tokio runtime! :(
        if let Some(pool) = self.pool.take() {
            pool.close();
        }
        futures::executor::block_on(async move {
            self.controller.get().await
                .expect("failed to get controller connection")
                .execute(&format!("drop database {} with (force)", self.db_name), &[])
                .await
                .expect("failed to drop temporary test DB");
        });
    }
}
