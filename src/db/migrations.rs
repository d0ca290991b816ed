//! Schema migrations of the catalog tables.
//!
//! Every migration applied to a database is recorded in `__db_migrations`
//! together with its script. The recorded migrations have to be a prefix of
//! [`MIGRATIONS`] with identical scripts; the remaining ones are applied in
//! order.

use chrono::NaiveDateTime;
use deadpool_postgres::Transaction;
use std::time::Duration;
use tokio_postgres::{IsolationLevel, error::SqlState};

use crate::prelude::*;
use super::{Db, query};


const META_TABLE: &str = "__db_migrations";

struct Migration {
    name: &'static str,
    script: &'static str,
}

/// All migrations in the order they are applied. The ID of a migration is its
/// position in this list, starting at 1. Released entries must never change.
const MIGRATIONS: &[Migration] = &[
    Migration { name: "authors", script: include_str!("migrations/01-authors.sql") },
    Migration { name: "books", script: include_str!("migrations/02-books.sql") },
];

/// What needs to happen to bring a database to the current schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MigrationPlan {
    /// The database has no tables at all. The meta table and all migrations
    /// have to be created.
    CreateAll,

    /// All migrations are applied.
    UpToDate,

    /// The first `done` migrations are applied, the others are missing.
    Continue { done: usize },
}

impl MigrationPlan {
    /// Inspects the database without modifying it. Returns `Err` if the
    /// database is in a state that cannot be migrated automatically.
    pub(crate) async fn build(tx: &Transaction<'_>) -> Result<Self> {
        if !query::does_table_exist(&**tx, META_TABLE).await? {
            let tables = query::all_table_names(&**tx).await?;
            if !tables.is_empty() {
                bail!(
                    "table '{META_TABLE}' is missing, but other tables exist ({}). \
                        Is this database used by another application?",
                    tables.join(", "),
                );
            }
            return Ok(Self::CreateAll);
        }

        let rows = tx.query(
            &format!("select id, name, applied_on, script from {META_TABLE} order by id"),
            &[],
        ).await.context("failed to read applied migrations")?;

        if rows.len() > MIGRATIONS.len() {
            bail!(
                "{} migrations are applied to the database, but this version of Libris \
                    only knows {}. Is the database used by a newer Libris?",
                rows.len(),
                MIGRATIONS.len(),
            );
        }

        for (expected_id, (row, known)) in (1..).zip(rows.iter().zip(MIGRATIONS)) {
            let id = row.get::<_, i64>("id");
            let name = row.get::<_, &str>("name");
            let applied_on = row.get::<_, NaiveDateTime>("applied_on");
            if id != expected_id {
                bail!("applied migrations are not numbered 1, 2, ...: found {id} at position {expected_id}");
            }
            if row.get::<_, &str>("script") != known.script {
                trace!("Script of migration {id} in the database:\n{}", row.get::<_, &str>("script"));
                bail!(
                    "migration {id} ('{name}', applied on {applied_on}) does not match the \
                        migration '{}' built into Libris",
                    known.name,
                );
            }
        }

        Ok(match rows.len() {
            done if done == MIGRATIONS.len() => Self::UpToDate,
            done => Self::Continue { done },
        })
    }

    /// Number of migrations this plan applies.
    pub(crate) fn pending(&self) -> usize {
        match *self {
            Self::CreateAll => MIGRATIONS.len(),
            Self::UpToDate => 0,
            Self::Continue { done } => MIGRATIONS.len() - done,
        }
    }

    async fn execute(&self, tx: &Transaction<'_>) -> Result<()> {
        let done = match *self {
            Self::UpToDate => return Ok(()),
            Self::CreateAll => {
                info!("Database is empty, creating table '{META_TABLE}'");
                tx.batch_execute(include_str!("db-migrations.sql")).await
                    .with_context(|| format!("failed to create '{META_TABLE}'"))?;
                0
            }
            Self::Continue { done } => done,
        };

        let insert = format!(
            "insert into {META_TABLE} (id, name, applied_on, script) \
                values ($1, $2, now() at time zone 'utc', $3)"
        );
        for (id, migration) in (1i64..).zip(MIGRATIONS).skip(done) {
            info!("Applying migration {id} ('{}')", migration.name);
            trace!("Executing:\n{}", migration.script);
            tx.batch_execute(migration.script).await
                .with_context(|| format!("failed to apply migration {id} ('{}')", migration.name))?;
            tx.execute(&insert, &[&id, &migration.name, &migration.script]).await
                .with_context(|| format!("failed to record migration {id} in '{META_TABLE}'"))?;
        }

        Ok(())
    }
}


/// Brings the database schema up to date.
///
/// Runs in one serializable transaction so that concurrently starting Libris
/// processes cannot apply a migration twice. The loser of such a race fails
/// to commit and tries again, then finding the schema up to date.
pub(crate) async fn migrate(db: &mut Db) -> Result<()> {
    const RETRY_DELAY: Duration = Duration::from_millis(500);

    loop {
        let tx = db.build_transaction()
            .isolation_level(IsolationLevel::Serializable)
            .start()
            .await?;

        let plan = MigrationPlan::build(&tx).await?;
        plan.execute(&tx).await?;

        match tx.commit().await {
            Ok(()) => {
                match plan.pending() {
                    0 => debug!("Database schema is up to date"),
                    n => info!("Applied {n} migrations, database schema is up to date"),
                }
                return Ok(());
            }
            Err(e) if e.code() == Some(&SqlState::T_R_SERIALIZATION_FAILURE) => {
                warn!(
                    "Committing migrations failed, probably because another process \
                        migrated concurrently. Retrying in {RETRY_DELAY:?}",
                );
                tokio::time::sleep(RETRY_DELAY).await;
            }
            Err(e) => return Err(e).context("failed to commit migrations"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::{MIGRATIONS, MigrationPlan};

    #[test]
    fn migrations_create_the_catalog_tables() {
        let names = MIGRATIONS.iter().map(|m| m.name).collect::<Vec<_>>();
        assert_eq!(names, ["authors", "books"]);
        for m in MIGRATIONS {
            assert!(m.script.contains(&format!("create table {}", m.name)), "{}", m.name);
        }
    }

    #[test]
    fn pending_counts() {
        assert_eq!(MigrationPlan::CreateAll.pending(), 2);
        assert_eq!(MigrationPlan::Continue { done: 1 }.pending(), 1);
        assert_eq!(MigrationPlan::UpToDate.pending(), 0);
    }
}
