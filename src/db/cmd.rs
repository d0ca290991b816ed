use tokio_postgres::IsolationLevel;

use crate::{prelude::*, config::Config};
use super::{Db, create_pool, query};


#[derive(Debug, clap::Subcommand)]
pub(crate) enum DbCommand {
    /// Applies all outstanding migrations. `serve` does this on start as well.
    Migrate,

    /// Drops all catalog tables (and with them all books and authors) after
    /// asking for confirmation.
    Clear,
}

/// Entry point for `db` commands.
pub(crate) async fn run(cmd: &DbCommand, config: &Config) -> Result<()> {
    let pool = create_pool(&config.db).await?;
    let mut db = pool.get().await?;

    match cmd {
        DbCommand::Migrate => super::migrate(&mut db).await?,
        DbCommand::Clear => clear(&mut db, config).await?,
    }

    Ok(())
}

/// Shows what is about to be removed, asks for confirmation and drops every
/// table in the `public` schema. Nothing is changed if the user does not
/// answer "yes".
async fn clear(db: &mut Db, config: &Config) -> Result<()> {
    let tx = db.build_transaction()
        .isolation_level(IsolationLevel::Serializable)
        .start()
        .await?;

    let tables = query::all_table_names(&*tx).await?;
    if tables.is_empty() {
        info!("Database '{}' has no tables: nothing to clear", config.db.database);
        return Ok(());
    }

    warn!("About to drop all tables of the catalog, including every book and author!");
    println!();
    if let Ok(Ok(hostname)) = hostname::get().map(|n| n.into_string()) {
        println!("Running on: {hostname}");
    }
    println!("Database: '{}' on {}:{}", config.db.database, config.db.host, config.db.port);
    for table in &tables {
        let rows = tx.query_one(&format!("select count(*) from {table}"), &[]).await?
            .get::<_, i64>(0);
        println!(" - {table}: {rows} rows");
    }
    println!();
    println!("Type 'yes' to drop these tables.");
    crate::cmd::prompt_for_yes()?;

    drop_tables(&*tx, &tables).await?;
    tx.commit().await.context("failed to commit clearing the database")?;
    info!("Dropped {} tables", tables.len());

    Ok(())
}

pub(super) async fn drop_tables(
    db: &impl tokio_postgres::GenericClient,
    tables: &[String],
) -> Result<()> {
    for table in tables {
        debug!("Dropping table '{table}'");
        db.execute(&format!("drop table {table} cascade"), &[]).await
            .with_context(|| format!("failed to drop table '{table}'"))?;
    }
    Ok(())
}
