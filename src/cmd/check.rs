//! A subcommand making sure various things are working. Useful for updating
//! Libris where you want to check as many things as possible as early as
//! possible.

use crate::{
    args::{self, Args},
    config::Config,
    db::{self, MigrationPlan},
    load_config_and_init_logger,
    prelude::*,
    store::{Backend, Fixtures},
};


pub(crate) async fn run(shared: &args::Shared, args: &Args) -> Result<()> {
    let config = load_config_and_init_logger(shared, args, "check")
        .context("failed to load config: cannot proceed with `check` command")?;


    // Perform main checks
    info!("Starting to verify various things...");
    let referenced_files = check_referenced_files(&config).await;
    let fixtures = check_fixtures(&config);
    let db = match config.store.backend {
        Backend::Postgres => Some(check_db(&config).await),
        Backend::Fixtures => None,
    };
    info!("Done verifying various things");


    // Print summary after all log output
    let mut any_errors = false;
    println!();
    bunt::println!("{$bold+blue+intense}Summary{/$}");
    println!();
    print_outcome(&mut any_errors, "Load configuration", &Ok(()));
    print_outcome(&mut any_errors, "Checking all referenced files", &referenced_files);
    print_outcome(&mut any_errors, "Loading fixtures", &fixtures);
    if let Some(db) = &db {
        print_outcome(&mut any_errors, "Connection to DB & schema state", db);
    }

    println!();
    if any_errors {
        bunt::println!("{$red+intense}➡  Errors have occured!{/$}");
        std::process::exit(1);
    } else {
        bunt::println!("{$green+intense}⮕  Everything OK{/$} \
            {$dimmed}(Libris probably works in this environment){/$}");
        println!("   ");
        Ok(())
    }
}

fn print_outcome<T>(any_errors: &mut bool, label: &str, result: &Result<T>) {
    match result {
        Ok(_) => {
            bunt::println!(" ▸ {[bold+intense]}  {$green+bold}✔ ok{/$}", label);
        }
        Err(e) => {
            *any_errors = true;
            bunt::println!(" ▸ {[bold+intense]}  {$red+bold}✘ error{/$}", label);
            bunt::println!("      {$red}▶▶▶ {$bold}Error:{/$}{/$} {[yellow+intense]}", e);
            println!();
            bunt::println!("      {$red+italic}Caused by:{/$}");

            for (i, cause) in e.chain().skip(1).enumerate() {
                print!("       {: >1$}", "", i * 2);
                println!("‣ {cause}");
            }
            println!();
        }
    }
}

async fn check_referenced_files(config: &Config) -> Result<()> {
    if let Some(path) = &config.store.fixtures {
        debug!("Trying to open '{}' for reading...", path.display());
        let _ = tokio::fs::File::open(path)
            .await
            .context(format!("could not open '{}' for reading", path.display()))?;
    }

    config.db.check_server_cert()?;

    Ok(())
}

/// The fixtures are also read by `import-fixtures`, so they are checked for
/// every backend.
fn check_fixtures(config: &Config) -> Result<()> {
    let fixtures = Fixtures::load(config.store.fixtures.as_deref())?;
    debug!(
        "Fixtures contain {} authors and {} books",
        fixtures.authors.len(),
        fixtures.books.len(),
    );
    Ok(())
}

async fn check_db(config: &Config) -> Result<()> {
    let pool = db::create_pool(&config.db).await?;
    let mut conn = pool.get().await?;
    let tx = conn.transaction().await?;

    match MigrationPlan::build(&tx).await? {
        MigrationPlan::UpToDate => info!("DB schema is up to date"),
        plan => info!("{} migrations will be applied on start", plan.pending()),
    }

    // Nothing was changed, but we don't want to commit anything here anyway.
    tx.rollback().await?;
    Ok(())
}
