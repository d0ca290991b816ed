//! The Libris backend server.

use clap::{FromArgMatches, CommandFactory};
use std::env;

use crate::{
    args::{Args, Command},
    config::Config,
    prelude::*,
};

mod api;
mod args;
mod config;
mod cmd;
mod db;
mod http;
mod logger;
mod metrics;
mod model;
mod prelude;
mod store;
mod version;


#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Log error in case stdout is not connected and it is logged into a file.
        error!("{:?}", e);

        // Show a somewhat nice representation of the error
        eprintln!();
        eprintln!();
        bunt::eprintln!("{$red}▶▶▶ {$bold}Error:{/$}{/$} {[yellow+intense]}", e);
        eprintln!();
        if e.chain().len() > 1 {
            bunt::eprintln!("{$red+italic}Caused by:{/$}");
        }

        for (i, cause) in e.chain().skip(1).enumerate() {
            eprint!(" {: >1$}", "", i * 2);
            eprintln!("‣ {cause}");
        }

        std::process::exit(1);
    }
}

/// Main entry point.
async fn run() -> Result<()> {
    // If `RUST_BACKTRACE` wasn't already set, we default to `1`. Backtraces are
    // almost always useful for debugging and we don't expect panics to occur
    // regularly.
    if env::var("RUST_BACKTRACE") == Err(env::VarError::NotPresent) {
        env::set_var("RUST_BACKTRACE", "1");
    }

    // Parse CLI args. This is a bit roundabout because we want to override the
    // version using some runtime code.
    let args = Args::from_arg_matches(
        &Args::command()
            .version(version::full())
            .get_matches(),
    )?;

    // Configure output via `bunt`
    bunt::set_stdout_color_choice(args.stdout_color());
    bunt::set_stderr_color_choice(args.stderr_color());


    // Dispatch subcommand.
    match &args.cmd {
        Command::Serve { shared } => {
            let config = load_config_and_init_logger(shared, &args, "serve")?;
            start_server(config).await?;
        }
        Command::Db { cmd, shared } => {
            let config = load_config_and_init_logger(shared, &args, "db")?;
            db::cmd::run(cmd, &config).await?;
        }
        Command::Check { shared } => cmd::check::run(shared, &args).await?,
        Command::WriteConfig { target } => config::write_template(target.as_ref())?,
        Command::ExportApiSchema { args } => cmd::export_api_schema::run(args)?,
        Command::ImportFixtures { args: import_args, shared } => {
            let config = load_config_and_init_logger(shared, &args, "import-fixtures")?;
            cmd::import_fixtures::run(import_args, &config).await?;
        }
    }

    Ok(())
}

async fn start_server(config: Config) -> Result<()> {
    info!("Starting Libris backend ...");
    trace!("Configuration: {:#?}", config);
    let store = store::open(&config).await?;

    // Start web server
    let root_node = api::root_node();
    http::serve(&config.http, root_node, store).await
        .context("failed to start HTTP server")?;

    Ok(())
}


fn load_config_and_init_logger(
    shared: &args::Shared,
    args: &Args,
    cmd: &str,
) -> Result<Config> {
    // Load configuration.
    let (config, path) = match &shared.config {
        Some(path) => {
            let config = Config::load_from(path)
                .context(format!("failed to load config from '{}'", path.display()))?;
            (config, path.clone())
        }
        None => Config::from_env_or_default_locations()?,
    };

    // Initialize logger. Unfortunately, we can only do this here
    // after reading the config.
    logger::init(&config.log, args, cmd)?;
    info!("Loaded config from '{}'", path.display());

    Ok(config)
}
