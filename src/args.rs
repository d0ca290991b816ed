//! This module defines the command line arguments Libris accepts.

use std::{io::IsTerminal, path::PathBuf};
use termcolor::ColorChoice;

use crate::{cmd, db::cmd::DbCommand};


#[derive(Debug, clap::Parser)]
#[command(about = "Library catalog backend: a GraphQL API over books and authors.")]
pub(crate) struct Args {
    #[command(subcommand)]
    pub(crate) cmd: Command,

    /// Whether to use colors in the output. Possible values: "auto", "always"
    /// and "never".
    #[arg(long, global = true, default_value = "auto", value_parser = parse_color_choice)]
    pub(crate) color: ColorChoice,
}

impl Args {
    pub(crate) fn stdout_color(&self) -> ColorChoice {
        resolve_color(self.color, std::io::stdout().is_terminal())
    }

    pub(crate) fn stderr_color(&self) -> ColorChoice {
        resolve_color(self.color, std::io::stderr().is_terminal())
    }
}

fn resolve_color(choice: ColorChoice, is_terminal: bool) -> ColorChoice {
    match choice {
        ColorChoice::Auto if !is_terminal => ColorChoice::Never,
        other => other,
    }
}

fn parse_color_choice(s: &str) -> Result<ColorChoice, String> {
    match s {
        "auto" => Ok(ColorChoice::Auto),
        "always" => Ok(ColorChoice::Always),
        "never" => Ok(ColorChoice::Never),
        other => Err(format!("invalid color choice '{other}'")),
    }
}

#[derive(Debug, clap::Subcommand)]
pub(crate) enum Command {
    /// Starts the backend HTTP server.
    Serve {
        #[command(flatten)]
        shared: Shared,
    },

    /// Database operations.
    Db {
        #[command(subcommand)]
        cmd: DbCommand,

        #[command(flatten)]
        shared: Shared,
    },

    /// Checks config, fixtures, DB connection and schema state to find
    /// problems in Libris' environment.
    ///
    /// Useful for updates as you can catch many errors early, without needing
    /// to restart the running Libris process. Exits with 0 if everything is
    /// Ok, and with 1 otherwise.
    Check {
        #[command(flatten)]
        shared: Shared,
    },

    /// Outputs a template for the configuration file (which includes
    /// descriptions or all options).
    WriteConfig {
        /// Target file. If not specified, the template is written to stdout.
        target: Option<PathBuf>,
    },

    /// Exports the API as GraphQL schema.
    ExportApiSchema {
        #[command(flatten)]
        args: cmd::export_api_schema::Args,
    },

    /// Copies a fixture dataset (authors and books) into the database.
    ImportFixtures {
        #[command(flatten)]
        args: cmd::import_fixtures::Args,

        #[command(flatten)]
        shared: Shared,
    },
}

#[derive(Debug, clap::Args)]
pub(crate) struct Shared {
    /// Path to the configuration file. If this is not specified, Libris will
    /// try opening `config.toml` or `/etc/libris/config.toml`.
    #[arg(short, long)]
    pub(crate) config: Option<PathBuf>,
}
