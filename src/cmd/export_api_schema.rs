//! Writes the GraphQL schema of the API in SDL form. Useful for clients that
//! generate code from the schema.

use std::path::PathBuf;

use crate::{api, prelude::*};


#[derive(Debug, clap::Args)]
pub(crate) struct Args {
    /// Path to the output file. If not specified, the schema is printed to
    /// stdout.
    target: Option<PathBuf>,
}

pub(crate) fn run(args: &Args) -> Result<()> {
    let schema = api::root_node().as_sdl();

    match &args.target {
        Some(target) => std::fs::write(target, schema)
            .with_context(|| format!("failed to write schema to '{}'", target.display()))?,
        None => println!("{schema}"),
    }

    Ok(())
}
