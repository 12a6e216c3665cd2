//! Ontoforge CLI - build and maintain a semantic ontology over a relational database

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod logging;

use cli::{Cli, Commands};
use commands::common::ExitCode;
use commands::{changes, extract, refresh, resume, status};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.global.verbose);

    if let Err(err) = dispatch(&cli).await {
        if let Some(code) = err.downcast_ref::<ExitCode>() {
            std::process::exit(code.0);
        }
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

async fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Extract(args) => extract::execute(args, &cli.global).await,
        Commands::Resume(args) => resume::execute(args, &cli.global).await,
        Commands::Status(args) => status::execute(args, &cli.global).await,
        Commands::Refresh(args) => refresh::execute(args, &cli.global).await,
        Commands::Changes(args) => changes::execute(args, &cli.global).await,
    }
}
