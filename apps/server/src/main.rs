//! Onboarding service: turns CSV/JSON asset descriptions into RDF stored in
//! a repository, and reports the hub keys minted for each asset.

mod commands;
mod routes;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
