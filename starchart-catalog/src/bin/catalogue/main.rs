//! starchart-catalogue: build and inspect tile-indexed star catalogues.

mod cli;
mod inspect;
mod plan;

use clap::Parser;
use cli::{Cli, Commands};
use starchart_catalog::store::CatalogueStore;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = CatalogueStore::new(cli.catalogue_config());
    match &cli.command {
        Commands::Build => inspect::build(&store),
        Commands::Info => inspect::info(&store),
        Commands::Tile(args) => inspect::tile(&store, args),
        Commands::Plan(args) => plan::run(&store, args),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
