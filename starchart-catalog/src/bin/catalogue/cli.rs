//! CLI argument definitions for starchart-catalogue

use clap::{Parser, Subcommand};
use starchart_catalog::store::CatalogueConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "starchart-catalogue")]
#[command(about = "Build and inspect tile-indexed star catalogues")]
#[command(version)]
pub struct Cli {
    /// Text source catalogue (.gz accepted)
    #[arg(long, global = true, default_value = "stars.txt.gz")]
    pub source: PathBuf,

    /// Binary catalogue file
    #[arg(long, global = true, default_value = "stars.bin")]
    pub binary: PathBuf,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn catalogue_config(&self) -> CatalogueConfig {
        CatalogueConfig::new(&self.source, &self.binary)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rebuild the binary catalogue from the text source
    Build,

    /// Print the header summary and per-level occupancy
    Info,

    /// Dump the records of one tile and check their magnitude order
    Tile(TileArgs),

    /// Plan magnitude limits for an equirectangular field
    Plan(PlanArgs),
}

#[derive(Parser)]
pub struct TileArgs {
    /// Global tile id
    pub tile_id: u32,

    /// Print at most this many records
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Field centre right ascension, degrees
    #[arg(allow_hyphen_values = true)]
    pub ra: f64,

    /// Field centre declination, degrees
    #[arg(allow_hyphen_values = true)]
    pub dec: f64,

    /// Field width, degrees
    #[arg(long, default_value = "25.0")]
    pub width: f64,

    /// Field height, degrees
    #[arg(long, default_value = "17.7")]
    pub height: f64,

    /// Initial faint magnitude limit
    #[arg(long, default_value = "6.0")]
    pub mag_min: f64,

    #[arg(long, default_value = "0")]
    pub min_objects: u32,

    #[arg(long, default_value = "1693")]
    pub max_objects: u32,

    /// Histogram bin width, magnitudes
    #[arg(long, default_value = "0.5")]
    pub mag_step: f64,
}
