//! `build`, `info` and `tile` subcommands.

use anyhow::Context;
use starchart_catalog::store::{CatalogueRecord, CatalogueStore, NameField};

use crate::cli::TileArgs;

pub fn build(store: &CatalogueStore) -> anyhow::Result<()> {
    let config = store.config();
    println!("=== Rebuild Binary Catalogue ===");
    println!("Source: {:?}", config.source_path);
    println!("Output: {:?}", config.binary_path);
    println!("Levels: {}", config.tiling.level_count());
    println!("Tiles: {}", config.tiling.total_tiles());
    println!();

    let stats = store.rebuild().context("Failed to rebuild catalogue")?;
    println!("Records written: {}", stats.records_written);
    println!("Too faint for any level: {}", stats.too_faint);
    println!("Malformed lines skipped: {}", stats.malformed_lines);
    println!("Tiles out of magnitude order: {}", stats.unsorted_tiles);
    println!("Empty tiles: {} of {}", stats.empty_tiles, stats.tile_count);
    println!("Largest tile: {} records", stats.max_tile_records);
    println!(
        "File size: {} bytes ({:.2} MB)",
        stats.file_size,
        stats.file_size as f64 / 1_048_576.0
    );
    println!("Elapsed: {:.2} s", stats.elapsed_secs);
    Ok(())
}

pub fn info(store: &CatalogueStore) -> anyhow::Result<()> {
    let handle = store.open().context("Failed to open catalogue")?;
    let index = handle.index();
    println!("{}", index);
    println!();
    println!("{:>5}  {:>8}  {:>9}  {:>10}", "Level", "Mag", "Grid", "Records");
    let counts = index.level_record_counts();
    for (i, (level, count)) in handle.tiling().levels().iter().zip(counts).enumerate() {
        println!(
            "{:>5}  {:>8.2}  {:>4}×{:<4}  {:>10}",
            i, level.faintest_mag, level.ra_bins, level.dec_bins, count
        );
    }
    Ok(())
}

pub fn tile(store: &CatalogueStore, args: &TileArgs) -> anyhow::Result<()> {
    let mut handle = store.open().context("Failed to open catalogue")?;
    let records = handle
        .read_tile(args.tile_id)
        .with_context(|| format!("Failed to read tile {}", args.tile_id))?;

    println!("Tile {}: {} records", args.tile_id, records.len());
    for record in records.iter().take(args.limit.unwrap_or(usize::MAX)) {
        print_record(record);
    }

    let unsorted = records.windows(2).filter(|w| w[1].mag < w[0].mag).count();
    if unsorted > 0 {
        anyhow::bail!(
            "Tile {} has {} records out of magnitude order",
            args.tile_id,
            unsorted
        );
    }
    println!("Magnitude order: OK");
    Ok(())
}

fn print_record(record: &CatalogueRecord) {
    let name = [
        NameField::ProperName,
        NameField::BayerDesignation,
        NameField::VariableId,
        NameField::FlamsteedNumber,
    ]
    .into_iter()
    .find_map(|field| record.name(field))
    .unwrap_or("-");
    println!(
        "{:>8} {:>10.5} {:>+10.5} {:>6.2} {:>6.2}  {}",
        record.hip_number,
        record.ra.to_degrees(),
        record.dec.to_degrees(),
        record.mag,
        record.colour_index,
        name
    );
}
