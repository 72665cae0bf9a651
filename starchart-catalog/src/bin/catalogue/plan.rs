//! `plan` subcommand: run the magnitude planner over an equirectangular field.

use anyhow::Context;
use starchart_catalog::query::{plan, survey, MagnitudeRequest, Viewport};
use starchart_catalog::store::CatalogueStore;
use std::time::Instant;

use crate::cli::PlanArgs;

pub fn run(store: &CatalogueStore, args: &PlanArgs) -> anyhow::Result<()> {
    let mut handle = store.open().context("Failed to open catalogue")?;
    let viewport = Viewport::equirectangular(
        args.ra.to_radians(),
        args.dec.to_radians(),
        args.width.to_radians() / 2.0,
        args.height.to_radians() / 2.0,
    );
    let request = MagnitudeRequest {
        mag_min: args.mag_min,
        min_objects: args.min_objects,
        max_objects: args.max_objects,
        mag_step: args.mag_step,
        ..Default::default()
    };

    let start = Instant::now();
    let limits = plan(&mut handle, &viewport, &request).context("Magnitude planning failed")?;
    let field = survey(&mut handle, &viewport, limits.mag_min).context("Field survey failed")?;
    let elapsed = start.elapsed();

    println!("Faint limit (mag_min): {:.2}", limits.mag_min);
    println!("Size scale bright end (mag_max): {:.2}", limits.mag_max);
    println!("Objects to draw: {}", field.count);
    match (field.brightest, field.faintest) {
        (Some(b), Some(f)) => println!("Magnitude range: {:.2} .. {:.2}", b, f),
        _ => println!("Magnitude range: (empty field)"),
    }
    println!("Elapsed: {:.1} ms", elapsed.as_secs_f64() * 1000.0);
    Ok(())
}
