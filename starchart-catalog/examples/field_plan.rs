use starchart_catalog::query::{plan, survey, MagnitudeRequest, Viewport};
use starchart_catalog::store::{CatalogueConfig, CatalogueStore};

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let (Some(source), Some(binary)) = (args.next(), args.next()) else {
        anyhow::bail!("Usage: field_plan <stars.txt[.gz]> <stars.bin>");
    };

    let store = CatalogueStore::new(CatalogueConfig::new(source, binary));
    let mut handle = store.open()?;
    println!("{}", handle.index());

    // Orion, 25° × 18°
    let viewport = Viewport::equirectangular(
        83.8f64.to_radians(),
        (-1.0f64).to_radians(),
        12.5f64.to_radians(),
        9.0f64.to_radians(),
    );
    let request = MagnitudeRequest {
        mag_min: 8.0,
        max_objects: 800,
        ..Default::default()
    };

    let limits = plan(&mut handle, &viewport, &request)?;
    let field = survey(&mut handle, &viewport, limits.mag_min)?;
    println!(
        "\nmag_min {:.2}, mag_max {:.2}: {} objects",
        limits.mag_min, limits.mag_max, field.count
    );

    Ok(())
}
