use anyhow::Result;
use log::info;
use std::io;
use std::path::PathBuf;

use insolation3d::io::write_growth_result;
use insolation3d::sim::sampling::{evaluate_sun_hours, sample_ground, sample_surfaces};
use insolation3d::{
    AnalysisConfig, Footprint, GrowthOutcome, ObstacleScene, ObstacleSurface, Point,
    PotentialGrowth, SunPath, UID,
};

/// Demo run: a vacant site between two existing blocks.
///
/// Set `INSOLATION_CONFIG` to a TOML file to override the defaults and
/// `RUST_LOG=debug` for details.
fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::var_os("INSOLATION_CONFIG") {
        Some(path) => AnalysisConfig::from_toml_file(&PathBuf::from(path))?,
        None => AnalysisConfig::default(),
    };

    let scene = ObstacleScene::new(&[
        // Residential block north of the site, its south facade is protected
        ObstacleSurface::from_box(
            "north_block",
            Point::new(0., 45., 0.),
            Point::new(60., 57., 27.),
        ),
        ObstacleSurface::from_box("east_tower", Point::new(70., 0., 0.), Point::new(85., 20., 45.)),
    ]);
    let site = Footprint::rectangle(10., 5., 46., 35.)?;

    let sun = SunPath::generate(&config.location, &config.sun)?;
    info!("{} sun samples", sun.len());

    // Facade points on the north block
    let facade_faces = sample_surfaces(&scene, &[0], &config.sampling);
    let ground = UID::from("ground");
    let points: Vec<_> = facade_faces
        .iter()
        .filter(|f| f.normal.dy < -0.99)
        .map(|f| f.to_query_point(&scene, &ground))
        .collect();
    info!("{} facade query points", points.len());

    let ground_faces = sample_ground(std::slice::from_ref(&site), &config.sampling)?;
    let sun_hours = evaluate_sun_hours(&ground_faces, &scene, &sun, &config.sampling)?;
    let mean = sun_hours.iter().map(|r| r.hours).sum::<f64>() / sun_hours.len().max(1) as f64;
    info!("Mean ground sun hours around the site: {:.2} h", mean);

    let growth = PotentialGrowth::new(
        &scene,
        &sun,
        &site,
        &points,
        config.norm,
        config.growth.clone(),
    )?;
    match growth.run_with_progress(|p| info!("[{:5.1}%] {}", p.percent, p.message)) {
        GrowthOutcome::Completed(result) => {
            info!(
                "Buildable volume {:.0} m3, max height {:.1} m",
                result.total_volume(),
                result.max_height()
            );
            write_growth_result(io::stdout().lock(), &result)?;
        }
        GrowthOutcome::Cancelled => info!("Growth cancelled"),
    }
    Ok(())
}
