use anyhow::{Context, Result};
use clap::Parser;
use curbviz::{RenderConfig, MAX_ZOOM};
use log::{info, warn};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

mod batch;
mod cache;
mod model;
mod output;

use batch::{run_batch, BatchOptions};
use cache::TileCache;
use model::processor::process_zones_file;

#[derive(Parser)]
#[command(author, version, about = "Render curb areas and their zones over map tiles", long_about = None)]
struct Cli {
    /// Path to the zones JSON document
    #[arg(default_value = "zones.json")]
    zones: PathBuf,

    /// Path to the areas JSON document
    #[arg(default_value = "areas.json")]
    areas: PathBuf,

    /// Tile zoom level
    #[arg(short, long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(0..=MAX_ZOOM as i64))]
    zoom: u32,

    /// Draw each zone as a straight line between its ends
    #[arg(long)]
    straight: bool,

    /// Render without writing PNG files
    #[arg(long)]
    no_images: bool,

    /// Directory of cached tiles named <zoom>-<x>-<y>.<extension>
    #[arg(short, long, default_value = "tiles")]
    tiles_dir: PathBuf,

    /// File extension of cached tiles
    #[arg(long, default_value = "jpeg")]
    tile_extension: String,

    /// Directory the rendered images are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Render areas in parallel
    #[arg(long)]
    parallel: bool,

    /// Largest allowed canvas, in tiles per side
    #[arg(long, default_value_t = 32, value_parser = clap::value_parser!(u32).range(1..=128))]
    max_canvas_tiles: u32,
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Parse command line arguments
    let cli = Cli::parse();

    // Load every zone up front; areas only reference them
    let (zones, zone_stats) = process_zones_file(&cli.zones)
        .context("Failed to load zones")?;
    info!(
        "Loaded {} zones ({} malformed, {} duplicate ids)",
        zones.len(),
        zone_stats.malformed,
        zone_stats.duplicates
    );
    if let Some(newest) = zone_stats.newest_update {
        info!("Newest zone update: {}", newest.to_rfc3339());
    }

    let tiles = TileCache::new(&cli.tiles_dir, &cli.tile_extension)
        .context("Failed to open tile cache")?;

    let create_images = !cli.no_images;
    if create_images {
        std::fs::create_dir_all(&cli.output_dir)
            .context("Failed to create output directory")?;
    }

    let options = BatchOptions {
        render: RenderConfig {
            zoom: cli.zoom,
            straight: cli.straight,
            max_canvas_tiles: cli.max_canvas_tiles,
            ..Default::default()
        },
        create_images,
        output_dir: cli.output_dir,
        parallel: cli.parallel,
    };

    info!("Reading areas from {}", cli.areas.display());
    let areas = File::open(&cli.areas)
        .with_context(|| format!("Failed to open area file: {:?}", cli.areas))?;
    let summary = run_batch(BufReader::new(areas), &zones, &tiles, &options)
        .context("Failed to render areas")?;

    info!(
        "Done: {} rendered, {} written, {} skipped, {} failed",
        summary.rendered, summary.written, summary.skipped, summary.failed
    );
    if summary.missing_tiles > 0 {
        warn!("{} tiles were missing and left blank", summary.missing_tiles);
    }
    if summary.malformed_records > 0 || summary.unresolved_references > 0 {
        warn!(
            "{} malformed area records skipped, {} zone references unresolved",
            summary.malformed_records, summary.unresolved_references
        );
    }

    Ok(())
}
