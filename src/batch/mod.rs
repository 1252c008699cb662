use anyhow::{anyhow, Result};
use curbviz::{render_area, AreaGeometry, RenderConfig, TileSource};
use log::{debug, error, info};
use rayon::prelude::*;
use std::io::Read;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use crate::model::processor::process_areas;
use crate::model::{Area, StreamStats, ZoneTable};
use crate::output::write_image;

/// Settings for one run over an area stream
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub render: RenderConfig,
    pub create_images: bool,     // Write a PNG per rendered area
    pub output_dir: PathBuf,
    pub parallel: bool,          // Render areas on the rayon pool
}

/// What happened to one area
#[derive(Debug)]
pub enum AreaOutcome {
    Rendered {
        index: usize,
        area_id: String,
        dimensions: (u32, u32),
        missing_tiles: usize,
        output: Option<PathBuf>,
    },
    Skipped {
        area_id: String,
        reason: String,
    },
    Failed {
        index: usize,
        area_id: String,
        error: String,
    },
}

impl AreaOutcome {
    fn log(&self) {
        match self {
            AreaOutcome::Rendered { index, area_id, dimensions, missing_tiles, output } => {
                match output {
                    Some(path) => info!("#{}, Image saved: {}", index, path.display()),
                    None => info!("#{}, Didn't save: {}x{}", index, dimensions.0, dimensions.1),
                }
                if *missing_tiles > 0 {
                    debug!("#{}, area {} rendered with {} missing tiles", index, area_id, missing_tiles);
                }
            }
            AreaOutcome::Skipped { area_id, reason } => info!("Skipping area {}: {}", area_id, reason),
            AreaOutcome::Failed { index, area_id, error } => error!("#{}, area {} failed: {}", index, area_id, error),
        }
    }
}

/// Totals over all areas of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub rendered: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub missing_tiles: usize,
    pub malformed_records: usize,
    pub unresolved_references: usize,
}

impl BatchSummary {
    pub fn record(mut self, outcome: AreaOutcome) -> Self {
        match outcome {
            AreaOutcome::Rendered { missing_tiles, output, .. } => {
                self.rendered += 1;
                self.missing_tiles += missing_tiles;
                if output.is_some() {
                    self.written += 1;
                }
            }
            AreaOutcome::Skipped { .. } => self.skipped += 1,
            AreaOutcome::Failed { .. } => self.failed += 1,
        }
        self
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            rendered: self.rendered + other.rendered,
            written: self.written + other.written,
            skipped: self.skipped + other.skipped,
            failed: self.failed + other.failed,
            missing_tiles: self.missing_tiles + other.missing_tiles,
            malformed_records: self.malformed_records + other.malformed_records,
            unresolved_references: self.unresolved_references + other.unresolved_references,
        }
    }

    fn with_stream_stats(mut self, stats: &StreamStats) -> Self {
        self.malformed_records += stats.malformed;
        self.unresolved_references += stats.unresolved_references;
        self
    }
}

/// An area waiting to be rendered. Only polygon areas get an image index.
struct AreaJob {
    index: Option<usize>,
    area: Area,
}

impl AreaJob {
    fn new(area: Area, next_index: &mut usize) -> Self {
        let index = match area.geometry {
            AreaGeometry::Polygon(_) => {
                let index = *next_index;
                *next_index += 1;
                Some(index)
            }
            _ => None,
        };
        Self { index, area }
    }
}

/// Render every area of an `{"areas": [...]}` stream against the zone table.
///
/// Failures of individual areas are logged and counted; only an unreadable stream is an
/// error.
pub fn run_batch<R, T>(reader: R, zones: &ZoneTable, tiles: &T, options: &BatchOptions) -> Result<BatchSummary>
where
    R: Read + Send,
    T: TileSource + Sync,
{
    let (stats, summary) = if options.parallel {
        run_parallel(reader, zones, tiles, options)?
    } else {
        let mut summary = BatchSummary::default();
        let mut next_index = 0;
        let stats = process_areas(reader, zones, |area| {
            let job = AreaJob::new(area, &mut next_index);
            summary = std::mem::take(&mut summary).record(process_job(job, tiles, options));
        })?;
        (stats, summary)
    };

    Ok(summary.with_stream_stats(&stats))
}

fn run_parallel<R, T>(reader: R, zones: &ZoneTable, tiles: &T, options: &BatchOptions) -> Result<(StreamStats, BatchSummary)>
where
    R: Read + Send,
    T: TileSource + Sync,
{
    // Bounded so that reading never runs far ahead of rendering
    let (sender, receiver) = mpsc::sync_channel::<AreaJob>(rayon::current_num_threads() * 2);

    thread::scope(|scope| {
        let producer = scope.spawn(move || {
            let mut next_index = 0;
            process_areas(reader, zones, |area| {
                // Send only fails once the receiver is gone, and then nobody wants the area
                let _ = sender.send(AreaJob::new(area, &mut next_index));
            })
        });

        let summary = receiver
            .into_iter()
            .par_bridge()
            .map(|job| process_job(job, tiles, options))
            .fold(BatchSummary::default, BatchSummary::record)
            .reduce(BatchSummary::default, BatchSummary::merge);

        let stats = producer
            .join()
            .map_err(|_| anyhow!("Area reader thread panicked"))??;
        Ok((stats, summary))
    })
}

fn process_job(job: AreaJob, tiles: &dyn TileSource, options: &BatchOptions) -> AreaOutcome {
    let AreaJob { index, area } = job;
    let outcome = match index {
        None => AreaOutcome::Skipped {
            reason: format!("{} geometry is not rendered", area.geometry.kind()),
            area_id: area.id,
        },
        Some(index) => match render_and_write(index, &area, tiles, options) {
            Ok(outcome) => outcome,
            Err(e) => AreaOutcome::Failed {
                index,
                area_id: area.id,
                error: format!("{:#}", e),
            },
        },
    };
    outcome.log();
    outcome
}

fn render_and_write(index: usize, area: &Area, tiles: &dyn TileSource, options: &BatchOptions) -> Result<AreaOutcome> {
    let rendered = render_area(area, &options.render, tiles)?;

    let output = if options.create_images {
        Some(write_image(&rendered.image, &options.output_dir, index)?)
    } else {
        None
    };

    Ok(AreaOutcome::Rendered {
        index,
        area_id: area.id.clone(),
        dimensions: rendered.image.dimensions(),
        missing_tiles: rendered.missing_tiles,
        output,
    })
}
