//! Rendering of curb areas over slippy-map tile mosaics.
//!
//! An area is drawn onto a canvas covering every tile its polygon and zones touch. Zone
//! fragments are stitched into chains first so that a chain can be drawn as one straight
//! chord when requested.

use image::{Rgba, RgbaImage};
use log::{debug, warn};
use thiserror::Error;

pub mod bounds;
pub mod draw;
pub mod model;
pub mod mosaic;
pub mod projection;
pub mod stitch;

pub use bounds::TileBounds;
pub use draw::ChainStyle;
pub use model::{Area, AreaGeometry, LineGeometry, Zone, ZoneTable};
pub use mosaic::{NoTiles, TileSource};
pub use projection::{LonLat, MAX_ZOOM, TILE_SIZE};
pub use stitch::{stitch_polylines, PixelPoint};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed geometry: {0}")]
    MalformedGeometry(String),

    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    #[error("Tile {zoom}/{x}/{y} unavailable: {reason}")]
    TileUnavailable { zoom: u32, x: i64, y: i64, reason: String },

    #[error("Canvas of {columns}x{rows} tiles exceeds the configured limit")]
    CanvasTooLarge { columns: i64, rows: i64 },

    #[error("Zoom level {zoom} is deeper than {max}")]
    ZoomOutOfRange { zoom: u32, max: u32 },

    #[error("Failed to generate image: {0}")]
    ImageError(String),
}

pub type StatusOr<T> = Result<T, RenderError>;

/// Configuration for rendering one area
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub zoom: u32,
    pub straight: bool,            // Draw each zone chain as a single chord
    pub background: Rgba<u8>,      // Shown wherever a tile is missing
    pub area_color: Rgba<u8>,
    pub zone_color: Rgba<u8>,
    pub stroke_width: f32,
    pub max_canvas_tiles: u32,     // Per side
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            zoom: 20,
            straight: false,
            background: Rgba([200, 200, 200, 255]),
            area_color: Rgba([0, 255, 0, 255]),
            zone_color: Rgba([255, 0, 0, 255]),
            stroke_width: 2.0,
            max_canvas_tiles: 32,
        }
    }
}

/// A rendered area and what went into it
pub struct RenderedArea {
    pub image: RgbaImage,
    pub bounds: TileBounds,
    pub missing_tiles: usize,
    pub chains: usize,
}

/// Renders an area at `zoom` with the default styling
pub fn render(area: &Area, zoom: u32, straight: bool, tiles: &dyn TileSource) -> StatusOr<RgbaImage> {
    let config = RenderConfig { zoom, straight, ..Default::default() };
    render_area(area, &config, tiles).map(|rendered| rendered.image)
}

/// Renders the tile mosaic under an area with its outline and stitched zones on top
pub fn render_area(area: &Area, config: &RenderConfig, tiles: &dyn TileSource) -> StatusOr<RenderedArea> {
    let zoom = config.zoom;
    if zoom > MAX_ZOOM {
        return Err(RenderError::ZoomOutOfRange { zoom, max: MAX_ZOOM });
    }
    let ring = area.ring()?;

    // Zones with broken geometry are left out rather than failing the whole area
    let zone_lines: Vec<Vec<LonLat>> = area
        .zones
        .iter()
        .filter_map(|zone| match zone.positions() {
            Ok(line) => Some(line),
            Err(e) => {
                warn!("Skipping zone in area {}: {}", area.id, e);
                None
            }
        })
        .collect();

    let bounds = bounds::area_bounds(&ring, &zone_lines, zoom)
        .ok_or_else(|| RenderError::MalformedGeometry(format!("area {} has no vertices", area.id)))?;
    debug!(
        "Area {} covers tiles x {}..={} y {}..={} at zoom {}",
        area.id, bounds.min_x, bounds.max_x, bounds.min_y, bounds.max_y, zoom
    );

    let mosaic = mosaic::compose_mosaic(&bounds, zoom, tiles, config.background, config.max_canvas_tiles)?;
    let mut image = mosaic.image;

    let to_canvas = |points: &[LonLat]| -> Vec<PixelPoint> {
        let (origin_x, origin_y) = bounds.pixel_origin();
        points
            .iter()
            .map(|&(lon, lat)| {
                let (x, y) = projection::to_pixel(lon, lat, zoom);
                PixelPoint::new(x - origin_x, y - origin_y)
            })
            .collect()
    };

    draw::draw_closed_path(&mut image, &to_canvas(&ring), config.area_color, config.stroke_width);

    let polylines: Vec<Vec<PixelPoint>> = zone_lines.iter().map(|line| to_canvas(line)).collect();
    let chains = stitch_polylines(&polylines);
    let style = ChainStyle::from_straight(config.straight);
    for chain in &chains {
        draw::draw_chain(&mut image, chain, style, config.zone_color, config.stroke_width);
    }
    debug!("Area {}: {} zones stitched into {} chains", area.id, polylines.len(), chains.len());

    Ok(RenderedArea {
        image,
        bounds,
        missing_tiles: mosaic.missing_tiles,
        chains: chains.len(),
    })
}
