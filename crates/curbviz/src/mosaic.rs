use image::{imageops, DynamicImage, Rgba, RgbaImage};
use log::{debug, warn};

use crate::bounds::TileBounds;
use crate::projection::TILE_SIZE;
use crate::{RenderError, StatusOr};

/// Source of pre-rendered background tiles addressed by (zoom, x, y)
pub trait TileSource {
    fn fetch_tile(&self, zoom: u32, x: i64, y: i64) -> StatusOr<DynamicImage>;
}

/// Tile source with no tiles; every cell of the mosaic stays background
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTiles;

impl TileSource for NoTiles {
    fn fetch_tile(&self, zoom: u32, x: i64, y: i64) -> StatusOr<DynamicImage> {
        Err(RenderError::TileUnavailable {
            zoom,
            x,
            y,
            reason: "no tile source configured".to_string(),
        })
    }
}

/// Background canvas with every available tile placed on its grid cell
pub struct Mosaic {
    pub image: RgbaImage,
    pub missing_tiles: usize,
}

/// Canvas dimensions in pixels for a tile rectangle
pub fn canvas_size(bounds: &TileBounds, max_tiles: u32) -> StatusOr<(u32, u32)> {
    let (columns, rows) = (bounds.columns(), bounds.rows());
    let too_large = || RenderError::CanvasTooLarge { columns, rows };
    if columns > max_tiles as i64 || rows > max_tiles as i64 {
        return Err(too_large());
    }
    let width = (columns as u32).checked_mul(TILE_SIZE).ok_or_else(too_large)?;
    let height = (rows as u32).checked_mul(TILE_SIZE).ok_or_else(too_large)?;
    Ok((width, height))
}

/// Fills a canvas with `background` and draws each tile of `bounds` at its offset.
///
/// A tile that cannot be fetched is logged and its cell keeps the background colour.
pub fn compose_mosaic(
    bounds: &TileBounds,
    zoom: u32,
    tiles: &dyn TileSource,
    background: Rgba<u8>,
    max_tiles: u32,
) -> StatusOr<Mosaic> {
    let (width, height) = canvas_size(bounds, max_tiles)?;
    let mut image = RgbaImage::from_pixel(width, height, background);
    let mut missing_tiles = 0;

    for (x, y) in bounds.tiles() {
        let offset_x = (x - bounds.min_x) * TILE_SIZE as i64;
        let offset_y = (y - bounds.min_y) * TILE_SIZE as i64;
        match tiles.fetch_tile(zoom, x, y) {
            Ok(tile) => {
                debug!("Placing tile {}/{}/{} at ({}, {})", zoom, x, y, offset_x, offset_y);
                imageops::overlay(&mut image, &tile.to_rgba8(), offset_x, offset_y);
            }
            Err(e) => {
                warn!("Leaving tile {}/{}/{} blank: {}", zoom, x, y, e);
                missing_tiles += 1;
            }
        }
    }

    Ok(Mosaic { image, missing_tiles })
}
