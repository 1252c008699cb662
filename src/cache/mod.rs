use anyhow::Result;
use curbviz::{RenderError, StatusOr, TileSource};
use image::DynamicImage;
use log::warn;
use std::path::{Path, PathBuf};

/// Directory of pre-rendered background tiles named `<zoom>-<x>-<y>.<extension>`
pub struct TileCache {
    tile_dir: PathBuf,
    extension: String,
}

impl TileCache {
    /// Create a tile cache reading from the given directory
    pub fn new<P: AsRef<Path>>(tile_dir: P, extension: &str) -> Result<Self> {
        let tile_dir = tile_dir.as_ref().to_path_buf();

        if tile_dir.exists() && !tile_dir.is_dir() {
            anyhow::bail!("Tile path {} is not a directory", tile_dir.display());
        }

        // Every tile will come back missing, but areas still render over the background
        if !tile_dir.exists() {
            warn!("Tile directory {} does not exist; mosaics will be blank", tile_dir.display());
        }

        Ok(Self {
            tile_dir,
            extension: extension.trim_start_matches('.').to_string(),
        })
    }

    /// Get the cached file path for a tile
    /// Returns None if the tile is not in the cache
    pub fn get_cached_file(&self, zoom: u32, x: i64, y: i64) -> Option<PathBuf> {
        let file_path = self.get_tile_path(zoom, x, y);
        if file_path.is_file() {
            Some(file_path)
        } else {
            None
        }
    }

    /// Get the cache path for a tile
    fn get_tile_path(&self, zoom: u32, x: i64, y: i64) -> PathBuf {
        self.tile_dir.join(format!("{}-{}-{}.{}", zoom, x, y, self.extension))
    }
}

impl TileSource for TileCache {
    fn fetch_tile(&self, zoom: u32, x: i64, y: i64) -> StatusOr<DynamicImage> {
        let unavailable = |reason: String| RenderError::TileUnavailable { zoom, x, y, reason };

        let path = self
            .get_cached_file(zoom, x, y)
            .ok_or_else(|| unavailable(format!("{} not found", self.get_tile_path(zoom, x, y).display())))?;
        image::open(&path).map_err(|e| unavailable(format!("failed to decode {}: {}", path.display(), e)))
    }
}
