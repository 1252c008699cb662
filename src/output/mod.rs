use anyhow::{Context, Result};
use image::{ImageFormat, RgbaImage};
use std::path::{Path, PathBuf};

/// File name of the image rendered for the `index`-th area of a run
pub fn image_filename(index: usize) -> String {
    format!("area_and_zones_{}.png", index)
}

/// Write a rendered area as PNG into `output_dir`
pub fn write_image<P: AsRef<Path>>(image: &RgbaImage, output_dir: P, index: usize) -> Result<PathBuf> {
    let output_path = output_dir.as_ref().join(image_filename(index));
    image
        .save_with_format(&output_path, ImageFormat::Png)
        .with_context(|| format!("Failed to save image to {:?}", output_path))?;
    Ok(output_path)
}
