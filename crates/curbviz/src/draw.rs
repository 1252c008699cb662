use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, Canvas};

use crate::stitch::PixelPoint;

/// How a stitched zone chain is drawn
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainStyle {
    /// Every segment of the chain, closed back to the first point
    Outline,
    /// One straight segment from the first point to the last
    Chord,
}

impl ChainStyle {
    pub fn from_straight(straight: bool) -> Self {
        if straight { ChainStyle::Chord } else { ChainStyle::Outline }
    }
}

/// Draws a line `width` pixels wide on any canvas by stamping filled circles along it.
/// Widths of one pixel or less fall back to a plain line.
pub fn draw_thick_line_segment_mut<C: Canvas>(
    canvas: &mut C,
    start: (f32, f32),
    end: (f32, f32),
    color: C::Pixel,
    width: f32,
) where
    C::Pixel: 'static,
{
    if width <= 1.0 {
        draw_line_segment_mut(canvas, start, end, color);
        return;
    }

    let radius = (width / 2.0).round() as i32;
    // Half a radius between stamps keeps the edges of the stroke smooth
    let spacing = (radius as f32 / 2.0).max(0.5);
    for center in stamp_centers(start, end, spacing) {
        draw_filled_circle_mut(canvas, center, radius, color);
    }
}

/// Pixel centres spaced at most `spacing` apart from `start` to `end`, both included.
/// Consecutive duplicates are dropped, so a zero-length segment yields one centre.
fn stamp_centers(start: (f32, f32), end: (f32, f32), spacing: f32) -> Vec<(i32, i32)> {
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let steps = ((dx.hypot(dy) / spacing).ceil() as usize).max(1);

    let mut centers: Vec<(i32, i32)> = (0..=steps)
        .map(|step| {
            let t = step as f32 / steps as f32;
            ((start.0 + t * dx).round() as i32, (start.1 + t * dy).round() as i32)
        })
        .collect();
    centers.dedup();
    centers
}

/// Draws `points` as a closed path: consecutive segments plus the segment from the last
/// point back to the first.
pub fn draw_closed_path(image: &mut RgbaImage, points: &[PixelPoint], color: Rgba<u8>, width: f32) {
    match points {
        [] => {}
        [only] => draw_thick_line_segment_mut(image, only.as_f32(), only.as_f32(), color, width),
        _ => {
            for pair in points.windows(2) {
                draw_thick_line_segment_mut(image, pair[0].as_f32(), pair[1].as_f32(), color, width);
            }
            // A two-point path closes onto its only segment
            if points.len() > 2 {
                let (first, last) = (points[0], points[points.len() - 1]);
                if first != last {
                    draw_thick_line_segment_mut(image, last.as_f32(), first.as_f32(), color, width);
                }
            }
        }
    }
}

/// Draws the straight segment from the first to the last point, ignoring interior points
pub fn draw_chord(image: &mut RgbaImage, points: &[PixelPoint], color: Rgba<u8>, width: f32) {
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        draw_thick_line_segment_mut(image, first.as_f32(), last.as_f32(), color, width);
    }
}

pub fn draw_chain(image: &mut RgbaImage, chain: &[PixelPoint], style: ChainStyle, color: Rgba<u8>, width: f32) {
    match style {
        ChainStyle::Outline => draw_closed_path(image, chain, color, width),
        ChainStyle::Chord => draw_chord(image, chain, color, width),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLANK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const INK: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn points(raw: &[(i64, i64)]) -> Vec<PixelPoint> {
        raw.iter().map(|&p| PixelPoint::from(p)).collect()
    }

    #[test]
    fn test_thick_horizontal_line_covers_every_column() {
        let mut image = RgbaImage::from_pixel(40, 20, BLANK);
        draw_thick_line_segment_mut(&mut image, (5.0, 10.0), (30.0, 10.0), INK, 2.0);
        for x in 5..=30 {
            assert_eq!(*image.get_pixel(x, 10), INK, "column {}", x);
            assert_eq!(*image.get_pixel(x, 9), INK, "column {}", x);
        }
        assert_eq!(*image.get_pixel(20, 14), BLANK);
    }

    #[test]
    fn test_thin_line_and_degenerate_segment() {
        let mut image = RgbaImage::from_pixel(20, 20, BLANK);
        draw_thick_line_segment_mut(&mut image, (2.0, 2.0), (2.0, 15.0), INK, 1.0);
        assert_eq!(*image.get_pixel(2, 8), INK);
        assert_eq!(*image.get_pixel(3, 8), BLANK);

        draw_thick_line_segment_mut(&mut image, (12.0, 12.0), (12.0, 12.0), INK, 2.0);
        assert_eq!(*image.get_pixel(12, 12), INK);
    }

    #[test]
    fn test_stamps_cover_both_ends_without_repeats() {
        let centers = stamp_centers((0.0, 0.0), (10.0, 0.0), 0.5);
        assert_eq!(centers.first(), Some(&(0, 0)));
        assert_eq!(centers.last(), Some(&(10, 0)));
        assert!(centers.windows(2).all(|pair| pair[0] != pair[1]));
        assert_eq!(centers.len(), 11);

        assert_eq!(stamp_centers((3.4, 7.6), (3.4, 7.6), 0.5), vec![(3, 8)]);
    }

    #[test]
    fn test_thick_line_on_an_rgb_canvas() {
        let mut image = image::RgbImage::new(20, 20);
        let ink = image::Rgb([0, 255, 0]);
        draw_thick_line_segment_mut(&mut image, (2.0, 10.0), (17.0, 10.0), ink, 4.0);
        assert_eq!(*image.get_pixel(10, 8), ink);
        assert_eq!(*image.get_pixel(10, 12), ink);
        assert_eq!(*image.get_pixel(10, 16), image::Rgb([0, 0, 0]));
    }

    #[test]
    fn test_segments_off_canvas_are_clipped() {
        let mut image = RgbaImage::from_pixel(10, 10, BLANK);
        draw_thick_line_segment_mut(&mut image, (-50.0, 5.0), (50.0, 5.0), INK, 2.0);
        assert_eq!(*image.get_pixel(0, 5), INK);
        assert_eq!(*image.get_pixel(9, 5), INK);
    }

    #[test]
    fn test_closed_path_draws_closing_segment() {
        let mut image = RgbaImage::from_pixel(40, 40, BLANK);
        let path = points(&[(5, 5), (30, 5), (30, 30)]);
        draw_closed_path(&mut image, &path, INK, 1.0);
        assert_eq!(*image.get_pixel(15, 5), INK);
        assert_eq!(*image.get_pixel(30, 20), INK);
        // Closing diagonal from (30, 30) back to (5, 5)
        assert_eq!(*image.get_pixel(17, 17), INK);
    }

    #[test]
    fn test_chord_skips_interior_points() {
        let path = points(&[(5, 20), (5, 5), (30, 5), (30, 20)]);

        let mut chord = RgbaImage::from_pixel(40, 40, BLANK);
        draw_chain(&mut chord, &path, ChainStyle::Chord, INK, 2.0);
        assert_eq!(*chord.get_pixel(17, 20), INK);
        assert_eq!(*chord.get_pixel(17, 5), BLANK);

        let mut outline = RgbaImage::from_pixel(40, 40, BLANK);
        draw_chain(&mut outline, &path, ChainStyle::Outline, INK, 2.0);
        assert_eq!(*outline.get_pixel(17, 20), INK);
        assert_eq!(*outline.get_pixel(17, 5), INK);
    }

    #[test]
    fn test_style_from_straight_flag() {
        assert_eq!(ChainStyle::from_straight(true), ChainStyle::Chord);
        assert_eq!(ChainStyle::from_straight(false), ChainStyle::Outline);
    }
}
