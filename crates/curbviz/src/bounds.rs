use crate::projection::{to_tile_indices, LonLat, TILE_SIZE};

/// Inclusive rectangle of slippy-map tile indices at one zoom level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileBounds {
    pub min_x: i64,
    pub max_x: i64,
    pub min_y: i64,
    pub max_y: i64,
}

impl TileBounds {
    /// Bounds covering a single tile
    pub fn of_tile(x: i64, y: i64) -> Self {
        Self { min_x: x, max_x: x, min_y: y, max_y: y }
    }

    /// Smallest bounds covering both `self` and the tile at `(x, y)`
    pub fn include(self, x: i64, y: i64) -> Self {
        Self {
            min_x: self.min_x.min(x),
            max_x: self.max_x.max(x),
            min_y: self.min_y.min(y),
            max_y: self.max_y.max(y),
        }
    }

    /// Saturates instead of overflowing for indices far off the tile grid
    pub fn columns(&self) -> i64 {
        self.max_x.saturating_sub(self.min_x).saturating_add(1)
    }

    pub fn rows(&self) -> i64 {
        self.max_y.saturating_sub(self.min_y).saturating_add(1)
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Absolute pixel position of the top-left corner of the rectangle
    pub fn pixel_origin(&self) -> (i64, i64) {
        let tile = TILE_SIZE as i64;
        (self.min_x * tile, self.min_y * tile)
    }

    /// Tile indices in row-major order
    pub fn tiles(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        (self.min_y..=self.max_y).flat_map(move |y| (self.min_x..=self.max_x).map(move |x| (x, y)))
    }
}

/// Folds the tiles of `points` into `bounds`.
///
/// `None` stands for "nothing seen yet", so the first point seeds the rectangle.
pub fn accumulate(bounds: Option<TileBounds>, points: &[LonLat], zoom: u32) -> Option<TileBounds> {
    points.iter().fold(bounds, |bounds, &(lon, lat)| {
        let (x, y) = to_tile_indices(lon, lat, zoom);
        Some(match bounds {
            Some(bounds) => bounds.include(x, y),
            None => TileBounds::of_tile(x, y),
        })
    })
}

/// Tile rectangle covering an area ring and every zone line drawn over it.
/// Returns `None` only when there are no vertices at all.
pub fn area_bounds(ring: &[LonLat], zone_lines: &[Vec<LonLat>], zoom: u32) -> Option<TileBounds> {
    let bounds = accumulate(None, ring, zoom);
    zone_lines
        .iter()
        .fold(bounds, |bounds, line| accumulate(bounds, line, zoom))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_grows_in_every_direction() {
        let bounds = TileBounds::of_tile(10, 10)
            .include(12, 9)
            .include(8, 11)
            .include(9, 10);
        assert_eq!(bounds, TileBounds { min_x: 8, max_x: 12, min_y: 9, max_y: 11 });
        assert_eq!(bounds.columns(), 5);
        assert_eq!(bounds.rows(), 3);
    }

    #[test]
    fn test_span_of_extreme_indices_saturates() {
        let bounds = TileBounds::of_tile(i64::MIN, 0).include(i64::MAX, 0);
        assert_eq!(bounds.columns(), i64::MAX);
        assert_eq!(bounds.rows(), 1);
    }

    #[test]
    fn test_first_point_is_also_a_maximum() {
        // A descending sequence must still record the first point as max
        let points = [(10.0, 0.0), (5.0, 0.0), (1.0, 0.0)];
        let bounds = accumulate(None, &points, 6).unwrap();
        let (first_x, _) = to_tile_indices(10.0, 0.0, 6);
        let (last_x, _) = to_tile_indices(1.0, 0.0, 6);
        assert_eq!(bounds.max_x, first_x);
        assert_eq!(bounds.min_x, last_x);
        assert!(first_x > last_x);
    }

    #[test]
    fn test_bounds_cover_zones_outside_the_area() {
        let ring = vec![(0.0, 0.0), (0.1, 0.0), (0.1, 0.1), (0.0, 0.1), (0.0, 0.0)];
        let zone = vec![(2.0, -2.0), (2.5, -2.5)];
        let zoom = 8;

        let area_only = area_bounds(&ring, &[], zoom).unwrap();
        let with_zone = area_bounds(&ring, &[zone.clone()], zoom).unwrap();
        assert!(with_zone.columns() > area_only.columns());
        assert!(with_zone.rows() > area_only.rows());

        for &(lon, lat) in ring.iter().chain(zone.iter()) {
            let (x, y) = to_tile_indices(lon, lat, zoom);
            assert!(with_zone.contains(x, y));
        }
    }

    #[test]
    fn test_bounds_are_minimal() {
        let ring = vec![(-0.5, 0.5), (0.7, 0.5), (0.7, -0.4), (-0.5, -0.4)];
        let zone = vec![(1.3, 0.2), (1.4, 0.2)];
        let zoom = 9;
        let bounds = area_bounds(&ring, &[zone.clone()], zoom).unwrap();

        let tiles: Vec<(i64, i64)> = ring
            .iter()
            .chain(zone.iter())
            .map(|&(lon, lat)| to_tile_indices(lon, lat, zoom))
            .collect();
        // Every edge of the rectangle is touched by some vertex
        assert!(tiles.iter().any(|&(x, _)| x == bounds.min_x));
        assert!(tiles.iter().any(|&(x, _)| x == bounds.max_x));
        assert!(tiles.iter().any(|&(_, y)| y == bounds.min_y));
        assert!(tiles.iter().any(|&(_, y)| y == bounds.max_y));
    }

    #[test]
    fn test_empty_input_has_no_bounds() {
        assert_eq!(area_bounds(&[], &[], 3), None);
        assert_eq!(area_bounds(&[], &[vec![]], 3), None);
    }

    #[test]
    fn test_tiles_are_row_major() {
        let bounds = TileBounds { min_x: 3, max_x: 4, min_y: 7, max_y: 8 };
        let tiles: Vec<_> = bounds.tiles().collect();
        assert_eq!(tiles, vec![(3, 7), (4, 7), (3, 8), (4, 8)]);
        assert_eq!(bounds.pixel_origin(), (3 * 256, 7 * 256));
    }
}
