use std::f64::consts::PI;

/// Size of a slippy-map tile edge in pixels
pub const TILE_SIZE: u32 = 256;

/// Half the circumference of the Web Mercator world in meters (EPSG:3857)
pub const MERCATOR_EXTENT: f64 = 20037508.34;

/// Latitude limit of the square Web Mercator world
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Deepest zoom level rendered; beyond it tile and pixel indices lose precision
pub const MAX_ZOOM: u32 = 30;

/// A longitude/latitude pair in degrees (x = longitude, y = latitude)
pub type LonLat = (f64, f64);

fn world_scale(zoom: u32) -> f64 {
    2f64.powi(zoom as i32)
}

/// Converts longitude/latitude to Web Mercator meters.
///
/// Inputs are clamped to the projectable world first so the logarithm never sees
/// an out-of-domain argument.
pub fn to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lon = lon.clamp(-180.0, 180.0);
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);

    let x = lon * MERCATOR_EXTENT / 180.0;
    let y = ((90.0 + lat) * PI / 360.0).tan().ln() / (PI / 180.0);
    let y = y * MERCATOR_EXTENT / 180.0;
    (x, y)
}

/// Converts Web Mercator meters back to longitude/latitude
pub fn from_mercator(x: f64, y: f64) -> LonLat {
    let lon = x * 180.0 / MERCATOR_EXTENT;
    let lat = y * 180.0 / MERCATOR_EXTENT;
    let lat = (lat * PI / 180.0).exp().atan() * 360.0 / PI - 90.0;
    (lon, lat)
}

/// Slippy-map tile indices containing a longitude/latitude at the given zoom.
///
/// Not clamped: points beyond the Mercator latitude limit produce indices outside
/// `0..2^zoom`.
pub fn to_tile_indices(lon: f64, lat: f64, zoom: u32) -> (i64, i64) {
    let n = world_scale(zoom);
    let lat_rad = lat.to_radians();

    let x = ((lon + 180.0) / 360.0 * n).floor();
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n).floor();
    (x as i64, y as i64)
}

/// Absolute pixel coordinates of a longitude/latitude at the given zoom.
/// Pixel y grows southwards.
pub fn to_pixel(lon: f64, lat: f64, zoom: u32) -> (i64, i64) {
    let (mercator_x, mercator_y) = to_mercator(lon, lat);
    let scale = TILE_SIZE as f64 * world_scale(zoom) / MERCATOR_EXTENT / 2.0;
    let pixel_x = ((mercator_x + MERCATOR_EXTENT) * scale) as i64;
    let pixel_y = ((MERCATOR_EXTENT - mercator_y) * scale) as i64;
    (pixel_x, pixel_y)
}
