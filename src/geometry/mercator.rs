//! Web Mercator (EPSG:3857) projection and XYZ tile envelopes.

use geo_types::Coord;
use std::f64::consts::PI;

use super::Envelope;
use crate::error::{DatasetError, DatasetResult};

const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the width of the projected world in metres
pub const ORIGIN_SHIFT: f64 = PI * EARTH_RADIUS;

/// Latitude at which the square Web Mercator world ends
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

pub const MAX_ZOOM: u8 = 24;

/// Input: longitude and latitude degrees in EPSG:4326
/// Output: (x, y) EPSG:3857
pub fn to_mercator(c: Coord<f64>) -> Coord<f64> {
    let lat = c.y.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let y = ((90.0 + lat) * PI / 360.0).tan().ln() * EARTH_RADIUS;
    Coord {
        x: c.x * ORIGIN_SHIFT / 180.0,
        y,
    }
}

/// Inverse of [`to_mercator`]
pub fn to_lonlat(c: Coord<f64>) -> Coord<f64> {
    Coord {
        x: c.x / ORIGIN_SHIFT * 180.0,
        y: (c.y / EARTH_RADIUS).sinh().atan().to_degrees(),
    }
}

/// A slippy-map tile address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: i64, x: i64, y: i64) -> DatasetResult<Self> {
        if !(0..=i64::from(MAX_ZOOM)).contains(&z) {
            return Err(DatasetError::invalid(format!(
                "zoom {} outside 0..={}",
                z, MAX_ZOOM
            )));
        }
        let tiles = 1_i64 << z;
        if !(0..tiles).contains(&x) || !(0..tiles).contains(&y) {
            return Err(DatasetError::invalid(format!(
                "tile {}/{}/{} outside the {}x{} grid",
                z, x, y, tiles, tiles
            )));
        }
        Ok(Self {
            z: z as u8,
            x: x as u32,
            y: y as u32,
        })
    }

    /// Tile envelope in EPSG:3857 metres
    pub fn bounds(&self) -> Envelope {
        let size = 2.0 * ORIGIN_SHIFT / f64::from(1_u32 << self.z);
        let min_x = -ORIGIN_SHIFT + f64::from(self.x) * size;
        let max_y = ORIGIN_SHIFT - f64::from(self.y) * size;
        Envelope {
            min_x,
            min_y: max_y - size,
            max_x: min_x + size,
            max_y,
        }
    }

    /// Tile envelope grown by `buffer` units of an `extent`-wide tile
    pub fn buffered_bounds(&self, extent: u32, buffer: u32) -> Envelope {
        let b = self.bounds();
        let pad = (b.max_x - b.min_x) * f64::from(buffer) / f64::from(extent);
        Envelope {
            min_x: b.min_x - pad,
            min_y: b.min_y - pad,
            max_x: b.max_x + pad,
            max_y: b.max_y + pad,
        }
    }
}

/// Convert a Web Mercator envelope back to degrees.
///
/// An envelope touching the top or bottom edge of the projected world
/// reaches the pole, since [`to_mercator`] clamps polar latitudes onto
/// that edge.
pub fn envelope_to_lonlat(env: &Envelope) -> Envelope {
    let min = to_lonlat(Coord { x: env.min_x, y: env.min_y });
    let max = to_lonlat(Coord { x: env.max_x, y: env.max_y });
    Envelope {
        min_x: min.x,
        min_y: if env.min_y <= -ORIGIN_SHIFT { -90.0 } else { min.y },
        max_x: max.x,
        max_y: if env.max_y >= ORIGIN_SHIFT { 90.0 } else { max.y },
    }
}
