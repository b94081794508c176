//! Tile coordinates and tile bounding boxes.

use std::fmt;
use std::str::FromStr;

use geo::{Coord, Point, Rect};

/// Highest zoom level supported by the tile coordinate types.
pub const MAX_ZOOM: u8 = 30;

/// Column/row of a tile at a zoom level known from context.
///
/// Ordered by x, then y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoordinate {
    pub x: u32,
    pub y: u32,
}

impl TileCoordinate {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// The tile containing this one `levels` zoom levels further out.
    pub fn coarsen(self, levels: u8) -> Self {
        Self {
            x: self.x >> levels,
            y: self.y >> levels,
        }
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.x, self.y)
    }
}

impl FromStr for TileCoordinate {
    type Err = String;

    /// Parse `x/y`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once('/')
            .ok_or_else(|| format!("expected x/y, got {:?}", s))?;
        let x = x.parse().map_err(|e| format!("invalid x {:?}: {}", x, e))?;
        let y = y.parse().map_err(|e| format!("invalid y {:?}: {}", y, e))?;
        Ok(Self { x, y })
    }
}

/// Geographic bounding box (degrees).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    pub lng_min: f64,
    pub lat_min: f64,
    pub lng_max: f64,
    pub lat_max: f64,
}

impl TileBounds {
    pub fn new(lng_min: f64, lat_min: f64, lng_max: f64, lat_max: f64) -> Self {
        Self {
            lng_min,
            lat_min,
            lng_max,
            lat_max,
        }
    }

    /// An inverted box that any [`expand`](Self::expand) replaces.
    pub fn empty() -> Self {
        Self {
            lng_min: f64::INFINITY,
            lat_min: f64::INFINITY,
            lng_max: f64::NEG_INFINITY,
            lat_max: f64::NEG_INFINITY,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.lng_min <= self.lng_max && self.lat_min <= self.lat_max
    }

    pub fn expand(&mut self, other: &Self) {
        self.lng_min = self.lng_min.min(other.lng_min);
        self.lat_min = self.lat_min.min(other.lat_min);
        self.lng_max = self.lng_max.max(other.lng_max);
        self.lat_max = self.lat_max.max(other.lat_max);
    }

    /// Grown by `buffer` degrees on every side.
    pub fn buffered(&self, buffer: f64) -> Self {
        Self {
            lng_min: self.lng_min - buffer,
            lat_min: self.lat_min - buffer,
            lng_max: self.lng_max + buffer,
            lat_max: self.lat_max + buffer,
        }
    }

    pub fn width(&self) -> f64 {
        self.lng_max - self.lng_min
    }

    pub fn height(&self) -> f64 {
        self.lat_max - self.lat_min
    }

    /// Inclusive containment.
    pub fn contains(&self, point: &Point<f64>) -> bool {
        point.x() >= self.lng_min
            && point.x() <= self.lng_max
            && point.y() >= self.lat_min
            && point.y() <= self.lat_max
    }

    pub fn intersects_rect(&self, rect: &Rect<f64>) -> bool {
        rect.max().x >= self.lng_min
            && rect.min().x <= self.lng_max
            && rect.max().y >= self.lat_min
            && rect.min().y <= self.lat_max
    }

    pub fn contains_rect(&self, rect: &Rect<f64>) -> bool {
        rect.min().x >= self.lng_min
            && rect.max().x <= self.lng_max
            && rect.min().y >= self.lat_min
            && rect.max().y <= self.lat_max
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.lng_min,
                y: self.lat_min,
            },
            Coord {
                x: self.lng_max,
                y: self.lat_max,
            },
        )
    }
}
