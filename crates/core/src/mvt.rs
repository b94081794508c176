//! MVT (Mapbox Vector Tile) encoding.
//!
//! Geometry is written as a stream of commands:
//!
//! - **MoveTo** / **LineTo** followed by zigzag-encoded coordinate deltas
//! - **ClosePath** ending each polygon ring
//!
//! Deltas are relative to a cursor that carries over between the parts of
//! one feature. Tile coordinates have y pointing down.
//!
//! Reference: <https://github.com/mapbox/vector-tile-spec>

use geo::orient::{Direction, Orient};
use geo::{Coord, LineString, MultiLineString, MultiPolygon, Point};

use crate::attribute_store::AttributeStore;
use crate::dictionary::AttributeDictionary;
use crate::geometry::FeatureGeometry;
use crate::output_object::OutputObject;
use crate::tile::TileBounds;
use crate::vector_tile::tile::{Feature, Layer};
use crate::vector_tile::Tile;

/// Default tile extent.
pub const DEFAULT_EXTENT: u32 = 4096;

/// Layer format version written into every layer.
pub const MVT_VERSION: u32 = 2;

const CMD_MOVE_TO: u32 = 1;
const CMD_LINE_TO: u32 = 2;
const CMD_CLOSE_PATH: u32 = 7;

/// Map signed integers to unsigned so small magnitudes stay small:
/// 0 → 0, -1 → 1, 1 → 2, -2 → 3, ...
#[inline]
pub fn zigzag_encode(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

#[inline]
pub fn zigzag_decode(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

/// Pack a command id with its repeat count.
#[inline]
pub fn command_encode(command_id: u32, count: u32) -> u32 {
    (command_id & 0x7) | (count << 3)
}

/// Split a command into `(command_id, count)`.
#[inline]
pub fn command_decode(command: u32) -> (u32, u32) {
    (command & 0x7, command >> 3)
}

/// Project a longitude/latitude into tile space, `(0, 0)` at the top left.
pub fn geo_to_tile_coords(lng: f64, lat: f64, bounds: &TileBounds, extent: u32) -> (i32, i32) {
    let extent_f = extent as f64;
    let x_ratio = (lng - bounds.lng_min) / bounds.width();
    let y_ratio = (lat - bounds.lat_min) / bounds.height();

    let x = (x_ratio * extent_f).round() as i32;
    let y = ((1.0 - y_ratio) * extent_f).round() as i32;
    (x, y)
}

/// Command stream for one feature.
struct CommandWriter<'a> {
    bounds: &'a TileBounds,
    extent: u32,
    cursor: (i32, i32),
    commands: Vec<u32>,
}

impl<'a> CommandWriter<'a> {
    fn new(bounds: &'a TileBounds, extent: u32) -> Self {
        Self {
            bounds,
            extent,
            cursor: (0, 0),
            commands: Vec::new(),
        }
    }

    fn push_coord(&mut self, coord: &Coord<f64>) {
        let (x, y) = geo_to_tile_coords(coord.x, coord.y, self.bounds, self.extent);
        self.commands.push(zigzag_encode(x - self.cursor.0));
        self.commands.push(zigzag_encode(y - self.cursor.1));
        self.cursor = (x, y);
    }

    fn point(&mut self, point: &Point<f64>) {
        self.commands.push(command_encode(CMD_MOVE_TO, 1));
        self.push_coord(&point.0);
    }

    fn line(&mut self, line: &LineString<f64>) {
        let Some((first, rest)) = line.0.split_first() else {
            return;
        };
        if rest.is_empty() {
            return;
        }
        self.commands.push(command_encode(CMD_MOVE_TO, 1));
        self.push_coord(first);
        self.commands.push(command_encode(CMD_LINE_TO, rest.len() as u32));
        for coord in rest {
            self.push_coord(coord);
        }
    }

    /// A closed ring: the closing coordinate is replaced by ClosePath.
    fn ring(&mut self, ring: &LineString<f64>) {
        if ring.0.len() < 4 {
            return;
        }
        let interior = &ring.0[1..ring.0.len() - 1];
        self.commands.push(command_encode(CMD_MOVE_TO, 1));
        self.push_coord(&ring.0[0]);
        self.commands.push(command_encode(CMD_LINE_TO, interior.len() as u32));
        for coord in interior {
            self.push_coord(coord);
        }
        self.commands.push(command_encode(CMD_CLOSE_PATH, 1));
    }

    fn multi_line_string(&mut self, lines: &MultiLineString<f64>) {
        for line in &lines.0 {
            self.line(line);
        }
    }

    /// Rings are reoriented first: exteriors counter-clockwise in lng/lat,
    /// which turns clockwise once y is flipped.
    fn multi_polygon(&mut self, polygons: &MultiPolygon<f64>) {
        let oriented = polygons.orient(Direction::Default);
        for polygon in &oriented.0 {
            self.ring(polygon.exterior());
            for interior in polygon.interiors() {
                self.ring(interior);
            }
        }
    }

    fn finish(self) -> Vec<u32> {
        self.commands
    }
}

/// Encode `geometry` into command form. Empty if nothing drawable remains.
pub fn encode_geometry(geometry: &FeatureGeometry, bounds: &TileBounds, extent: u32) -> Vec<u32> {
    let mut writer = CommandWriter::new(bounds, extent);
    match geometry {
        FeatureGeometry::Point(p) => writer.point(p),
        FeatureGeometry::MultiLineString(mls) => writer.multi_line_string(mls),
        FeatureGeometry::MultiPolygon(mp) => writer.multi_polygon(mp),
    }
    writer.finish()
}

/// Builds one layer, owning its key/value dictionary.
#[derive(Debug)]
pub struct LayerBuilder {
    name: String,
    extent: u32,
    include_ids: bool,
    features: Vec<Feature>,
    dictionary: AttributeDictionary,
}

impl LayerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extent: DEFAULT_EXTENT,
            include_ids: false,
            features: Vec::new(),
            dictionary: AttributeDictionary::new(),
        }
    }

    pub fn with_extent(mut self, extent: u32) -> Self {
        self.extent = extent;
        self
    }

    /// Write each object's raw entity id as the feature id.
    pub fn with_include_ids(mut self, include_ids: bool) -> Self {
        self.include_ids = include_ids;
        self
    }

    /// Encode `object` with `geometry` as a new feature, writing the
    /// attributes visible at `zoom`.
    ///
    /// Returns `false` and adds nothing if the geometry encodes to no
    /// commands.
    pub fn add_object<S>(
        &mut self,
        store: &S,
        object: &OutputObject,
        geometry: &FeatureGeometry,
        zoom: u8,
        bounds: &TileBounds,
    ) -> bool
    where
        S: AttributeStore + ?Sized,
    {
        let commands = encode_geometry(geometry, bounds, self.extent);
        if commands.is_empty() {
            return false;
        }

        let mut feature = Feature {
            id: self.include_ids.then(|| object.entity().raw()),
            tags: Vec::new(),
            r#type: Some(geometry.mvt_type() as i32),
            geometry: commands,
        };
        object.write_attributes(store, &mut self.dictionary, &mut feature, zoom);
        self.features.push(feature);
        true
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn build(self) -> Layer {
        let (keys, values) = self.dictionary.into_mvt();
        Layer {
            version: MVT_VERSION,
            name: self.name,
            features: self.features,
            keys,
            values,
            extent: Some(self.extent),
        }
    }
}

/// Collects layers into a tile.
#[derive(Debug, Default)]
pub struct TileBuilder {
    layers: Vec<Layer>,
}

impl TileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer. Layers without features are dropped.
    pub fn add_layer(&mut self, layer: Layer) {
        if !layer.features.is_empty() {
            self.layers.push(layer);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn build(self) -> Tile {
        Tile { layers: self.layers }
    }
}
