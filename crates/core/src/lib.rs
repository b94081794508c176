//! Feature encoding core for OpenStreetMap vector tiles.
//!
//! This library provides the pieces a tile generator needs between "features
//! have been extracted" and "tile bytes are written":
//!
//! - [`OutputObject`]: one renderable feature, keyed by a [`PackedId`]
//! - [`ordering`]: the total order used to cluster and merge look-alike features
//! - [`AttributeDictionary`]: per-layer key/value dictionaries for feature tags
//! - [`geometry`]: building clipped geometry from a [`GeometryStore`]
//! - [`tile_worker`]: serializing the objects of one tile into an MVT tile
//! - [`TileExpiryList`]: the set of tiles that must be regenerated
//!
//! # Examples
//!
//! ```no_run
//! use osmtile_core::{TileCoordinate, TileExpiryList};
//!
//! let mut expired = TileExpiryList::new(14, true);
//! expired.read_list_from_file("expired.list").unwrap();
//!
//! for tile in expired.clone_at_zoom(12) {
//!     println!("12/{}", tile);
//! }
//! if expired.contains(TileCoordinate::new(8529, 5974)) {
//!     println!("14/8529/5974 needs regenerating");
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

pub mod attribute_store;
pub mod clip;
pub mod dictionary;
pub mod expiry;
pub mod geometry;
pub mod mvt;
pub mod ordering;
pub mod osm_id;
pub mod output_object;
pub mod tile;
pub mod tile_worker;
pub mod value;
pub mod vector_tile;

pub use attribute_store::{Attribute, AttributeSet, AttributeSetRef, AttributeStore, MemoryAttributeStore};
pub use dictionary::AttributeDictionary;
pub use expiry::{ExpiryLineError, TileExpiryList};
pub use geometry::{FeatureGeometry, GeometryStore, MemoryGeometryStore, WayOutput};
pub use ordering::OutputObjectRef;
pub use osm_id::{EntityId, IdOverflow, OriginKind, PackedId};
pub use output_object::{GeometryKind, OutputObject};
pub use tile::{TileBounds, TileCoordinate};
pub use value::AttributeValue;

/// Errors raised by the tile encoding core.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read expiry list {}: {source}", .path.display())]
    ExpiryRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid expiry list {} at line {line}: {reason}", .path.display())]
    ExpiryList {
        path: PathBuf,
        line: usize,
        reason: ExpiryLineError,
    },

    #[error("Geometry store has no {0}")]
    MissingEntity(EntityId),

    #[error("Unsupported attribute value: {0}")]
    UnsupportedValue(String),

    #[error("MVT decoding failed: {0}")]
    MvtDecode(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Tile serialization settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Tile extent (default: 4096)
    pub extent: u32,
    /// Buffer around each tile in pixels (default: 8)
    pub buffer_pixels: u32,
    /// Layer names, indexed by output object layer number
    pub layer_names: Vec<String>,
    /// Merge same-appearance lines and polygons into one feature
    pub combine_similar: bool,
    /// Write the source entity id as the feature id
    pub include_ids: bool,
    /// Skip objects whose geometry is missing instead of failing the tile
    pub skip_missing_geometry: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extent: mvt::DEFAULT_EXTENT,
            buffer_pixels: clip::DEFAULT_BUFFER_PIXELS,
            layer_names: Vec::new(),
            combine_similar: true,
            include_ids: false,
            skip_missing_geometry: false,
        }
    }
}

impl Config {
    pub fn with_extent(mut self, extent: u32) -> Self {
        self.extent = extent;
        self
    }

    pub fn with_buffer(mut self, buffer_pixels: u32) -> Self {
        self.buffer_pixels = buffer_pixels;
        self
    }

    pub fn with_layer_names(mut self, names: Vec<String>) -> Self {
        self.layer_names = names;
        self
    }

    pub fn with_combine_similar(mut self, combine: bool) -> Self {
        self.combine_similar = combine;
        self
    }

    pub fn with_include_ids(mut self, include_ids: bool) -> Self {
        self.include_ids = include_ids;
        self
    }

    pub fn with_skip_missing_geometry(mut self, skip: bool) -> Self {
        self.skip_missing_geometry = skip;
        self
    }

    /// Name of layer `layer`, `layer{n}` if none was configured.
    pub fn layer_name(&self, layer: u8) -> String {
        self.layer_names
            .get(layer as usize)
            .cloned()
            .unwrap_or_else(|| format!("layer{}", layer))
    }
}
