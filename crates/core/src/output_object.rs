//! Output objects: one renderable feature destined for one or more tiles.
//!
//! An [`OutputObject`] is created once per extracted feature during the
//! collection pass. Its geometry kind, source id, layer and sort direction
//! are fixed from then on; z-order, min-zoom and the attribute-set reference
//! may be changed by later passes (styling, merging).
//!
//! Objects are stored by the caller (typically a `Vec`) and handed around as
//! [`OutputObjectRef`](crate::ordering::OutputObjectRef) handles.

use std::fmt;

use crate::attribute_store::{AttributeSet, AttributeSetRef, AttributeStore};
use crate::dictionary::AttributeDictionary;
use crate::osm_id::{EntityId, OriginKind, PackedId};
use crate::vector_tile::tile::{Feature, GeomType};

/// Highest min-zoom an object can carry.
pub const MAX_MIN_ZOOM: u8 = 15;

/// Geometry kind of an output object. Declaration order is the order used
/// when sorting objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeometryKind {
    Point,
    LineString,
    MultiLineString,
    Polygon,
}

impl GeometryKind {
    /// Whether an entity of this origin can supply this kind of geometry.
    ///
    /// Points come from nodes, linestrings from ways, multilinestrings from
    /// relations, polygons from ways or relations. Shapefile records may
    /// supply anything.
    pub fn accepts(self, origin: OriginKind) -> bool {
        match (self, origin) {
            (_, OriginKind::Shape) => true,
            (GeometryKind::Point, OriginKind::Node) => true,
            (GeometryKind::LineString, OriginKind::Way) => true,
            (GeometryKind::MultiLineString, OriginKind::Relation) => true,
            (GeometryKind::Polygon, OriginKind::Way | OriginKind::Relation) => true,
            _ => false,
        }
    }

    pub fn mvt_type(self) -> GeomType {
        match self {
            GeometryKind::Point => GeomType::Point,
            GeometryKind::LineString | GeometryKind::MultiLineString => GeomType::Linestring,
            GeometryKind::Polygon => GeomType::Polygon,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GeometryKind::Point => "point",
            GeometryKind::LineString => "linestring",
            GeometryKind::MultiLineString => "multilinestring",
            GeometryKind::Polygon => "polygon",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A feature to be written into tiles.
#[derive(Debug, Clone)]
pub struct OutputObject {
    id: PackedId,
    kind: GeometryKind,
    layer: u8,
    ascending_sort: bool,
    z_order: f32,
    min_zoom: u8,
    attributes: AttributeSetRef,
}

impl OutputObject {
    /// Create an output object sorted ascending, at z-order 0, visible from
    /// zoom 0.
    ///
    /// # Panics
    ///
    /// Panics if `entity` cannot supply a geometry of `kind` (see
    /// [`GeometryKind::accepts`]) or if its raw id does not fit in 39 bits.
    pub fn new(kind: GeometryKind, layer: u8, entity: EntityId, attributes: AttributeSetRef) -> Self {
        assert!(
            kind.accepts(entity.kind()),
            "{} cannot be built from {}",
            kind,
            entity
        );
        Self {
            id: PackedId::from(entity),
            kind,
            layer,
            ascending_sort: true,
            z_order: 0.0,
            min_zoom: 0,
            attributes,
        }
    }

    /// Set the sort direction within the layer.
    pub fn with_ascending_sort(mut self, ascending: bool) -> Self {
        self.ascending_sort = ascending;
        self
    }

    pub fn with_z_order(mut self, z_order: f32) -> Self {
        self.z_order = z_order;
        self
    }

    /// # Panics
    ///
    /// Panics if `min_zoom` exceeds [`MAX_MIN_ZOOM`].
    pub fn with_min_zoom(mut self, min_zoom: u8) -> Self {
        self.set_min_zoom(min_zoom);
        self
    }

    pub fn id(&self) -> PackedId {
        self.id
    }

    pub fn entity(&self) -> EntityId {
        self.id.entity()
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    pub fn layer(&self) -> u8 {
        self.layer
    }

    pub fn ascending_sort(&self) -> bool {
        self.ascending_sort
    }

    pub fn z_order(&self) -> f32 {
        self.z_order
    }

    pub fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    pub fn attributes(&self) -> AttributeSetRef {
        self.attributes
    }

    pub fn set_z_order(&mut self, z_order: f32) {
        self.z_order = z_order;
    }

    /// # Panics
    ///
    /// Panics if `min_zoom` exceeds [`MAX_MIN_ZOOM`].
    pub fn set_min_zoom(&mut self, min_zoom: u8) {
        assert!(
            min_zoom <= MAX_MIN_ZOOM,
            "min zoom {} above {}",
            min_zoom,
            MAX_MIN_ZOOM
        );
        self.min_zoom = min_zoom;
    }

    pub fn set_attributes(&mut self, attributes: AttributeSetRef) {
        self.attributes = attributes;
    }

    pub fn visible_at(&self, zoom: u8) -> bool {
        self.min_zoom <= zoom
    }

    /// Resolve this object's attribute set.
    pub fn attribute_set<'a, S>(&self, store: &'a S) -> &'a AttributeSet
    where
        S: AttributeStore + ?Sized,
    {
        store.attribute_set(self.attributes)
    }

    /// Write this object's attributes visible at `zoom` into `feature.tags`,
    /// resolving keys and values through the layer's dictionary.
    pub fn write_attributes<S>(
        &self,
        store: &S,
        dictionary: &mut AttributeDictionary,
        feature: &mut Feature,
        zoom: u8,
    ) -> usize
    where
        S: AttributeStore + ?Sized,
    {
        dictionary.write_attributes(self.attribute_set(store), zoom, &mut feature.tags)
    }
}
