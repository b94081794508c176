//! Building clipped tile geometry for output objects.
//!
//! Coordinates come from a [`GeometryStore`], looked up by the object's
//! source entity. Way-derived objects (lines and polygons) are assembled
//! into a multi-linestring or multi-polygon and clipped to the tile box;
//! point objects are a single coordinate lookup.
//!
//! A missing entity is an error. A geometry that clips away to nothing is
//! not: the builders return `Ok(None)` and the feature is simply not drawn
//! in that tile.

use std::collections::HashMap;

use geo::{
    Area, BooleanOps, Centroid, Contains, Coord, Geometry, LineString, MultiLineString, MultiPolygon, Point,
    Polygon,
};

use crate::clip::{clip_multi_linestring, clip_multi_polygon, clip_point};
use crate::osm_id::EntityId;
use crate::output_object::{GeometryKind, OutputObject};
use crate::tile::TileBounds;
use crate::vector_tile::tile::GeomType;
use crate::{Error, Result};

/// Source coordinates keyed by entity id. Coordinates are `x = longitude`,
/// `y = latitude`.
pub trait GeometryStore {
    fn node_coordinate(&self, id: u64) -> Option<Coord<f64>>;

    fn way_coordinates(&self, id: u64) -> Option<Vec<Coord<f64>>>;

    /// Member linestrings or rings of a relation.
    fn relation_parts(&self, id: u64) -> Option<Vec<Vec<Coord<f64>>>>;

    /// Geometry of a shapefile record.
    fn shape_geometry(&self, id: u64) -> Option<Geometry<f64>>;
}

/// Hash-map backed [`GeometryStore`].
#[derive(Debug, Default, Clone)]
pub struct MemoryGeometryStore {
    nodes: HashMap<u64, Coord<f64>>,
    ways: HashMap<u64, Vec<Coord<f64>>>,
    relations: HashMap<u64, Vec<Vec<Coord<f64>>>>,
    shapes: HashMap<u64, Geometry<f64>>,
}

impl MemoryGeometryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_node(&mut self, id: u64, coord: Coord<f64>) {
        self.nodes.insert(id, coord);
    }

    pub fn insert_way(&mut self, id: u64, coords: Vec<Coord<f64>>) {
        self.ways.insert(id, coords);
    }

    pub fn insert_relation(&mut self, id: u64, parts: Vec<Vec<Coord<f64>>>) {
        self.relations.insert(id, parts);
    }

    pub fn insert_shape(&mut self, id: u64, geometry: Geometry<f64>) {
        self.shapes.insert(id, geometry);
    }
}

impl GeometryStore for MemoryGeometryStore {
    fn node_coordinate(&self, id: u64) -> Option<Coord<f64>> {
        self.nodes.get(&id).copied()
    }

    fn way_coordinates(&self, id: u64) -> Option<Vec<Coord<f64>>> {
        self.ways.get(&id).cloned()
    }

    fn relation_parts(&self, id: u64) -> Option<Vec<Vec<Coord<f64>>>> {
        self.relations.get(&id).cloned()
    }

    fn shape_geometry(&self, id: u64) -> Option<Geometry<f64>> {
        self.shapes.get(&id).cloned()
    }
}

/// Geometry ready for encoding into a tile.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureGeometry {
    Point(Point<f64>),
    MultiLineString(MultiLineString<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl FeatureGeometry {
    pub fn is_empty(&self) -> bool {
        match self {
            FeatureGeometry::Point(_) => false,
            FeatureGeometry::MultiLineString(mls) => mls.0.is_empty(),
            FeatureGeometry::MultiPolygon(mp) => mp.0.is_empty(),
        }
    }

    pub fn mvt_type(&self) -> GeomType {
        match self {
            FeatureGeometry::Point(_) => GeomType::Point,
            FeatureGeometry::MultiLineString(_) => GeomType::Linestring,
            FeatureGeometry::MultiPolygon(_) => GeomType::Polygon,
        }
    }

    /// Combine `other` into `self` if both are the same collection type:
    /// line parts are appended, polygons are unioned so overlapping areas
    /// dissolve into one ring. Returns `false` (leaving `self` untouched)
    /// otherwise.
    pub fn merge(&mut self, other: FeatureGeometry) -> bool {
        match (self, other) {
            (FeatureGeometry::MultiLineString(a), FeatureGeometry::MultiLineString(b)) => {
                a.0.extend(b.0);
                true
            }
            (FeatureGeometry::MultiPolygon(a), FeatureGeometry::MultiPolygon(b)) => {
                if a.0.is_empty() {
                    *a = b;
                } else if !b.0.is_empty() {
                    *a = a.union(&b);
                }
                true
            }
            _ => false,
        }
    }
}

impl From<FeatureGeometry> for Geometry<f64> {
    fn from(geometry: FeatureGeometry) -> Self {
        match geometry {
            FeatureGeometry::Point(p) => Geometry::Point(p),
            FeatureGeometry::MultiLineString(mls) => Geometry::MultiLineString(mls),
            FeatureGeometry::MultiPolygon(mp) => Geometry::MultiPolygon(mp),
        }
    }
}

/// What to produce for a way-derived object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WayOutput {
    /// The clipped line or polygon geometry.
    #[default]
    Full,
    /// For polygons, the centroid of the whole polygon, kept only if it
    /// falls inside the tile. Lines are unaffected.
    Centroid,
}

/// Assemble and clip the geometry of a line or polygon object.
///
/// # Panics
///
/// Panics if `object` is a point object.
pub fn build_way_geometry<S>(
    store: &S,
    object: &OutputObject,
    bbox: &TileBounds,
    output: WayOutput,
) -> Result<Option<FeatureGeometry>>
where
    S: GeometryStore + ?Sized,
{
    assert!(
        object.kind() != GeometryKind::Point,
        "build_way_geometry called for point object {}",
        object.entity()
    );
    let entity = object.entity();

    let geometry = if object.kind() == GeometryKind::Polygon {
        let polygons = source_polygons(store, entity)?;
        if output == WayOutput::Centroid {
            return Ok(polygons
                .centroid()
                .and_then(|c| clip_point(&c, bbox))
                .map(FeatureGeometry::Point));
        }
        FeatureGeometry::MultiPolygon(clip_multi_polygon(&polygons, bbox))
    } else {
        let lines = source_lines(store, entity)?;
        FeatureGeometry::MultiLineString(clip_multi_linestring(&lines, bbox))
    };

    if geometry.is_empty() {
        log::trace!("{} clipped away entirely", entity);
        return Ok(None);
    }
    Ok(Some(geometry))
}

/// Look up the coordinate of a point object. `None` if it lies outside
/// `bbox`.
///
/// # Panics
///
/// Panics if `object` is not a point object.
pub fn build_node_geometry<S>(store: &S, object: &OutputObject, bbox: &TileBounds) -> Result<Option<Point<f64>>>
where
    S: GeometryStore + ?Sized,
{
    assert!(
        object.kind() == GeometryKind::Point,
        "build_node_geometry called for {} object {}",
        object.kind(),
        object.entity()
    );
    let entity = object.entity();

    let point = match entity {
        EntityId::Node(id) => store.node_coordinate(id).map(Point::from),
        EntityId::Shape(id) => store.shape_geometry(id).and_then(|geometry| match geometry {
            Geometry::Point(p) => Some(p),
            other => other.centroid(),
        }),
        _ => None,
    }
    .ok_or(Error::MissingEntity(entity))?;

    Ok(clip_point(&point, bbox))
}

fn source_lines<S>(store: &S, entity: EntityId) -> Result<MultiLineString<f64>>
where
    S: GeometryStore + ?Sized,
{
    let lines = match entity {
        EntityId::Way(id) => store.way_coordinates(id).map(|c| vec![LineString::new(c)]),
        EntityId::Relation(id) => store
            .relation_parts(id)
            .map(|parts| parts.into_iter().map(LineString::new).collect()),
        EntityId::Shape(id) => store.shape_geometry(id).map(shape_lines),
        EntityId::Node(_) => None,
    }
    .ok_or(Error::MissingEntity(entity))?;

    Ok(MultiLineString::new(
        lines.into_iter().filter(|l| l.0.len() >= 2).collect(),
    ))
}

fn source_polygons<S>(store: &S, entity: EntityId) -> Result<MultiPolygon<f64>>
where
    S: GeometryStore + ?Sized,
{
    match entity {
        EntityId::Way(id) => store
            .way_coordinates(id)
            .map(|c| assemble_multi_polygon(vec![LineString::new(c)])),
        EntityId::Relation(id) => store
            .relation_parts(id)
            .map(|parts| assemble_multi_polygon(parts.into_iter().map(LineString::new).collect())),
        EntityId::Shape(id) => store.shape_geometry(id).map(shape_polygons),
        EntityId::Node(_) => None,
    }
    .ok_or(Error::MissingEntity(entity))
}

fn shape_lines(geometry: Geometry<f64>) -> Vec<LineString<f64>> {
    match geometry {
        Geometry::LineString(ls) => vec![ls],
        Geometry::MultiLineString(mls) => mls.0,
        Geometry::Polygon(p) => polygon_rings(p),
        Geometry::MultiPolygon(mp) => mp.0.into_iter().flat_map(polygon_rings).collect(),
        _ => vec![],
    }
}

fn polygon_rings(polygon: Polygon<f64>) -> Vec<LineString<f64>> {
    let (exterior, interiors) = polygon.into_inner();
    std::iter::once(exterior).chain(interiors).collect()
}

fn shape_polygons(geometry: Geometry<f64>) -> MultiPolygon<f64> {
    match geometry {
        Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
        Geometry::MultiPolygon(mp) => mp,
        Geometry::Rect(r) => MultiPolygon::new(vec![r.to_polygon()]),
        _ => MultiPolygon::new(vec![]),
    }
}

/// Turn loose rings into polygons. Rings are closed and taken largest
/// first; a ring inside an already accepted outer ring becomes one of its
/// holes, anything else starts a new polygon.
pub fn assemble_multi_polygon(rings: Vec<LineString<f64>>) -> MultiPolygon<f64> {
    let mut rings: Vec<(f64, LineString<f64>)> = rings
        .into_iter()
        .filter_map(|mut ring| {
            ring.close();
            if ring.0.len() < 4 {
                return None;
            }
            let area = Polygon::new(ring.clone(), vec![]).unsigned_area();
            (area > 0.0).then_some((area, ring))
        })
        .collect();
    rings.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut outers: Vec<(Polygon<f64>, Vec<LineString<f64>>)> = Vec::new();
    for (_, ring) in rings {
        match outers.iter_mut().find(|(outer, _)| outer.contains(&ring)) {
            Some((_, holes)) => holes.push(ring),
            None => outers.push((Polygon::new(ring, vec![]), Vec::new())),
        }
    }

    MultiPolygon::new(
        outers
            .into_iter()
            .map(|(outer, holes)| Polygon::new(outer.into_inner().0, holes))
            .collect(),
    )
}
