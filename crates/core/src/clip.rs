//! Clipping geometries to a tile's bounding box.
//!
//! Lines are cut with geo's boolean ops. Polygons use Sutherland-Hodgman
//! against the box when they are small and every ring is simple, and fall
//! back to a boolean intersection otherwise, since Sutherland-Hodgman
//! misbehaves on self-intersecting rings. Empty results are returned as empty
//! collections, never as errors.

use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, BooleanOps, BoundingRect, Coord, Line, LineString, MultiLineString, MultiPolygon, Point, Polygon};

use crate::tile::TileBounds;

/// Default buffer around each tile, in tile pixels.
pub const DEFAULT_BUFFER_PIXELS: u32 = 8;

/// Convert a pixel buffer to degrees for a tile of the given extent.
pub fn buffer_pixels_to_degrees(buffer_pixels: u32, bounds: &TileBounds, extent: u32) -> f64 {
    bounds.width() * buffer_pixels as f64 / extent as f64
}

pub fn clip_point(point: &Point<f64>, bounds: &TileBounds) -> Option<Point<f64>> {
    bounds.contains(point).then_some(*point)
}

/// Keep the parts of `lines` inside `bounds`.
pub fn clip_multi_linestring(lines: &MultiLineString<f64>, bounds: &TileBounds) -> MultiLineString<f64> {
    let Some(rect) = lines.bounding_rect() else {
        return MultiLineString::new(vec![]);
    };
    if !bounds.intersects_rect(&rect) {
        return MultiLineString::new(vec![]);
    }
    if bounds.contains_rect(&rect) {
        return lines.clone();
    }
    let clipped = bounds.to_rect().to_polygon().clip(lines, false);
    MultiLineString::new(clipped.0.into_iter().filter(|l| l.0.len() >= 2).collect())
}

/// Keep the parts of `polygons` inside `bounds`. Zero-area slivers left by
/// polygons that only touch the box are dropped.
pub fn clip_multi_polygon(polygons: &MultiPolygon<f64>, bounds: &TileBounds) -> MultiPolygon<f64> {
    let Some(rect) = polygons.bounding_rect() else {
        return MultiPolygon::new(vec![]);
    };
    if !bounds.intersects_rect(&rect) {
        return MultiPolygon::new(vec![]);
    }
    if bounds.contains_rect(&rect) {
        return polygons.clone();
    }

    let mut out = Vec::with_capacity(polygons.0.len());
    for polygon in &polygons.0 {
        out.extend(clip_polygon(polygon, bounds));
    }
    MultiPolygon::new(out)
}

fn clip_polygon(polygon: &Polygon<f64>, bounds: &TileBounds) -> Vec<Polygon<f64>> {
    match polygon.bounding_rect() {
        Some(rect) if bounds.intersects_rect(&rect) => {
            if bounds.contains_rect(&rect) {
                return vec![polygon.clone()];
            }
        }
        _ => return vec![],
    }

    let pieces = if sutherland_hodgman_applies(polygon) {
        sutherland_hodgman(polygon, bounds).into_iter().collect()
    } else {
        log::trace!("large or self-intersecting polygon, clipping with boolean ops");
        polygon.intersection(&bounds.to_rect().to_polygon()).0
    };

    pieces
        .into_iter()
        .filter(|p| p.unsigned_area() > 0.0)
        .collect()
}

fn sutherland_hodgman(polygon: &Polygon<f64>, bounds: &TileBounds) -> Option<Polygon<f64>> {
    let exterior = clip_ring(polygon.exterior(), bounds)?;
    let interiors = polygon
        .interiors()
        .iter()
        .filter_map(|ring| clip_ring(ring, bounds))
        .collect();
    Some(Polygon::new(exterior, interiors))
}

/// Clip a ring against the four box edges in turn. `None` if fewer than
/// three vertices survive.
fn clip_ring(ring: &LineString<f64>, bounds: &TileBounds) -> Option<LineString<f64>> {
    let mut vertices: Vec<Coord<f64>> = ring.0.clone();
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }

    let edges = [
        Edge::Left(bounds.lng_min),
        Edge::Right(bounds.lng_max),
        Edge::Bottom(bounds.lat_min),
        Edge::Top(bounds.lat_max),
    ];
    for edge in edges {
        vertices = edge.clip(&vertices);
        if vertices.is_empty() {
            return None;
        }
    }

    (vertices.len() >= 3).then(|| LineString::new(vertices))
}

#[derive(Clone, Copy)]
enum Edge {
    Left(f64),
    Right(f64),
    Bottom(f64),
    Top(f64),
}

impl Edge {
    fn inside(self, c: Coord<f64>) -> bool {
        match self {
            Edge::Left(v) => c.x >= v,
            Edge::Right(v) => c.x <= v,
            Edge::Bottom(v) => c.y >= v,
            Edge::Top(v) => c.y <= v,
        }
    }

    /// Where segment `a`-`b` crosses this edge.
    fn crossing(self, a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
        match self {
            Edge::Left(v) | Edge::Right(v) => {
                let t = (v - a.x) / (b.x - a.x);
                Coord {
                    x: v,
                    y: a.y + t * (b.y - a.y),
                }
            }
            Edge::Bottom(v) | Edge::Top(v) => {
                let t = (v - a.y) / (b.y - a.y);
                Coord {
                    x: a.x + t * (b.x - a.x),
                    y: v,
                }
            }
        }
    }

    fn clip(self, vertices: &[Coord<f64>]) -> Vec<Coord<f64>> {
        let mut out = Vec::with_capacity(vertices.len() + 4);
        for (i, &current) in vertices.iter().enumerate() {
            let previous = vertices[(i + vertices.len() - 1) % vertices.len()];
            match (self.inside(previous), self.inside(current)) {
                (true, true) => out.push(current),
                (true, false) => out.push(self.crossing(previous, current)),
                (false, true) => {
                    out.push(self.crossing(previous, current));
                    out.push(current);
                }
                (false, false) => {}
            }
        }
        out
    }
}

/// Polygons with more vertices than this skip the quadratic simplicity
/// check and go straight to boolean clipping.
const SIMPLE_CHECK_MAX_VERTICES: usize = 256;

/// Whether every ring is small enough to check and simple.
fn sutherland_hodgman_applies(polygon: &Polygon<f64>) -> bool {
    let vertices = polygon.exterior().0.len() + polygon.interiors().iter().map(|r| r.0.len()).sum::<usize>();
    vertices <= SIMPLE_CHECK_MAX_VERTICES
        && is_simple_ring(polygon.exterior())
        && polygon.interiors().iter().all(is_simple_ring)
}

/// No two non-adjacent edges of the ring touch or cross.
fn is_simple_ring(ring: &LineString<f64>) -> bool {
    let edges: Vec<Line<f64>> = ring.lines().collect();
    let n = edges.len();
    if n < 3 {
        return false;
    }
    for i in 0..n {
        for j in (i + 2)..n {
            // first and last edges share the closing vertex
            if i == 0 && j == n - 1 {
                continue;
            }
            match line_intersection(edges[i], edges[j]) {
                None => {}
                Some(LineIntersection::SinglePoint { .. }) | Some(LineIntersection::Collinear { .. }) => {
                    return false;
                }
            }
        }
    }
    true
}
