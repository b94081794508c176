//! Tile serialization pass: turns the output objects that touch one tile
//! into an MVT [`Tile`].
//!
//! For each tile:
//! 1. Objects not visible at the zoom are dropped
//! 2. The rest are sorted and de-duplicated (see [`crate::ordering`])
//! 3. Each run of same-appearance objects has its geometry built and
//!    clipped, and lines and polygons in a run are merged into one feature
//!    when `combine_similar` is set
//! 4. Features are ordered by z-order within their layer and encoded
//!
//! Tiles that end up without features are skipped (`Ok(None)`).
//!
//! Workers share the attribute and geometry stores read-only; each call
//! owns its layer dictionaries, so tiles can be written in parallel.

use std::collections::BTreeMap;

use prost::Message;

use crate::attribute_store::AttributeStore;
use crate::clip::buffer_pixels_to_degrees;
use crate::geometry::{build_node_geometry, build_way_geometry, FeatureGeometry, GeometryStore, WayOutput};
use crate::mvt::{LayerBuilder, TileBuilder};
use crate::ordering::{dedup_output_objects, mergeable_groups, OutputObjectRef};
use crate::output_object::{GeometryKind, OutputObject};
use crate::tile::TileBounds;
use crate::vector_tile::Tile;
use crate::{Config, Error, Result};

/// A feature waiting for its layer to be encoded.
struct PendingFeature<'a> {
    object: &'a OutputObject,
    geometry: FeatureGeometry,
}

impl PendingFeature<'_> {
    /// Sort key within the layer; descending objects sort by negated
    /// z-order.
    fn sort_key(&self) -> f32 {
        let z = if self.object.ascending_sort() {
            self.object.z_order()
        } else {
            -self.object.z_order()
        };
        // fold -0.0 into 0.0 so equal z-orders tie under total_cmp
        z + 0.0
    }
}

/// Build the tile at `zoom` covering `bounds` from `objects`.
///
/// `objects` should already be limited to those touching the tile; anything
/// outside `bounds` (plus the configured buffer) is clipped away anyway.
///
/// Fails with [`Error::MissingEntity`] if an object's source entity is not
/// in `geometries`, unless [`Config::skip_missing_geometry`] is set.
pub fn write_tile<A, G>(
    objects: &[OutputObject],
    attributes: &A,
    geometries: &G,
    zoom: u8,
    bounds: &TileBounds,
    config: &Config,
) -> Result<Option<Tile>>
where
    A: AttributeStore + ?Sized,
    G: GeometryStore + ?Sized,
{
    let buffer = buffer_pixels_to_degrees(config.buffer_pixels, bounds, config.extent);
    let clip_bounds = bounds.buffered(buffer);

    let mut refs: Vec<OutputObjectRef<'_>> = objects
        .iter()
        .filter(|o| o.visible_at(zoom))
        .map(|o| OutputObjectRef::new(o, attributes))
        .collect();
    dedup_output_objects(&mut refs);

    let mut layers: BTreeMap<u8, Vec<PendingFeature<'_>>> = BTreeMap::new();
    for group in mergeable_groups(&refs) {
        let combine = config.combine_similar && group[0].kind() != GeometryKind::Point;
        let pending = layers.entry(group[0].layer()).or_default();

        let mut merged: Option<PendingFeature<'_>> = None;
        for r in group {
            let object = r.object();
            let Some(geometry) = object_geometry(geometries, object, &clip_bounds, config)? else {
                continue;
            };
            if !combine {
                pending.push(PendingFeature { object, geometry });
                continue;
            }
            match merged.as_mut() {
                Some(feature) => {
                    feature.geometry.merge(geometry);
                }
                None => merged = Some(PendingFeature { object, geometry }),
            }
        }
        pending.extend(merged);
    }

    let mut tile = TileBuilder::new();
    for (layer, mut features) in layers {
        features.sort_by(|a, b| a.sort_key().total_cmp(&b.sort_key()));

        let mut builder = LayerBuilder::new(config.layer_name(layer))
            .with_extent(config.extent)
            .with_include_ids(config.include_ids);
        for feature in &features {
            builder.add_object(attributes, feature.object, &feature.geometry, zoom, bounds);
        }
        log::trace!("layer {} at z{}: {} features", layer, zoom, builder.len());
        tile.add_layer(builder.build());
    }

    if tile.is_empty() {
        return Ok(None);
    }
    let tile = tile.build();
    log::debug!(
        "Wrote tile at z{} with {} layers, {} features",
        zoom,
        tile.layers.len(),
        tile.layers.iter().map(|l| l.features.len()).sum::<usize>()
    );
    Ok(Some(tile))
}

fn object_geometry<G>(
    geometries: &G,
    object: &OutputObject,
    bounds: &TileBounds,
    config: &Config,
) -> Result<Option<FeatureGeometry>>
where
    G: GeometryStore + ?Sized,
{
    let built = if object.kind() == GeometryKind::Point {
        build_node_geometry(geometries, object, bounds).map(|p| p.map(FeatureGeometry::Point))
    } else {
        build_way_geometry(geometries, object, bounds, WayOutput::Full)
    };

    match built {
        Err(Error::MissingEntity(entity)) if config.skip_missing_geometry => {
            log::warn!("Skipping {} object: {} not in geometry store", object.kind(), entity);
            Ok(None)
        }
        other => other,
    }
}

/// Serialize a tile to protobuf bytes.
pub fn encode_tile(tile: &Tile) -> Vec<u8> {
    tile.encode_to_vec()
}

pub fn decode_tile(data: &[u8]) -> Result<Tile> {
    Tile::decode(data).map_err(|e| Error::MvtDecode(format!("Failed to decode tile: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute_store::{AttributeSet, AttributeSetRef, MemoryAttributeStore};
    use crate::geometry::MemoryGeometryStore;
    use crate::mvt::{command_decode, command_encode};
    use crate::osm_id::EntityId;
    use crate::vector_tile::tile::GeomType;
    use geo::coord;

    struct Fixture {
        attributes: MemoryAttributeStore,
        geometries: MemoryGeometryStore,
        road: AttributeSetRef,
        path: AttributeSetRef,
        park: AttributeSetRef,
    }

    fn fixture() -> Fixture {
        let mut attributes = MemoryAttributeStore::new();
        let road = attributes.insert(AttributeSet::new().with("highway", "primary"));
        let path = attributes.insert(AttributeSet::new().with("highway", "path"));
        let park = attributes.insert(AttributeSet::new().with("leisure", "park"));

        let mut geometries = MemoryGeometryStore::new();
        for id in 1..=3u64 {
            let y = id as f64;
            geometries.insert_way(id, vec![coord! { x: 1.0, y: y }, coord! { x: 9.0, y: y }]);
        }
        for id in 10..=12u64 {
            let x = (id - 10) as f64 * 3.0;
            geometries.insert_way(
                id,
                vec![
                    coord! { x: x, y: 0.0 },
                    coord! { x: x + 2.0, y: 0.0 },
                    coord! { x: x + 2.0, y: 2.0 },
                    coord! { x: x, y: 2.0 },
                    coord! { x: x, y: 0.0 },
                ],
            );
        }
        // overlapping squares
        for (id, min, max) in [(13u64, 1.0, 5.0), (14, 2.0, 6.0)] {
            geometries.insert_way(
                id,
                vec![
                    coord! { x: min, y: min },
                    coord! { x: max, y: min },
                    coord! { x: max, y: max },
                    coord! { x: min, y: max },
                    coord! { x: min, y: min },
                ],
            );
        }
        geometries.insert_node(100, coord! { x: 5.0, y: 5.0 });
        geometries.insert_node(101, coord! { x: 6.0, y: 6.0 });

        Fixture {
            attributes,
            geometries,
            road,
            path,
            park,
        }
    }

    fn bounds() -> TileBounds {
        TileBounds::new(0.0, 0.0, 10.0, 10.0)
    }

    fn line(id: u64, attrs: AttributeSetRef) -> OutputObject {
        OutputObject::new(GeometryKind::LineString, 0, EntityId::Way(id), attrs)
    }

    fn area(id: u64, attrs: AttributeSetRef) -> OutputObject {
        OutputObject::new(GeometryKind::Polygon, 1, EntityId::Way(id), attrs)
    }

    fn write(f: &Fixture, objects: &[OutputObject], config: &Config) -> Result<Option<Tile>> {
        write_tile(objects, &f.attributes, &f.geometries, 14, &bounds(), config)
    }

    fn move_to_count(geometry: &[u32]) -> usize {
        geometry
            .iter()
            .filter(|&&c| c == command_encode(1, 1))
            .count()
    }

    #[test]
    fn test_similar_lines_are_combined() {
        let f = fixture();
        let objects = vec![line(1, f.road), line(2, f.road), line(3, f.path)];
        let tile = write(&f, &objects, &Config::default()).unwrap().unwrap();

        assert_eq!(tile.layers.len(), 1);
        let layer = &tile.layers[0];
        assert_eq!(layer.name, "layer0");
        assert_eq!(layer.features.len(), 2);
        let parts: Vec<_> = layer.features.iter().map(|f| move_to_count(&f.geometry)).collect();
        assert!(parts.contains(&2) && parts.contains(&1), "{:?}", parts);
    }

    #[test]
    fn test_combine_disabled_keeps_features_apart() {
        let f = fixture();
        let objects = vec![line(1, f.road), line(2, f.road)];
        let config = Config::default().with_combine_similar(false);
        let tile = write(&f, &objects, &config).unwrap().unwrap();
        assert_eq!(tile.layers[0].features.len(), 2);
    }

    #[test]
    fn test_points_are_never_combined() {
        let f = fixture();
        let objects = vec![
            OutputObject::new(GeometryKind::Point, 2, EntityId::Node(100), f.park),
            OutputObject::new(GeometryKind::Point, 2, EntityId::Node(101), f.park),
        ];
        let tile = write(&f, &objects, &Config::default()).unwrap().unwrap();
        let layer = &tile.layers[0];
        assert_eq!(layer.features.len(), 2);
        assert_eq!(layer.features[0].r#type, Some(GeomType::Point as i32));
        assert_eq!(command_decode(layer.features[0].geometry[0]), (1, 1));
    }

    #[test]
    fn test_layers_in_order_with_names() {
        let f = fixture();
        let objects = vec![area(10, f.park), line(1, f.road)];
        let config = Config::default().with_layer_names(vec!["transportation".to_string()]);
        let tile = write(&f, &objects, &config).unwrap().unwrap();
        let names: Vec<_> = tile.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["transportation", "layer1"]);
    }

    #[test]
    fn test_min_zoom_filter() {
        let f = fixture();
        let objects = vec![line(1, f.road).with_min_zoom(15)];
        assert!(write(&f, &objects, &Config::default()).unwrap().is_none());

        let tile = write_tile(&objects, &f.attributes, &f.geometries, 15, &bounds(), &Config::default())
            .unwrap();
        assert!(tile.is_some());
    }

    #[test]
    fn test_duplicates_are_written_once() {
        let f = fixture();
        let objects = vec![line(1, f.road), line(1, f.road)];
        let config = Config::default().with_combine_similar(false);
        let tile = write(&f, &objects, &config).unwrap().unwrap();
        assert_eq!(tile.layers[0].features.len(), 1);
    }

    #[test]
    fn test_z_order_within_layer() {
        let f = fixture();
        let config = Config::default().with_combine_similar(false).with_include_ids(true);

        let ascending = vec![
            area(10, f.park).with_z_order(3.0),
            area(11, f.park).with_z_order(1.0),
            area(12, f.park).with_z_order(2.0),
        ];
        let tile = write(&f, &ascending, &config).unwrap().unwrap();
        let ids: Vec<_> = tile.layers[0].features.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![Some(11), Some(12), Some(10)]);

        let descending: Vec<_> = ascending
            .into_iter()
            .map(|o| o.with_ascending_sort(false))
            .collect();
        let tile = write(&f, &descending, &config).unwrap().unwrap();
        let ids: Vec<_> = tile.layers[0].features.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![Some(10), Some(12), Some(11)]);
    }

    #[test]
    fn test_equal_z_order_keeps_sorted_order() {
        let f = fixture();
        let config = Config::default().with_combine_similar(false).with_include_ids(true);
        let objects = vec![area(12, f.park), area(10, f.park), area(11, f.park)];
        let tile = write(&f, &objects, &config).unwrap().unwrap();
        let ids: Vec<_> = tile.layers[0].features.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![Some(10), Some(11), Some(12)]);
    }

    #[test]
    fn test_equal_z_order_mixed_direction() {
        let f = fixture();
        let config = Config::default().with_combine_similar(false).with_include_ids(true);
        let objects = vec![
            area(11, f.park).with_ascending_sort(false),
            area(10, f.park),
        ];
        let tile = write(&f, &objects, &config).unwrap().unwrap();
        let ids: Vec<_> = tile.layers[0].features.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![Some(10), Some(11)]);
    }

    #[test]
    fn test_overlapping_polygons_merge_into_one_ring() {
        let f = fixture();
        let objects = vec![area(13, f.park), area(14, f.park)];
        let tile = write(&f, &objects, &Config::default()).unwrap().unwrap();
        let layer = &tile.layers[0];
        assert_eq!(layer.features.len(), 1);
        assert_eq!(move_to_count(&layer.features[0].geometry), 1);
    }

    #[test]
    fn test_missing_entity() {
        let f = fixture();
        let objects = vec![line(1, f.road), line(404, f.path)];
        match write(&f, &objects, &Config::default()) {
            Err(Error::MissingEntity(EntityId::Way(404))) => {}
            other => panic!("Expected MissingEntity, got {:?}", other),
        }

        let config = Config::default().with_skip_missing_geometry(true);
        let tile = write(&f, &objects, &config).unwrap().unwrap();
        assert_eq!(tile.layers[0].features.len(), 1);
    }

    #[test]
    fn test_empty_tile_is_none() {
        let f = fixture();
        assert!(write(&f, &[], &Config::default()).unwrap().is_none());

        let far = TileBounds::new(50.0, 50.0, 60.0, 60.0);
        let objects = vec![line(1, f.road)];
        let tile = write_tile(&objects, &f.attributes, &f.geometries, 14, &far, &Config::default()).unwrap();
        assert!(tile.is_none());
    }

    #[test]
    fn test_encode_decode_tile() {
        let f = fixture();
        let tile = write(&f, &[line(1, f.road)], &Config::default()).unwrap().unwrap();
        let bytes = encode_tile(&tile);
        assert_eq!(decode_tile(&bytes).unwrap(), tile);

        assert!(matches!(decode_tile(&[0x1a, 0x05, 0x01]), Err(Error::MvtDecode(_))));
    }
}
