//! Ordering of output objects for clustering and merging.
//!
//! Objects are compared by layer, geometry kind, attribute set (structurally)
//! and finally packed id. Attributes rank above the id so that features that
//! look the same end up next to each other after sorting and can be merged
//! into a single output feature.
//!
//! The hash is coarser than equality: it covers layer and id only.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

use rayon::slice::ParallelSliceMut;

use crate::attribute_store::{AttributeSet, AttributeStore};
use crate::output_object::OutputObject;

/// Borrowed handle to an output object together with its resolved
/// attribute set.
///
/// Equality, ordering and hashing are defined over the referenced object's
/// fields, never over the handle's address.
#[derive(Debug, Clone, Copy)]
pub struct OutputObjectRef<'a> {
    object: &'a OutputObject,
    attributes: &'a AttributeSet,
}

impl<'a> OutputObjectRef<'a> {
    pub fn new<S>(object: &'a OutputObject, store: &'a S) -> Self
    where
        S: AttributeStore + ?Sized,
    {
        Self {
            object,
            attributes: object.attribute_set(store),
        }
    }

    pub fn object(&self) -> &'a OutputObject {
        self.object
    }

    pub fn attribute_set(&self) -> &'a AttributeSet {
        self.attributes
    }

    /// Same layer, geometry kind and attributes: the two objects render
    /// identically and may be merged if their geometries allow it.
    pub fn same_appearance(&self, other: &Self) -> bool {
        self.object.layer() == other.object.layer()
            && self.object.kind() == other.object.kind()
            && self.attributes == other.attributes
    }
}

impl Deref for OutputObjectRef<'_> {
    type Target = OutputObject;

    fn deref(&self) -> &OutputObject {
        self.object
    }
}

impl PartialEq for OutputObjectRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OutputObjectRef<'_> {}

impl PartialOrd for OutputObjectRef<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OutputObjectRef<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.object
            .layer()
            .cmp(&other.object.layer())
            .then_with(|| self.object.kind().cmp(&other.object.kind()))
            .then_with(|| self.attributes.cmp(other.attributes))
            .then_with(|| self.object.id().cmp(&other.object.id()))
    }
}

impl Hash for OutputObjectRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(self.object.layer());
        self.object.id().hash(state);
    }
}

/// Resolve handles for every object in `objects`.
pub fn resolve_all<'a, S>(objects: &'a [OutputObject], store: &'a S) -> Vec<OutputObjectRef<'a>>
where
    S: AttributeStore + ?Sized,
{
    objects.iter().map(|o| OutputObjectRef::new(o, store)).collect()
}

/// Sort handles in parallel. The sort is stable, so the result does not
/// depend on the number of threads.
pub fn sort_output_objects(refs: &mut [OutputObjectRef<'_>]) {
    refs.par_sort();
}

/// Sort and drop handles that compare equal to their predecessor.
pub fn dedup_output_objects(refs: &mut Vec<OutputObjectRef<'_>>) {
    sort_output_objects(refs);
    refs.dedup();
}

/// Runs of adjacent handles with the same appearance. Input must be sorted.
pub fn mergeable_groups<'r, 'a>(
    refs: &'r [OutputObjectRef<'a>],
) -> impl Iterator<Item = &'r [OutputObjectRef<'a>]> {
    refs.chunk_by(|a, b| a.same_appearance(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute_store::{AttributeSetRef, MemoryAttributeStore};
    use crate::osm_id::EntityId;
    use crate::output_object::GeometryKind;
    use std::collections::hash_map::DefaultHasher;

    struct Fixture {
        store: MemoryAttributeStore,
        primary: AttributeSetRef,
        secondary: AttributeSetRef,
        short: AttributeSetRef,
    }

    fn fixture() -> Fixture {
        let mut store = MemoryAttributeStore::new();
        let primary = store.insert(AttributeSet::new().with("highway", "primary").with("lanes", 2.0));
        let secondary =
            store.insert(AttributeSet::new().with("highway", "secondary").with("lanes", 2.0));
        let short = store.insert(AttributeSet::new().with("highway", "track"));
        Fixture {
            store,
            primary,
            secondary,
            short,
        }
    }

    fn way(layer: u8, id: u64, attrs: AttributeSetRef) -> OutputObject {
        OutputObject::new(GeometryKind::LineString, layer, EntityId::Way(id), attrs)
    }

    fn hash_of(r: &OutputObjectRef<'_>) -> u64 {
        let mut hasher = DefaultHasher::new();
        r.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_layer_first() {
        let f = fixture();
        let a = way(0, 99, f.secondary);
        let b = way(1, 1, f.short);
        assert!(OutputObjectRef::new(&a, &f.store) < OutputObjectRef::new(&b, &f.store));
    }

    #[test]
    fn test_kind_before_attributes() {
        let f = fixture();
        let line = way(0, 5, f.secondary);
        let poly = OutputObject::new(GeometryKind::Polygon, 0, EntityId::Way(1), f.short);
        assert!(OutputObjectRef::new(&line, &f.store) < OutputObjectRef::new(&poly, &f.store));
    }

    #[test]
    fn test_attributes_before_id() {
        let f = fixture();
        let a = way(0, 1000, f.primary);
        let b = way(0, 1, f.secondary);
        let c = way(0, 2000, f.short);
        let (ra, rb, rc) = (
            OutputObjectRef::new(&a, &f.store),
            OutputObjectRef::new(&b, &f.store),
            OutputObjectRef::new(&c, &f.store),
        );
        // shorter set first, then lexicographic
        assert!(rc < ra);
        assert!(ra < rb);
    }

    #[test]
    fn test_id_breaks_ties() {
        let f = fixture();
        let a = way(0, 1, f.primary);
        let b = way(0, 2, f.primary);
        let ra = OutputObjectRef::new(&a, &f.store);
        let rb = OutputObjectRef::new(&b, &f.store);
        assert!(ra < rb);
        assert!(ra.same_appearance(&rb));
    }

    #[test]
    fn test_equality_ignores_handle_identity() {
        let f = fixture();
        let a = way(0, 7, f.primary).with_z_order(3.0);
        let b = way(0, 7, f.primary);
        assert_eq!(OutputObjectRef::new(&a, &f.store), OutputObjectRef::new(&b, &f.store));
    }

    #[test]
    fn test_hash_uses_layer_and_id() {
        let f = fixture();
        let a = way(0, 7, f.primary);
        let b = way(0, 7, f.secondary);
        let ra = OutputObjectRef::new(&a, &f.store);
        let rb = OutputObjectRef::new(&b, &f.store);
        assert_ne!(ra, rb);
        assert_eq!(hash_of(&ra), hash_of(&rb));
    }

    #[test]
    fn test_total_order_over_all_triples() {
        let f = fixture();
        let objects = vec![
            way(0, 3, f.primary),
            way(0, 1, f.secondary),
            way(1, 2, f.short),
            way(0, 3, f.primary),
            OutputObject::new(GeometryKind::Polygon, 0, EntityId::Relation(4), f.short),
            way(0, 2, f.short),
        ];
        let refs = resolve_all(&objects, &f.store);

        for a in &refs {
            assert_eq!(a.cmp(a), Ordering::Equal);
            for b in &refs {
                assert_eq!(a.cmp(b), b.cmp(a).reverse());
                for c in &refs {
                    if a < b && b < c {
                        assert!(a < c);
                    }
                }
            }
        }
    }

    #[test]
    fn test_parallel_sort_is_deterministic() {
        let f = fixture();
        let sets = [f.primary, f.secondary, f.short];
        let objects: Vec<_> = (0..2000u64)
            .map(|i| way((i % 3) as u8, (i * 7919) % 1000, sets[(i % 5 % 3) as usize]))
            .collect();

        let mut parallel = resolve_all(&objects, &f.store);
        sort_output_objects(&mut parallel);

        let mut sequential = resolve_all(&objects, &f.store);
        sequential.sort();

        let ids = |v: &[OutputObjectRef<'_>]| -> Vec<_> { v.iter().map(|r| r.object() as *const _).collect() };
        assert_eq!(ids(&parallel), ids(&sequential));
    }

    #[test]
    fn test_dedup_removes_exact_duplicates() {
        let f = fixture();
        let objects = vec![way(0, 1, f.primary), way(0, 1, f.primary), way(0, 2, f.primary)];
        let mut refs = resolve_all(&objects, &f.store);
        dedup_output_objects(&mut refs);
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn test_mergeable_groups() {
        let f = fixture();
        let objects = vec![
            way(0, 4, f.primary),
            way(0, 1, f.secondary),
            way(0, 2, f.primary),
            way(1, 3, f.primary),
        ];
        let mut refs = resolve_all(&objects, &f.store);
        sort_output_objects(&mut refs);

        let sizes: Vec<_> = mergeable_groups(&refs).map(|g| g.len()).collect();
        assert_eq!(sizes, vec![2, 1, 1]);
    }
}
