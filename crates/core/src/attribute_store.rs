//! Attribute sets and the store that owns them.
//!
//! Output objects never own their attributes. They hold an
//! [`AttributeSetRef`] into an [`AttributeStore`], which is filled during
//! the collection pass and only read while tiles are written.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::value::AttributeValue;

/// Handle to an attribute set held by an [`AttributeStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeSetRef(u32);

impl AttributeSetRef {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

/// One key/value pair, visible from `min_zoom` upwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub key: String,
    pub value: AttributeValue,
    pub min_zoom: u8,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            min_zoom: 0,
        }
    }

    pub fn with_min_zoom(mut self, min_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self
    }

    pub fn visible_at(&self, zoom: u8) -> bool {
        self.min_zoom <= zoom
    }
}

/// The attributes of one feature, in insertion order, keys unique.
///
/// Sets order structurally: shorter sets first, then pairwise by key, value
/// and attribute min-zoom. Two sets are equal exactly when they hold the
/// same attributes in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AttributeSet {
    attributes: Vec<Attribute>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute. An existing attribute with the same key is replaced
    /// in place, keeping its position.
    pub fn insert(&mut self, attribute: Attribute) {
        match self.attributes.iter_mut().find(|a| a.key == attribute.key) {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }

    /// Builder form of [`insert`](Self::insert) for attributes visible at
    /// every zoom.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(Attribute::new(key, value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| &a.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Attributes that should be written at `zoom`.
    pub fn visible_at(&self, zoom: u8) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(move |a| a.visible_at(zoom))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl FromIterator<Attribute> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        let mut set = AttributeSet::new();
        for attribute in iter {
            set.insert(attribute);
        }
        set
    }
}

impl PartialOrd for AttributeSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AttributeSet {
    fn cmp(&self, other: &Self) -> Ordering {
        self.len().cmp(&other.len()).then_with(|| {
            self.attributes
                .iter()
                .zip(&other.attributes)
                .map(|(a, b)| {
                    a.key
                        .cmp(&b.key)
                        .then_with(|| a.value.cmp(&b.value))
                        .then_with(|| a.min_zoom.cmp(&b.min_zoom))
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        })
    }
}

/// Read access to attribute sets by reference.
pub trait AttributeStore {
    /// Resolve a reference.
    ///
    /// # Panics
    ///
    /// Implementations panic on a reference they did not hand out.
    fn attribute_set(&self, reference: AttributeSetRef) -> &AttributeSet;
}

/// In-memory attribute store that interns sets: structurally equal sets
/// share one reference.
#[derive(Debug, Default)]
pub struct MemoryAttributeStore {
    sets: Vec<AttributeSet>,
    index: HashMap<AttributeSet, AttributeSetRef>,
}

impl MemoryAttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a set, returning the existing reference if an equal set is
    /// already present.
    pub fn insert(&mut self, set: AttributeSet) -> AttributeSetRef {
        if let Some(&reference) = self.index.get(&set) {
            return reference;
        }
        let reference = AttributeSetRef(self.sets.len() as u32);
        self.sets.push(set.clone());
        self.index.insert(set, reference);
        reference
    }

    pub fn get(&self, reference: AttributeSetRef) -> Option<&AttributeSet> {
        self.sets.get(reference.0 as usize)
    }

    /// Number of distinct sets.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl AttributeStore for MemoryAttributeStore {
    fn attribute_set(&self, reference: AttributeSetRef) -> &AttributeSet {
        match self.get(reference) {
            Some(set) => set,
            None => panic!(
                "attribute set {} not in store of {} sets",
                reference.0,
                self.sets.len()
            ),
        }
    }
}
