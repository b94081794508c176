//! Source-entity identifiers.
//!
//! Output objects remember where they came from: a shapefile record, or an
//! OSM node, way, or relation. In memory that is the [`EntityId`] sum type.
//! Where a single integer is needed (hashing, sorting, storage) it is packed
//! into a [`PackedId`]: the origin kind lives in bits 39-40 and the raw id
//! in the low 39 bits, so packed ids sort by origin first, then by raw id.

use std::fmt;

use thiserror::Error;

/// Number of bits available for the raw entity id.
pub const OSM_ID_BITS: u32 = 39;

/// Mask selecting the raw id bits of a packed id.
pub const OSM_ID_MASK: u64 = (1 << OSM_ID_BITS) - 1;

/// Largest raw id that can be packed.
pub const MAX_RAW_ID: u64 = OSM_ID_MASK;

const KIND_BITS: u32 = 2;

/// Where an output object's geometry comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum OriginKind {
    Shape = 0,
    Node = 1,
    Way = 2,
    Relation = 3,
}

impl OriginKind {
    fn from_bits(bits: u64) -> Self {
        match bits & ((1 << KIND_BITS) - 1) {
            0 => OriginKind::Shape,
            1 => OriginKind::Node,
            2 => OriginKind::Way,
            _ => OriginKind::Relation,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OriginKind::Shape => "shape",
            OriginKind::Node => "node",
            OriginKind::Way => "way",
            OriginKind::Relation => "relation",
        }
    }
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw id did not fit in [`OSM_ID_BITS`] bits.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{kind} id {id} does not fit in 39 bits")]
pub struct IdOverflow {
    pub kind: OriginKind,
    pub id: u64,
}

/// Reference to a source entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    Shape(u64),
    Node(u64),
    Way(u64),
    Relation(u64),
}

impl EntityId {
    pub fn new(kind: OriginKind, raw: u64) -> Self {
        match kind {
            OriginKind::Shape => EntityId::Shape(raw),
            OriginKind::Node => EntityId::Node(raw),
            OriginKind::Way => EntityId::Way(raw),
            OriginKind::Relation => EntityId::Relation(raw),
        }
    }

    pub fn kind(&self) -> OriginKind {
        match self {
            EntityId::Shape(_) => OriginKind::Shape,
            EntityId::Node(_) => OriginKind::Node,
            EntityId::Way(_) => OriginKind::Way,
            EntityId::Relation(_) => OriginKind::Relation,
        }
    }

    pub fn raw(&self) -> u64 {
        match *self {
            EntityId::Shape(id) | EntityId::Node(id) | EntityId::Way(id) | EntityId::Relation(id) => {
                id
            }
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.raw())
    }
}

/// An [`EntityId`] packed into 41 bits.
///
/// The derived ordering is the integer ordering, which groups by origin
/// kind and then by raw id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackedId(u64);

impl PackedId {
    /// Pack an origin kind and raw id.
    ///
    /// # Panics
    ///
    /// Panics if `raw` does not fit in 39 bits. Ids that large never occur in
    /// real extracts, so reaching this is a bug in the caller.
    pub fn encode(kind: OriginKind, raw: u64) -> Self {
        match Self::try_encode(kind, raw) {
            Ok(id) => id,
            Err(err) => panic!("{}", err),
        }
    }

    /// Pack an origin kind and raw id, rejecting ids wider than 39 bits.
    pub fn try_encode(kind: OriginKind, raw: u64) -> Result<Self, IdOverflow> {
        if raw > MAX_RAW_ID {
            return Err(IdOverflow { kind, id: raw });
        }
        Ok(PackedId(((kind as u64) << OSM_ID_BITS) | raw))
    }

    /// Split back into origin kind and raw id.
    pub fn decode(self) -> (OriginKind, u64) {
        (self.kind(), self.raw())
    }

    pub fn kind(self) -> OriginKind {
        OriginKind::from_bits(self.0 >> OSM_ID_BITS)
    }

    pub fn raw(self) -> u64 {
        self.0 & OSM_ID_MASK
    }

    pub fn entity(self) -> EntityId {
        EntityId::new(self.kind(), self.raw())
    }

    /// The packed integer.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<EntityId> for PackedId {
    /// # Panics
    ///
    /// Panics if the raw id does not fit in 39 bits.
    fn from(entity: EntityId) -> Self {
        PackedId::encode(entity.kind(), entity.raw())
    }
}

impl From<PackedId> for EntityId {
    fn from(id: PackedId) -> Self {
        id.entity()
    }
}

impl fmt::Display for PackedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.entity().fmt(f)
    }
}
