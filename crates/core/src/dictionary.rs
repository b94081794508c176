//! Per-layer key/value dictionaries.
//!
//! A vector tile layer stores every attribute key and value once. Features
//! reference them through `tags`: a flat list of `[key_index, value_index]`
//! pairs. Each layer under construction owns one [`AttributeDictionary`];
//! nothing is shared between tiles, so parallel tile workers need no locks.

use std::collections::HashMap;

use crate::attribute_store::AttributeSet;
use crate::value::AttributeValue;
use crate::vector_tile::tile::Value;

/// Append-only key and value lists with lookup indexes.
///
/// Entries keep the order of first insertion, so the same features written
/// in the same order always produce the same dictionary.
#[derive(Debug, Clone, Default)]
pub struct AttributeDictionary {
    keys: Vec<String>,
    key_index: HashMap<String, u32>,
    values: Vec<AttributeValue>,
    value_index: HashMap<AttributeValue, u32>,
}

impl AttributeDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `key`, appending it if unseen.
    pub fn find_or_insert_key(&mut self, key: &str) -> u32 {
        if let Some(&idx) = self.key_index.get(key) {
            return idx;
        }
        let idx = self.keys.len() as u32;
        self.keys.push(key.to_string());
        self.key_index.insert(key.to_string(), idx);
        idx
    }

    /// Index of a structurally equal value, if present.
    pub fn find_value(&self, value: &AttributeValue) -> Option<u32> {
        self.value_index.get(value).copied()
    }

    /// Index of `value`, appending it if unseen.
    pub fn find_or_insert_value(&mut self, value: &AttributeValue) -> u32 {
        if let Some(idx) = self.find_value(value) {
            return idx;
        }
        let idx = self.values.len() as u32;
        self.values.push(value.clone());
        self.value_index.insert(value.clone(), idx);
        idx
    }

    /// Write the attributes of `set` visible at `zoom` as tag pairs.
    ///
    /// Pairs are appended to `tags` in the set's order. A key that already
    /// has a pair in `tags` is skipped, so no attribute is written twice for
    /// one feature. Returns the number of pairs appended.
    pub fn write_attributes(&mut self, set: &AttributeSet, zoom: u8, tags: &mut Vec<u32>) -> usize {
        let mut written = 0;
        for attribute in set.visible_at(zoom) {
            let key_idx = self.find_or_insert_key(&attribute.key);
            if tags.chunks_exact(2).any(|pair| pair[0] == key_idx) {
                continue;
            }
            let value_idx = self.find_or_insert_value(&attribute.value);
            tags.push(key_idx);
            tags.push(value_idx);
            written += 1;
        }
        written
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.values.is_empty()
    }

    /// Consume into the layer's `keys` and `values` fields.
    pub fn into_mvt(self) -> (Vec<String>, Vec<Value>) {
        let values = self.values.iter().map(AttributeValue::to_mvt_value).collect();
        (self.keys, values)
    }
}
