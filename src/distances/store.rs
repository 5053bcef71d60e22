//! Raw distance holding area, one entry per object type.
//!
//! Entries are created before any tree exists and outlive tree
//! generations: a reset only drops the resolved objects.

use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{ObjId, ObjType};
use crate::{Error, Result};

/// Raw distances for one object type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DistanceEntry {
    /// OS indexes, pairwise distinct.
    indexes: Vec<u32>,
    /// Row-major `count × count` raw values, in `indexes` order.
    matrix: Vec<f32>,
    /// Objects matching `indexes`, for the current tree generation.
    /// `None` until resolution succeeds.
    nodes: Option<Vec<ObjId>>,
}

impl DistanceEntry {
    pub fn count(&self) -> usize {
        self.indexes.len()
    }

    pub fn indexes(&self) -> &[u32] {
        &self.indexes
    }

    pub fn matrix(&self) -> &[f32] {
        &self.matrix
    }

    pub fn nodes(&self) -> Option<&[ObjId]> {
        self.nodes.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.nodes.is_some()
    }

    /// Raw distance between the `i`-th and `j`-th indexes.
    pub fn value(&self, i: usize, j: usize) -> Option<f32> {
        let n = self.count();
        if i >= n || j >= n {
            return None;
        }
        self.matrix.get(i * n + j).copied()
    }

    /// Only the resolver hands out objects, and always a full set.
    pub(crate) fn set_nodes(&mut self, nodes: Option<Vec<ObjId>>) {
        debug_assert!(nodes.as_ref().is_none_or(|n| n.len() == self.count()));
        self.nodes = nodes;
    }
}

/// Per-type raw distance storage.
///
/// Iteration always follows [`ObjType`] order.
#[derive(Debug, Clone, Default)]
pub struct DistanceStore {
    entries: BTreeMap<ObjType, DistanceEntry>,
}

impl DistanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry for `obj_type`, taking ownership of both vectors.
    ///
    /// Fails with `DuplicateIndex` if an index appears twice, or
    /// `MatrixSize` if `matrix` is not `indexes.len()²` long. On failure
    /// both inputs are dropped and the previous entry is left as it was.
    /// An empty index list removes the entry.
    pub fn set(&mut self, obj_type: ObjType, indexes: Vec<u32>, matrix: Vec<f32>) -> Result<()> {
        for (i, idx) in indexes.iter().enumerate() {
            if indexes[i + 1..].contains(idx) {
                return Err(Error::DuplicateIndex { obj_type, index: *idx });
            }
        }
        let expected = indexes.len() * indexes.len();
        if matrix.len() != expected {
            return Err(Error::MatrixSize { obj_type, expected, got: matrix.len() });
        }

        if indexes.is_empty() {
            self.entries.remove(&obj_type);
            return Ok(());
        }
        debug!(%obj_type, count = indexes.len(), "storing distance matrix");
        self.entries.insert(obj_type, DistanceEntry { indexes, matrix, nodes: None });
        Ok(())
    }

    pub fn get(&self, obj_type: ObjType) -> Option<&DistanceEntry> {
        self.entries.get(&obj_type)
    }

    pub(crate) fn get_mut(&mut self, obj_type: ObjType) -> Option<&mut DistanceEntry> {
        self.entries.get_mut(&obj_type)
    }

    pub fn remove(&mut self, obj_type: ObjType) -> Option<DistanceEntry> {
        self.entries.remove(&obj_type)
    }

    /// Entries in type order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjType, &DistanceEntry)> {
        self.entries.iter().map(|(t, e)| (*t, e))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (ObjType, &mut DistanceEntry)> {
        self.entries.iter_mut().map(|(t, e)| (*t, e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop resolved objects, keep raw indexes and matrices.
    pub fn clear_generation(&mut self) {
        for entry in self.entries.values_mut() {
            entry.nodes = None;
        }
    }

    /// Drop everything.
    pub fn clear_all(&mut self) {
        self.entries.clear();
    }
}
