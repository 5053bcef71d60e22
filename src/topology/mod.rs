//! # Topology Tree
//!
//! Arena-backed object tree. Objects are addressed by [`ObjId`] and never
//! removed individually; [`Topology::reset`] drops a whole generation at
//! once, keeping only the root.
//!
//! The tree is kept "connected" after every mutation: depths, logical
//! indexes and per-depth levels are recomputed by [`Topology::reconnect`]
//! whenever an object is inserted.

pub mod insert;

use std::ops::Index;

use crate::config::DistanceConfig;
use crate::distances::{DistanceStore, ingest};
use crate::model::*;
use crate::Result;

// ============================================================================
// Type depth
// ============================================================================

/// Where objects of a given type live in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDepth {
    /// No object of this type.
    Unknown,
    /// Objects of this type exist at more than one depth.
    Multiple,
    /// Every object of this type is at this depth.
    Depth(u32),
}

// ============================================================================
// Topology
// ============================================================================

/// One machine's object tree, plus the distance data attached to it.
#[derive(Debug)]
pub struct Topology {
    pub(crate) objects: Vec<TopoObject>,
    /// Object ids per depth, in logical order.
    pub(crate) levels: Vec<Vec<ObjId>>,
    pub(crate) distances: DistanceStore,
    pub(crate) config: DistanceConfig,
    /// Set once the pipeline ran for the current tree generation.
    pub(crate) distances_loaded: bool,
}

const ROOT: ObjId = ObjId(0);

impl Topology {
    /// Create a topology holding only a `System` root.
    ///
    /// Every textual distance spec in `config` is ingested right away, in
    /// type order. Malformed specs are logged and dropped; only an
    /// allocation failure is returned.
    pub fn new(config: DistanceConfig) -> Result<Self> {
        let mut topo = Self {
            objects: vec![Self::fresh_root()],
            levels: vec![vec![ROOT]],
            distances: DistanceStore::new(),
            config,
            distances_loaded: false,
        };
        let specs: Vec<(ObjType, String)> = topo
            .config
            .specs
            .iter()
            .map(|(t, s)| (*t, s.clone()))
            .collect();
        for (obj_type, spec) in specs {
            match ingest::ingest_distances(&mut topo.distances, obj_type, &spec) {
                Err(e) if e.is_fatal() => return Err(e),
                _ => {}
            }
        }
        Ok(topo)
    }

    /// Topology configured from `HWTOPO_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(DistanceConfig::from_env())
    }

    fn fresh_root() -> TopoObject {
        TopoObject::new(ROOT, ObjType::System, Some(0), CpuSet::new())
    }

    pub fn root(&self) -> &TopoObject {
        &self.objects[ROOT.0]
    }

    pub fn root_id(&self) -> ObjId {
        ROOT
    }

    pub fn get(&self, id: ObjId) -> Option<&TopoObject> {
        self.objects.get(id.0)
    }

    pub fn config(&self) -> &DistanceConfig {
        &self.config
    }

    /// Number of objects, root included.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.len() == 1
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Objects at `depth`, in logical order.
    pub fn objects_at_depth(&self, depth: u32) -> &[ObjId] {
        self.levels.get(depth as usize).map_or(&[], |l| l.as_slice())
    }

    /// Objects of `obj_type`, in pre-order.
    pub fn objects_by_type(&self, obj_type: ObjType) -> Vec<ObjId> {
        self.walk().filter(|o| o.obj_type == obj_type).map(|o| o.id).collect()
    }

    /// Objects of `obj_type` strictly below `ancestor`, in pre-order.
    pub fn descendants_of_type(&self, ancestor: ObjId, obj_type: ObjType) -> Vec<ObjId> {
        self.walk_from(ancestor)
            .skip(1)
            .filter(|o| o.obj_type == obj_type)
            .map(|o| o.id)
            .collect()
    }

    pub fn type_depth(&self, obj_type: ObjType) -> TypeDepth {
        let mut found = TypeDepth::Unknown;
        for obj in self.walk().filter(|o| o.obj_type == obj_type) {
            match found {
                TypeDepth::Unknown => found = TypeDepth::Depth(obj.depth),
                TypeDepth::Depth(d) if d != obj.depth => return TypeDepth::Multiple,
                _ => {}
            }
        }
        found
    }

    /// Smallest object whose cpuset includes `set`.
    ///
    /// `None` if even the root does not cover it.
    pub fn covering_object(&self, set: &CpuSet) -> Option<ObjId> {
        let mut current = ROOT;
        if !set.is_included_in(&self.objects[current.0].cpuset) {
            return None;
        }
        'descend: loop {
            for &child in &self.objects[current.0].children {
                if set.is_included_in(&self.objects[child.0].cpuset) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// Pre-order walk over the whole tree.
    pub fn walk(&self) -> Walk<'_> {
        self.walk_from(ROOT)
    }

    /// Pre-order walk over the subtree rooted at `start`.
    pub fn walk_from(&self, start: ObjId) -> Walk<'_> {
        let stack = if start.0 < self.objects.len() { vec![start] } else { Vec::new() };
        Walk { topo: self, stack }
    }

    /// Recompute depth, logical index and per-depth levels.
    pub fn reconnect(&mut self) {
        let mut levels: Vec<Vec<ObjId>> = Vec::new();
        let mut stack = vec![(ROOT, 0u32)];
        while let Some((id, depth)) = stack.pop() {
            let d = depth as usize;
            if levels.len() <= d {
                levels.resize_with(d + 1, Vec::new);
            }
            let obj = &mut self.objects[id.0];
            obj.depth = depth;
            obj.logical_index = levels[d].len() as u32;
            levels[d].push(id);
            for &child in obj.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        self.levels = levels;
    }

    /// Drop the current tree generation, keeping a bare root.
    ///
    /// Resolved objects in the distance store belong to the dropped
    /// generation and are released; raw indexes and matrices survive so
    /// the next [`load_distances`](Self::load_distances) resolves them
    /// against the rebuilt tree.
    pub fn reset(&mut self) {
        self.objects.clear();
        self.objects.push(Self::fresh_root());
        self.levels = vec![vec![ROOT]];
        self.distances.clear_generation();
        self.distances_loaded = false;
    }

    // ========================================================================
    // Distance input
    // ========================================================================

    pub fn distances(&self) -> &DistanceStore {
        &self.distances
    }

    /// Store a raw distance matrix for `obj_type`, taking ownership of both
    /// vectors. `matrix` is row-major, `indexes.len()²` values.
    pub fn set_distance_matrix(
        &mut self,
        obj_type: ObjType,
        indexes: Vec<u32>,
        matrix: Vec<f32>,
    ) -> Result<()> {
        self.distances.set(obj_type, indexes, matrix)
    }

    /// Parse and store a textual distance spec (`"0,1:1,2,2,1"` or `"0,1,2,3:2*2"`).
    pub fn set_distances_from_str(&mut self, obj_type: ObjType, spec: &str) -> Result<()> {
        ingest::ingest_distances(&mut self.distances, obj_type, spec)
    }

    /// Forget every distance input, raw and resolved.
    pub fn clear_distances(&mut self) {
        self.distances.clear_all();
    }
}

impl Index<ObjId> for Topology {
    type Output = TopoObject;

    fn index(&self, id: ObjId) -> &TopoObject {
        &self.objects[id.0]
    }
}

// ============================================================================
// Walk
// ============================================================================

/// Read-only pre-order iterator over a subtree.
pub struct Walk<'a> {
    topo: &'a Topology,
    stack: Vec<ObjId>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a TopoObject;

    fn next(&mut self) -> Option<&'a TopoObject> {
        let id = self.stack.pop()?;
        let obj = &self.topo.objects[id.0];
        self.stack.extend(obj.children.iter().rev().copied());
        Some(obj)
    }
}

// ============================================================================
// Tests
// ============================================================================
