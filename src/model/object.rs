//! Object in the topology tree.

use serde::{Deserialize, Serialize};
use super::{CpuSet, LogicalDistances, ObjType};

/// Opaque object identifier (arena slot inside one [`Topology`](crate::Topology)).
///
/// Ids are only meaningful for the tree generation that issued them; a
/// topology reset invalidates every id except the root's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjId(pub usize);

impl std::fmt::Display for ObjId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of the topology tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TopoObject {
    pub id: ObjId,
    pub obj_type: ObjType,
    /// OS-assigned index. `None` for synthetic objects such as groups.
    pub os_index: Option<u32>,
    pub cpuset: CpuSet,
    /// Distance from the root. Valid after `Topology::reconnect()`.
    pub depth: u32,
    /// Rank among all objects at the same depth. Valid after `Topology::reconnect()`.
    pub logical_index: u32,
    pub parent: Option<ObjId>,
    /// Ordered by first set bit of each child's cpuset.
    pub children: Vec<ObjId>,
    /// Grouping pass that created this object. Only set on `Group` objects.
    pub group_depth: Option<u32>,
    /// Normalized distance matrices owned by this object.
    pub distances: Vec<LogicalDistances>,
}

impl TopoObject {
    pub fn new(id: ObjId, obj_type: ObjType, os_index: Option<u32>, cpuset: CpuSet) -> Self {
        Self {
            id,
            obj_type,
            os_index,
            cpuset,
            depth: 0,
            logical_index: 0,
            parent: None,
            children: Vec::new(),
            group_depth: None,
            distances: Vec::new(),
        }
    }

    pub fn with_group_depth(mut self, depth: u32) -> Self {
        self.group_depth = Some(depth);
        self
    }

    pub fn arity(&self) -> usize {
        self.children.len()
    }
}

impl std::fmt::Display for TopoObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.os_index {
            Some(os) => write!(f, "{} P#{} L#{} ({})", self.obj_type, os, self.logical_index, self.cpuset),
            None => write!(f, "{} L#{} ({})", self.obj_type, self.logical_index, self.cpuset),
        }
    }
}
