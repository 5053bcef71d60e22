//! Insertion by cpuset coverage.
//!
//! A new object is placed below the smallest object whose cpuset strictly
//! contains its own, and adopts every sibling whose cpuset it strictly
//! contains. The root grows to cover whatever is inserted.

use tracing::{debug, trace};

use super::{Topology, ROOT};
use crate::model::*;
use crate::{Error, Result};

impl Topology {
    /// Insert an object and return its id.
    ///
    /// If an object with an equal cpuset and the same type already exists,
    /// nothing is inserted and the existing id is returned. Objects with
    /// equal cpusets but different types nest by type rank (a package
    /// above its cores, a NUMA node above its package, and so on).
    pub fn insert_object(
        &mut self,
        obj_type: ObjType,
        os_index: Option<u32>,
        cpuset: CpuSet,
    ) -> Result<ObjId> {
        self.insert_by_cpuset(obj_type, os_index, cpuset, None)
    }

    /// Insert a synthetic `Group` object created by grouping pass `group_depth`.
    ///
    /// A group whose cpuset equals an existing object carries no new
    /// information: it is dropped and the existing object is returned.
    pub fn insert_group(&mut self, cpuset: CpuSet, group_depth: u32) -> Result<ObjId> {
        self.insert_by_cpuset(ObjType::Group, None, cpuset, Some(group_depth))
    }

    fn insert_by_cpuset(
        &mut self,
        obj_type: ObjType,
        os_index: Option<u32>,
        cpuset: CpuSet,
        group_depth: Option<u32>,
    ) -> Result<ObjId> {
        let mut parent = ROOT;
        let mut adopted: Vec<ObjId> = Vec::new();

        'descend: loop {
            adopted.clear();
            for &child in &self.objects[parent.0].children {
                let existing = &self.objects[child.0];
                if existing.cpuset == cpuset {
                    if existing.obj_type == obj_type || obj_type == ObjType::Group {
                        debug!(%obj_type, %cpuset, existing = %existing, "merging into existing object");
                        return Ok(child);
                    }
                    if obj_type.nesting_rank() < existing.obj_type.nesting_rank() {
                        adopted.push(child);
                    } else {
                        parent = child;
                        continue 'descend;
                    }
                } else if cpuset.is_included_in(&existing.cpuset) {
                    parent = child;
                    continue 'descend;
                } else if existing.cpuset.is_included_in(&cpuset) {
                    adopted.push(child);
                } else if existing.cpuset.intersects(&cpuset) {
                    return Err(Error::InsertConflict { cpuset, existing: child });
                }
            }
            break;
        }

        let id = ObjId(self.objects.len());
        self.objects.try_reserve(1)?;

        let mut obj = TopoObject::new(id, obj_type, os_index, cpuset);
        if let Some(depth) = group_depth {
            obj = obj.with_group_depth(depth);
        }
        obj.parent = Some(parent);
        obj.children = adopted;
        for &child in &obj.children {
            self.objects[child.0].parent = Some(id);
        }

        let first = obj.cpuset.first();
        self.objects[parent.0].children.retain(|c| !obj.children.contains(c));
        let objects = &self.objects;
        let siblings = &objects[parent.0].children;
        let pos = siblings
            .iter()
            .position(|c| objects[c.0].cpuset.first() > first)
            .unwrap_or(siblings.len());
        trace!(%obj_type, cpuset = %obj.cpuset, %parent, adopted = obj.children.len(), "inserting object");

        self.objects[ROOT.0].cpuset.union_with(&obj.cpuset);
        self.objects[parent.0].children.insert(pos, id);
        self.objects.push(obj);
        self.reconnect();
        Ok(id)
    }
}
