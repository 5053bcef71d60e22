//! OS index → object resolution.
//!
//! Runs once per tree generation. An entry is resolved completely or not
//! at all: a single unknown index leaves the entry without objects.

use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::model::{ObjId, ObjType};
use crate::topology::Topology;
use crate::{Error, Result};

impl Topology {
    /// Map `(type, os_index)` to the first matching object in pre-order.
    fn os_index_map(&self) -> HashMap<(ObjType, u32), ObjId> {
        let mut map = HashMap::with_capacity(self.len());
        for obj in self.walk() {
            if let Some(os) = obj.os_index {
                map.entry((obj.obj_type, os)).or_insert(obj.id);
            }
        }
        map
    }

    /// Resolve the stored OS indexes of every type into objects of the
    /// current tree. Returns how many entries were resolved.
    pub fn resolve_distance_indexes(&mut self) -> usize {
        let map = self.os_index_map();
        let mut resolved = 0;

        for (obj_type, entry) in self.distances.iter_mut() {
            let nodes = entry
                .indexes()
                .iter()
                .map(|&os_index| {
                    map.get(&(obj_type, os_index))
                        .copied()
                        .ok_or(Error::UnknownOsIndex { obj_type, os_index })
                })
                .collect::<Result<Vec<ObjId>>>();

            match nodes {
                Ok(nodes) => {
                    debug!(%obj_type, count = nodes.len(), "resolved distance indexes");
                    entry.set_nodes(Some(nodes));
                    resolved += 1;
                }
                Err(e) => {
                    warn!(%obj_type, error = %e, "ignoring {obj_type} distances");
                    entry.set_nodes(None);
                }
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use crate::config::DistanceConfig;
    use crate::model::*;
    use crate::topology::Topology;

    fn four_numa() -> Topology {
        let mut topo = Topology::new(DistanceConfig::default()).unwrap();
        for n in 0..4u32 {
            topo.insert_object(ObjType::NumaNode, Some(n * 2), CpuSet::from_range(n * 2..n * 2 + 2))
                .unwrap();
        }
        topo
    }

    #[test]
    fn test_resolves_in_index_order() {
        let mut topo = four_numa();
        topo.set_distance_matrix(ObjType::NumaNode, vec![6, 0], vec![1.0, 2.0, 2.0, 1.0]).unwrap();
        assert_eq!(topo.resolve_distance_indexes(), 1);

        let nodes = topo.distances().get(ObjType::NumaNode).unwrap().nodes().unwrap().to_vec();
        assert_eq!(topo[nodes[0]].os_index, Some(6));
        assert_eq!(topo[nodes[1]].os_index, Some(0));
    }

    #[test]
    fn test_one_unknown_index_resolves_nothing() {
        let mut topo = four_numa();
        topo.set_distance_matrix(ObjType::NumaNode, vec![0, 2, 5], vec![1.0; 9]).unwrap();
        assert_eq!(topo.resolve_distance_indexes(), 0);
        assert!(topo.distances().get(ObjType::NumaNode).unwrap().nodes().is_none());
    }

    #[test]
    fn test_type_must_match() {
        let mut topo = four_numa();
        topo.set_distance_matrix(ObjType::Package, vec![0, 2], vec![1.0, 2.0, 2.0, 1.0]).unwrap();
        assert_eq!(topo.resolve_distance_indexes(), 0);
    }
}
