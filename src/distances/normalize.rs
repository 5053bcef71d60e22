//! Raw matrix → [`LogicalDistances`] on the owning object.
//!
//! The owner is the smallest object whose cpuset is exactly the union of
//! the members. The matrix is rescaled by its minimum and re-indexed by
//! logical rank.

use tracing::{debug, info};

use crate::model::*;
use crate::topology::{Topology, TypeDepth};
use crate::{Error, Result};

impl Topology {
    /// Build the normalized matrix for one resolved entry.
    ///
    /// Returns the owner and the matrix to attach to it. Every error is a
    /// skip except `Allocation`.
    pub(crate) fn logical_distances_for(
        &self,
        obj_type: ObjType,
        nodes: &[ObjId],
        raw: &[f32],
    ) -> Result<(ObjId, LogicalDistances)> {
        let member_depth = match self.type_depth(obj_type) {
            TypeDepth::Depth(d) => d,
            _ => return Err(Error::AmbiguousDepth { obj_type }),
        };

        let mut set = CpuSet::new();
        for &id in nodes {
            set.union_with(&self[id].cpuset);
        }
        let owner = match self.covering_object(&set) {
            Some(owner) if self[owner].cpuset == set => owner,
            _ => return Err(Error::PartialCoverage { obj_type, cpuset: set }),
        };
        let relative_depth = member_depth
            .checked_sub(self[owner].depth)
            .ok_or_else(|| Error::PartialCoverage { obj_type, cpuset: set.clone() })?;

        let (min, max) = raw
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if min.is_nan() || min <= 0.0 {
            return Err(Error::ZeroMinimum { obj_type });
        }

        let count = nodes.len();
        let min_logical = nodes
            .iter()
            .map(|&id| self[id].logical_index)
            .min()
            .unwrap_or(0);
        let ranks: Vec<usize> = nodes
            .iter()
            .map(|&id| (self[id].logical_index - min_logical) as usize)
            .collect();
        if ranks.iter().any(|&r| r >= count) {
            // another object sits between the members at that depth
            return Err(Error::PartialCoverage { obj_type, cpuset: set });
        }

        let mut latency: Vec<f32> = Vec::new();
        latency.try_reserve_exact(count * count)?;
        latency.resize(count * count, 0.0);
        for (i, &li) in ranks.iter().enumerate() {
            for (j, &lj) in ranks.iter().enumerate() {
                latency[li * count + lj] = raw[i * count + j] / min;
            }
        }

        Ok((
            owner,
            LogicalDistances {
                obj_type,
                relative_depth,
                count,
                latency_base: min,
                latency_max: max / min,
                latency,
            },
        ))
    }

    fn resolved_entries(&self) -> Vec<(ObjType, Vec<ObjId>, Vec<f32>)> {
        self.distances
            .iter()
            .filter_map(|(t, e)| e.nodes().map(|n| (t, n.to_vec(), e.matrix().to_vec())))
            .collect()
    }

    /// Attach a normalized matrix to the owner of every resolved entry.
    /// Returns how many matrices were attached.
    pub fn finalize_logical_distances(&mut self) -> Result<usize> {
        let mut attached = 0;
        for (obj_type, nodes, raw) in self.resolved_entries() {
            match self.logical_distances_for(obj_type, &nodes, &raw) {
                Ok((owner, logical)) => {
                    debug!(
                        %obj_type, owner = %self[owner], relative_depth = logical.relative_depth,
                        latency_base = logical.latency_base, latency_max = logical.latency_max,
                        "attaching logical distances"
                    );
                    self.objects[owner.0].distances.push(logical);
                    attached += 1;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => info!(%obj_type, reason = %e, "no logical distances"),
            }
        }
        Ok(attached)
    }

    /// Rebuild attached matrices after the tree gained objects.
    ///
    /// New levels shift member depths and logical indexes, so each matrix
    /// is recomputed from its raw entry and replaces the one attached to
    /// the same owner. A matrix that can no longer be computed (its type
    /// now sits at several depths) is left as it was.
    pub fn refresh_logical_distances(&mut self) -> Result<()> {
        for (obj_type, nodes, raw) in self.resolved_entries() {
            match self.logical_distances_for(obj_type, &nodes, &raw) {
                Ok((owner, logical)) => {
                    let slot = self.objects[owner.0]
                        .distances
                        .iter_mut()
                        .find(|d| d.obj_type == obj_type);
                    if let Some(slot) = slot {
                        *slot = logical;
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => info!(
                    %obj_type, reason = %e,
                    "keeping previous logical distances, relative depth may be stale"
                ),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistanceConfig;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    /// Two packages with two NUMA nodes each; NUMA OS indexes reversed.
    fn two_by_two() -> Topology {
        let mut topo = Topology::new(DistanceConfig::default()).unwrap();
        topo.insert_object(ObjType::Package, Some(0), CpuSet::from_range(0..4)).unwrap();
        topo.insert_object(ObjType::Package, Some(1), CpuSet::from_range(4..8)).unwrap();
        for n in 0..4u32 {
            topo.insert_object(ObjType::NumaNode, Some(3 - n), CpuSet::from_range(n * 2..n * 2 + 2))
                .unwrap();
        }
        topo
    }

    #[test]
    fn test_normalizes_and_reorders_by_logical_index() {
        let mut topo = two_by_two();
        topo.set_distance_matrix(
            ObjType::NumaNode,
            vec![0, 1],
            vec![10.0, 30.0, 20.0, 10.0],
        )
        .unwrap();
        topo.resolve_distance_indexes();
        assert_eq!(topo.finalize_logical_distances().unwrap(), 1);

        // os 0 and 1 are the last two NUMA nodes, both in package 1
        let owner = topo.objects_by_type(ObjType::Package)[1];
        let d = &topo[owner].distances[0];
        assert_eq!(d.relative_depth, 1);
        assert_eq!(d.latency_base, 10.0);
        assert_eq!(d.latency_max, 3.0);
        // logical 0 is os 1, logical 1 is os 0
        assert_eq!(d.latency, vec![1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_partial_coverage_is_skipped() {
        let mut topo = two_by_two();
        topo.set_distance_matrix(ObjType::NumaNode, vec![3, 1, 0], vec![1.0, 2.0, 2.0, 2.0, 1.0, 2.0, 2.0, 2.0, 1.0])
            .unwrap();
        topo.resolve_distance_indexes();
        assert_eq!(topo.finalize_logical_distances().unwrap(), 0);
        assert!(topo.walk().all(|o| o.distances.is_empty()));
    }

    #[test]
    fn test_zero_minimum_is_skipped() {
        let mut topo = two_by_two();
        topo.set_distance_matrix(ObjType::Package, vec![0, 1], vec![0.0, 1.0, 1.0, 0.0]).unwrap();
        topo.resolve_distance_indexes();
        let nodes = topo.distances().get(ObjType::Package).unwrap().nodes().unwrap().to_vec();
        let err = topo.logical_distances_for(ObjType::Package, &nodes, &[0.0, 1.0, 1.0, 0.0]).unwrap_err();
        assert!(matches!(err, Error::ZeroMinimum { .. }));
    }

    #[test]
    fn test_ambiguous_depth_is_skipped() {
        let mut topo = two_by_two();
        topo.insert_object(ObjType::Pu, Some(0), CpuSet::from_indexes([0])).unwrap();
        topo.insert_object(ObjType::Pu, Some(1), CpuSet::from_indexes([1])).unwrap();
        topo.insert_object(ObjType::Core, Some(0), CpuSet::from_indexes([0])).unwrap();
        topo.set_distance_matrix(ObjType::Pu, vec![0, 1], vec![1.0, 2.0, 2.0, 1.0]).unwrap();
        topo.resolve_distance_indexes();
        assert_eq!(topo.type_depth(ObjType::Pu), TypeDepth::Multiple);
        assert_eq!(topo.finalize_logical_distances().unwrap(), 0);
    }

    #[test]
    fn test_refresh_keeps_matrix_when_loners_split_depths() {
        let mut topo = Topology::new(DistanceConfig::default()).unwrap();
        for n in 0..5u32 {
            topo.insert_object(ObjType::NumaNode, Some(n), CpuSet::from_range(n * 2..n * 2 + 2))
                .unwrap();
        }
        let mut m = vec![40.0f32; 25];
        for i in 0..5 {
            m[i * 5 + i] = 10.0;
        }
        for (a, b) in [(0, 1), (2, 3)] {
            m[a * 5 + b] = 20.0;
            m[b * 5 + a] = 20.0;
        }
        topo.set_distance_matrix(ObjType::NumaNode, (0..5).collect(), m).unwrap();

        let report = topo.load_distances().unwrap();
        assert_eq!(report.groups_created, 2);
        // node 4 stayed under the root, the others moved down
        assert_eq!(topo.type_depth(ObjType::NumaNode), TypeDepth::Multiple);
        let d = &topo.root().distances;
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].relative_depth, 1);
        assert_eq!(d[0].count, 5);
    }

    proptest! {
        #[test]
        fn prop_normalized_minimum_is_one(values in proptest::collection::vec(0.5f32..100.0, 16)) {
            let mut topo = two_by_two();
            topo.set_distance_matrix(ObjType::NumaNode, vec![0, 1, 2, 3], values).unwrap();
            topo.resolve_distance_indexes();
            prop_assert_eq!(topo.finalize_logical_distances().unwrap(), 1);
            let d = &topo.root().distances[0];
            prop_assert_eq!(d.latency_min(), 1.0);
            prop_assert!(d.latency_max >= 1.0);
        }
    }
}
