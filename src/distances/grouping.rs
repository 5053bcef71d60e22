//! # Distance-based grouping
//!
//! Objects connected, directly or through other members, by the smallest
//! off-diagonal distance of a matrix form a cluster. Every cluster of two
//! or more objects becomes a `Group` object in the tree. The matrix is
//! then factorized into a cluster × cluster matrix (block averages) and
//! the process repeats one level up, until a pass no longer splits the
//! objects into at least two clusters.
//!
//! ```text
//!  pass 0:  N0 N1 N2 N3 N4 N5 N6 N7      min distance → {0,1} {2,3} {4,5} {6,7}
//!  pass 1:  G0    G1    G2    G3         min distance → {G0,G1} {G2,G3}
//!  pass 2:  G'0         G'1              single cluster → stop
//! ```

use std::fmt::Write as _;

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::model::*;
use crate::topology::Topology;
use crate::{Error, Result};

// ============================================================================
// Pure matrix helpers
// ============================================================================

/// Result of one clustering pass.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupPartition {
    /// 1-based cluster id per object; `0` for objects left alone.
    pub group_ids: Vec<u32>,
    /// Number of clusters with at least two members.
    pub group_count: u32,
    /// Distance that connects members of a cluster.
    pub min_distance: f32,
}

impl GroupPartition {
    /// Object positions of cluster `id` (1-based).
    pub fn members(&self, id: u32) -> SmallVec<[usize; 8]> {
        self.group_ids
            .iter()
            .enumerate()
            .filter(|(_, g)| **g == id)
            .map(|(i, _)| i)
            .collect()
    }

    /// Clusters as member lists, in id order.
    pub fn clusters(&self) -> Vec<SmallVec<[usize; 8]>> {
        (1..=self.group_count).map(|id| self.members(id)).collect()
    }
}

/// A matrix can be clustered only if it is symmetric and every object is
/// strictly closer to itself than to anything else.
pub fn check_matrix(n: usize, matrix: &[f32]) -> Result<()> {
    for i in 0..n {
        for j in i + 1..n {
            let ij = matrix[i * n + j];
            let ji = matrix[j * n + i];
            if ij != ji {
                return Err(Error::Asymmetric { i, j, ij, ji });
            }
            for k in [i, j] {
                let kk = matrix[k * n + k];
                if ij <= kk {
                    return Err(Error::DiagonalNotMinimal { i, j, k, ij, kk });
                }
            }
        }
    }
    Ok(())
}

/// Cluster objects by transitive closure over the minimal off-diagonal
/// distance. `None` if there is no off-diagonal entry.
pub fn find_groups(n: usize, matrix: &[f32]) -> Option<GroupPartition> {
    let min_distance = (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .map(|(i, j)| matrix[i * n + j])
        .fold(None, |acc: Option<f32>, v| Some(acc.map_or(v, |a| a.min(v))))?;
    debug!(min_distance, "found minimal distance between objects");

    let mut group_ids = vec![0u32; n];
    let mut next_id = 1u32;
    let mut frontier: Vec<usize> = Vec::new();

    for start in 0..n {
        if group_ids[start] != 0 {
            continue;
        }
        group_ids[start] = next_id;
        let mut size = 1;
        frontier.clear();
        frontier.push(start);

        while let Some(j) = frontier.pop() {
            for k in 0..n {
                if group_ids[k] == 0 && matrix[j * n + k] == min_distance {
                    group_ids[k] = next_id;
                    size += 1;
                    frontier.push(k);
                    trace!(object = k, through = j, root = start, "minimally connected");
                }
            }
        }

        if size == 1 {
            group_ids[start] = 0;
            continue;
        }
        debug!(size, min_distance, "found transitive graph");
        next_id += 1;
    }

    Some(GroupPartition { group_ids, group_count: next_id - 1, min_distance })
}

/// Average the `n × n` matrix over cluster blocks into a
/// `group_count × group_count` matrix. Objects outside any cluster are
/// left out.
pub fn factorize(n: usize, matrix: &[f32], partition: &GroupPartition) -> Result<Vec<f32>> {
    let g = partition.group_count as usize;
    let mut sums: Vec<f32> = Vec::new();
    sums.try_reserve_exact(g * g)?;
    sums.resize(g * g, 0.0);
    let mut sizes = vec![0usize; g];

    for (i, &gi) in partition.group_ids.iter().enumerate() {
        if gi == 0 {
            continue;
        }
        sizes[gi as usize - 1] += 1;
        for (j, &gj) in partition.group_ids.iter().enumerate() {
            if gj == 0 {
                continue;
            }
            sums[(gi as usize - 1) * g + (gj as usize - 1)] += matrix[i * n + j];
        }
    }
    for a in 0..g {
        for b in 0..g {
            sums[a * g + b] /= (sizes[a] * sizes[b]) as f32;
        }
    }
    Ok(sums)
}

/// Matrix dump for debug logs, one row per line with an index header.
pub fn format_matrix(labels: &[String], matrix: &[f32]) -> String {
    let n = labels.len();
    let mut out = String::from("  index");
    for label in labels {
        let _ = write!(out, " {label:>5}");
    }
    for (i, label) in labels.iter().enumerate() {
        let _ = write!(out, "\n  {label:>5}");
        for j in 0..n {
            let _ = write!(out, " {:2.3}", matrix[i * n + j]);
        }
    }
    out
}

// ============================================================================
// Tree side
// ============================================================================

impl Topology {
    /// Run grouping on every attached logical matrix, in type order.
    /// Returns how many `Group` objects were created.
    ///
    /// Does nothing when grouping is disabled in the configuration.
    pub fn group_by_distances(&mut self) -> Result<usize> {
        if !self.config.grouping {
            debug!("grouping by distances disabled");
            return Ok(0);
        }

        // Members are taken before any group is inserted: pre-order is then
        // the logical order the matrices were built in. Groups created for
        // one type reorder the objects of the next.
        let mut jobs: Vec<(ObjId, Vec<ObjId>, LogicalDistances)> = Vec::new();
        for obj_type in ObjType::ALL {
            for obj in self.walk() {
                for d in obj.distances.iter().filter(|d| d.obj_type == obj_type) {
                    let members = self.descendants_of_type(obj.id, obj_type);
                    if members.len() != d.count {
                        warn!(
                            %obj_type, owner = %obj, found = members.len(), expected = d.count,
                            "member count does not match distance matrix, not grouping"
                        );
                        continue;
                    }
                    jobs.push((obj.id, members, d.clone()));
                }
            }
        }

        let mut created = 0;
        for (owner, members, logical) in jobs {
            let obj_type = logical.obj_type;
            trace!(%obj_type, owner = %self[owner], count = members.len(), "grouping job");
            match self.setup_groups_from_distances(obj_type, members, logical.latency) {
                Ok(n) => created += n,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(%obj_type, error = %e, "not grouping {obj_type} objects"),
            }
        }
        Ok(created)
    }

    /// Group `objs` (all of `obj_type`, in matrix order) and keep grouping
    /// the resulting groups until a pass yields fewer than two clusters.
    pub fn setup_groups_from_distances(
        &mut self,
        obj_type: ObjType,
        objs: Vec<ObjId>,
        matrix: Vec<f32>,
    ) -> Result<usize> {
        let n = objs.len();
        if matrix.len() != n * n {
            return Err(Error::MatrixSize { obj_type, expected: n * n, got: matrix.len() });
        }
        debug!(
            %obj_type,
            "trying to group objects using distance matrix:\n{}",
            format_matrix(&self.matrix_labels(&objs), &matrix)
        );
        check_matrix(n, &matrix)?;

        let mut objs = objs;
        let mut matrix = matrix;
        let mut depth = 0u32;
        let mut created = 0;

        loop {
            let n = objs.len();
            let Some(partition) = find_groups(n, &matrix) else {
                break;
            };
            match partition.group_count {
                0 => break,
                1 => {
                    debug!(depth, "ignoring Group object with all objects");
                    break;
                }
                _ => {}
            }

            let mut groups: Vec<ObjId> = Vec::with_capacity(partition.group_count as usize);
            for members in partition.clusters() {
                let mut cpuset = CpuSet::new();
                for &m in &members {
                    cpuset.union_with(&self[objs[m]].cpuset);
                }
                let before = self.len();
                let id = match self.insert_group(cpuset, depth) {
                    Ok(id) => id,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(%obj_type, depth, error = %e, "cannot insert Group, stopping");
                        return Ok(created);
                    }
                };
                if self.len() > before {
                    created += 1;
                }
                debug!(depth, size = members.len(), group = %self[id], "adding Group object");
                groups.push(id);
            }

            matrix = factorize(n, &matrix, &partition)?;
            objs = groups;
            debug!(
                depth,
                "generated new distance matrix between groups:\n{}",
                format_matrix(&(0..objs.len()).map(|i| i.to_string()).collect::<Vec<_>>(), &matrix)
            );
            depth += 1;
        }
        Ok(created)
    }

    fn matrix_labels(&self, objs: &[ObjId]) -> Vec<String> {
        objs.iter()
            .map(|&id| match self[id].os_index {
                Some(os) => os.to_string(),
                None => format!("L{}", self[id].logical_index),
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
