//! # Distance Pipeline
//!
//! Raw distances flow strictly downward:
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Ingestion | `ingest` | validated `(indexes, matrix)` |
//! | Store | `store` | one [`DistanceEntry`] per type |
//! | Resolution | `resolve` | entry objects for the current tree |
//! | Normalization | `normalize` | [`LogicalDistances`](crate::LogicalDistances) on the owner |
//! | Grouping | `grouping` | new `Group` objects |
//!
//! Every recoverable failure is local to one type: it is logged and the
//! other types carry on. Only allocation failures stop the pipeline.

pub mod store;
pub mod ingest;
pub mod resolve;
pub mod normalize;
pub mod grouping;

use tracing::debug;

use crate::topology::Topology;
use crate::Result;

pub use store::{DistanceEntry, DistanceStore};
pub use grouping::{GroupPartition, check_matrix, factorize, find_groups};
pub use ingest::parse_distances;

/// What one pipeline run produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistanceReport {
    /// Types whose indexes all resolved to objects.
    pub resolved: usize,
    /// Logical matrices attached to owners.
    pub normalized: usize,
    /// `Group` objects inserted in the tree.
    pub groups_created: usize,
}

impl Topology {
    /// Run resolution, normalization and grouping on the current tree.
    ///
    /// Call once the tree is fully built. Runs at most once per tree
    /// generation; later calls return an empty report until
    /// [`reset`](Topology::reset).
    pub fn load_distances(&mut self) -> Result<DistanceReport> {
        if self.distances_loaded {
            debug!("distances already loaded for this tree");
            return Ok(DistanceReport::default());
        }

        self.reconnect();
        let resolved = self.resolve_distance_indexes();
        let normalized = self.finalize_logical_distances()?;
        let groups_created = self.group_by_distances()?;
        if groups_created > 0 {
            self.refresh_logical_distances()?;
        }
        self.distances_loaded = true;

        let report = DistanceReport { resolved, normalized, groups_created };
        debug!(?report, "distances loaded");
        Ok(report)
    }
}
