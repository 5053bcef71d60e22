//! # hwtopo — Hardware Topology Distances
//!
//! An object tree describing the physical layout of a machine (packages,
//! NUMA nodes, caches, cores, processing units), enriched with
//! inter-object distance matrices.
//!
//! ## Distance pipeline
//!
//! ```text
//! textual spec / set_distance_matrix()
//!   → DistanceStore          (raw OS indexes + raw matrix, per type)
//!   → resolve                (OS indexes → tree objects, all-or-nothing)
//!   → normalize              (LogicalDistances on the owner, min = 1.0)
//!   → grouping               (synthesize Group objects, recurse)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use hwtopo::{CpuSet, DistanceConfig, ObjType, Topology};
//!
//! # fn example() -> hwtopo::Result<()> {
//! let mut topo = Topology::new(DistanceConfig::default())?;
//! for node in 0..4u32 {
//!     topo.insert_object(ObjType::NumaNode, Some(node), CpuSet::from_range(node * 4..node * 4 + 4))?;
//! }
//! topo.set_distance_matrix(ObjType::NumaNode, vec![0, 1, 2, 3], vec![
//!     10.0, 20.0, 40.0, 40.0,
//!     20.0, 10.0, 40.0, 40.0,
//!     40.0, 40.0, 10.0, 20.0,
//!     40.0, 40.0, 20.0, 10.0,
//! ])?;
//! let report = topo.load_distances()?;
//! assert_eq!(report.groups_created, 2);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod topology;
pub mod distances;
pub mod config;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    CpuSet, LogicalDistances, ObjId, ObjType, TopoObject,
};

// ============================================================================
// Re-exports: Tree
// ============================================================================

pub use topology::{Topology, TypeDepth, Walk};

// ============================================================================
// Re-exports: Distances
// ============================================================================

pub use distances::{DistanceEntry, DistanceReport, DistanceStore};
pub use config::DistanceConfig;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Input errors: the entry for this type is abandoned.
    #[error("{obj_type} distances: index {index} appears more than once")]
    DuplicateIndex { obj_type: ObjType, index: u32 },

    #[error("{obj_type} distances: matrix has {got} values, expected {expected}")]
    MatrixSize { obj_type: ObjType, expected: usize, got: usize },

    #[error("{obj_type} distances: {message}")]
    Parse { obj_type: ObjType, message: String },

    #[error("{obj_type} distances: got {got} values, expected {expected}")]
    ValueCount { obj_type: ObjType, expected: usize, got: usize },

    #[error("{obj_type} distances: invalid grouping {x}*{y}*{z} for {expected} objects")]
    InvalidGrouping { obj_type: ObjType, x: u32, y: u32, z: u32, expected: usize },

    // Resolution failure: the entry keeps no objects.
    #[error("{obj_type} distances: unknown OS index {os_index}")]
    UnknownOsIndex { obj_type: ObjType, os_index: u32 },

    // Normalization skips.
    #[error("{obj_type} distances: type is not at a single depth")]
    AmbiguousDepth { obj_type: ObjType },

    #[error("{obj_type} distances: objects cover {cpuset} which is not exactly one object")]
    PartialCoverage { obj_type: ObjType, cpuset: CpuSet },

    #[error("{obj_type} distances: minimal distance is not positive, matrix does not contain latencies")]
    ZeroMinimum { obj_type: ObjType },

    // Matrix invalid at grouping time.
    #[error("distance matrix asymmetric: [{i},{j}]={ij} != [{j},{i}]={ji}")]
    Asymmetric { i: usize, j: usize, ij: f32, ji: f32 },

    #[error("distance to self not strictly minimal: [{i},{j}]={ij} <= [{k},{k}]={kk}")]
    DiagonalNotMinimal { i: usize, j: usize, k: usize, ij: f32, kk: f32 },

    // Tree insertion.
    #[error("cannot insert object with cpuset {cpuset}: partially overlaps {existing}")]
    InsertConflict { cpuset: CpuSet, existing: ObjId },

    // Fatal for the current build.
    #[error("allocation failed: {0}")]
    Allocation(#[from] std::collections::TryReserveError),
}

impl Error {
    /// Whether the pipeline must stop instead of logging and moving on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Allocation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
