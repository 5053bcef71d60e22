//! # Topology Model
//!
//! Plain data types shared by the tree and the distance pipeline.
//!
//! Design rule: no tree mutation, no logging, no environment access here.
//! This module is pure data.

pub mod obj_type;
pub mod cpuset;
pub mod object;
pub mod distances;

pub use obj_type::{ObjType, UnknownObjType};
pub use cpuset::CpuSet;
pub use object::{ObjId, TopoObject};
pub use distances::LogicalDistances;
