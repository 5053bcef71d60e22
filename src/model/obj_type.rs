//! Object types of the topology tree.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of a topology object.
///
/// The derived ordering is the enumeration order. Everything that walks
/// "all types" (the distance store, environment lookup, diagnostics) walks
/// them in this order so output is reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObjType {
    /// Whole system, the root of every tree.
    System,
    /// One shared-memory machine.
    Machine,
    /// NUMA memory node.
    NumaNode,
    /// Physical package (socket).
    Package,
    /// Data or unified cache.
    Cache,
    /// Processor core.
    Core,
    /// Processing unit (hardware thread).
    Pu,
    /// Synthetic object grouping other objects, no OS identity.
    Group,
    /// Anything else.
    Misc,
}

impl ObjType {
    /// All types, in enumeration order.
    pub const ALL: [ObjType; 9] = [
        ObjType::System,
        ObjType::Machine,
        ObjType::NumaNode,
        ObjType::Package,
        ObjType::Cache,
        ObjType::Core,
        ObjType::Pu,
        ObjType::Group,
        ObjType::Misc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjType::System => "System",
            ObjType::Machine => "Machine",
            ObjType::NumaNode => "NUMANode",
            ObjType::Package => "Package",
            ObjType::Cache => "Cache",
            ObjType::Core => "Core",
            ObjType::Pu => "PU",
            ObjType::Group => "Group",
            ObjType::Misc => "Misc",
        }
    }

    /// Nesting rank used when two objects cover the same location set:
    /// the lower rank becomes the parent.
    pub(crate) fn nesting_rank(&self) -> u8 {
        match self {
            ObjType::System => 0,
            ObjType::Machine => 1,
            ObjType::Group => 2,
            ObjType::NumaNode => 3,
            ObjType::Package => 4,
            ObjType::Cache => 5,
            ObjType::Core => 6,
            ObjType::Pu => 7,
            ObjType::Misc => 8,
        }
    }
}

impl fmt::Display for ObjType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a type name does not match any [`ObjType`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown object type `{0}`")]
pub struct UnknownObjType(pub String);

impl FromStr for ObjType {
    type Err = UnknownObjType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownObjType(s.to_string()))
    }
}
