//! Normalized latency matrices attached to topology objects.

use serde::{Deserialize, Serialize};

use super::ObjType;

/// A logically-ordered, normalized latency matrix.
///
/// Owned by the smallest object whose location set equals the union of
/// the member objects. Row/column `0` is always the member with the lowest
/// logical index, so consumers never deal with OS indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalDistances {
    /// Type of the member objects.
    pub obj_type: ObjType,
    /// Depth of the members relative to the owner.
    pub relative_depth: u32,
    /// Number of members.
    pub count: usize,
    /// Raw minimum value; every entry was divided by it.
    pub latency_base: f32,
    /// Normalized maximum value.
    pub latency_max: f32,
    /// Row-major `count × count` normalized values.
    pub latency: Vec<f32>,
}

impl LogicalDistances {
    /// Normalized latency from logical rank `i` to logical rank `j`.
    pub fn get(&self, i: usize, j: usize) -> Option<f32> {
        if i >= self.count || j >= self.count {
            return None;
        }
        self.latency.get(i * self.count + j).copied()
    }

    /// Smallest normalized value. `1.0` for every matrix the normalizer emits.
    pub fn latency_min(&self) -> f32 {
        self.latency.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn row(&self, i: usize) -> Option<&[f32]> {
        if i >= self.count {
            return None;
        }
        Some(&self.latency[i * self.count..(i + 1) * self.count])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LogicalDistances {
        LogicalDistances {
            obj_type: ObjType::NumaNode,
            relative_depth: 1,
            count: 2,
            latency_base: 10.0,
            latency_max: 2.0,
            latency: vec![1.0, 2.0, 2.0, 1.0],
        }
    }

    #[test]
    fn test_get_bounds() {
        let d = sample();
        assert_eq!(d.get(0, 1), Some(2.0));
        assert_eq!(d.get(2, 0), None);
        assert_eq!(d.row(1), Some(&[2.0, 1.0][..]));
    }

    #[test]
    fn test_serializes() {
        let d = sample();
        let json = serde_json::to_string(&d).unwrap();
        let back: LogicalDistances = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
