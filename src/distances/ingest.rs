//! Textual distance specs.
//!
//! ```text
//! "idx0,idx1,...,idxN-1:v00,v01,...,v(N-1)(N-1)"   explicit row-major matrix
//! "idx0,idx1,...,idxN-1:X*Y"                       X groups of Y objects
//! "idx0,idx1,...,idxN-1:X*Y*Z"                     X groups of Y groups of Z objects
//! ```
//!
//! The shorthand generates hop-like distances: 1 to self, 2 inside an
//! innermost group of `Z`, 4 inside a group of `Y·Z`, 8 otherwise.

use tracing::{error, warn};

use super::DistanceStore;
use crate::model::ObjType;
use crate::{Error, Result};

/// Parse a spec into its index list and row-major matrix.
pub fn parse_distances(obj_type: ObjType, spec: &str) -> Result<(Vec<u32>, Vec<f32>)> {
    let parse_err = |message: String| Error::Parse { obj_type, message };

    let (index_part, value_part) = spec
        .split_once(':')
        .ok_or_else(|| parse_err("missing colon".into()))?;

    let indexes = index_part
        .split(',')
        .map(|s| {
            let s = s.trim();
            s.parse::<u32>()
                .map_err(|_| parse_err(format!("invalid index `{s}`")))
        })
        .collect::<Result<Vec<u32>>>()?;
    let count = indexes.len();

    let expected = count
        .checked_mul(count)
        .ok_or_else(|| parse_err(format!("too many objects ({count})")))?;
    let mut matrix: Vec<f32> = Vec::new();

    // Reserve only once the body is known to describe `count²` values.
    let value_part = value_part.trim();
    if value_part.contains('*') {
        let (x, y, z) = parse_grouping(obj_type, value_part)?;
        let product = u64::from(x) * u64::from(y) * u64::from(z);
        if product != count as u64 {
            return Err(Error::InvalidGrouping { obj_type, x, y, z, expected: count });
        }
        matrix.try_reserve_exact(expected)?;
        let (y, z) = (y as usize, z as usize);
        for i in 0..count {
            for j in 0..count {
                let value = if i == j {
                    1.0
                } else if i / z == j / z {
                    2.0
                } else if i / z / y == j / z / y {
                    4.0
                } else {
                    8.0
                };
                matrix.push(value);
            }
        }
    } else {
        let got = value_part.split(',').count();
        if got != expected {
            return Err(Error::ValueCount { obj_type, expected, got });
        }
        matrix.try_reserve_exact(expected)?;
        for s in value_part.split(',') {
            let s = s.trim();
            let value = s
                .parse::<f32>()
                .map_err(|_| parse_err(format!("invalid distance `{s}`")))?;
            if !value.is_finite() {
                return Err(parse_err(format!("distance `{s}` is not finite")));
            }
            matrix.push(value);
        }
    }

    Ok((indexes, matrix))
}

fn parse_grouping(obj_type: ObjType, s: &str) -> Result<(u32, u32, u32)> {
    let parts = s
        .split('*')
        .map(|p| {
            let p = p.trim();
            p.parse::<u32>().map_err(|_| Error::Parse {
                obj_type,
                message: format!("invalid grouping factor `{p}`"),
            })
        })
        .collect::<Result<Vec<u32>>>()?;
    match parts.as_slice() {
        [x, y] => Ok((*x, *y, 1)),
        [x, y, z] => Ok((*x, *y, *z)),
        _ => Err(Error::Parse {
            obj_type,
            message: format!("grouping `{s}` needs two or three factors"),
        }),
    }
}

/// Parse `spec` and store it for `obj_type`.
///
/// Failures are logged and returned; the store is only touched on success.
pub fn ingest_distances(store: &mut DistanceStore, obj_type: ObjType, spec: &str) -> Result<()> {
    let res = parse_distances(obj_type, spec)
        .and_then(|(indexes, matrix)| store.set(obj_type, indexes, matrix));
    if let Err(e) = &res {
        if e.is_fatal() {
            error!(%obj_type, error = %e, "distance ingestion aborted");
        } else {
            warn!(%obj_type, error = %e, "ignoring {obj_type} distances");
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_explicit_matrix() {
        let (idx, m) = parse_distances(ObjType::NumaNode, "4,7:10,20,20,10").unwrap();
        assert_eq!(idx, vec![4, 7]);
        assert_eq!(m, vec![10.0, 20.0, 20.0, 10.0]);
    }

    #[test]
    fn test_shorthand_two_by_two() {
        let (idx, m) = parse_distances(ObjType::NumaNode, "0,1,2,3:2*2").unwrap();
        assert_eq!(idx, vec![0, 1, 2, 3]);
        assert_eq!(
            m,
            vec![
                1.0, 4.0, 8.0, 8.0,
                4.0, 1.0, 8.0, 8.0,
                8.0, 8.0, 1.0, 4.0,
                8.0, 8.0, 4.0, 1.0,
            ]
        );
    }

    #[test]
    fn test_shorthand_three_levels() {
        let (_, m) = parse_distances(ObjType::Pu, "0,1,2,3,4,5,6,7:2*2*2").unwrap();
        let row0: Vec<f32> = m[..8].to_vec();
        assert_eq!(row0, vec![1.0, 2.0, 4.0, 4.0, 8.0, 8.0, 8.0, 8.0]);
    }

    #[test]
    fn test_bad_grouping_product() {
        let err = parse_distances(ObjType::NumaNode, "0,1,2:2*2").unwrap_err();
        assert!(matches!(err, Error::InvalidGrouping { x: 2, y: 2, z: 1, expected: 3, .. }));
        let err = parse_distances(ObjType::NumaNode, "0,1:2*0").unwrap_err();
        assert!(matches!(err, Error::InvalidGrouping { .. }));
    }

    #[test]
    fn test_value_count_mismatch() {
        let err = parse_distances(ObjType::NumaNode, "0,1,2:1,2,3,4").unwrap_err();
        assert!(matches!(err, Error::ValueCount { expected: 9, got: 4, .. }));
        let err = parse_distances(ObjType::NumaNode, "0:1,2").unwrap_err();
        assert!(matches!(err, Error::ValueCount { expected: 1, got: 2, .. }));
    }

    #[test]
    fn test_short_body_for_huge_index_list_is_not_fatal() {
        let indexes: Vec<String> = (0..1_000_000u32).map(|i| i.to_string()).collect();
        let spec = format!("{}:1,2", indexes.join(","));

        let err = parse_distances(ObjType::Pu, &spec).unwrap_err();
        assert!(!err.is_fatal());
        assert!(matches!(err, Error::ValueCount { expected: 1_000_000_000_000, got: 2, .. }));
    }

    #[test]
    fn test_malformed() {
        for spec in ["0,1", "0,x:1,2,2,1", "0,1:1,2,2,y", "0,1:2*a", "0,1:1*1*1*2", ":1", "0:inf"] {
            assert!(
                matches!(parse_distances(ObjType::Core, spec), Err(Error::Parse { .. })),
                "{spec} should not parse"
            );
        }
    }

    #[test]
    fn test_failed_ingest_leaves_store_untouched() {
        let mut store = DistanceStore::new();
        assert!(ingest_distances(&mut store, ObjType::NumaNode, "0,1,2:1,2,3,4").is_err());
        assert!(store.is_empty());
        ingest_distances(&mut store, ObjType::NumaNode, "0,1,2:1*3").unwrap();
        assert_eq!(store.get(ObjType::NumaNode).unwrap().count(), 3);
    }
}
