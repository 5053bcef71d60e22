//! End-to-end tests for tree regeneration: raw distances outlive the tree,
//! resolved objects and groups do not.

use hwtopo::{CpuSet, DistanceConfig, ObjType, Topology};
use pretty_assertions::assert_eq;

fn build(topo: &mut Topology) {
    for n in 0..4u32 {
        topo.insert_object(ObjType::NumaNode, Some(n), CpuSet::from_range(n * 2..n * 2 + 2))
            .unwrap();
    }
}

fn topo_with_pairs() -> Topology {
    let mut topo = Topology::new(DistanceConfig::default()).unwrap();
    build(&mut topo);
    topo.set_distances_from_str(ObjType::NumaNode, "0,1,2,3:2*2").unwrap();
    topo
}

// ============================================================================
// 1. Reset keeps raw input, drops the resolved objects
// ============================================================================

#[test]
fn test_reset_then_reload_groups_again() {
    let mut topo = topo_with_pairs();
    assert_eq!(topo.load_distances().unwrap().groups_created, 2);

    topo.reset();
    assert!(topo.is_empty());
    let entry = topo.distances().get(ObjType::NumaNode).unwrap();
    assert_eq!(entry.indexes(), &[0, 1, 2, 3]);
    assert!(!entry.is_resolved());

    build(&mut topo);
    let report = topo.load_distances().unwrap();
    assert_eq!(report.resolved, 1);
    assert_eq!(report.normalized, 1);
    assert_eq!(report.groups_created, 2);
    assert_eq!(topo.objects_by_type(ObjType::Group).len(), 2);
}

// ============================================================================
// 2. A rebuilt tree missing an object: the entry no longer resolves
// ============================================================================

#[test]
fn test_reload_on_smaller_tree() {
    let mut topo = topo_with_pairs();
    topo.load_distances().unwrap();

    topo.reset();
    for n in 0..3u32 {
        topo.insert_object(ObjType::NumaNode, Some(n), CpuSet::from_range(n * 2..n * 2 + 2))
            .unwrap();
    }
    let report = topo.load_distances().unwrap();
    assert_eq!(report.resolved, 0);
    assert_eq!(report.groups_created, 0);
    assert!(topo.root().distances.is_empty());
}

// ============================================================================
// 3. clear_distances drops everything
// ============================================================================

#[test]
fn test_clear_distances() {
    let mut topo = topo_with_pairs();
    topo.clear_distances();
    assert!(topo.distances().is_empty());

    let report = topo.load_distances().unwrap();
    assert_eq!(report, Default::default());
    assert!(topo.objects_by_type(ObjType::Group).is_empty());
}

// ============================================================================
// 4. Replacing a matrix between generations
// ============================================================================

#[test]
fn test_replaced_matrix_applies_to_next_generation() {
    let mut topo = topo_with_pairs();
    topo.load_distances().unwrap();
    topo.reset();

    let mut uniform = vec![2.0f32; 16];
    for i in 0..4 {
        uniform[i * 5] = 1.0;
    }
    topo.set_distance_matrix(ObjType::NumaNode, vec![0, 1, 2, 3], uniform).unwrap();
    build(&mut topo);

    let report = topo.load_distances().unwrap();
    assert_eq!(report.normalized, 1);
    assert_eq!(report.groups_created, 0);
    assert_eq!(topo.root().distances[0].latency_max, 2.0);
}
