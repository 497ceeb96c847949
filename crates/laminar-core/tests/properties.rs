//! Property-based and end-to-end tests exercised through the public API
//! only (no access to crate-internal types).

use laminar_core::config::HnswParams;
use laminar_core::distance::{Cosine, Euclidean};
use laminar_core::Index;
use proptest::prelude::*;

#[test]
fn end_to_end_grid_search_returns_subset_of_nearest_quadrant() {
    let index: Index<Euclidean> = Index::with_defaults(2).unwrap();
    for i in 0..100u64 {
        index
            .insert(i, vec![(i / 10) as f64, (i % 10) as f64])
            .unwrap();
    }
    let result = index.search(&[1.5, 1.5], 4);
    assert_eq!(result.len(), 4);
    let allowed: std::collections::HashSet<u64> = [11, 12, 21, 22].into_iter().collect();
    for id in &result {
        assert!(allowed.contains(id));
    }
}

#[test]
fn end_to_end_delete_then_search_excludes_tombstone() {
    let index: Index<Euclidean> = Index::with_defaults(2).unwrap();
    for i in 1..=3u64 {
        index.insert(i, vec![i as f64, i as f64]).unwrap();
    }
    index.delete(1);
    let result = index.search(&[1.1, 1.1], 1);
    assert!(!result.contains(&1));
    assert_eq!(result, vec![2]);
}

#[test]
fn end_to_end_batch_build_and_search() {
    let index: Index<Euclidean> = Index::with_defaults(2).unwrap();
    let items: Vec<(u64, Vec<f64>)> = (0..100u64)
        .map(|i| (i, vec![(i / 10) as f64, (i % 10) as f64]))
        .collect();
    let stats = index.batch_insert(items);
    assert_eq!(stats.inserted, 100);

    let queries: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64, i as f64]).collect();
    let results = index.batch_search(&queries, 5, Default::default());
    assert_eq!(results.len(), 5);
    for r in &results {
        assert!(r.len() <= 5);
    }
}

#[test]
fn diagnostics_stay_zero_after_a_realistic_sequential_workload() {
    let index: Index<Euclidean> = Index::with_defaults(3).unwrap();
    for i in 0..300u64 {
        index
            .insert(i, vec![(i % 17) as f64, (i % 5) as f64, (i % 11) as f64])
            .unwrap();
    }
    for i in (0..300u64).step_by(7) {
        let _ = index.search(&[(i % 17) as f64, (i % 5) as f64, (i % 11) as f64], 10);
    }
    for i in (0..300u64).step_by(13) {
        index.delete(i);
    }
    let items: Vec<(u64, Vec<f64>)> = (300..400u64)
        .map(|i| (i, vec![(i % 17) as f64, (i % 5) as f64, (i % 11) as f64]))
        .collect();
    index.batch_insert(items);
    let queries: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, i as f64, i as f64]).collect();
    index.batch_search(&queries, 5, Default::default());
    index.batch_delete(&(300..320u64).collect::<Vec<_>>());

    let snapshot = index.diagnostics();
    assert_eq!(snapshot.invariant_violation_total, 0);
    assert_eq!(snapshot.corruption_detected_total, 0);
}

#[test]
fn cosine_metric_end_to_end_orthogonal_axes() {
    let index: Index<Cosine> = Index::with_defaults(2).unwrap();
    index.insert(1, vec![1.0, 0.0]).unwrap();
    index.insert(2, vec![0.0, 1.0]).unwrap();
    let result = index.search(&[1.0, 0.01], 1);
    assert_eq!(result, vec![1]);
}

proptest! {
    /// P3: returned ids have strictly non-decreasing distance to the query.
    #[test]
    fn search_results_are_distance_ordered(
        points in prop::collection::vec((-50.0f64..50.0, -50.0f64..50.0), 5..80),
        qx in -50.0f64..50.0,
        qy in -50.0f64..50.0,
    ) {
        let index: Index<Euclidean> = Index::with_defaults(2).unwrap();
        for (i, (x, y)) in points.iter().enumerate() {
            let _ = index.insert(i as u64, vec![*x, *y]);
        }
        let k = (points.len() / 2).max(1);
        let result = index.search(&[qx, qy], k);

        let mut last = 0.0f64;
        for id in &result {
            let (x, y) = points[*id as usize];
            let d = ((x - qx).powi(2) + (y - qy).powi(2)).sqrt();
            prop_assert!(d + 1e-9 >= last);
            last = d;
        }
    }

    /// P1: every node's per-level adjacency respects its degree cap.
    #[test]
    fn degree_cap_is_never_exceeded(
        points in prop::collection::vec((-20.0f64..20.0, -20.0f64..20.0), 10..150),
    ) {
        let params = HnswParams::custom(8, 16, 60);
        let index: Index<Euclidean> = Index::new(2, params).unwrap();
        for (i, (x, y)) in points.iter().enumerate() {
            let _ = index.insert(i as u64, vec![*x, *y]);
        }
        // The cap itself is an internal invariant; we check it indirectly
        // by confirming search still returns a well-formed, bounded result
        // after heavy construction (an out-of-cap graph would typically
        // surface as wildly oversized or duplicated result sets).
        let result = index.search(&[0.0, 0.0], 10);
        prop_assert!(result.len() <= 10);
        let unique: std::collections::HashSet<_> = result.iter().collect();
        prop_assert_eq!(unique.len(), result.len());
    }
}
