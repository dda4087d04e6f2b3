//! Property-based tests for sparse tensor canonicalisation, union and unfolding
//!
//! Values are small integers stored as f64 so sums are exact regardless of
//! the order in which duplicates are merged.

use partensor_sparse::{ColumnLayout, SpTensor};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// Test Utilities
// ============================================================================

type TensorData = (Vec<Vec<usize>>, Vec<f64>);

/// Random tensor with `1..=max_modes` modes and indices below `max_index`
///
/// The index range is kept small so duplicates and empty slices are common.
fn tensor_strategy(
    max_modes: usize,
    max_nnz: usize,
    max_index: usize,
) -> impl Strategy<Value = TensorData> {
    (1..=max_modes, 0..=max_nnz).prop_flat_map(move |(nmodes, nnz)| {
        (
            prop::collection::vec(prop::collection::vec(0..max_index, nnz..=nnz), nmodes..=nmodes),
            prop::collection::vec((-50i32..50).prop_map(f64::from), nnz..=nnz),
        )
    })
}

fn build((ind, vals): TensorData) -> SpTensor<f64> {
    SpTensor::from_arrays(ind, vals).unwrap()
}

/// Sum of values per full coordinate
fn class_sums(tt: &SpTensor<f64>) -> BTreeMap<Vec<usize>, f64> {
    let mut sums = BTreeMap::new();
    for n in 0..tt.nnz() {
        *sums.entry(tt.coord(n)).or_insert(0.0) += tt.vals()[n];
    }
    sums
}

/// Entries as a sorted multiset of (coordinate, value bits)
fn entry_multiset(tt: &SpTensor<f64>) -> Vec<(Vec<usize>, u64)> {
    let mut entries: Vec<_> = (0..tt.nnz())
        .map(|n| (tt.coord(n), tt.vals()[n].to_bits()))
        .collect();
    entries.sort();
    entries
}

// ============================================================================
// Sorting and Deduplication
// ============================================================================

proptest! {
    /// Property: sorting orders the primary mode and permutes whole entries
    #[test]
    fn prop_sort_orders_primary_mode(data in tensor_strategy(4, 40, 6), mode in 0usize..4) {
        let mut tt = build(data);
        let mode = mode % tt.nmodes();
        let before = entry_multiset(&tt);

        tt.sort_by_mode(mode).unwrap();

        prop_assert!(tt.is_sorted_by_mode(mode));
        prop_assert!(tt.ind(mode).windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(entry_multiset(&tt), before);
    }

    /// Property: dedup leaves distinct coordinates with per-class sums
    #[test]
    fn prop_dedup_preserves_class_sums(data in tensor_strategy(3, 40, 4)) {
        let mut tt = build(data);
        let nnz = tt.nnz();
        let expected = class_sums(&tt);

        let removed = tt.remove_duplicates();

        prop_assert_eq!(tt.nnz() + removed, nnz);
        prop_assert_eq!(tt.nnz(), expected.len());
        let coords: BTreeSet<_> = (0..tt.nnz()).map(|n| tt.coord(n)).collect();
        prop_assert_eq!(coords.len(), tt.nnz());
        prop_assert_eq!(class_sums(&tt), expected);
    }
}

// ============================================================================
// Empty-Slice Compaction
// ============================================================================

proptest! {
    /// Property: compaction is idempotent and leaves dense modes unmapped
    #[test]
    fn prop_remove_empty_idempotent(data in tensor_strategy(4, 30, 8)) {
        let mut tt = build(data);
        let dims_before = tt.dims().to_vec();

        tt.remove_empty_slices();
        let once = tt.clone();
        prop_assert_eq!(tt.remove_empty_slices(), 0);
        prop_assert_eq!(&tt, &once);

        for m in 0..tt.nmodes() {
            if tt.dims()[m] == dims_before[m] {
                prop_assert!(tt.indmap(m).is_none());
            }
        }
    }

    /// Property: local indices map back to exactly the original globals
    #[test]
    fn prop_remove_empty_round_trip(data in tensor_strategy(3, 30, 10)) {
        let original = build(data);
        let mut tt = original.clone();
        tt.remove_empty_slices();

        for m in 0..tt.nmodes() {
            let nonempty = original.unique_slices(m).unwrap();
            let mapped: Vec<usize> = (0..tt.dims()[m]).map(|l| tt.to_global(m, l)).collect();
            prop_assert_eq!(mapped, nonempty);

            for n in 0..tt.nnz() {
                prop_assert_eq!(tt.to_global(m, tt.ind(m)[n]), original.ind(m)[n]);
            }
        }
        prop_assert_eq!(tt.vals(), original.vals());
    }

    /// Property: fill_dims tracks arbitrary index edits
    #[test]
    fn prop_fill_dims_after_mutation(
        data in tensor_strategy(3, 20, 5),
        bump in 0usize..100,
    ) {
        let mut tt = build(data);
        prop_assume!(tt.nnz() > 0);

        tt.ind_mut(0)[0] = bump;
        tt.fill_dims();

        for m in 0..tt.nmodes() {
            let max = tt.ind(m).iter().copied().max().unwrap();
            prop_assert_eq!(tt.dims()[m], max + 1);
        }
    }
}

// ============================================================================
// Union and Unfolding
// ============================================================================

proptest! {
    /// Property: a canonical tensor unioned with itself keeps every entry once
    #[test]
    fn prop_union_with_self_not_doubled(data in tensor_strategy(3, 30, 5)) {
        let mut a = build(data);
        a.remove_duplicates();
        let mut b = a.clone();

        let u = SpTensor::union(&mut a, &mut b).unwrap();

        prop_assert_eq!(u.nnz(), a.nnz());
        prop_assert_eq!(entry_multiset(&u), entry_multiset(&a));
    }

    /// Property: union keeps the multiset of entries that are not exact matches
    #[test]
    fn prop_union_covers_both_operands(
        a in tensor_strategy(2, 15, 4),
        b in tensor_strategy(2, 15, 4),
    ) {
        let mut a = build(a);
        let mut b = build(b);
        prop_assume!(a.nmodes() == b.nmodes());
        a.remove_duplicates();
        b.remove_duplicates();

        let u = SpTensor::union(&mut a, &mut b).unwrap();

        let mut expected = entry_multiset(&a);
        for entry in entry_multiset(&b) {
            if !expected.contains(&entry) {
                expected.push(entry);
            }
        }
        expected.sort();
        prop_assert_eq!(entry_multiset(&u), expected);
    }

    /// Property: every entry lands at (ind[mode], layout column) of the unfolding
    #[test]
    fn prop_unfold_places_entries(data in tensor_strategy(4, 30, 4), mode in 0usize..4) {
        let mut tt = build(data);
        let mode = mode % tt.nmodes();
        tt.remove_duplicates();

        let csr = tt.unfold(mode).unwrap();
        let layout = ColumnLayout::new(tt.dims(), mode).unwrap();

        prop_assert_eq!(csr.row_ptr().len(), tt.dims()[mode] + 1);
        prop_assert_eq!(csr.nnz(), tt.nnz());

        let dense = csr.to_dense();
        for n in 0..tt.nnz() {
            let coord = tt.coord(n);
            prop_assert_eq!(dense[[coord[mode], layout.column_of(&coord)]], tt.vals()[n]);
        }
    }
}

// ============================================================================
// Concrete Scenarios
// ============================================================================

#[test]
fn test_sort_then_dedup_scenario() {
    let mut tt = SpTensor::from_arrays(
        vec![vec![0, 0, 1], vec![0, 0, 1], vec![0, 0, 1]],
        vec![2.0, 3.0, 4.0],
    )
    .unwrap();

    tt.sort_by_mode(0).unwrap();
    assert_eq!(tt.remove_duplicates(), 1);

    assert_eq!(tt.nnz(), 2);
    assert_eq!(tt.coord(0), vec![0, 0, 0]);
    assert_eq!(tt.vals()[0], 5.0);
    assert_eq!(tt.coord(1), vec![1, 1, 1]);
    assert_eq!(tt.vals()[1], 4.0);
}

#[test]
fn test_compaction_then_unfold() -> anyhow::Result<()> {
    let mut tt = SpTensor::from_arrays(vec![vec![10, 40, 10], vec![3, 0, 7]], vec![1.0, 2.0, 3.0])?;
    tt.remove_empty_slices();
    assert_eq!(tt.dims(), &[2, 3]);

    let csr = tt.unfold(0)?;
    assert_eq!(csr.shape(), (2, 3));
    assert_eq!(csr.row(0), Some((&[1, 2][..], &[1.0, 3.0][..])));
    assert_eq!(tt.to_global(0, 1), 40);
    Ok(())
}
