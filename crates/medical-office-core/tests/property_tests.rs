//! Property tests for the list pipeline and the reconciler.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use proptest::prelude::*;

use medical_office_core::query::{paginate, sort_with, FilterSet, SortDirection};
use medical_office_core::reconcile::reconcile;

proptest! {
    #[test]
    fn prop_page_is_clamped_and_bounded(
        rows in prop::collection::vec(any::<u16>(), 0..60),
        requested in 0u32..20,
        size in 1u32..12,
    ) {
        let total = rows.len();
        let page = paginate(rows, requested, size);
        prop_assert!(page.page_index >= 1);
        prop_assert!(page.page_index <= page.total_pages);
        prop_assert!(page.items.len() <= size as usize);
        prop_assert_eq!(page.total_count, total as u64);
    }

    #[test]
    fn prop_pages_cover_every_row_once(
        rows in prop::collection::vec(any::<u16>(), 0..60),
        size in 1u32..12,
    ) {
        let total_pages = paginate(rows.clone(), 1, size).total_pages;
        let joined: Vec<u16> = (1..=total_pages)
            .flat_map(|p| paginate(rows.clone(), p, size).items)
            .collect();
        prop_assert_eq!(joined, rows);
    }

    #[test]
    fn prop_paginate_is_idempotent(
        rows in prop::collection::vec(any::<u16>(), 0..60),
        requested in 0u32..20,
        size in 1u32..12,
    ) {
        let first = paginate(rows.clone(), requested, size);
        let second = paginate(rows, requested, size);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_filter_order_does_not_matter(
        rows in prop::collection::vec(0i32..100, 0..40),
        min in 0i32..100,
        divisor in 1i32..7,
    ) {
        let a = FilterSet::new()
            .with("min", move |v: &i32| *v >= min)
            .with("divisible", move |v: &i32| v % divisor == 0);
        let b = FilterSet::new()
            .with("divisible", move |v: &i32| v % divisor == 0)
            .with("min", move |v: &i32| *v >= min);
        prop_assert_eq!(a.apply(rows.clone()), b.apply(rows));
        prop_assert_eq!(a.len(), 2);
    }

    #[test]
    fn prop_sort_ignores_input_order(
        rows in prop::collection::vec((0u8..5, any::<u32>()), 0..40),
        descending in any::<bool>(),
    ) {
        // Unique ids for the tiebreak
        let rows: Vec<(u8, u32, usize)> = rows.into_iter().enumerate().map(|(i, (k, v))| (k, v, i)).collect();
        let direction = if descending { SortDirection::Desc } else { SortDirection::Asc };
        let primary = |a: &(u8, u32, usize), b: &(u8, u32, usize)| a.0.cmp(&b.0);
        let tiebreak = |a: &(u8, u32, usize), b: &(u8, u32, usize)| a.2.cmp(&b.2);

        let mut forward = rows.clone();
        sort_with(&mut forward, direction, primary, tiebreak);
        let mut reversed: Vec<_> = rows.into_iter().rev().collect();
        sort_with(&mut reversed, direction, primary, tiebreak);
        prop_assert_eq!(&forward, &reversed);

        for pair in forward.windows(2) {
            let ord = direction.apply(primary(&pair[0], &pair[1]));
            prop_assert!(ord != Ordering::Greater);
            if ord == Ordering::Equal {
                prop_assert!(pair[0].2 < pair[1].2);
            }
        }
    }

    #[test]
    fn prop_reconcile_reaches_desired_known_set(
        options in prop::collection::btree_set(0i64..30, 0..20),
        current in prop::collection::btree_set(0i64..30, 0..10),
        desired in prop::option::of(prop::collection::vec(0i64..40, 0..15)),
    ) {
        let current: BTreeSet<i64> = current.intersection(&options).copied().collect();
        let delta = reconcile(&options, &current, desired.as_deref());

        prop_assert!(delta.to_add.is_disjoint(&current));
        prop_assert!(delta.to_remove.is_subset(&current));
        prop_assert!(delta.to_add.is_subset(&options));

        let mut after = current.clone();
        delta.apply_to(&mut after);
        let expected: BTreeSet<i64> = desired
            .unwrap_or_default()
            .into_iter()
            .filter(|id| options.contains(id))
            .collect();
        prop_assert_eq!(after, expected);
    }

    #[test]
    fn prop_reconcile_twice_is_a_no_op(
        options in prop::collection::btree_set(0i64..30, 0..20),
        current in prop::collection::btree_set(0i64..30, 0..10),
        desired in prop::option::of(prop::collection::vec(0i64..40, 0..15)),
    ) {
        let mut current: BTreeSet<i64> = current.intersection(&options).copied().collect();
        reconcile(&options, &current, desired.as_deref()).apply_to(&mut current);

        let again = reconcile(&options, &current, desired.as_deref());
        prop_assert!(again.is_empty());
    }

    #[test]
    fn prop_reconcile_with_current_selection_changes_nothing(
        options in prop::collection::btree_set(0i64..30, 0..20),
        current in prop::collection::btree_set(0i64..30, 0..10),
    ) {
        let current: BTreeSet<i64> = current.intersection(&options).copied().collect();
        let selection: Vec<i64> = current.iter().copied().collect();
        prop_assert!(reconcile(&options, &current, Some(selection.as_slice())).is_empty());
    }
}
