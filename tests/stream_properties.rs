//! Property-based tests for producers and cells

use proptest::prelude::*;
use undertow::prelude::*;

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
        .block_on(fut)
}

proptest! {
    #[test]
    fn prop_from_iterable_preserves_order(
        values in prop::collection::vec(any::<i32>(), 0..200)
    ) {
        let fx = from_iterable::<_, String>(values.clone());
        prop_assert_eq!(block_on(fx.collect_all()), Ok(values));
    }

    #[test]
    fn prop_scan_prepends_seed(
        values in prop::collection::vec(any::<i16>(), 0..100),
        seed in any::<i64>()
    ) {
        let fx = from_iterable::<_, String>(values.clone())
            .scan(seed, |acc, n| acc.wrapping_add(i64::from(n)));
        let out = block_on(fx.collect_all()).unwrap();

        prop_assert_eq!(out.len(), values.len() + 1);
        prop_assert_eq!(out[0], seed);
    }

    #[test]
    fn prop_skip_repeats_has_no_adjacent_equals(
        values in prop::collection::vec(0u8..4, 0..100)
    ) {
        let fx = from_iterable::<_, String>(values.clone()).skip_repeats();
        let out = block_on(fx.collect_all()).unwrap();

        prop_assert!(out.windows(2).all(|w| w[0] != w[1]));

        let mut expected = values;
        expected.dedup();
        prop_assert_eq!(out, expected);
    }

    #[test]
    fn prop_skip_repeats_with_key(
        values in prop::collection::vec(-5i32..5, 0..100)
    ) {
        let eq = Equivalence::by_key(|n: &i32| n.abs());
        let fx = from_iterable::<_, String>(values).skip_repeats_with(eq.clone());
        let out = block_on(fx.collect_all()).unwrap();

        prop_assert!(out.windows(2).all(|w| !eq.equals(&w[0], &w[1])));
    }

    #[test]
    fn prop_take_is_prefix(
        values in prop::collection::vec(any::<u32>(), 0..50),
        n in 0usize..60
    ) {
        let fx = from_iterable::<_, String>(values.clone()).take(n);
        let expected: Vec<_> = values.into_iter().take(n).collect();
        prop_assert_eq!(block_on(fx.collect_all()), Ok(expected));
    }

    #[test]
    fn prop_merge_keeps_each_branch_in_order(
        left in prop::collection::vec(0i32..1000, 0..50),
        right in prop::collection::vec(1000i32..2000, 0..50)
    ) {
        let fx = merge_all(vec![
            from_iterable::<_, String>(left.clone()),
            from_iterable(right.clone()),
        ]);
        let out = block_on(fx.collect_all()).unwrap();

        prop_assert_eq!(out.len(), left.len() + right.len());
        let from_left: Vec<_> = out.iter().copied().filter(|n| *n < 1000).collect();
        let from_right: Vec<_> = out.iter().copied().filter(|n| *n >= 1000).collect();
        prop_assert_eq!(from_left, left);
        prop_assert_eq!(from_right, right);
    }

    #[test]
    fn prop_ref_version_counts_changes(
        writes in prop::collection::vec(0u8..3, 0..50)
    ) {
        block_on(async {
            let cell = RefSubject::<u8>::of(0);
            let mut expected = 1;
            let mut current = 0;
            for value in writes {
                if value != current {
                    expected += 1;
                    current = value;
                }
                cell.set(value).await;
            }
            assert_eq!(cell.version(), expected);
            assert_eq!(cell.get().await, Ok(current));
        });
    }

    #[test]
    fn prop_subject_replays_last_n(
        values in prop::collection::vec(any::<i32>(), 0..30),
        capacity in 0usize..8
    ) {
        let replayed = block_on(async {
            let subject = Subject::<i32, String>::replay(capacity);
            for value in values.iter().copied() {
                subject.on_success(value).await;
            }
            subject.replayed()
        });

        let skip = values.len().saturating_sub(capacity);
        prop_assert_eq!(replayed, values[skip..].to_vec());
    }
}
