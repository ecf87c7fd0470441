//! Tests for producers, combinators and runners.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::fx::prelude::*;
use crate::fx::FromIterable;

// Constructors

#[tokio::test]
async fn test_succeed_emits_once() {
    let fx = succeed::<_, String>(42);
    assert_eq!(fx.collect_all().await, Ok(vec![42]));
}

#[tokio::test]
async fn test_fail_emits_nothing() {
    let fx = fail::<i32, _>("error".to_string());
    assert_eq!(fx.collect_all().await, Err(Cause::fail("error".to_string())));
}

#[tokio::test]
async fn test_from_iterable_is_cold() {
    let fx = from_iterable::<_, String>(vec![1, 2, 3]);
    assert_eq!(fx.collect_all().await, Ok(vec![1, 2, 3]));
    assert_eq!(fx.collect_all().await, Ok(vec![1, 2, 3]));
}

#[tokio::test]
async fn test_from_effect_runs_once_per_subscription() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let fx = from_effect(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move { Ok::<_, String>(n) }
    });

    assert_eq!(fx.collect_all().await, Ok(vec![0]));
    assert_eq!(fx.collect_all().await, Ok(vec![1]));
}

#[tokio::test]
async fn test_from_future_reports_any_cause() {
    let fx = from_future(|| async { Err::<i32, Cause<String>>(Cause::die_message("bug")) });
    assert!(fx.collect_all().await.unwrap_err().is_die());
}

#[tokio::test]
async fn test_empty_completes() {
    assert_eq!(empty::<i32, String>().collect_all().await, Ok(vec![]));
}

#[tokio::test(start_paused = true)]
async fn test_periodic_ticks_until_stopped() {
    let ticks = periodic::<String>(Duration::from_secs(1)).take(3);
    assert_eq!(ticks.collect_all().await, Ok(vec![(), (), ()]));
}

#[tokio::test(start_paused = true)]
async fn test_from_schedule_completes_when_exhausted() {
    let schedule = Schedule::spaced(Duration::from_millis(10)).with_max_recurrences(2);
    let fx = from_schedule::<String>(schedule);
    assert_eq!(fx.collect_all().await, Ok(vec![(), ()]));
}

#[tokio::test]
async fn test_suspend_builds_at_run_time() {
    let fx = suspend(|| from_iterable::<_, String>(vec![1, 2]));
    assert_eq!(fx.collect_all().await, Ok(vec![1, 2]));
}

#[tokio::test]
async fn test_unwrap_fails_when_construction_fails() {
    let fx = unwrap(|| async { Err::<FromIterable<Vec<i32>, String>, _>("nope".to_string()) });
    assert_eq!(fx.collect_all().await, Err(Cause::fail("nope".to_string())));
}

#[tokio::test]
async fn test_unwrap_scoped_closes_scope_after_run() {
    let closed = Arc::new(AtomicUsize::new(0));
    let flag = closed.clone();
    let fx = unwrap_scoped(move |scope| {
        let flag = flag.clone();
        async move {
            scope.add_finalizer(move || {
                flag.fetch_add(1, Ordering::SeqCst);
            });
            Ok::<_, String>(from_iterable(vec![1]))
        }
    });

    assert_eq!(fx.collect_all().await, Ok(vec![1]));
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

// Transformation

#[tokio::test]
async fn test_map_effect_failure_stops_the_stream() {
    let fx = from_iterable(vec![1, 2, 3]).map_effect(|n| async move {
        if n == 2 {
            Err("two".to_string())
        } else {
            Ok(n)
        }
    });
    assert_eq!(fx.collect_all().await, Err(Cause::fail("two".to_string())));
}

#[tokio::test]
async fn test_filter_map_and_effect() {
    let fx = from_iterable::<_, String>(vec!["1", "x", "3"]).filter_map(|s| s.parse::<i32>().ok());
    assert_eq!(fx.collect_all().await, Ok(vec![1, 3]));

    let fx = from_iterable::<_, String>(vec![1, 2, 3, 4])
        .filter_effect(|n| {
            let even = n % 2 == 0;
            async move { Ok(even) }
        });
    assert_eq!(fx.collect_all().await, Ok(vec![2, 4]));
}

#[tokio::test]
async fn test_scan_emits_seed_first() {
    let fx = from_iterable::<_, String>(vec![1, 2, 3]).scan(0, |acc, n| acc + n);
    assert_eq!(fx.collect_all().await, Ok(vec![0, 1, 3, 6]));
}

#[tokio::test]
async fn test_scan_effect_forwards_failure() {
    let fx = from_iterable(vec![1, 2, 3]).scan_effect(0, |acc, n| async move {
        if n == 3 {
            Err("overflow")
        } else {
            Ok(acc + n)
        }
    });
    assert_eq!(fx.collect_all().await, Err(Cause::fail("overflow")));

    let values = fx.exit().collect_all().await.unwrap();
    assert_eq!(values, vec![Ok(0), Ok(1), Ok(3), Err(Cause::fail("overflow"))]);
}

#[tokio::test]
async fn test_tap_sees_every_value() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let fx = from_iterable::<_, String>(vec![1, 2]).tap(move |n| log.lock().unwrap().push(*n));
    assert_eq!(fx.collect_all().await, Ok(vec![1, 2]));
    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn test_skip_repeats_with_equivalence() {
    let fx = from_iterable::<_, String>(vec!["a", "A", "b", "B", "a"])
        .skip_repeats_with(Equivalence::by_key(|s: &&str| s.to_lowercase()));
    assert_eq!(fx.collect_all().await, Ok(vec!["a", "b", "a"]));
}

#[tokio::test]
async fn test_slice_variants() {
    let source = || from_iterable::<_, String>(vec![1, 2, 3, 4, 5]);
    assert_eq!(source().take(3).collect_all().await, Ok(vec![1, 2, 3]));
    assert_eq!(source().skip(3).collect_all().await, Ok(vec![4, 5]));
    assert_eq!(source().take(0).collect_all().await, Ok(vec![]));
    assert_eq!(source().take(10).collect_all().await, Ok(vec![1, 2, 3, 4, 5]));
}

#[tokio::test]
async fn test_take_stops_infinite_upstream() {
    let fx = from_iterable::<_, String>(0..).take(2);
    assert_eq!(fx.collect_all().await, Ok(vec![0, 1]));
}

#[tokio::test]
async fn test_take_while_family() {
    let source = || from_iterable::<_, String>(vec![1, 2, 3, 4, 1]);
    assert_eq!(source().take_while(|n| *n < 3).collect_all().await, Ok(vec![1, 2]));
    assert_eq!(source().take_until(|n| *n == 3).collect_all().await, Ok(vec![1, 2]));
    assert_eq!(source().drop_after(|n| *n == 3).collect_all().await, Ok(vec![1, 2, 3]));
    assert_eq!(source().skip_while(|n| *n < 3).collect_all().await, Ok(vec![3, 4, 1]));
    assert_eq!(source().skip_until(|n| *n == 4).collect_all().await, Ok(vec![4, 1]));
}

#[tokio::test(start_paused = true)]
async fn test_until_stops_on_signal() {
    let fx = periodic::<String>(Duration::from_millis(10))
        .scan(0, |n, ()| n + 1)
        .until(at((), Duration::from_millis(35)));
    assert_eq!(fx.collect_all().await, Ok(vec![0, 1, 2, 3]));
}

#[tokio::test]
async fn test_start_with_and_continue_with() {
    let fx = from_iterable::<_, String>(vec![2])
        .start_with(1)
        .continue_with(succeed(3));
    assert_eq!(fx.collect_all().await, Ok(vec![1, 2, 3]));

    let fx = fail::<i32, _>("stop").continue_with(succeed(3));
    assert_eq!(fx.collect_all().await, Err(Cause::fail("stop")));
}

#[tokio::test]
async fn test_loop_effect_threads_state() {
    let fx = from_iterable(vec![10, 20]).loop_effect(0, |count, n| async move {
        Ok::<_, String>((n + count, count + 1))
    });
    assert_eq!(fx.collect_all().await, Ok(vec![10, 21]));
}

// Failure channel

#[tokio::test]
async fn test_result_keeps_defects_as_failures() {
    let fx = from_iterable::<_, String>(vec![1])
        .continue_with(fail("bad".to_string()))
        .result();
    assert_eq!(fx.collect_all().await, Ok(vec![Ok(1), Err("bad".to_string())]));

    let fx = die::<i32, String>("bug").result();
    assert!(fx.collect_all().await.unwrap_err().is_die());
}

#[tokio::test]
async fn test_causes_emits_only_the_failure() {
    let fx = from_iterable(vec![1, 2]).continue_with(fail("bad")).causes();
    assert_eq!(fx.collect_all().await, Ok(vec![Cause::fail("bad")]));
}

#[tokio::test]
async fn test_map_error_leaves_defects_alone() {
    let fx = fail::<i32, _>(1).map_error(|n: i32| n.to_string());
    assert_eq!(fx.collect_all().await, Err(Cause::fail("1".to_string())));

    let fx = die::<i32, i32>("bug").map_error(|n| n.to_string());
    let cause = fx.collect_all().await.unwrap_err();
    assert!(cause.is_die());
    assert!(cause.failures().is_empty());
}

#[tokio::test]
async fn test_map_both() {
    let fx = from_iterable(vec![1])
        .continue_with(fail(2))
        .map_both(|e: i32| e * 100, |n| n + 1);
    assert_eq!(
        fx.exit().collect_all().await,
        Ok(vec![Ok(2), Err(Cause::fail(200))])
    );
}

#[tokio::test]
async fn test_catch_if_only_matching_errors() {
    let recover = |code: &i32| *code == 404;
    let fx = fail::<&str, _>(404).catch_if(recover, |_| succeed("default"));
    assert_eq!(fx.collect_all().await, Ok(vec!["default"]));

    let fx = fail::<&str, _>(500).catch_if(recover, |_| succeed("default"));
    assert_eq!(fx.collect_all().await, Err(Cause::fail(500)));
}

#[tokio::test]
async fn test_catch_cause_recovers_defects() {
    let fx = die::<i32, String>("bug").catch_cause(|cause| {
        assert!(cause.is_die());
        succeed::<_, String>(0)
    });
    assert_eq!(fx.collect_all().await, Ok(vec![0]));
}

#[tokio::test]
async fn test_or_else_succeed() {
    let fx = from_iterable(vec![1]).continue_with(fail(9)).or_else_succeed(|e| e * 2);
    assert_eq!(fx.collect_all().await, Ok(vec![1, 18]));
}

#[tokio::test(start_paused = true)]
async fn test_retry_until_schedule_exhausted() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let fx = from_effect(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Err::<i32, _>("down") }
    })
    .retry(Schedule::exponential(Duration::from_millis(10)).with_max_recurrences(3));

    assert_eq!(fx.collect_all().await, Err(Cause::fail("down")));
    assert_eq!(attempts.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_retry_does_not_retry_defects() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let fx = from_future(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Err::<i32, Cause<String>>(Cause::die_message("bug")) }
    })
    .retry(Schedule::spaced(Duration::from_millis(1)));

    assert!(fx.collect_all().await.unwrap_err().is_die());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

// Hooks

#[tokio::test]
async fn test_on_exit_sees_outcome_once() {
    let exits = Arc::new(Mutex::new(Vec::new()));
    let log = exits.clone();
    let fx = from_iterable(vec![1, 2])
        .continue_with(fail("bad"))
        .on_exit(move |exit| log.lock().unwrap().push(exit.clone()));

    assert!(fx.collect_all().await.is_err());
    assert_eq!(*exits.lock().unwrap(), vec![Err(Cause::fail("bad"))]);
}

#[tokio::test]
async fn test_on_error_skips_success() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let fx = succeed::<_, String>(1).on_error(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(fx.collect_all().await, Ok(vec![1]));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_on_interrupt_fires_when_dropped() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let fx = never::<i32, String>().on_interrupt(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let outcome = tokio::time::timeout(Duration::from_millis(5), fx.drain()).await;
    assert!(outcome.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// Concurrency

#[tokio::test]
async fn test_flat_map_runs_every_inner_stream() {
    let fx = from_iterable::<_, String>(vec![1, 2, 3]).flat_map(|n| from_iterable(vec![n, n * 10]));
    let mut values = fx.collect_all().await.unwrap();
    values.sort();
    assert_eq!(values, vec![1, 2, 3, 10, 20, 30]);
}

#[tokio::test(start_paused = true)]
async fn test_flat_map_concurrently_bounds_live_inner_streams() {
    let live = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (live_in, peak_in) = (live.clone(), peak.clone());

    let fx = from_iterable::<_, String>(0..6).flat_map_concurrently(
        move |n| {
            let live = live_in.clone();
            let peak = peak_in.clone();
            from_effect(move || {
                let live = live.clone();
                let peak = peak.clone();
                async move {
                    let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    live.fetch_sub(1, Ordering::SeqCst);
                    Ok(n)
                }
            })
        },
        2,
    );

    let mut values = fx.collect_all().await.unwrap();
    values.sort();
    assert_eq!(values, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(peak.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_flat_map_failure_ends_everything() {
    let fx = from_iterable(vec![1, 2]).flat_map(|n| {
        if n == 2 {
            fail_cause::<i32, _>(Cause::fail("inner")).boxed()
        } else {
            never().boxed()
        }
    });
    assert_eq!(fx.collect_all().await, Err(Cause::fail("inner")));
}

#[tokio::test]
async fn test_switch_map_keeps_only_latest() {
    let fx = from_iterable::<_, String>(vec![1, 2, 3]).switch_map(|n| at(n, Duration::from_millis(1)));
    assert_eq!(fx.collect_all().await, Ok(vec![3]));
}

#[tokio::test]
async fn test_exhaust_map_drops_while_busy() {
    let fx = from_iterable::<_, String>(vec![1, 2, 3]).exhaust_map(|n| at(n, Duration::from_millis(1)));
    assert_eq!(fx.collect_all().await, Ok(vec![1]));
}

#[tokio::test]
async fn test_exhaust_latest_map_runs_latest_next() {
    let fx = from_iterable::<_, String>(vec![1, 2, 3])
        .exhaust_latest_map(|n| at(n, Duration::from_millis(1)));
    assert_eq!(fx.collect_all().await, Ok(vec![1, 3]));
}

#[tokio::test]
async fn test_merge_keeps_branch_order() {
    let fx = from_iterable::<_, String>(vec![1, 2]).merge(from_iterable(vec![3, 4]));
    let values = fx.collect_all().await.unwrap();
    assert_eq!(values.len(), 4);
    let position = |v: i32| values.iter().position(|x| *x == v).unwrap();
    assert!(position(1) < position(2));
    assert!(position(3) < position(4));
}

#[tokio::test]
async fn test_merge_all_typed_failure_ends_merge() {
    let fx = merge_all(vec![
        never::<i32, &str>().boxed(),
        fail::<i32, _>("boom").boxed(),
    ]);
    assert_eq!(fx.collect_all().await, Err(Cause::fail("boom")));
}

#[tokio::test]
async fn test_merge_all_interrupt_waits_for_siblings() {
    let fx = merge_all(vec![
        fail_cause::<i32, String>(Cause::interrupt(FiberId::none())).boxed(),
        from_iterable(vec![1, 2]).boxed(),
    ]);
    let exits = fx.exit().collect_all().await.unwrap();
    assert_eq!(exits.iter().filter(|e| e.is_ok()).count(), 2);
    let last = exits.last().unwrap();
    assert!(last.as_ref().unwrap_err().is_interrupted_only());
}

#[tokio::test(start_paused = true)]
async fn test_combine_emits_latest_pairs() {
    let numbers = at::<_, String>(1, Duration::from_millis(10))
        .continue_with(at(2, Duration::from_millis(20)));
    let letters = at("a", Duration::from_millis(15));

    let fx = numbers.combine(letters);
    assert_eq!(fx.collect_all().await, Ok(vec![(1, "a"), (2, "a")]));
}

#[tokio::test(start_paused = true)]
async fn test_combine_all_and_struct_of() {
    let fx = combine_all(vec![
        at::<_, String>(1, Duration::from_millis(10)),
        at(2, Duration::from_millis(20)),
    ]);
    assert_eq!(fx.collect_all().await, Ok(vec![vec![1, 2]]));

    let fx = struct_of(vec![
        ("a", at::<_, String>(1, Duration::from_millis(10))),
        ("b", at(2, Duration::from_millis(5))),
    ]);
    let maps = fx.collect_all().await.unwrap();
    assert_eq!(maps.len(), 1);
    assert_eq!(maps[0].get("a"), Some(&1));
    assert_eq!(maps[0].get("b"), Some(&2));
}

#[tokio::test(start_paused = true)]
async fn test_combine_waits_for_every_slot() {
    let fx = combine((succeed::<_, String>(1), never::<i32, String>())).take(1);
    let outcome = tokio::time::timeout(Duration::from_secs(1), fx.collect_all()).await;
    assert!(outcome.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_debounce_throttle_delay() {
    let burst = || {
        at::<_, String>(1, Duration::from_millis(0))
            .merge(at(2, Duration::from_millis(10)))
            .merge(at(3, Duration::from_millis(100)))
    };

    let debounced = burst().debounce(Duration::from_millis(50));
    assert_eq!(debounced.collect_all().await, Ok(vec![2, 3]));

    let throttled = burst().throttle(Duration::from_millis(50));
    assert_eq!(throttled.collect_all().await, Ok(vec![1, 3]));

    let latest = burst().throttle_latest(Duration::from_millis(50));
    assert_eq!(latest.collect_all().await, Ok(vec![1, 2, 3]));

    let delayed = from_iterable::<_, String>(vec![1, 2]).delay(Duration::from_millis(5));
    assert_eq!(delayed.collect_all().await, Ok(vec![1, 2]));
}

#[tokio::test(start_paused = true)]
#[tracing_test::traced_test]
async fn test_switch_map_traces_the_interrupted_exit() {
    let fx = from_iterable::<_, String>(vec![1, 2]).switch_map(|n| at(n, Duration::from_millis(10)));
    assert_eq!(fx.collect_all().await, Ok(vec![2]));
    assert!(logs_contain("interrupted previous inner stream"));
}

fn panics_on_two(n: i32) -> i32 {
    if n == 2 {
        panic!("inner kaboom");
    }
    n
}

fn assert_inner_defect(exit: Exit<Vec<i32>, String>) {
    let cause = exit.unwrap_err();
    assert!(cause.is_die(), "expected a defect, got {cause:?}");
    assert_eq!(cause.defects()[0].message(), "inner kaboom");
}

#[tokio::test]
async fn test_panic_in_flat_map_inner_becomes_defect() {
    let fx = from_iterable::<_, String>(vec![1, 2]).flat_map(|n| succeed(n).map(panics_on_two));
    assert_inner_defect(fx.collect_all().await);
}

#[tokio::test]
async fn test_panic_in_switch_map_inner_becomes_defect() {
    let fx = from_iterable::<_, String>(vec![1, 2]).switch_map(|n| succeed(n).map(panics_on_two));
    assert_inner_defect(fx.collect_all().await);
}

#[tokio::test]
async fn test_panic_in_exhaust_map_inner_becomes_defect() {
    let fx = from_iterable::<_, String>(vec![2]).exhaust_map(|n| succeed(n).map(panics_on_two));
    assert_inner_defect(fx.collect_all().await);
}

#[tokio::test]
async fn test_panic_in_exhaust_latest_map_inner_becomes_defect() {
    let fx = from_iterable::<_, String>(vec![2, 3])
        .exhaust_latest_map(|n| succeed(n).map(panics_on_two));
    assert_inner_defect(fx.collect_all().await);
}

#[tokio::test]
async fn test_panic_in_merge_branch_becomes_defect() {
    let fx = merge_all(vec![
        from_iterable::<_, String>(vec![2]).map(panics_on_two),
        from_iterable(vec![1]).map(panics_on_two),
    ]);
    assert_inner_defect(fx.collect_all().await);

    let fx = from_iterable::<_, String>(vec![1])
        .map(panics_on_two)
        .merge(from_iterable(vec![2]).map(panics_on_two));
    assert_inner_defect(fx.collect_all().await);
}

#[tokio::test]
async fn test_panic_in_combine_source_becomes_defect() {
    let fx = combine((
        succeed::<_, String>(1),
        succeed(2).map(panics_on_two),
    ))
    .map(|(a, b)| a + b);
    assert_inner_defect(fx.collect_all().await);

    let fx = combine_all(vec![
        succeed::<_, String>(1).map(panics_on_two),
        succeed(2).map(panics_on_two),
    ])
    .map(|values| values.into_iter().sum::<i32>());
    assert_inner_defect(fx.collect_all().await);
}

// Runners

#[tokio::test]
async fn test_first_stops_after_one_value() {
    assert_eq!(from_iterable::<_, String>(1..).first().await, Ok(Some(1)));
    assert_eq!(empty::<i32, String>().first().await, Ok(None));
}

#[tokio::test]
async fn test_drain_reports_failure() {
    assert_eq!(from_iterable::<_, String>(vec![1]).drain().await, Ok(()));
    assert_eq!(fail::<i32, _>("x").drain().await, Err(Cause::fail("x")));
}

#[tokio::test]
async fn test_observe_stops_on_observer_error() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let exit = from_iterable(0..)
        .observe(move |n| {
            log.lock().unwrap().push(n);
            async move { if n == 2 { Err("enough") } else { Ok(()) } }
        })
        .await;
    assert_eq!(exit, Err(Cause::fail("enough")));
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_panic_becomes_defect() {
    let fx = from_iterable::<_, String>(vec![1]).map(|_: i32| -> i32 { panic!("kaboom") });
    let cause = fx.collect_all().await.unwrap_err();
    assert!(cause.is_die());
    assert_eq!(cause.defects()[0].message(), "kaboom");
}

#[tokio::test]
async fn test_fork_and_join() {
    let scope = crate::Scope::new();
    let fiber = from_iterable::<_, String>(vec![1, 2]).fork(&scope);
    assert_eq!(fiber.join().await, Ok(()));

    let fiber = fail::<i32, _>("bad").run_fork();
    assert_eq!(fiber.join().await, Err(Cause::fail("bad")));
}

#[tokio::test]
async fn test_closing_scope_interrupts_forked_producer() {
    let scope = crate::Scope::new();
    let fiber = never::<i32, String>().fork(&scope);
    scope.close().await;
    assert!(fiber.is_done());
    assert!(fiber.join().await.unwrap_err().is_interrupted());
}

#[tokio::test]
async fn test_boxed_producers_in_a_collection() {
    let producers: Vec<BoxedFx<i32, String>> = vec![
        succeed(1).boxed(),
        from_iterable(vec![2, 3]).map(|n| n * 10).boxed(),
    ];
    let mut values = Vec::new();
    for fx in &producers {
        values.extend(fx.collect_all().await.unwrap());
    }
    assert_eq!(values, vec![1, 20, 30]);
}
