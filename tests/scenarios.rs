//! End-to-end scenarios for overlap policies, multicasting and cells.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use undertow::prelude::*;
use undertow::testing::{Event, TestSink};
use undertow::{assert_exit_failure, assert_exit_success};

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// Concurrency combinators
// ============================================================================

#[tokio::test]
async fn take_three_of_five() {
    let fx = from_iterable::<_, String>(vec![1, 2, 3, 4, 5]).take(3);
    assert_eq!(fx.collect_all().await, Ok(vec![1, 2, 3]));
}

#[tokio::test]
async fn merge_all_interleaves_two_sources() {
    let fx = merge_all(vec![
        from_iterable::<_, String>(vec![1, 2]),
        from_iterable(vec![3, 4]),
    ]);
    let out = fx.collect_all().await.unwrap();

    assert_eq!(out.len(), 4);
    let mut sorted = out.clone();
    sorted.sort();
    assert_eq!(sorted, vec![1, 2, 3, 4]);

    let position = |n: i32| out.iter().position(|v| *v == n).unwrap();
    assert!(position(1) < position(2));
    assert!(position(3) < position(4));
}

#[tokio::test(start_paused = true)]
async fn switch_map_cancels_the_previous_inner() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let inner_log = log.clone();
    let fx = at::<_, String>(1, Duration::from_millis(10))
        .merge(at(2, Duration::from_millis(20)))
        .switch_map(move |n| {
            let cancelled = inner_log.clone();
            let emitted = inner_log.clone();
            at(n, Duration::from_millis(100))
                .on_interrupt(move || cancelled.lock().unwrap().push(format!("cancelled {n}")))
                .tap(move |v| emitted.lock().unwrap().push(format!("emitted {v}")))
        });

    assert_eq!(fx.collect_all().await, Ok(vec![2]));
    assert_eq!(
        *log.lock().unwrap(),
        vec!["cancelled 1".to_string(), "emitted 2".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn exhaust_map_drops_inputs_while_busy() {
    let runs = Arc::new(AtomicUsize::new(0));

    let counter = runs.clone();
    let fx = periodic::<String>(Duration::from_millis(10))
        .take(10)
        .exhaust_map(move |()| {
            let counter = counter.clone();
            suspend(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                sleep::<(), String>(Duration::from_millis(35))
            })
        });

    assert_exit_success!(fx.drain().await);
    let runs = runs.load(Ordering::SeqCst);
    assert!(runs >= 1);
    assert!(runs < 10, "expected dropped inputs, got {runs} runs");
}

#[tokio::test]
async fn exhaust_latest_map_processes_the_last_input() {
    let fx = from_iterable::<_, String>(vec![1, 2, 3])
        .exhaust_latest_map(|n| at(n, Duration::from_millis(5)));
    let out = fx.collect_all().await.unwrap();

    assert_eq!(out.first(), Some(&1));
    assert_eq!(out.last(), Some(&3));
    assert!(!out.contains(&2));
}

#[tokio::test(start_paused = true)]
async fn failure_in_one_branch_interrupts_the_rest() {
    let cancelled = Arc::new(AtomicUsize::new(0));

    let flag = cancelled.clone();
    let slow = never::<i32, &str>().on_interrupt(move || {
        flag.fetch_add(1, Ordering::SeqCst);
    });
    let failing = sleep::<i32, &str>(Duration::from_millis(5)).continue_with(fail("boom"));

    let fx = slow.boxed().merge(failing.boxed());
    assert_eq!(fx.collect_all().await, Err(Cause::fail("boom")));
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Subject and RefSubject
// ============================================================================

#[tokio::test]
async fn subject_replays_only_its_capacity() {
    let subject = Subject::<i32, String>::replay(2);
    for n in [1, 2, 3] {
        subject.on_success(n).await;
    }

    let sink = TestSink::new();
    let subscription = tokio::spawn({
        let subject = subject.clone();
        let sink = sink.clone();
        async move { subject.run(sink).await }
    });
    settle().await;

    subject.complete();
    subscription.await.unwrap();
    assert_eq!(sink.events(), vec![Event::Value(2), Event::Value(3)]);
}

#[tokio::test]
async fn subject_failure_is_delivered_once() {
    let subject = Subject::<i32, String>::unbounded();
    let sink = TestSink::new();
    let subscription = tokio::spawn({
        let subject = subject.clone();
        let sink = sink.clone();
        async move { subject.run(sink).await }
    });
    settle().await;

    subject.on_success(1).await;
    subject.on_failure(Cause::fail("closed".to_string())).await;
    subject.on_success(2).await;
    subscription.await.unwrap();

    assert_eq!(
        sink.events(),
        vec![Event::Value(1), Event::Failure(Cause::fail("closed".to_string()))]
    );
}

#[tokio::test]
async fn ref_subject_notifies_once_for_equal_writes() {
    let cell = RefSubject::<String>::of("a".to_string());
    let sink = TestSink::new();
    let subscription = tokio::spawn({
        let cell = cell.clone();
        let sink = sink.clone();
        async move { cell.run(sink).await }
    });
    settle().await;

    cell.set("b".to_string()).await;
    cell.set("b".to_string()).await;
    cell.complete();
    subscription.await.unwrap();

    assert_eq!(sink.values(), vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn ref_subject_drives_a_pipeline() {
    let total = RefNumber::<i64, String>::of(0);
    let labels = total
        .clone()
        .filter(|n| n % 2 == 0)
        .map(|n| format!("even {n}"));

    let seen = tokio::spawn(async move { labels.take(3).collect_all().await });
    settle().await;

    for _ in 0..4 {
        total.increment().await.unwrap();
    }

    assert_eq!(
        seen.await.unwrap(),
        Ok(vec![
            "even 0".to_string(),
            "even 2".to_string(),
            "even 4".to_string()
        ])
    );
}

#[tokio::test]
async fn ref_subject_combines_with_other_cells() {
    let first = RefSubject::<&str>::of("Ada");
    let last = RefSubject::<&str>::of("Lovelace");

    let names = combine((first.clone(), last.clone())).map(|(f, l)| format!("{f} {l}"));
    let seen = tokio::spawn(async move { names.take(2).collect_all().await });
    settle().await;

    first.set("Augusta").await;
    assert_eq!(
        seen.await.unwrap(),
        Ok(vec![
            "Ada Lovelace".to_string(),
            "Augusta Lovelace".to_string()
        ])
    );
}

#[tokio::test]
async fn deferred_ref_publishes_failures() {
    let cell = DeferredRef::<i32, &str>::new(Equivalence::exit(Equivalence::strict()));
    assert!(cell.done(Err(Cause::fail("x"))));
    assert_exit_failure!(cell.get().await);
    assert!(cell.done(Ok(1)));
    assert_eq!(cell.get().await, Ok(1));
}

#[tokio::test(start_paused = true)]
async fn ref_subject_complete_ends_a_subscriber_mid_replay() {
    let cell = RefSubject::<i32, String>::of(1);
    let seen = tokio::spawn({
        let cell = cell.clone();
        async move {
            cell.observe(|_| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(())
            })
            .await
        }
    });
    settle().await;

    cell.complete();
    let exit = tokio::time::timeout(Duration::from_secs(5), seen).await;
    assert_eq!(exit.unwrap().unwrap(), Ok(()));
}

#[tokio::test]
async fn panic_inside_inner_work_reaches_the_caller() {
    let cell = RefNumber::<i32, String>::of(1);
    let fx = cell
        .clone()
        .take(1)
        .flat_map(|n| succeed(n).map(|n| -> i32 { panic!("bad value {n}") }));

    let cause = fx.collect_all().await.unwrap_err();
    assert!(cause.is_die());
    assert_eq!(cause.defects()[0].message(), "bad value 1");
}
