use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::fx::prelude::*;
use crate::ref_subject::{RefBool, RefHashMap, RefNumber, RefOption, RefSubject, RefVec};
use crate::scope::Scope;

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

fn collect<A, E>(cell: &RefSubject<A, E>) -> tokio::task::JoinHandle<Exit<Vec<A>, E>>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    let cell = cell.clone();
    tokio::spawn(async move { cell.collect_all().await })
}

#[tokio::test]
async fn get_returns_initial_value() {
    let cell = RefSubject::<i32>::of(1);
    assert_eq!(cell.get().await, Ok(1));
    assert_eq!(cell.version(), 1);
}

#[tokio::test]
async fn equal_writes_notify_once() {
    let cell = RefSubject::<i32>::of(0);
    let seen = collect(&cell);
    settle().await;

    cell.set(5).await;
    cell.set(5).await;
    settle().await;
    cell.complete();

    assert_eq!(seen.await.unwrap(), Ok(vec![0, 5]));
    assert_eq!(cell.version(), 2);
}

#[tokio::test]
async fn custom_equivalence_decides_changes() {
    let cell = RefSubject::<String>::with_equivalence(
        "hello".to_string(),
        Equivalence::by_key(|s: &String| s.to_lowercase()),
    );
    cell.set("HELLO".to_string()).await;
    assert_eq!(cell.version(), 1);
    assert_eq!(cell.get().await, Ok("hello".to_string()));

    cell.set("bye".to_string()).await;
    assert_eq!(cell.version(), 2);
}

#[tokio::test]
async fn late_subscriber_sees_current_value_first() {
    let cell = RefSubject::<i32>::of(0);
    cell.set(1).await;
    cell.set(2).await;

    let seen = collect(&cell);
    settle().await;
    cell.set(3).await;
    settle().await;
    cell.complete();

    assert_eq!(seen.await.unwrap(), Ok(vec![2, 3]));
}

#[tokio::test]
async fn update_and_modify() {
    let cell = RefSubject::<i32, String>::of(10);
    assert_eq!(cell.update(|n| n * 2).await, Ok(20));

    let old = cell.modify(|n| (n, n + 1)).await;
    assert_eq!(old, Ok(20));
    assert_eq!(cell.get().await, Ok(21));
}

#[tokio::test]
async fn effect_failures_leave_the_cell_unchanged() {
    let cell = RefSubject::<i32, String>::of(1);

    let failed = cell
        .update_effect(|_| async { Err::<i32, _>("nope".to_string()) })
        .await;
    assert_eq!(failed, Err(Cause::fail("nope".to_string())));

    let label = cell
        .modify_effect(|n| async move { Ok((format!("was {n}"), n + 1)) })
        .await;
    assert_eq!(label, Ok("was 1".to_string()));
    assert_eq!(cell.get().await, Ok(2));
    assert_eq!(cell.version(), 2);
}

#[tokio::test]
async fn run_updates_holds_off_other_writers() {
    let cell = RefSubject::<i32, String>::of(0);

    let writer = {
        let cell = cell.clone();
        tokio::spawn(async move {
            cell.run_updates(|tx| async move {
                let n = tx.get().map_err(|c| c.squash())?;
                tokio::task::yield_now().await;
                tx.set(n + 1).await;
                tx.update(|n| n * 10).await.map_err(|c| c.squash())
            })
            .await
        })
    };
    tokio::task::yield_now().await;

    let other = {
        let cell = cell.clone();
        tokio::spawn(async move { cell.update(|n| n + 5).await })
    };

    assert_eq!(writer.await.unwrap(), Ok(10));
    assert_eq!(other.await.unwrap(), Ok(15));
}

#[tokio::test]
async fn lazy_cell_runs_once_until_reset() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let cell = RefSubject::<usize, String>::from_effect(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move { Ok(n) }
    });

    assert_eq!(runs.load(Ordering::SeqCst), 0);
    let (a, b) = tokio::join!(cell.get(), cell.get());
    assert_eq!((a, b), (Ok(0), Ok(0)));
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    assert_eq!(cell.reset().await, Some(Ok(0)));
    assert_eq!(cell.get().await, Ok(1));
}

#[tokio::test]
async fn lazy_cell_initializes_on_subscribe() {
    let cell = RefSubject::<i32, String>::from_effect(|| async { Ok(7) });
    assert_eq!(cell.first().await, Ok(Some(7)));
}

#[tokio::test]
async fn failed_initializer_is_stored() {
    let cell = RefSubject::<i32, String>::from_effect(|| async { Err("down".to_string()) });
    assert_eq!(cell.get().await, Err(Cause::fail("down".to_string())));
    assert_eq!(cell.collect_all().await, Err(Cause::fail("down".to_string())));
}

#[tokio::test]
async fn reset_interrupts_waiting_readers() {
    let cell = RefSubject::<i32>::of(1);
    cell.reset().await;

    let reader = {
        let cell = cell.clone();
        tokio::spawn(async move { cell.get().await })
    };
    settle().await;

    cell.reset().await;
    assert!(reader.await.unwrap().unwrap_err().is_interrupted());
}

#[tokio::test]
async fn reset_then_set_resumes_readers() {
    let cell = RefSubject::<i32>::of(1);
    cell.reset().await;

    let reader = {
        let cell = cell.clone();
        tokio::spawn(async move { cell.get().await })
    };
    settle().await;

    cell.set(1).await;
    assert_eq!(reader.await.unwrap(), Ok(1));
    assert_eq!(cell.version(), 2);
}

#[tokio::test(start_paused = true)]
async fn from_fx_follows_the_producer() {
    let scope = Scope::new();
    let source = from_iterable::<_, String>(vec![1, 1, 2]).flat_map_concurrently(
        |n| at(n, Duration::from_millis(10)),
        1,
    );
    let cell = RefSubject::from_fx(source, &scope);

    assert_eq!(cell.get().await, Ok(1));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(cell.get().await, Ok(2));
    assert_eq!(cell.version(), 2);

    scope.close().await;
}

#[tokio::test(start_paused = true)]
async fn closing_the_scope_interrupts_readers() {
    let scope = Scope::new();
    let cell = RefSubject::from_fx(never::<i32, String>(), &scope);

    let reader = {
        let cell = cell.clone();
        tokio::spawn(async move { cell.get().await })
    };
    settle().await;

    scope.close().await;
    assert!(reader.await.unwrap().unwrap_err().is_interrupted());
}

#[tokio::test]
async fn interrupt_ends_subscriptions() {
    let cell = RefSubject::<i32, String>::of(0);
    let seen = collect(&cell);
    settle().await;

    cell.interrupt().await;
    assert!(seen.await.unwrap().unwrap_err().is_interrupted());
    assert_eq!(cell.subscriber_count(), 0);
}

#[tokio::test]
async fn computed_skips_unchanged_projections() {
    let cell = RefSubject::<i32>::of(1);
    let parity = cell.computed(|n| n % 2 == 0);

    let seen = {
        let parity = parity.clone();
        tokio::spawn(async move { parity.collect_all().await })
    };
    settle().await;

    for n in [3, 5, 6, 8, 9] {
        cell.set(n).await;
    }
    settle().await;
    cell.complete();

    assert_eq!(seen.await.unwrap(), Ok(vec![false, true, false]));
    assert_eq!(parity.get().await, Ok(false));
}

#[tokio::test]
async fn computed_with_uses_its_own_equivalence() {
    let cell = RefSubject::<String>::of("ada".to_string());
    let initial = cell.computed_with(
        |name| name.chars().next().unwrap_or(' '),
        Equivalence::by_key(|c: &char| c.to_ascii_lowercase()),
    );

    let seen = {
        let initial = initial.clone();
        tokio::spawn(async move { initial.collect_all().await })
    };
    settle().await;

    for name in ["Ada", "grace", "Grace"] {
        cell.set(name.to_string()).await;
    }
    settle().await;
    cell.complete();

    assert_eq!(seen.await.unwrap(), Ok(vec!['a', 'g']));
    assert_eq!(initial.get().await, Ok('G'));
}

#[tokio::test]
async fn bool_and_number_helpers() {
    let flag = RefBool::<String>::of(false);
    assert_eq!(flag.toggle().await, Ok(true));
    assert_eq!(flag.toggle().await, Ok(false));

    let count = RefNumber::<u8>::of(254);
    assert_eq!(count.increment().await, Ok(255));
    assert_eq!(count.increment().await, Ok(255));
    assert_eq!(count.add(0).await, Ok(255));
    assert_eq!(count.decrement().await, Ok(254));
    // saturated increment changed nothing
    assert_eq!(count.version(), 3);

    let ratio = RefNumber::<f64>::of(0.5);
    assert_eq!(ratio.add(0.25).await, Ok(0.75));
}

#[tokio::test]
async fn vec_helpers() {
    let items = RefVec::<i32>::of(vec![]);
    items.push(1).await.unwrap();
    items.append([2, 3]).await.unwrap();
    assert_eq!(items.len().await, Ok(3));
    assert_eq!(items.pop().await, Ok(Some(3)));
    assert_eq!(items.get().await, Ok(vec![1, 2]));

    items.clear_all().await.unwrap();
    assert_eq!(items.is_empty().await, Ok(true));
    assert_eq!(items.pop().await, Ok(None));
}

#[tokio::test]
async fn option_helpers() {
    let slot = RefOption::<&str>::of(None);
    assert_eq!(slot.get_or("none").await, Ok("none"));

    slot.set_some("x").await;
    assert_eq!(slot.get_or("none").await, Ok("x"));
    assert_eq!(slot.set_none().await, Ok(Some("x")));
    assert_eq!(slot.get().await, Ok(None));
}

#[tokio::test]
async fn hash_map_helpers() {
    let map = RefHashMap::<&str, i32>::of(HashMap::new());
    assert_eq!(map.insert("a", 1).await, Ok(None));
    assert_eq!(map.insert("a", 2).await, Ok(Some(1)));
    assert_eq!(map.remove_key(&"a").await, Ok(Some(2)));
    assert_eq!(map.remove_key(&"a").await, Ok(None));

    // removing a missing key is not a change
    assert_eq!(map.version(), 4);
}
