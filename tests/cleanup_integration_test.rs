mod common;

use common::MockResource;
use gauntlet_core::cleanup::CleanupCoordinator;
use gauntlet_core::config::CleanupConfig;
use gauntlet_core::constants::ResourceKind;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn sequential(continue_on_error: bool) -> CleanupCoordinator {
    CleanupCoordinator::new(CleanupConfig {
        max_concurrent: 1,
        continue_on_error,
        ..CleanupConfig::default()
    })
}

#[tokio::test]
async fn test_priorities_run_highest_first() {
    let coordinator = sequential(true);
    let order = Arc::new(Mutex::new(Vec::new()));

    for priority in [1, 10, 5, 8, 3] {
        let order = order.clone();
        coordinator.register(format!("p{priority}"), priority, move |_| async move {
            order.lock().push(priority);
            Ok(())
        });
    }

    let metrics = coordinator.execute().await;
    assert_eq!(*order.lock(), vec![10, 8, 5, 3, 1]);
    assert_eq!(metrics.successful_tasks, 5);
    assert_eq!(metrics.failed_tasks, 0);
    let recorded: Vec<_> = metrics.task_records.iter().map(|r| r.priority).collect();
    assert_eq!(recorded, vec![10, 8, 5, 3, 1]);
}

#[tokio::test]
async fn test_stop_on_error_runs_exactly_two_of_three() {
    let coordinator = sequential(false);
    let ran = Arc::new(AtomicUsize::new(0));
    let side_effect = Arc::new(AtomicBool::new(false));

    let counter = ran.clone();
    coordinator.register("ok-first", 0, move |_| async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let counter = ran.clone();
    coordinator.register("fails", 0, move |_| async move {
        counter.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("could not delete bucket")
    });
    let counter = ran.clone();
    let flag = side_effect.clone();
    coordinator.register("ok-last", 0, move |_| async move {
        counter.fetch_add(1, Ordering::SeqCst);
        flag.store(true, Ordering::SeqCst);
        Ok(())
    });

    let metrics = coordinator.execute().await;
    assert_eq!(ran.load(Ordering::SeqCst), 2);
    assert_eq!(metrics.successful_tasks, 1);
    assert_eq!(metrics.failed_tasks, 1);
    assert_eq!(metrics.skipped_tasks, 1);
    assert!(!side_effect.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_timed_out_task_counts_as_failure_and_run_continues() {
    let coordinator = sequential(true);
    let after = Arc::new(AtomicBool::new(false));

    coordinator.register_with_timeout("hangs", 5, Duration::from_millis(20), |_| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    });
    let flag = after.clone();
    coordinator.register("after", 1, move |_| async move {
        flag.store(true, Ordering::SeqCst);
        Ok(())
    });

    let metrics = coordinator.execute().await;
    assert_eq!(metrics.failed_tasks, 1);
    assert!(metrics.errors[0].contains("timed out"));
    assert!(after.load(Ordering::SeqCst));
    assert!(metrics.success_rate() > 0.49 && metrics.success_rate() < 0.51);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_bounded_concurrency_runs_everything() {
    let coordinator = CleanupCoordinator::new(CleanupConfig {
        max_concurrent: 3,
        ..CleanupConfig::default()
    });
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicUsize::new(0));

    for i in 0..12 {
        let running = running.clone();
        let peak = peak.clone();
        let done = done.clone();
        coordinator.register(format!("t{i}"), i % 4, move |_| async move {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            running.fetch_sub(1, Ordering::SeqCst);
            done.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }

    let metrics = coordinator.execute().await;
    assert_eq!(done.load(Ordering::SeqCst), 12);
    assert_eq!(metrics.successful_tasks, 12);
    assert!(peak.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn test_registered_resources_are_cleaned_in_priority_order() {
    let coordinator = sequential(true);
    let browser = MockResource::new("browser", ResourceKind::Browser);
    let database = MockResource::failing("database", ResourceKind::Database);

    coordinator.register_resource(database.clone(), 1);
    coordinator.register_resource(browser.clone(), 100);

    let metrics = coordinator.execute().await;
    assert_eq!(browser.cleanup_count(), 1);
    assert_eq!(database.cleanup_count(), 1);
    assert_eq!(metrics.task_records[0].name, "resource:browser");
    assert_eq!(metrics.failed_tasks, 1);
    assert!(metrics.errors[0].contains("database refused to close"));
}

#[tokio::test]
async fn test_shutdown_twice_never_reruns_callbacks() {
    let coordinator = sequential(true);
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    coordinator.register("once", 1, move |_| async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    coordinator.shutdown().await;
    let counter = calls.clone();
    coordinator.register("late", 1, move |_| async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    coordinator.shutdown().await;
    coordinator.execute().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
