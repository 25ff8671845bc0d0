//! Scheduler passes over the result store: retries, expiry, settling, single-flight.

mod helpers;

use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use helpers::{fake_engine, test_config};
use pan_check::storage::ExecutionStatus;
use pan_check::{
    Config, PassOutcome, Platform, SchedulerStatus, ShareLink, TrackedLink, TrackedStatus,
};

fn aliyun_link(id: &str) -> ShareLink {
    let url = format!("https://www.alipan.com/s/{id}");
    ShareLink {
        platform: Platform::Aliyun,
        share_id: id.to_string(),
        password: None,
        url: url.clone(),
        original: url,
    }
}

fn completed(outcome: PassOutcome) -> pan_check::storage::PassSummary {
    match outcome {
        PassOutcome::Completed(summary) => summary,
        other => panic!("pass did not complete: {other:?}"),
    }
}

#[tokio::test]
async fn test_deleted_share_is_never_retried() {
    let (engine, calls) = fake_engine(test_config()).await;
    let scheduler = engine.scheduler();

    let report = engine
        .check_batch("https://pan.baidu.com/s/1deadBaidu", None)
        .await;
    assert_eq!(report.invalid_links[0].reason.as_deref(), Some("分享已删除"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    for _ in 0..3 {
        let summary = completed(scheduler.run_once().await.unwrap());
        assert_eq!(summary.links_count, 0);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let tracked = engine.list_scheduled_task_state().await.unwrap();
    assert_eq!(tracked[0].status, TrackedStatus::Invalid);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_five_pending_passes_expire_link() {
    let config = Config {
        max_attempts: 5,
        ..test_config()
    };
    let (engine, calls) = fake_engine(config).await;
    let scheduler = engine.scheduler();
    engine
        .store()
        .upsert(&TrackedLink::new(aliyun_link("busyShare"), Utc::now()))
        .await
        .unwrap();

    for pass in 1..=4 {
        let summary = completed(scheduler.run_once().await.unwrap());
        assert_eq!(summary.links_count, 1, "pass {pass}");
        assert_eq!(summary.pending_count, 1, "pass {pass}");
    }

    let fifth = completed(scheduler.run_once().await.unwrap());
    assert_eq!(fifth.expired_count, 1);
    assert_eq!(fifth.pending_count, 0);

    let tracked = engine.list_scheduled_task_state().await.unwrap();
    assert_eq!(tracked[0].status, TrackedStatus::Expired);
    assert_eq!(tracked[0].attempts, 5);
    assert!(tracked[0].next_check.is_none());

    let sixth = completed(scheduler.run_once().await.unwrap());
    assert_eq!(sixth.links_count, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_pending_backoff_defers_recheck() {
    let config = Config {
        recheck_base_delay_secs: 3600,
        ..test_config()
    };
    let (engine, calls) = fake_engine(config).await;
    let scheduler = engine.scheduler();

    engine
        .check_batch("https://www.alipan.com/s/busyShare", None)
        .await;
    let summary = completed(scheduler.run_once().await.unwrap());

    assert_eq!(summary.links_count, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let tracked = engine.list_scheduled_task_state().await.unwrap();
    assert!(tracked[0].next_check.unwrap() > Utc::now() + chrono::Duration::minutes(59));
    engine.shutdown().await;
}

#[tokio::test]
async fn test_unsettled_links_are_confirmed_once_more() {
    let config = Config {
        required_confirmations: 2,
        ..test_config()
    };
    let (engine, calls) = fake_engine(config).await;
    let scheduler = engine.scheduler();

    engine
        .check_batch(
            "https://cloud.189.cn/t/QzUzIv\nhttps://pan.baidu.com/s/1deadBaidu",
            None,
        )
        .await;
    let first = completed(scheduler.run_once().await.unwrap());
    assert_eq!(first.links_count, 2);
    assert_eq!(first.valid_count, 1);
    assert_eq!(first.invalid_count, 1);

    let second = completed(scheduler.run_once().await.unwrap());
    assert_eq!(second.links_count, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_valid_links_rechecked_after_window() {
    let config = Config {
        recheck_valid_after_secs: Some(1),
        ..test_config()
    };
    let (engine, calls) = fake_engine(config).await;
    let scheduler = engine.scheduler();

    engine.check_batch("https://cloud.189.cn/t/QzUzIv", None).await;
    let early = completed(scheduler.run_once().await.unwrap());
    assert_eq!(early.links_count, 0);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let later = completed(scheduler.run_once().await.unwrap());
    assert_eq!(later.links_count, 1);
    assert_eq!(later.valid_count, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_overlapping_pass_is_skipped() {
    let (engine, _calls) = fake_engine(test_config()).await;
    let scheduler = engine.scheduler();
    engine
        .store()
        .upsert(&TrackedLink::new(aliyun_link("slowShare"), Utc::now()))
        .await
        .unwrap();

    let (first, second) = tokio::join!(scheduler.run_once(), scheduler.run_once());
    let outcomes = [first.unwrap(), second.unwrap()];

    assert_eq!(
        outcomes.iter().filter(|o| **o == PassOutcome::Skipped).count(),
        1
    );
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, PassOutcome::Completed(_)))
            .count(),
        1
    );
    assert!(!scheduler.state().running);

    // The guard is released once the pass is over
    assert!(matches!(
        scheduler.run_once().await.unwrap(),
        PassOutcome::Completed(_)
    ));
    engine.shutdown().await;
}

#[tokio::test]
async fn test_executions_are_recorded() {
    let (engine, _calls) = fake_engine(test_config()).await;
    let scheduler = engine.scheduler();
    engine
        .store()
        .upsert(&TrackedLink::new(aliyun_link("busyShare"), Utc::now()))
        .await
        .unwrap();

    completed(scheduler.run_once().await.unwrap());
    completed(scheduler.run_once().await.unwrap());

    let executions = engine.recent_executions(10).await.unwrap();
    assert_eq!(executions.len(), 2);
    assert!(executions[0].id > executions[1].id);
    for execution in &executions {
        assert_eq!(execution.status, ExecutionStatus::Success);
        assert_eq!(execution.summary.links_count, 1);
        assert_eq!(execution.summary.pending_count, 1);
        assert!(execution.finished_at.is_some());
        assert!(execution.error_message.is_none());
    }

    assert_eq!(engine.recent_executions(1).await.unwrap().len(), 1);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_spawned_scheduler_state() {
    let (engine, calls) = fake_engine(test_config()).await;
    let scheduler = engine.scheduler();

    let state = scheduler.state();
    assert_eq!(state.status, SchedulerStatus::Stopped);
    assert!(state.last_run.is_none());
    assert!(state.next_run.is_none());
    assert_eq!(state.interval_secs, 1);

    engine
        .store()
        .upsert(&TrackedLink::new(aliyun_link("busyShare"), Utc::now()))
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let handle = engine.spawn_scheduler(cancel.clone());
    tokio::time::sleep(Duration::from_millis(300)).await;

    let state = scheduler.state();
    assert_eq!(state.status, SchedulerStatus::Active);
    assert!(state.last_run.is_some());
    assert!(state.next_run.is_some());
    assert!(calls.load(Ordering::SeqCst) >= 1);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();
    assert_eq!(scheduler.state().status, SchedulerStatus::Stopped);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_interrupts_running_pass() {
    let config = Config {
        check_timeout_secs: 120,
        batch_timeout_secs: 120,
        ..test_config()
    };
    let (engine, calls) = fake_engine(config).await;
    let scheduler = engine.scheduler();
    engine
        .store()
        .upsert(&TrackedLink::new(aliyun_link("stuckShare"), Utc::now()))
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let handle = engine.spawn_scheduler(cancel.clone());
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(scheduler.state().running);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("scheduler waited for the pass to finish")
        .unwrap();
    assert!(!scheduler.state().running);

    let executions = engine.recent_executions(1).await.unwrap();
    assert_eq!(executions[0].status, ExecutionStatus::Failed);
    assert_eq!(
        executions[0].error_message.as_deref(),
        Some("interrupted by shutdown")
    );

    // The link was not written back, so it is still waiting for its first result
    let tracked = engine.list_scheduled_task_state().await.unwrap();
    assert_eq!(tracked[0].attempts, 0);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_tracked_links_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        db_path: dir.path().join("links.db"),
        ..test_config()
    };

    let (engine, _calls) = fake_engine(config.clone()).await;
    engine
        .check_batch(
            "https://pan.xunlei.com/s/VNabc\nhttps://www.alipan.com/s/busyShare",
            None,
        )
        .await;
    engine.shutdown().await;

    let (engine, _calls) = fake_engine(config).await;
    let tracked = engine.list_scheduled_task_state().await.unwrap();
    assert_eq!(tracked.len(), 2);
    let aliyun = tracked
        .iter()
        .find(|t| t.platform == Platform::Aliyun)
        .unwrap();
    assert_eq!(aliyun.status, TrackedStatus::Pending);
    assert!(tracked
        .iter()
        .any(|t| t.platform == Platform::Xunlei && t.status == TrackedStatus::Valid));
    engine.shutdown().await;
}
