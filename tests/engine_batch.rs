//! End-to-end batch checks through the engine with fake checkers.

mod helpers;

use std::sync::atomic::Ordering;

use helpers::{fake_engine, test_config};
use pan_check::{LinkStatus, Platform, TrackedStatus};

const MIXED_INPUT: &str = "\
看看这个 https://pan.quark.cn/s/abcdef 提取码: 1234
https://pan.baidu.com/s/1deadBaidu?pwd=wxyz
https://www.alipan.com/s/busyAli
https://cloud.189.cn/t/QzUzIv
not-a-link
https://www.alipan.com/s/busyAli
https://example.com/s/whatever
https://pan.xunlei.com/s/VNslowXL";

#[tokio::test]
async fn test_quark_duplicate_and_invalid_format() {
    let (engine, calls) = fake_engine(test_config()).await;
    let input = "https://pan.quark.cn/s/abcdef 提取码: 1234\nhttps://pan.quark.cn/s/abcdef?pwd=1234\nnot-a-link";

    let report = engine.check_batch(input, None).await;

    assert_eq!(report.checked_count(), 1);
    assert_eq!(report.duplicate_count, 1);
    assert_eq!(report.invalid_format_count, 1);
    assert_eq!(report.valid_links.len(), 1);
    let link = &report.valid_links[0].link;
    assert_eq!(link.platform, Platform::Quark);
    assert_eq!(link.share_id, "abcdef");
    assert_eq!(link.password.as_deref(), Some("1234"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_every_candidate_is_accounted_for() {
    let (engine, _calls) = fake_engine(test_config()).await;

    let report = engine.check_batch(MIXED_INPUT, None).await;

    // 8 lines: 5 unique links, 1 repeat, 1 bare token, 1 unknown host
    assert_eq!(report.total_submitted(), 8);
    assert_eq!(report.checked_count(), 5);
    assert_eq!(report.duplicate_count, 1);
    assert_eq!(report.invalid_format_count, 2);
    assert_eq!(report.excluded_count, 0);
    assert_eq!(report.valid_links.len(), 3);
    assert_eq!(report.invalid_links.len(), 1);
    assert_eq!(report.pending_links.len(), 1);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_buckets_follow_input_order() {
    let (engine, _calls) = fake_engine(test_config()).await;

    let report = engine.check_batch(MIXED_INPUT, None).await;

    let valid: Vec<Platform> = report.valid_links.iter().map(|r| r.link.platform).collect();
    assert_eq!(
        valid,
        vec![Platform::Quark, Platform::Tianyi, Platform::Xunlei]
    );
    engine.shutdown().await;
}

#[tokio::test]
async fn test_deleted_share_reports_reason() {
    let (engine, _calls) = fake_engine(test_config()).await;

    let report = engine.check_batch(MIXED_INPUT, None).await;

    let invalid = &report.invalid_links[0];
    assert_eq!(invalid.status, LinkStatus::Invalid);
    assert_eq!(invalid.link.platform, Platform::Baidu);
    assert_eq!(invalid.reason.as_deref(), Some("分享已删除"));
    engine.shutdown().await;
}

#[tokio::test]
async fn test_platform_selection_excludes_without_checking() {
    let (engine, calls) = fake_engine(test_config()).await;

    let report = engine
        .check_batch(MIXED_INPUT, Some(&[Platform::Quark, Platform::Aliyun]))
        .await;

    assert_eq!(report.checked_count(), 2);
    assert_eq!(report.excluded_count, 3);
    assert_eq!(report.duplicate_count, 1);
    assert_eq!(report.total_submitted(), 8);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_configured_allowlist_applies_when_request_has_none() {
    let config = pan_check::Config {
        selected_platforms: Some(vec![Platform::Xunlei]),
        ..test_config()
    };
    let (engine, _calls) = fake_engine(config).await;

    let report = engine.check_batch(MIXED_INPUT, None).await;
    assert_eq!(report.checked_count(), 1);
    assert_eq!(report.valid_links[0].link.platform, Platform::Xunlei);

    // A request-level selection wins over the configured one
    let report = engine.check_batch(MIXED_INPUT, Some(&[Platform::Baidu])).await;
    assert_eq!(report.checked_count(), 1);
    assert_eq!(report.invalid_links.len(), 1);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_empty_input_gives_empty_report() {
    let (engine, calls) = fake_engine(test_config()).await;

    let report = engine.check_batch("", None).await;
    assert_eq!(report.total_submitted(), 0);

    let report = engine.check_batch("没有链接的一段话\n\n   ", None).await;
    assert_eq!(report.total_submitted(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_checked_links_are_tracked() {
    let (engine, _calls) = fake_engine(test_config()).await;

    engine.check_batch(MIXED_INPUT, None).await;
    let tracked = engine.list_scheduled_task_state().await.unwrap();

    assert_eq!(tracked.len(), 5);
    let pending: Vec<_> = tracked
        .iter()
        .filter(|t| t.status == TrackedStatus::Pending)
        .collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].platform, Platform::Aliyun);
    assert_eq!(pending[0].attempts, 1);
    assert!(tracked
        .iter()
        .any(|t| t.status == TrackedStatus::Invalid && t.reason.as_deref() == Some("分享已删除")));
    engine.shutdown().await;
}

#[tokio::test]
async fn test_resubmitting_a_link_updates_its_row() {
    let (engine, _calls) = fake_engine(test_config()).await;

    engine
        .check_batch("https://www.alipan.com/s/busyAli", None)
        .await;
    engine
        .check_batch("https://www.alipan.com/s/busyAli", None)
        .await;

    let tracked = engine.list_scheduled_task_state().await.unwrap();
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].attempts, 2);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_json_report_shape() {
    let (engine, _calls) = fake_engine(test_config()).await;

    let report = engine
        .check_batch("https://pan.baidu.com/s/1deadBaidu\nnope", None)
        .await;
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["invalid_format_count"], 1);
    assert_eq!(json["invalid_links"][0]["status"], "invalid");
    assert_eq!(json["invalid_links"][0]["reason"], "分享已删除");
    assert_eq!(json["invalid_links"][0]["link"]["platform"], "baidu");
    assert!(json["total_duration_ms"].is_u64());
    engine.shutdown().await;
}
