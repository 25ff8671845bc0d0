//! Persistent record of checked links and scheduler passes.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use log::warn;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::migrations::run_migrations;
use super::models::{
    ExecutionStatus, PassSummary, TaskExecution, TrackedLink, TrackedStatus,
};
use super::pool::{init_db_pool_with_path, init_memory_pool};
use crate::error_handling::DatabaseError;
use crate::link::{CanonicalKey, Platform, ShareLink};

const MEMORY_PATH: &str = ":memory:";

const SELECT_TRACKED: &str = "SELECT link_key, platform, share_id, password, url, original, \
     status, reason, last_duration_ms, attempts, confirmations, first_seen_ms, \
     last_checked_ms, next_check_ms FROM tracked_links";

const SELECT_EXECUTIONS: &str = "SELECT id, status, links_count, checked_count, valid_count, \
     invalid_count, pending_count, expired_count, error_message, started_at_ms, \
     finished_at_ms, duration_ms FROM task_executions";

/// SQLite-backed store. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct ResultStore {
    pool: SqlitePool,
}

impl ResultStore {
    /// Opens (creating if needed) the database at `path` and applies migrations.
    ///
    /// `":memory:"` opens a private in-memory database.
    pub async fn open(path: &Path) -> Result<Self, DatabaseError> {
        let pool = if path.as_os_str() == MEMORY_PATH {
            init_memory_pool().await?
        } else {
            init_db_pool_with_path(path).await?
        };
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn in_memory() -> Result<Self, DatabaseError> {
        Self::open(Path::new(MEMORY_PATH)).await
    }

    /// Checkpoints the WAL and closes the pool.
    pub async fn close(&self) {
        if let Err(e) = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
        {
            warn!(
                "Failed to checkpoint WAL file (this is non-critical): {}",
                e
            );
        }
        self.pool.close().await;
    }

    pub async fn get(&self, key: &CanonicalKey) -> Result<Option<TrackedLink>, DatabaseError> {
        let row = sqlx::query(&format!("{SELECT_TRACKED} WHERE link_key = ?"))
            .bind(key.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(tracked_from_row).transpose()
    }

    /// Inserts or replaces the row for the link's key. Last writer wins.
    pub async fn upsert(&self, tracked: &TrackedLink) -> Result<(), DatabaseError> {
        let link = &tracked.link;
        sqlx::query(
            "INSERT INTO tracked_links (link_key, platform, share_id, password, url, original, \
                status, reason, last_duration_ms, attempts, confirmations, first_seen_ms, \
                last_checked_ms, next_check_ms) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(link_key) DO UPDATE SET \
                url = excluded.url, \
                original = excluded.original, \
                status = excluded.status, \
                reason = excluded.reason, \
                last_duration_ms = excluded.last_duration_ms, \
                attempts = excluded.attempts, \
                confirmations = excluded.confirmations, \
                last_checked_ms = excluded.last_checked_ms, \
                next_check_ms = excluded.next_check_ms",
        )
        .bind(tracked.key())
        .bind(link.platform.as_str())
        .bind(&link.share_id)
        .bind(&link.password)
        .bind(&link.url)
        .bind(&link.original)
        .bind(tracked.status.as_str())
        .bind(&tracked.reason)
        .bind(tracked.last_duration.map(duration_to_millis))
        .bind(i64::from(tracked.attempts))
        .bind(i64::from(tracked.confirmations))
        .bind(tracked.first_seen.timestamp_millis())
        .bind(tracked.last_checked.map(|t| t.timestamp_millis()))
        .bind(tracked.next_check.map(|t| t.timestamp_millis()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_by_status(
        &self,
        status: TrackedStatus,
    ) -> Result<Vec<TrackedLink>, DatabaseError> {
        let rows = sqlx::query(&format!(
            "{SELECT_TRACKED} WHERE status = ? ORDER BY first_seen_ms, link_key"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(collect_tracked(&rows))
    }

    pub async fn list_all(&self) -> Result<Vec<TrackedLink>, DatabaseError> {
        let rows = sqlx::query(&format!("{SELECT_TRACKED} ORDER BY first_seen_ms, link_key"))
            .fetch_all(&self.pool)
            .await?;
        Ok(collect_tracked(&rows))
    }

    /// Opens a `running` execution row and returns its id.
    pub async fn record_execution_start(
        &self,
        started_at: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        let result =
            sqlx::query("INSERT INTO task_executions (status, started_at_ms) VALUES (?, ?)")
                .bind(ExecutionStatus::Running.to_string())
                .bind(started_at.timestamp_millis())
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    /// Closes an execution row with its final counts.
    pub async fn record_execution_finish(
        &self,
        id: i64,
        status: ExecutionStatus,
        summary: &PassSummary,
        error_message: Option<&str>,
        finished_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE task_executions SET status = ?, links_count = ?, checked_count = ?, \
                valid_count = ?, invalid_count = ?, pending_count = ?, expired_count = ?, \
                error_message = ?, finished_at_ms = ?, duration_ms = ? - started_at_ms \
             WHERE id = ?",
        )
        .bind(status.to_string())
        .bind(count_to_i64(summary.links_count))
        .bind(count_to_i64(summary.checked_count))
        .bind(count_to_i64(summary.valid_count))
        .bind(count_to_i64(summary.invalid_count))
        .bind(count_to_i64(summary.pending_count))
        .bind(count_to_i64(summary.expired_count))
        .bind(error_message)
        .bind(finished_at.timestamp_millis())
        .bind(finished_at.timestamp_millis())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent executions first.
    pub async fn recent_executions(&self, limit: u32) -> Result<Vec<TaskExecution>, DatabaseError> {
        let rows = sqlx::query(&format!(
            "{SELECT_EXECUTIONS} ORDER BY started_at_ms DESC, id DESC LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(execution_from_row).collect()
    }
}

/// Maps rows, logging and skipping any that no longer decode.
fn collect_tracked(rows: &[SqliteRow]) -> Vec<TrackedLink> {
    rows.iter()
        .filter_map(|row| match tracked_from_row(row) {
            Ok(tracked) => Some(tracked),
            Err(e) => {
                warn!("Skipping tracked link: {e}");
                None
            }
        })
        .collect()
}

fn tracked_from_row(row: &SqliteRow) -> Result<TrackedLink, DatabaseError> {
    let key: String = row.try_get("link_key")?;
    let corrupt = |reason: String| DatabaseError::CorruptRow {
        key: key.clone(),
        reason,
    };

    let platform_id: String = row.try_get("platform")?;
    let platform = Platform::from_str(&platform_id)
        .map_err(|_| corrupt(format!("unknown platform '{platform_id}'")))?;
    let status_id: String = row.try_get("status")?;
    let status = TrackedStatus::from_str(&status_id)
        .map_err(|_| corrupt(format!("unknown status '{status_id}'")))?;

    let first_seen_ms: i64 = row.try_get("first_seen_ms")?;
    let first_seen =
        millis_to_datetime(first_seen_ms).ok_or_else(|| corrupt("bad first_seen_ms".into()))?;
    let last_checked_ms: Option<i64> = row.try_get("last_checked_ms")?;
    let next_check_ms: Option<i64> = row.try_get("next_check_ms")?;
    let last_duration_ms: Option<i64> = row.try_get("last_duration_ms")?;
    let attempts: i64 = row.try_get("attempts")?;
    let confirmations: i64 = row.try_get("confirmations")?;

    Ok(TrackedLink {
        link: ShareLink {
            platform,
            share_id: row.try_get("share_id")?,
            password: row.try_get("password")?,
            url: row.try_get("url")?,
            original: row.try_get("original")?,
        },
        status,
        reason: row.try_get("reason")?,
        last_duration: last_duration_ms.map(|ms| Duration::from_millis(ms.max(0) as u64)),
        attempts: u32::try_from(attempts).map_err(|_| corrupt("bad attempts".into()))?,
        confirmations: u32::try_from(confirmations)
            .map_err(|_| corrupt("bad confirmations".into()))?,
        first_seen,
        last_checked: last_checked_ms.and_then(millis_to_datetime),
        next_check: next_check_ms.and_then(millis_to_datetime),
    })
}

fn execution_from_row(row: &SqliteRow) -> Result<TaskExecution, DatabaseError> {
    let id: i64 = row.try_get("id")?;
    let corrupt = |reason: String| DatabaseError::CorruptRow {
        key: format!("task_execution:{id}"),
        reason,
    };
    let status_id: String = row.try_get("status")?;
    let status = ExecutionStatus::from_str(&status_id)
        .map_err(|_| corrupt(format!("unknown status '{status_id}'")))?;
    let started_at_ms: i64 = row.try_get("started_at_ms")?;
    let finished_at_ms: Option<i64> = row.try_get("finished_at_ms")?;
    let duration_ms: Option<i64> = row.try_get("duration_ms")?;

    let count = |column: &str| -> Result<usize, DatabaseError> {
        let value: i64 = row.try_get(column)?;
        Ok(usize::try_from(value).unwrap_or_default())
    };

    Ok(TaskExecution {
        id,
        status,
        summary: PassSummary {
            links_count: count("links_count")?,
            checked_count: count("checked_count")?,
            valid_count: count("valid_count")?,
            invalid_count: count("invalid_count")?,
            pending_count: count("pending_count")?,
            expired_count: count("expired_count")?,
        },
        error_message: row.try_get("error_message")?,
        started_at: millis_to_datetime(started_at_ms)
            .ok_or_else(|| corrupt("bad started_at_ms".into()))?,
        finished_at: finished_at_ms.and_then(millis_to_datetime),
        duration_ms: duration_ms.map(|ms| ms.max(0) as u64),
    })
}

fn millis_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn duration_to_millis(duration: Duration) -> i64 {
    duration.as_millis() as i64
}

fn count_to_i64(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn link(id: &str, password: Option<&str>) -> ShareLink {
        ShareLink {
            platform: Platform::Quark,
            share_id: id.to_string(),
            password: password.map(str::to_string),
            url: format!("https://pan.quark.cn/s/{id}"),
            original: format!("https://pan.quark.cn/s/{id}"),
        }
    }

    fn at(ms: i64) -> DateTime<Utc> {
        millis_to_datetime(ms).unwrap()
    }

    #[tokio::test]
    async fn test_corrupt_row_is_skipped_in_listings() {
        let store = ResultStore::in_memory().await.unwrap();
        store
            .upsert(&TrackedLink::new(link("good", None), at(1_700_000_000_000)))
            .await
            .unwrap();
        let broken = TrackedLink::new(link("broken", None), at(1_700_000_001_000));
        store.upsert(&broken).await.unwrap();
        sqlx::query("UPDATE tracked_links SET platform = 'nowhere' WHERE link_key = ?")
            .bind(broken.key())
            .execute(&store.pool)
            .await
            .unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].link.share_id, "good");

        let pending = store.list_by_status(TrackedStatus::Pending).await.unwrap();
        assert_eq!(pending.len(), 1);

        // A direct lookup still reports the damage
        assert!(matches!(
            store.get(&broken.link.canonical_key()).await,
            Err(DatabaseError::CorruptRow { .. })
        ));
    }

    #[tokio::test]
    async fn test_upsert_and_get_round_trip() {
        let store = ResultStore::in_memory().await.unwrap();
        let mut tracked = TrackedLink::new(link("abc", Some("1234")), at(1_700_000_000_000));
        tracked.reason = Some("请求超时".into());
        tracked.attempts = 2;
        tracked.last_duration = Some(Duration::from_millis(830));
        tracked.last_checked = Some(at(1_700_000_100_000));
        store.upsert(&tracked).await.unwrap();

        let loaded = store
            .get(&tracked.link.canonical_key())
            .await
            .unwrap()
            .expect("row should exist");
        assert_eq!(loaded, tracked);

        assert!(store
            .get(&link("other", None).canonical_key())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_and_keeps_first_seen() {
        let store = ResultStore::in_memory().await.unwrap();
        let first = TrackedLink::new(link("abc", None), at(1_000));
        store.upsert(&first).await.unwrap();

        let mut second = TrackedLink::new(link("abc", None), at(5_000));
        second.status = TrackedStatus::Invalid;
        second.reason = Some("分享已删除".into());
        second.confirmations = 1;
        store.upsert(&second).await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, TrackedStatus::Invalid);
        assert_eq!(all[0].first_seen, at(1_000));
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let store = ResultStore::in_memory().await.unwrap();
        let now = Utc::now();
        for (i, status) in [
            TrackedStatus::Pending,
            TrackedStatus::Valid,
            TrackedStatus::Pending,
            TrackedStatus::Expired,
        ]
        .into_iter()
        .enumerate()
        {
            let mut tracked =
                TrackedLink::new(link(&format!("id{i}"), None), now + ChronoDuration::seconds(i as i64));
            tracked.status = status;
            store.upsert(&tracked).await.unwrap();
        }

        let pending = store.list_by_status(TrackedStatus::Pending).await.unwrap();
        let ids: Vec<_> = pending.iter().map(|t| t.link.share_id.as_str()).collect();
        assert_eq!(ids, vec!["id0", "id2"]);
        assert_eq!(store.list_by_status(TrackedStatus::Expired).await.unwrap().len(), 1);
        assert!(store.list_by_status(TrackedStatus::Invalid).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_platform_is_reported() {
        let store = ResultStore::in_memory().await.unwrap();
        store.upsert(&TrackedLink::new(link("abc", None), at(0))).await.unwrap();
        sqlx::query("UPDATE tracked_links SET platform = 'dropbox'")
            .execute(&store.pool)
            .await
            .unwrap();

        let err = store.list_all().await.unwrap_err();
        assert!(matches!(err, DatabaseError::CorruptRow { .. }));
    }

    #[tokio::test]
    async fn test_execution_lifecycle() {
        let store = ResultStore::in_memory().await.unwrap();
        let id = store.record_execution_start(at(10_000)).await.unwrap();

        let running = store.recent_executions(5).await.unwrap();
        assert_eq!(running[0].status, ExecutionStatus::Running);
        assert!(running[0].finished_at.is_none());

        let summary = PassSummary {
            links_count: 3,
            checked_count: 3,
            valid_count: 1,
            invalid_count: 1,
            pending_count: 1,
            expired_count: 0,
        };
        store
            .record_execution_finish(id, ExecutionStatus::Success, &summary, None, at(12_500))
            .await
            .unwrap();
        let second = store.record_execution_start(at(20_000)).await.unwrap();

        let recent = store.recent_executions(5).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, second);
        assert_eq!(recent[1].summary, summary);
        assert_eq!(recent[1].duration_ms, Some(2_500));
        assert_eq!(store.recent_executions(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.db");
        let store = ResultStore::open(&path).await.unwrap();
        store.upsert(&TrackedLink::new(link("keep", None), at(1))).await.unwrap();
        store.close().await;

        let reopened = ResultStore::open(&path).await.unwrap();
        assert_eq!(reopened.list_all().await.unwrap().len(), 1);
        reopened.close().await;
    }
}
