use super::traits::ActivityStorage;
use crate::domain::{ActivityEvent, ActivityKind, Metadata};
use crate::error::{ActivityError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

const SCHEMA: &str = r#"
    PRAGMA journal_mode=WAL;
    CREATE TABLE IF NOT EXISTS user_activities (
        id             TEXT PRIMARY KEY,
        user_id        INTEGER NOT NULL,
        product_id     INTEGER NOT NULL,
        activity_type  TEXT NOT NULL,
        metadata       TEXT NOT NULL,
        created_at     TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_user_activities_user
        ON user_activities (user_id, created_at);
    CREATE INDEX IF NOT EXISTS idx_user_activities_product
        ON user_activities (product_id, activity_type);
"#;

const SELECT_COLUMNS: &str =
    "SELECT id, user_id, product_id, activity_type, metadata, created_at FROM user_activities";

/// Column values as read from a row, before domain validation
type RawRow = (String, i64, i64, String, String, String);

/// SQLite-backed activity store. One connection per process, shared behind a mutex.
///
/// rusqlite calls block, so every query runs on tokio's blocking pool.
pub struct SqliteActivityStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteActivityStorage {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| ActivityError::Storage {
                message: "SQLite connection mutex poisoned".to_string(),
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| ActivityError::Storage {
            message: format!("SQLite task failed: {}", e),
        })?
    }
}

// Fixed-width UTC text so lexical order matches chronological order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_event(row: RawRow) -> Result<ActivityEvent> {
    let (id, actor_id, subject_id, activity_type, metadata, created_at) = row;
    let id = Uuid::parse_str(&id).map_err(|e| ActivityError::CorruptRecord {
        message: format!("bad activity id '{}': {}", id, e),
    })?;
    let metadata: Metadata = serde_json::from_str(&metadata)?;
    Ok(ActivityEvent {
        id: Some(id),
        actor_id,
        subject_id,
        activity_type: activity_type.parse()?,
        metadata,
        created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
    })
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

#[async_trait]
impl ActivityStorage for SqliteActivityStorage {
    async fn insert_activity_event(&self, event: &mut ActivityEvent) -> Result<()> {
        let id = Uuid::new_v4();
        let metadata = serde_json::to_string(&event.metadata)?;
        let (actor_id, subject_id) = (event.actor_id, event.subject_id);
        let activity_type = event.activity_type.as_str();
        let created_at = format_timestamp(&event.created_at);

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO user_activities (id, user_id, product_id, activity_type, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id.to_string(), actor_id, subject_id, activity_type, metadata, created_at],
            )?;
            Ok(())
        })
        .await?;
        event.id = Some(id);

        debug!("Created activity: {} by actor {} with id {}", event.activity_type, event.actor_id, id);
        Ok(())
    }

    async fn get_activity_by_id(&self, activity_id: Uuid) -> Result<Option<ActivityEvent>> {
        let raw = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_COLUMNS))?;
                let mut rows = stmt.query(params![activity_id.to_string()])?;
                let row = rows.next()?.map(read_row).transpose()?;
                Ok(row)
            })
            .await?;
        raw.map(row_to_event).transpose()
    }

    async fn get_recent_activities_for_actor(
        &self,
        actor_id: i64,
        limit: Option<usize>,
    ) -> Result<Vec<ActivityEvent>> {
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.map_or(-1, |l| l as i64);
        let raw_rows = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
                    SELECT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![actor_id, limit], read_row)?
                    .collect::<rusqlite::Result<Vec<RawRow>>>()?;
                Ok(rows)
            })
            .await?;
        raw_rows.into_iter().map(row_to_event).collect()
    }

    async fn count_activities_by_kind(
        &self,
        subject_id: Option<i64>,
    ) -> Result<BTreeMap<ActivityKind, u64>> {
        let raw_counts = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT activity_type, COUNT(*) FROM user_activities
                     WHERE ?1 IS NULL OR product_id = ?1
                     GROUP BY activity_type",
                )?;
                let rows = stmt
                    .query_map(params![subject_id], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                    })?
                    .collect::<rusqlite::Result<Vec<(String, i64)>>>()?;
                Ok(rows)
            })
            .await?;

        let mut counts = BTreeMap::new();
        for (activity_type, count) in raw_counts {
            counts.insert(activity_type.parse::<ActivityKind>()?, count as u64);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn metadata(value: serde_json::Value) -> Metadata {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let storage = SqliteActivityStorage::open_in_memory().unwrap();
        let mut event = ActivityEvent::new(
            3,
            99,
            ActivityKind::AddToCart,
            metadata(json!({"quantity": 2, "source": "product_page"})),
        );
        storage.insert_activity_event(&mut event).await.unwrap();

        let stored = storage
            .get_activity_by_id(event.id.unwrap())
            .await
            .unwrap()
            .expect("stored row");
        assert_eq!(stored, event);
        assert_eq!(stored.metadata.get("quantity"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_open_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("activity.db");
        let storage = SqliteActivityStorage::open(&path).unwrap();
        let mut event = ActivityEvent::new(1, 1, ActivityKind::Review, Metadata::new());
        storage.insert_activity_event(&mut event).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_counts_and_recent_queries() {
        let storage = SqliteActivityStorage::open_in_memory().unwrap();
        for (actor, subject, kind) in [
            (1, 10, ActivityKind::ViewProduct),
            (1, 10, ActivityKind::Purchase),
            (2, 10, ActivityKind::ViewProduct),
            (1, 20, ActivityKind::Search),
        ] {
            let mut event = ActivityEvent::new(actor, subject, kind, Metadata::new());
            storage.insert_activity_event(&mut event).await.unwrap();
        }

        let counts = storage.count_activities_by_kind(Some(10)).await.unwrap();
        assert_eq!(counts.get(&ActivityKind::ViewProduct), Some(&2));
        assert_eq!(counts.get(&ActivityKind::Purchase), Some(&1));
        assert_eq!(counts.get(&ActivityKind::Search), None);

        let recent = storage.get_recent_activities_for_actor(1, Some(2)).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].activity_type, ActivityKind::Search);
        assert_eq!(recent[1].activity_type, ActivityKind::Purchase);

        let all = storage.get_recent_activities_for_actor(1, None).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_returned_event_matches_stored_row() {
        let storage = SqliteActivityStorage::open_in_memory().unwrap();
        for i in 0..20 {
            let mut event = ActivityEvent::new(i, i * 2, ActivityKind::ViewProduct, Metadata::new());
            storage.insert_activity_event(&mut event).await.unwrap();
            let stored = storage.get_activity_by_id(event.id.unwrap()).await.unwrap();
            assert_eq!(stored.as_ref(), Some(&event));
        }
    }

    #[tokio::test]
    async fn test_unknown_stored_type_is_corrupt_record() {
        let storage = SqliteActivityStorage::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        {
            let conn = storage.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO user_activities (id, user_id, product_id, activity_type, metadata, created_at)
                 VALUES (?1, 1, 1, 'view', '{}', '2024-01-01T00:00:00.000000Z')",
                params![id.to_string()],
            )
            .unwrap();
        }

        let err = storage.get_activity_by_id(id).await.unwrap_err();
        assert!(matches!(err, ActivityError::CorruptRecord { .. }));
    }
}
