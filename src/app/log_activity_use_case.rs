use std::sync::Arc;

use tracing::error;

use crate::domain::{ActivityEvent, ActivityKind, Metadata};
use crate::error::Result;
use crate::storage::ActivityStorage;

/// Use case gating raw activity labels before they reach storage.
///
/// Only events whose label canonicalizes to a known [`ActivityKind`] are
/// written, and they are written with the canonical kind, never the alias.
pub struct ActivityLogger {
    storage: Arc<dyn ActivityStorage>,
}

impl ActivityLogger {
    pub fn new(storage: Arc<dyn ActivityStorage>) -> Self {
        Self { storage }
    }

    /// Record an activity if `raw_type` is a known kind or alias.
    ///
    /// Returns `false` without touching storage for a missing, empty or
    /// unrecognized label. A storage failure also yields `false`.
    pub async fn log_activity(
        &self,
        actor_id: i64,
        subject_id: i64,
        raw_type: Option<&str>,
        metadata: Metadata,
    ) -> bool {
        match self
            .try_log_activity(actor_id, subject_id, raw_type, metadata)
            .await
        {
            Ok(stored) => stored.is_some(),
            Err(e) => {
                error!(actor_id, subject_id, "Failed to store activity: {}", e);
                false
            }
        }
    }

    /// Same gate as [`log_activity`](Self::log_activity), but storage errors
    /// are returned instead of collapsing into `false`. `Ok(None)` means the
    /// label was not recognized.
    pub async fn try_log_activity(
        &self,
        actor_id: i64,
        subject_id: i64,
        raw_type: Option<&str>,
        metadata: Metadata,
    ) -> Result<Option<ActivityEvent>> {
        let Some(kind) = ActivityKind::canonicalize(raw_type) else {
            return Ok(None);
        };

        let mut event = ActivityEvent::new(actor_id, subject_id, kind, metadata);
        self.storage.insert_activity_event(&mut event).await?;
        Ok(Some(event))
    }
}
