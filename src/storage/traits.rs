use crate::domain::{ActivityEvent, ActivityKind};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Storage trait for persisting user activity events
#[async_trait]
pub trait ActivityStorage: Send + Sync {
    /// Append an event, assigning it a fresh id
    async fn insert_activity_event(&self, event: &mut ActivityEvent) -> Result<()>;

    async fn get_activity_by_id(&self, activity_id: Uuid) -> Result<Option<ActivityEvent>>;

    /// Newest first; among equal timestamps the later insert comes first
    async fn get_recent_activities_for_actor(
        &self,
        actor_id: i64,
        limit: Option<usize>,
    ) -> Result<Vec<ActivityEvent>>;

    /// Per-kind totals, optionally restricted to one subject
    async fn count_activities_by_kind(
        &self,
        subject_id: Option<i64>,
    ) -> Result<BTreeMap<ActivityKind, u64>>;
}
