use super::traits::ActivityStorage;
use crate::domain::{ActivityEvent, ActivityKind};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// In-memory storage implementation for development/testing
pub struct InMemoryActivityStorage {
    // Kept in insertion order
    events: Arc<Mutex<Vec<ActivityEvent>>>,
}

impl Default for InMemoryActivityStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryActivityStorage {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of every stored event in insertion order
    pub async fn all_events(&self) -> Vec<ActivityEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl ActivityStorage for InMemoryActivityStorage {
    async fn insert_activity_event(&self, event: &mut ActivityEvent) -> Result<()> {
        let id = Uuid::new_v4();
        event.id = Some(id);

        let mut events = self.events.lock().await;
        events.push(event.clone());

        debug!("Created activity: {} by actor {} with id {}", event.activity_type, event.actor_id, id);
        Ok(())
    }

    async fn get_activity_by_id(&self, activity_id: Uuid) -> Result<Option<ActivityEvent>> {
        let events = self.events.lock().await;
        Ok(events.iter().find(|e| e.id == Some(activity_id)).cloned())
    }

    async fn get_recent_activities_for_actor(
        &self,
        actor_id: i64,
        limit: Option<usize>,
    ) -> Result<Vec<ActivityEvent>> {
        let events = self.events.lock().await;
        let mut recent: Vec<ActivityEvent> = events
            .iter()
            .rev()
            .filter(|e| e.actor_id == actor_id)
            .cloned()
            .collect();

        // Stable sort keeps later inserts ahead on equal timestamps
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if let Some(limit) = limit {
            recent.truncate(limit);
        }

        Ok(recent)
    }

    async fn count_activities_by_kind(
        &self,
        subject_id: Option<i64>,
    ) -> Result<BTreeMap<ActivityKind, u64>> {
        let events = self.events.lock().await;
        let mut counts = BTreeMap::new();
        for event in events
            .iter()
            .filter(|e| subject_id.map_or(true, |s| e.subject_id == s))
        {
            *counts.entry(event.activity_type).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
