//! Caller-side memoization of snapshots and the bus that tells it when to
//! forget them. The engine itself never subscribes to anything.

use crate::engine::StatisticsEngine;
use crate::error::Result;
use crate::period::PeriodRequest;
use crate::schema::StatisticsSnapshot;
use crate::store::RecordStore;
use chrono::{DateTime, Utc};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    RecordCreated,
    RecordUpdated,
    RecordDeleted,
    StaffChanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationEvent {
    pub tenant_id: String,
    pub kind: ChangeKind,
}

impl InvalidationEvent {
    pub fn new(tenant_id: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            kind,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Fans change notifications out to every live subscriber.
#[derive(Debug, Default)]
pub struct InvalidationBus {
    subscribers: Mutex<Vec<UnboundedSender<InvalidationEvent>>>,
}

impl InvalidationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> UnboundedReceiver<InvalidationEvent> {
        let (tx, rx) = unbounded();
        lock(&self.subscribers).push(tx);
        rx
    }

    /// Returns how many subscribers received the event. Subscribers whose
    /// receiver was dropped are removed.
    pub fn publish(&self, event: InvalidationEvent) -> usize {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|tx| tx.unbounded_send(event.clone()).is_ok());
        subscribers.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    pub tenant_id: String,
    pub request: PeriodRequest,
}

impl SnapshotKey {
    pub fn new(tenant_id: impl Into<String>, request: PeriodRequest) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            request,
        }
    }
}

/// Snapshots keyed by tenant and requested window.
///
/// Any change to a tenant's records moves its all-time totals, so an event
/// evicts every entry of that tenant regardless of window.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: Mutex<HashMap<SnapshotKey, StatisticsSnapshot>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SnapshotKey) -> Option<StatisticsSnapshot> {
        lock(&self.entries).get(key).cloned()
    }

    pub fn insert(&self, key: SnapshotKey, snapshot: StatisticsSnapshot) {
        lock(&self.entries).insert(key, snapshot);
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    pub async fn get_or_compute<S: RecordStore>(
        &self,
        engine: &StatisticsEngine<S>,
        key: SnapshotKey,
        as_of: DateTime<Utc>,
    ) -> Result<StatisticsSnapshot> {
        if let Some(snapshot) = self.get(&key) {
            return Ok(snapshot);
        }

        let snapshot = engine
            .compute_statistics_at(&key.tenant_id, &key.request, as_of)
            .await?;
        self.insert(key, snapshot.clone());
        Ok(snapshot)
    }

    /// Drops the entries affected by `event` and returns how many were dropped.
    pub fn apply(&self, event: &InvalidationEvent) -> usize {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|key, _| key.tenant_id != event.tenant_id);
        let evicted = before - entries.len();

        debug!(
            "{:?} for tenant {} evicted {} cached snapshots",
            event.kind, event.tenant_id, evicted
        );
        evicted
    }

    /// Applies events until the bus side of `events` is dropped.
    pub async fn follow(&self, mut events: UnboundedReceiver<InvalidationEvent>) {
        while let Some(event) = events.next().await {
            self.apply(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::store::{InMemoryRecordStore, TenantRoleConfig};

    fn engine() -> StatisticsEngine<InMemoryRecordStore> {
        let config = TenantRoleConfig {
            laboratory_id: Some("lab".to_string()),
            available_roles: vec!["owner".to_string()],
            ..Default::default()
        };
        let store = InMemoryRecordStore::new()
            .with_role_config("t1", config.clone())
            .with_role_config("t2", config);
        StatisticsEngine::new(store, EngineConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_bus_delivers_and_prunes() {
        let bus = InvalidationBus::new();
        let mut first = bus.subscribe();
        let second = bus.subscribe();
        drop(second);

        let delivered = bus.publish(InvalidationEvent::new("t1", ChangeKind::RecordCreated));
        assert_eq!(delivered, 1);
        assert_eq!(
            first.next().await,
            Some(InvalidationEvent::new("t1", ChangeKind::RecordCreated))
        );
    }

    #[tokio::test]
    async fn test_cache_evicts_only_affected_tenant() {
        let engine = engine();
        let cache = SnapshotCache::new();
        let now = Utc::now();

        let key_a = SnapshotKey::new("t1", PeriodRequest::default());
        let key_b = SnapshotKey::new("t1", PeriodRequest::default().with_year(2020));
        let key_c = SnapshotKey::new("t2", PeriodRequest::default());
        for key in [key_a.clone(), key_b, key_c.clone()] {
            cache.get_or_compute(&engine, key, now).await.unwrap();
        }
        assert_eq!(cache.len(), 3);

        let evicted = cache.apply(&InvalidationEvent::new("t1", ChangeKind::RecordUpdated));
        assert_eq!(evicted, 2);
        assert!(cache.get(&key_a).is_none());
        assert!(cache.get(&key_c).is_some());
    }

    #[tokio::test]
    async fn test_follow_applies_published_events() {
        let engine = engine();
        let cache = SnapshotCache::new();
        let bus = InvalidationBus::new();
        let events = bus.subscribe();

        let key = SnapshotKey::new("t1", PeriodRequest::default());
        cache.get_or_compute(&engine, key, Utc::now()).await.unwrap();

        bus.publish(InvalidationEvent::new("t1", ChangeKind::StaffChanged));
        drop(bus);
        cache.follow(events).await;

        assert!(cache.is_empty());
    }
}
