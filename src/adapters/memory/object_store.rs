//! In-memory implementation of the live-object API.
//!
//! Objects are held as JSON values partitioned by kind. The store assigns
//! uids, creation timestamps and monotonically increasing resource versions,
//! and rejects updates carrying a stale version, which is enough to exercise
//! the reconciler the way a real cluster API would.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::StoreError;
use crate::domain::models::{ManagedObject, ObjectKey};
use crate::domain::ports::ObjectStore;

/// Call counters, for asserting how a reconcile pass touched the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub gets: u64,
    pub creates: u64,
    pub updates: u64,
}

/// [`ObjectStore`] keeping objects in memory, with resource versions and uids
/// assigned the way an API server would.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<(&'static str, ObjectKey), Value>>,
    version: AtomicU64,
    gets: AtomicU64,
    creates: AtomicU64,
    updates: AtomicU64,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls made through the [`ObjectStore`] trait so far.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            gets: self.gets.load(Ordering::Relaxed),
            creates: self.creates.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
        }
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Read an object without counting it as a store call.
    pub async fn peek<O: ManagedObject>(&self, key: &ObjectKey) -> Option<O> {
        let objects = self.objects.read().await;
        objects
            .get(&(O::KIND, key.clone()))
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Remove an object, as an out-of-band actor would.
    pub async fn delete<O: ManagedObject>(&self, key: &ObjectKey) -> bool {
        self.objects
            .write()
            .await
            .remove(&(O::KIND, key.clone()))
            .is_some()
    }

    fn next_version(&self) -> String {
        (self.version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get<O: ManagedObject>(&self, key: &ObjectKey, into: &mut O) -> Result<(), StoreError> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        let objects = self.objects.read().await;
        let value = objects
            .get(&(O::KIND, key.clone()))
            .ok_or_else(|| StoreError::NotFound {
                kind: O::KIND.to_string(),
                key: key.to_string(),
            })?;
        *into = serde_json::from_value(value.clone())?;
        Ok(())
    }

    async fn create<O: ManagedObject>(&self, object: &O) -> Result<O, StoreError> {
        self.creates.fetch_add(1, Ordering::Relaxed);
        let key = object.meta().key();
        let mut objects = self.objects.write().await;
        if objects.contains_key(&(O::KIND, key.clone())) {
            return Err(StoreError::AlreadyExists {
                kind: O::KIND.to_string(),
                key: key.to_string(),
            });
        }

        let mut stored = object.clone();
        let meta = stored.meta_mut();
        meta.uid = Some(Uuid::new_v4().to_string());
        meta.resource_version = Some(self.next_version());
        meta.creation_timestamp = Some(Utc::now());

        objects.insert((O::KIND, key), serde_json::to_value(&stored)?);
        Ok(stored)
    }

    async fn update<O: ManagedObject>(&self, object: &O) -> Result<O, StoreError> {
        self.updates.fetch_add(1, Ordering::Relaxed);
        let key = object.meta().key();
        let mut objects = self.objects.write().await;
        let current_value = objects
            .get(&(O::KIND, key.clone()))
            .ok_or_else(|| StoreError::NotFound {
                kind: O::KIND.to_string(),
                key: key.to_string(),
            })?;
        let current: O = serde_json::from_value(current_value.clone())?;

        let stored_version = current.meta().resource_version.clone().unwrap_or_default();
        if let Some(expected) = &object.meta().resource_version {
            if *expected != stored_version {
                return Err(StoreError::Conflict {
                    kind: O::KIND.to_string(),
                    key: key.to_string(),
                    expected: expected.clone(),
                    actual: stored_version,
                });
            }
        }

        let mut stored = object.clone();
        let meta = stored.meta_mut();
        meta.uid.clone_from(&current.meta().uid);
        meta.creation_timestamp = current.meta().creation_timestamp;
        meta.resource_version = Some(self.next_version());

        objects.insert((O::KIND, key), serde_json::to_value(&stored)?);
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ObjectMeta;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Widget {
        metadata: ObjectMeta,
        size: u32,
    }

    impl ManagedObject for Widget {
        const KIND: &'static str = "Widget";

        fn meta(&self) -> &ObjectMeta {
            &self.metadata
        }

        fn meta_mut(&mut self) -> &mut ObjectMeta {
            &mut self.metadata
        }
    }

    fn widget(size: u32) -> Widget {
        Widget {
            metadata: ObjectMeta::new(&ObjectKey::new("ns", "w")),
            size,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_identity() {
        let store = InMemoryObjectStore::new();
        let created = store.create(&widget(1)).await.unwrap();

        assert!(created.metadata.uid.is_some());
        assert_eq!(created.metadata.resource_version.as_deref(), Some("1"));
        assert!(created.metadata.creation_timestamp.is_some());

        let mut fetched = Widget::default();
        store.get(&ObjectKey::new("ns", "w"), &mut fetched).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = InMemoryObjectStore::new();
        let mut fetched = Widget::default();
        let err = store
            .get(&ObjectKey::new("ns", "missing"), &mut fetched)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_twice_fails() {
        let store = InMemoryObjectStore::new();
        store.create(&widget(1)).await.unwrap();
        let err = store.create(&widget(2)).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_keeps_uid() {
        let store = InMemoryObjectStore::new();
        let created = store.create(&widget(1)).await.unwrap();

        let mut changed = created.clone();
        changed.size = 5;
        let updated = store.update(&changed).await.unwrap();

        assert_eq!(updated.size, 5);
        assert_eq!(updated.metadata.uid, created.metadata.uid);
        assert_eq!(updated.metadata.resource_version.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let store = InMemoryObjectStore::new();
        let created = store.create(&widget(1)).await.unwrap();
        store.update(&created).await.unwrap();

        let err = store.update(&created).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { ref expected, .. } if expected == "1"));
    }

    #[tokio::test]
    async fn test_stats_and_delete() {
        let store = InMemoryObjectStore::new();
        store.create(&widget(1)).await.unwrap();
        let mut fetched = Widget::default();
        store.get(&ObjectKey::new("ns", "w"), &mut fetched).await.unwrap();

        assert_eq!(
            store.stats(),
            StoreStats {
                gets: 1,
                creates: 1,
                updates: 0
            }
        );
        assert!(store.delete::<Widget>(&ObjectKey::new("ns", "w")).await);
        assert!(store.is_empty().await);
    }
}
