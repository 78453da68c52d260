use async_trait::async_trait;

use crate::domain::errors::StoreError;
use crate::domain::models::{ManagedObject, ObjectKey};

/// Repository port for the live-object API.
///
/// Mirrors a conventional cluster API: objects are addressed by kind plus
/// [`ObjectKey`], a missing object is reported as [`StoreError::NotFound`],
/// and updates carry the resource version they were read at.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the object at `key` into `into`, replacing its contents.
    async fn get<O: ManagedObject>(&self, key: &ObjectKey, into: &mut O) -> Result<(), StoreError>;

    /// Create a new object. Fails with `AlreadyExists` if the key is taken.
    async fn create<O: ManagedObject>(&self, object: &O) -> Result<O, StoreError>;

    /// Replace an existing object. Fails with `Conflict` on a stale resource version.
    async fn update<O: ManagedObject>(&self, object: &O) -> Result<O, StoreError>;
}
