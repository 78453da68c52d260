//! Idempotency cache of configuration objects known to exist on the control plane.
//!
//! Each registered tenant has a fixed list of expected revisions computed from
//! the [`RevisionPlan`]. Applied revisions are recorded with an opaque
//! checksum; [`RevisionCache::missing`] is the difference between the two and
//! is empty once the tenant has fully converged.
//!
//! A single `RwLock` guards all state. No transaction spans calls, so callers
//! must tolerate the cache changing between two reads.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::domain::models::{Revision, RevisionPlan};

#[derive(Debug, Default)]
struct CacheState {
    expected: HashMap<String, Vec<Revision>>,
    applied: HashMap<Revision, String>,
}

/// Thread-safe revision cache shared by every tenant.
#[derive(Debug)]
pub struct RevisionCache {
    plan: RevisionPlan,
    state: RwLock<CacheState>,
}

impl Default for RevisionCache {
    fn default() -> Self {
        Self::new(RevisionPlan::default())
    }
}

impl RevisionCache {
    /// Empty cache expanding registered tenants with `plan`.
    pub fn new(plan: RevisionPlan) -> Self {
        Self {
            plan,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub const fn plan(&self) -> &RevisionPlan {
        &self.plan
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Compute and store the tenant's expected revisions. No-op if already registered.
    pub fn register(&self, tenant: &str) {
        let mut state = self.write();
        if state.expected.contains_key(tenant) {
            return;
        }
        let expected = self.plan.expand(tenant);
        debug!(tenant, expected = expected.len(), "registered tenant revisions");
        state.expected.insert(tenant.to_string(), expected);
    }

    /// Forget everything about `tenant`.
    pub fn deregister(&self, tenant: &str) {
        let mut state = self.write();
        state.expected.remove(tenant);

        let mut removed: Vec<Revision> = state
            .applied
            .keys()
            .filter(|r| r.tenant == tenant)
            .cloned()
            .collect();
        removed.sort();
        for revision in removed {
            state.applied.remove(&revision);
            info!(revision = %revision, "removed revision");
        }
    }

    /// Record that `revision` exists on the control plane, overwriting any previous checksum.
    pub fn record_applied(&self, revision: Revision, checksum: impl Into<String>) {
        self.write().applied.insert(revision, checksum.into());
    }

    /// Drop a single applied record, e.g. after the object was deleted.
    pub fn forget(&self, revision: &Revision) -> bool {
        self.write().applied.remove(revision).is_some()
    }

    pub fn is_applied(&self, revision: &Revision) -> bool {
        self.read().applied.contains_key(revision)
    }

    pub fn checksum(&self, revision: &Revision) -> Option<String> {
        self.read().applied.get(revision).cloned()
    }

    /// Whether `revision` was last applied with exactly this payload checksum.
    pub fn is_current(&self, revision: &Revision, checksum: &str) -> bool {
        self.read()
            .applied
            .get(revision)
            .is_some_and(|applied| applied == checksum)
    }

    pub fn is_registered(&self, tenant: &str) -> bool {
        self.read().expected.contains_key(tenant)
    }

    /// Expected revisions for `tenant`, empty if it is not registered.
    pub fn expected(&self, tenant: &str) -> Vec<Revision> {
        self.read().expected.get(tenant).cloned().unwrap_or_default()
    }

    /// Expected revisions not yet recorded as applied.
    pub fn missing(&self, tenant: &str) -> BTreeSet<Revision> {
        let state = self.read();
        state
            .expected
            .get(tenant)
            .map(|expected| {
                expected
                    .iter()
                    .filter(|r| !state.applied.contains_key(*r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
