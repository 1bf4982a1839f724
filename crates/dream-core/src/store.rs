//! Aggregate store contract and an in-process implementation.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::aggregate::UserAggregate;
use crate::engine::DreamRecord;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CasOutcome {
    Stored,
    /// The stored version no longer matches `expected_version`.
    Conflict,
}

/// Durable read/write access to per-user aggregates.
///
/// Writes are optimistic: `compare_and_store` only succeeds when the stored
/// version still equals `expected_version` (0 for a user with no row yet).
/// Implementations must make a successful store all-or-nothing.
pub trait AggregateStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load(&self, user_id: &str) -> Result<Option<UserAggregate>, Self::Error>;

    fn compare_and_store(
        &self,
        user_id: &str,
        expected_version: u64,
        aggregate: &UserAggregate,
    ) -> Result<CasOutcome, Self::Error>;

    /// Store the aggregate and append the history record as one unit.
    /// Stores without history keep only the aggregate.
    fn commit_submission(
        &self,
        user_id: &str,
        expected_version: u64,
        aggregate: &UserAggregate,
        record: &DreamRecord,
    ) -> Result<CasOutcome, Self::Error> {
        let _ = record;
        self.compare_and_store(user_id, expected_version, aggregate)
    }
}

impl<S: AggregateStore + ?Sized> AggregateStore for Arc<S> {
    type Error = S::Error;

    fn load(&self, user_id: &str) -> Result<Option<UserAggregate>, Self::Error> {
        (**self).load(user_id)
    }

    fn compare_and_store(
        &self,
        user_id: &str,
        expected_version: u64,
        aggregate: &UserAggregate,
    ) -> Result<CasOutcome, Self::Error> {
        (**self).compare_and_store(user_id, expected_version, aggregate)
    }

    fn commit_submission(
        &self,
        user_id: &str,
        expected_version: u64,
        aggregate: &UserAggregate,
        record: &DreamRecord,
    ) -> Result<CasOutcome, Self::Error> {
        (**self).commit_submission(user_id, expected_version, aggregate, record)
    }
}

#[derive(Default)]
struct Slot {
    aggregate: Option<UserAggregate>,
    history: Vec<DreamRecord>,
}

/// In-process store with one lock per user.
///
/// The outer map lock is held only to find or create a slot; all
/// compare-and-store work happens under the user's own mutex, so two users
/// never contend.
#[derive(Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, Arc<Mutex<Slot>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, user_id: &str) -> Arc<Mutex<Slot>> {
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
        {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(user_id.to_string()).or_default())
    }

    fn existing_slot(&self, user_id: &str) -> Option<Arc<Mutex<Slot>>> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
    }

    /// Records committed for a user, oldest first.
    pub fn history(&self, user_id: &str) -> Vec<DreamRecord> {
        self.existing_slot(user_id)
            .map(|slot| {
                slot.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .history
                    .clone()
            })
            .unwrap_or_default()
    }

    /// Overwrite a user's aggregate without any version check.
    pub fn put_unchecked(&self, user_id: &str, aggregate: UserAggregate) {
        let slot = self.slot(user_id);
        slot.lock().unwrap_or_else(PoisonError::into_inner).aggregate = Some(aggregate);
    }

    fn cas(
        &self,
        user_id: &str,
        expected_version: u64,
        aggregate: &UserAggregate,
        record: Option<&DreamRecord>,
    ) -> CasOutcome {
        let slot = self.slot(user_id);
        let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let current = slot.aggregate.as_ref().map_or(0, |a| a.version);
        if current != expected_version {
            return CasOutcome::Conflict;
        }
        slot.aggregate = Some(aggregate.clone());
        if let Some(record) = record {
            slot.history.push(record.clone());
        }
        CasOutcome::Stored
    }
}

impl AggregateStore for MemoryStore {
    type Error = Infallible;

    fn load(&self, user_id: &str) -> Result<Option<UserAggregate>, Infallible> {
        Ok(self.existing_slot(user_id).and_then(|slot| {
            slot.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .aggregate
                .clone()
        }))
    }

    fn compare_and_store(
        &self,
        user_id: &str,
        expected_version: u64,
        aggregate: &UserAggregate,
    ) -> Result<CasOutcome, Infallible> {
        Ok(self.cas(user_id, expected_version, aggregate, None))
    }

    fn commit_submission(
        &self,
        user_id: &str,
        expected_version: u64,
        aggregate: &UserAggregate,
        record: &DreamRecord,
    ) -> Result<CasOutcome, Infallible> {
        Ok(self.cas(user_id, expected_version, aggregate, Some(record)))
    }
}
