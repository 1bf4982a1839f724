//! Orchestration: classify, update the user's aggregate under optimistic
//! concurrency, derive symbol parameters.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{UserAggregate, UserStats};
use crate::classify::{ClassifiedDream, Classifier};
use crate::config::Config;
use crate::error::{DreamError, Result};
use crate::extract::DreamText;
use crate::store::{AggregateStore, CasOutcome};
use crate::symbol::{SymbolMapper, SymbolParams};

/// One persisted history entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DreamRecord {
    pub id: Uuid,
    pub user_id: String,
    pub text: String,
    /// Equals the aggregate's `dream_count` right after this dream.
    pub sequence: u64,
    pub classified: ClassifiedDream,
    /// Set by the store on insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Result of a successful [`DreamEngine::submit`].
#[derive(Clone, Debug)]
pub struct Submission {
    pub record: DreamRecord,
    pub aggregate: UserAggregate,
    pub params: SymbolParams,
    /// Compare-and-store attempts used, 1 when uncontended.
    pub attempts: u32,
}

pub struct DreamEngine<S> {
    classifier: Arc<Classifier>,
    mapper: SymbolMapper,
    store: S,
    max_conflict_retries: u32,
}

impl<S: AggregateStore> DreamEngine<S> {
    pub fn new(config: &Config, store: S) -> Result<Self> {
        let classifier = Arc::new(Classifier::new(config)?);
        Ok(Self::with_classifier(classifier, config, store))
    }

    /// Share an already built classifier between engines.
    pub fn with_classifier(classifier: Arc<Classifier>, config: &Config, store: S) -> Self {
        Self {
            classifier,
            mapper: SymbolMapper::new(&config.symbol),
            store,
            max_conflict_retries: config.engine.max_conflict_retries,
        }
    }

    pub fn classifier(&self) -> &Arc<Classifier> {
        &self.classifier
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn classify_dream(&self, text: &str) -> Result<ClassifiedDream> {
        self.classifier.classify_dream(text)
    }

    /// Current aggregate, or the zero aggregate for an unknown user.
    pub fn load_aggregate(&self, user_id: &str) -> Result<UserAggregate> {
        check_user(user_id)?;
        let loaded = self.store.load(user_id).map_err(DreamError::store)?;
        match loaded {
            Some(agg) => {
                agg.validate()?;
                Ok(agg)
            }
            None => Ok(UserAggregate::default()),
        }
    }

    /// One read-update-store attempt. A lost race is reported as
    /// `Conflict` and nothing is written; the caller decides whether to retry.
    pub fn update_and_derive(
        &self,
        user_id: &str,
        classified: &ClassifiedDream,
    ) -> Result<(UserAggregate, SymbolParams)> {
        let current = self.load_aggregate(user_id)?;
        let next = current.update(classified, &self.mapper);
        match self
            .store
            .compare_and_store(user_id, current.version, &next)
            .map_err(DreamError::store)?
        {
            CasOutcome::Stored => {
                let params = next.symbol_params;
                Ok((next, params))
            }
            CasOutcome::Conflict => Err(conflict(user_id, current.version)),
        }
    }

    /// Classify once, then commit aggregate and history record together,
    /// retrying the read-update sequence on conflict.
    pub fn submit(&self, user_id: &str, dream: &DreamText) -> Result<Submission> {
        check_user(user_id)?;
        let classified = self.classifier.classify_text(dream);
        let id = Uuid::new_v4();
        let attempts_allowed = self.max_conflict_retries.saturating_add(1);

        let mut last_version = 0;
        for attempt in 1..=attempts_allowed {
            let current = self.load_aggregate(user_id)?;
            let next = current.update(&classified, &self.mapper);
            let record = DreamRecord {
                id,
                user_id: user_id.to_string(),
                text: dream.text().to_string(),
                sequence: next.dream_count,
                classified: classified.clone(),
                created_at: None,
            };
            let outcome = self
                .store
                .commit_submission(user_id, current.version, &next, &record)
                .map_err(DreamError::store)?;
            if outcome == CasOutcome::Stored {
                let params = next.symbol_params;
                return Ok(Submission {
                    record,
                    aggregate: next,
                    params,
                    attempts: attempt,
                });
            }
            last_version = current.version;
        }
        Err(conflict(user_id, last_version))
    }

    pub fn symbol(&self, user_id: &str) -> Result<SymbolParams> {
        Ok(self.load_aggregate(user_id)?.symbol_params)
    }

    pub fn stats(&self, user_id: &str) -> Result<UserStats> {
        Ok(UserStats::from_aggregate(&self.load_aggregate(user_id)?))
    }
}

fn check_user(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(DreamError::InvalidInput("user id is empty".to_string()));
    }
    Ok(())
}

fn conflict(user_id: &str, expected_version: u64) -> DreamError {
    DreamError::Conflict {
        user_id: user_id.to_string(),
        expected_version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadrant::Quadrant;
    use crate::store::MemoryStore;
    use std::cell::Cell;
    use std::convert::Infallible;

    fn engine() -> DreamEngine<MemoryStore> {
        DreamEngine::new(&Config::default(), MemoryStore::new()).unwrap()
    }

    #[test]
    fn test_submit_records_history() {
        let e = engine();
        let s = e
            .submit("alice", &DreamText::new("flying joyfully over a bright city").unwrap())
            .unwrap();
        assert_eq!(s.attempts, 1);
        assert_eq!(s.record.sequence, 1);
        assert_eq!(s.aggregate.version, 1);
        assert_eq!(s.params.dominant_quadrant, Quadrant::UpperDynamic);
        let history = e.store().history("alice");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, s.record.id);
    }

    #[test]
    fn test_update_and_derive_single_attempt() {
        let e = engine();
        let c = e.classify_dream("sat frozen in a dark empty room").unwrap();
        let (agg, params) = e.update_and_derive("bob", &c).unwrap();
        assert_eq!(agg.dream_count, 1);
        assert_eq!(params, agg.symbol_params);
        assert_eq!(params.dominant_quadrant, Quadrant::DownerStatic);
        // No history for the bare aggregate update.
        assert!(e.store().history("bob").is_empty());
    }

    #[test]
    fn test_unknown_user_is_zero_aggregate() {
        let e = engine();
        assert_eq!(e.load_aggregate("ghost").unwrap(), UserAggregate::default());
        assert_eq!(e.symbol("ghost").unwrap(), SymbolParams::initial());
        assert_eq!(e.stats("ghost").unwrap().total_dreams, 0);
    }

    #[test]
    fn test_empty_user_rejected() {
        let e = engine();
        let err = e.submit("  ", &DreamText::new("a dream").unwrap()).unwrap_err();
        assert!(matches!(err, DreamError::InvalidInput(_)));
    }

    #[test]
    fn test_corrupt_aggregate_surfaces() {
        let e = engine();
        let bad = UserAggregate {
            version: 3,
            dream_count: 3,
            ..UserAggregate::default()
        };
        e.store().put_unchecked("eve", bad.clone());
        let c = e.classify_dream("a quiet walk").unwrap();
        assert!(matches!(
            e.update_and_derive("eve", &c),
            Err(DreamError::CorruptState(_))
        ));
        // Nothing repaired or overwritten.
        assert_eq!(e.store().load("eve").unwrap(), Some(bad));
    }

    /// Store that loses the race a fixed number of times before accepting.
    struct Contended {
        inner: MemoryStore,
        losses: Cell<u32>,
    }

    impl AggregateStore for Contended {
        type Error = Infallible;

        fn load(&self, user_id: &str) -> std::result::Result<Option<UserAggregate>, Infallible> {
            self.inner.load(user_id)
        }

        fn compare_and_store(
            &self,
            user_id: &str,
            expected_version: u64,
            aggregate: &UserAggregate,
        ) -> std::result::Result<CasOutcome, Infallible> {
            if self.losses.get() > 0 {
                self.losses.set(self.losses.get() - 1);
                return Ok(CasOutcome::Conflict);
            }
            self.inner.compare_and_store(user_id, expected_version, aggregate)
        }
    }

    fn contended(losses: u32) -> DreamEngine<Contended> {
        let store = Contended {
            inner: MemoryStore::new(),
            losses: Cell::new(losses),
        };
        DreamEngine::new(&Config::default(), store).unwrap()
    }

    #[test]
    fn test_update_and_derive_reports_conflict() {
        let e = contended(1);
        let c = e.classify_dream("running").unwrap();
        let err = e.update_and_derive("u", &c).unwrap_err();
        assert!(err.is_conflict());
        assert!(e.store().inner.load("u").unwrap().is_none());
    }

    #[test]
    fn test_submit_retries_then_succeeds() {
        let e = contended(3);
        let s = e.submit("u", &DreamText::new("running").unwrap()).unwrap();
        assert_eq!(s.attempts, 4);
        assert_eq!(s.aggregate.dream_count, 1);
    }

    #[test]
    fn test_submit_gives_up() {
        let e = contended(100);
        let err = e.submit("u", &DreamText::new("running").unwrap()).unwrap_err();
        assert!(err.is_conflict());
    }
}
