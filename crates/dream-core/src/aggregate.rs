//! Per-user running aggregate.
//!
//! The aggregate is a summary, not a history: every field is updated in
//! O(1) from the previous value and the newly classified dream. The
//! plurality tie-break only needs the sequence number of the most recent
//! dream per quadrant, so no replay is ever required.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classify::ClassifiedDream;
use crate::constants::EPSILON;
use crate::error::{DreamError, Result};
use crate::quadrant::{AxisScore, Quadrant};
use crate::symbol::{SymbolMapper, SymbolParams};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadrantTally {
    pub count: u64,
    /// 1-based sequence number of the latest dream in this quadrant, 0 if none.
    pub last_seen: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadrantCounts {
    tallies: [QuadrantTally; 4],
}

impl QuadrantCounts {
    pub fn from_tallies(tallies: [QuadrantTally; 4]) -> Self {
        Self { tallies }
    }

    pub fn tally(&self, q: Quadrant) -> QuadrantTally {
        self.tallies[q.index()]
    }

    pub fn count(&self, q: Quadrant) -> u64 {
        self.tallies[q.index()].count
    }

    pub fn total(&self) -> u64 {
        self.tallies.iter().map(|t| t.count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Quadrant, QuadrantTally)> + '_ {
        Quadrant::ALL.into_iter().map(|q| (q, self.tally(q)))
    }

    fn record(&mut self, q: Quadrant, sequence: u64) {
        let t = &mut self.tallies[q.index()];
        t.count += 1;
        t.last_seen = sequence;
    }
}

/// Component-wise running sum of axis scores. Unlike [`AxisScore`] it is
/// unbounded: each component lies in `[-dream_count, dream_count]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisSum {
    pub valence: f64,
    pub energy: f64,
}

impl AxisSum {
    fn add(self, score: AxisScore) -> Self {
        Self {
            valence: self.valence + score.valence,
            energy: self.energy + score.energy,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserAggregate {
    /// Bumped by exactly one per committed update. 0 means never stored.
    pub version: u64,
    pub dream_count: u64,
    pub quadrant_counts: QuadrantCounts,
    pub running_axis_sum: AxisSum,
    pub confidence_sum: f64,
    /// Cached output of the symbol mapper for the current state.
    pub symbol_params: SymbolParams,
}

impl Default for UserAggregate {
    fn default() -> Self {
        Self {
            version: 0,
            dream_count: 0,
            quadrant_counts: QuadrantCounts::default(),
            running_axis_sum: AxisSum::default(),
            confidence_sum: 0.0,
            symbol_params: SymbolParams::initial(),
        }
    }
}

impl UserAggregate {
    /// Next aggregate state after one more dream. `self` is left untouched
    /// so a failed commit leaves nothing half-applied.
    pub fn update(&self, classified: &ClassifiedDream, mapper: &SymbolMapper) -> UserAggregate {
        let sequence = self.dream_count + 1;
        let mut quadrant_counts = self.quadrant_counts;
        quadrant_counts.record(classified.quadrant, sequence);

        let mut next = UserAggregate {
            version: self.version + 1,
            dream_count: sequence,
            quadrant_counts,
            running_axis_sum: self.running_axis_sum.add(classified.axis_score),
            confidence_sum: self.confidence_sum + classified.confidence,
            symbol_params: self.symbol_params,
        };

        let mut params = mapper.derive(&next);
        // A lowered complexity cap must not shrink an existing symbol.
        params.complexity = params.complexity.max(self.symbol_params.complexity);
        next.symbol_params = params;
        next
    }

    /// Plurality quadrant; ties go to the quadrant of the most recently
    /// submitted dream among the tied set.
    pub fn dominant_quadrant(&self) -> Quadrant {
        if self.dream_count == 0 {
            return Quadrant::UpperDynamic;
        }
        self.quadrant_counts
            .iter()
            .max_by_key(|(_, t)| (t.count, t.last_seen))
            .map(|(q, _)| q)
            .unwrap_or(Quadrant::UpperDynamic)
    }

    /// Check every structural invariant. A violation is reported as
    /// `CorruptState` and never repaired.
    pub fn validate(&self) -> Result<()> {
        let n = self.dream_count;
        let total = self.quadrant_counts.total();
        if total != n {
            return Err(corrupt(format!(
                "quadrant counts sum to {total}, dream_count is {n}"
            )));
        }
        if self.version < n {
            return Err(corrupt(format!("version {} behind dream_count {n}", self.version)));
        }

        let mut latest = 0;
        for (q, t) in self.quadrant_counts.iter() {
            if (t.count == 0) != (t.last_seen == 0) {
                return Err(corrupt(format!("{q}: count {} with last_seen {}", t.count, t.last_seen)));
            }
            if t.last_seen > n || t.last_seen < t.count {
                return Err(corrupt(format!("{q}: last_seen {} out of range", t.last_seen)));
            }
            latest = latest.max(t.last_seen);
        }
        if latest != n {
            return Err(corrupt(format!("latest sequence {latest}, dream_count is {n}")));
        }
        let seen: Vec<u64> = self
            .quadrant_counts
            .iter()
            .map(|(_, t)| t.last_seen)
            .filter(|s| *s > 0)
            .collect();
        for (i, a) in seen.iter().enumerate() {
            if seen[i + 1..].contains(a) {
                return Err(corrupt(format!("sequence {a} claimed by two quadrants")));
            }
        }

        let bound = n as f64 + EPSILON;
        let sums = [
            ("valence sum", self.running_axis_sum.valence),
            ("energy sum", self.running_axis_sum.energy),
        ];
        for (name, value) in sums {
            if !value.is_finite() || value.abs() > bound {
                return Err(corrupt(format!("{name} {value} outside ±{n}")));
            }
        }
        if !self.confidence_sum.is_finite() || !(0.0..=bound).contains(&self.confidence_sum) {
            return Err(corrupt(format!(
                "confidence sum {} outside [0, {n}]",
                self.confidence_sum
            )));
        }

        self.symbol_params
            .check_bounds()
            .map_err(|msg| corrupt(format!("cached symbol params: {msg}")))
    }
}

fn corrupt(msg: String) -> DreamError {
    DreamError::CorruptState(msg)
}

/// Read model over an aggregate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_dreams: u64,
    pub average_valence: f64,
    pub average_energy: f64,
    pub average_confidence: f64,
    pub dominant_quadrant: Quadrant,
    pub quadrant_counts: BTreeMap<Quadrant, u64>,
}

impl UserStats {
    pub fn from_aggregate(agg: &UserAggregate) -> Self {
        let mean = |sum: f64| {
            if agg.dream_count == 0 {
                0.0
            } else {
                sum / agg.dream_count as f64
            }
        };
        Self {
            total_dreams: agg.dream_count,
            average_valence: mean(agg.running_axis_sum.valence),
            average_energy: mean(agg.running_axis_sum.energy),
            average_confidence: mean(agg.confidence_sum),
            dominant_quadrant: agg.dominant_quadrant(),
            quadrant_counts: agg
                .quadrant_counts
                .iter()
                .map(|(q, t)| (q, t.count))
                .collect(),
        }
    }
}
