use serde::{Deserialize, Serialize};

use crate::aggregate::UserAggregate;
use crate::config::SymbolConfig;
use crate::quadrant::Quadrant;

/// Generative parameters consumed by a renderer. Every field is always
/// within its declared bounds, so renderers never clamp.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymbolParams {
    /// Growth stage, `≥ 1`, non-decreasing over a user's history.
    pub complexity: u32,
    /// Running mean valence, `[-1, 1]`.
    pub palette_bias: f64,
    /// Running mean energy rescaled to `[0, 1]`.
    pub symmetry_factor: f64,
    pub dominant_quadrant: Quadrant,
}

impl SymbolParams {
    /// Parameters of a user with no dreams yet.
    pub fn initial() -> Self {
        Self {
            complexity: 1,
            palette_bias: 0.0,
            symmetry_factor: 0.5,
            dominant_quadrant: Quadrant::UpperDynamic,
        }
    }

    pub fn check_bounds(&self) -> Result<(), String> {
        if self.complexity < 1 {
            return Err(format!("complexity {} below 1", self.complexity));
        }
        if !(-1.0..=1.0).contains(&self.palette_bias) {
            return Err(format!("palette_bias {} outside [-1, 1]", self.palette_bias));
        }
        if !(0.0..=1.0).contains(&self.symmetry_factor) {
            return Err(format!(
                "symmetry_factor {} outside [0, 1]",
                self.symmetry_factor
            ));
        }
        Ok(())
    }
}

/// Growth stage for a dream count: one step each time the count reaches
/// 1, 3, 7, 15, 31, ... (`2^k - 1`).
pub fn growth_stage(dream_count: u64) -> u32 {
    // floor(log2(n + 1)) without floating point
    let stage = u64::BITS - 1 - dream_count.saturating_add(1).leading_zeros();
    stage.max(1)
}

/// Pure mapping from aggregate to symbol parameters. No randomness: equal
/// aggregates give bit-identical parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SymbolMapper {
    max_complexity: u32,
}

impl Default for SymbolMapper {
    fn default() -> Self {
        Self::new(&SymbolConfig::default())
    }
}

impl SymbolMapper {
    pub fn new(config: &SymbolConfig) -> Self {
        Self {
            max_complexity: config.max_complexity.max(1),
        }
    }

    pub fn derive(&self, agg: &UserAggregate) -> SymbolParams {
        if agg.dream_count == 0 {
            return SymbolParams::initial();
        }
        let n = agg.dream_count as f64;
        let mean_valence = agg.running_axis_sum.valence / n;
        let mean_energy = agg.running_axis_sum.energy / n;
        SymbolParams {
            complexity: growth_stage(agg.dream_count).min(self.max_complexity),
            palette_bias: mean_valence.clamp(-1.0, 1.0),
            symmetry_factor: ((mean_energy + 1.0) / 2.0).clamp(0.0, 1.0),
            dominant_quadrant: agg.dominant_quadrant(),
        }
    }
}

/// Rendering collaborator: turns parameters into a visual artifact.
pub trait SymbolRenderer {
    type Artifact;

    fn render(&self, params: &SymbolParams) -> Self::Artifact;
}
