use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Position of a dream in 2-D axis space. Both components stay in `[-1, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisScore {
    pub valence: f64,
    pub energy: f64,
}

impl AxisScore {
    /// Clamp both components into range. NaN collapses to 0.
    pub fn clamped(valence: f64, energy: f64) -> Self {
        Self {
            valence: clamp_unit(valence),
            energy: clamp_unit(energy),
        }
    }

    /// Euclidean distance from the origin, in `[0, √2]`.
    pub fn magnitude(&self) -> f64 {
        (self.valence * self.valence + self.energy * self.energy).sqrt()
    }
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(-1.0, 1.0) }
}

/// Sign combination of the two axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quadrant {
    UpperDynamic,
    UpperStatic,
    DownerDynamic,
    DownerStatic,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::UpperDynamic,
        Quadrant::UpperStatic,
        Quadrant::DownerDynamic,
        Quadrant::DownerStatic,
    ];

    /// Zero belongs to the positive side on both axes.
    pub fn from_axes(score: AxisScore) -> Self {
        match (score.valence >= 0.0, score.energy >= 0.0) {
            (true, true) => Quadrant::UpperDynamic,
            (true, false) => Quadrant::UpperStatic,
            (false, true) => Quadrant::DownerDynamic,
            (false, false) => Quadrant::DownerStatic,
        }
    }

    /// Stable index into per-quadrant arrays.
    pub fn index(self) -> usize {
        match self {
            Quadrant::UpperDynamic => 0,
            Quadrant::UpperStatic => 1,
            Quadrant::DownerDynamic => 2,
            Quadrant::DownerStatic => 3,
        }
    }

    pub fn is_upper(self) -> bool {
        matches!(self, Quadrant::UpperDynamic | Quadrant::UpperStatic)
    }

    pub fn is_dynamic(self) -> bool {
        matches!(self, Quadrant::UpperDynamic | Quadrant::DownerDynamic)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Quadrant::UpperDynamic => "UpperDynamic",
            Quadrant::UpperStatic => "UpperStatic",
            Quadrant::DownerDynamic => "DownerDynamic",
            Quadrant::DownerStatic => "DownerStatic",
        }
    }

    /// Human-readable description.
    pub fn describe(self) -> &'static str {
        match self {
            Quadrant::UpperDynamic => "Dynamic Upper (Energetic Positive)",
            Quadrant::UpperStatic => "Static Upper (Peaceful Positive)",
            Quadrant::DownerDynamic => "Dynamic Downer (Chaotic Negative)",
            Quadrant::DownerStatic => "Static Downer (Stagnant Negative)",
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quadrant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quadrant::ALL
            .into_iter()
            .find(|q| q.as_str() == s)
            .ok_or_else(|| format!("unknown quadrant '{s}'"))
    }
}
