use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarpOutcome {
    Safe,
    Mine,
}

impl WarpOutcome {
    pub const fn is_mine(self) -> bool {
        matches!(self, Self::Mine)
    }

    pub const fn forced_cell(self) -> WireCell {
        match self {
            Self::Safe => WireCell::ForceSafe,
            Self::Mine => WireCell::ForceMine,
        }
    }

    pub const fn from_mine(is_mine: bool) -> Self {
        if is_mine { Self::Mine } else { Self::Safe }
    }
}

/// The one hidden cell the player wants to force.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarpIntent {
    pub coords: Coord2,
    pub outcome: WarpOutcome,
}

impl WarpIntent {
    pub const fn new(coords: Coord2, outcome: WarpOutcome) -> Self {
        Self { coords, outcome }
    }
}

/// Energy needed to force an outcome: the information content of that outcome.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WarpCost {
    Finite(f64),
    /// The outcome contradicts a certainty.
    Blocked,
}

impl WarpCost {
    /// `probability` is the solver's mine probability in percent.
    pub fn for_outcome(probability: f32, outcome: WarpOutcome) -> Self {
        let p = f64::from(probability.clamp(0.0, 100.0)) / 100.0;
        let chance = match outcome {
            WarpOutcome::Safe => 1.0 - p,
            WarpOutcome::Mine => p,
        };

        let cost = -chance.log2();
        if cost.is_infinite() || cost.is_nan() {
            Self::Blocked
        } else if cost <= 0.0 {
            // -log2(1) is -0.0
            Self::Finite(0.0)
        } else {
            Self::Finite(cost)
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Self::Finite(cost) => Some(cost),
            Self::Blocked => None,
        }
    }

    pub fn is_free(self) -> bool {
        self == Self::Finite(0.0)
    }

    pub fn is_affordable(self, pool: f64) -> bool {
        match self {
            Self::Finite(cost) => cost == 0.0 || cost <= pool,
            Self::Blocked => false,
        }
    }
}
