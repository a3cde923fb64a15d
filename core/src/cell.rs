use serde::{Deserialize, Serialize};

/// Hidden ground truth of a cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Truth {
    Mine,
    Count(u8),
}

impl Truth {
    pub const fn is_mine(self) -> bool {
        matches!(self, Self::Mine)
    }

    pub const fn count(self) -> Option<u8> {
        match self {
            Self::Mine => None,
            Self::Count(count) => Some(count),
        }
    }
}

impl Default for Truth {
    fn default() -> Self {
        Self::Count(0)
    }
}

/// What the player can see of a cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Visibility {
    #[default]
    Unrevealed,
    Revealed,
    Flagged,
}

impl Visibility {
    pub const fn is_revealed(self) -> bool {
        matches!(self, Self::Revealed)
    }

    pub const fn is_unrevealed(self) -> bool {
        matches!(self, Self::Unrevealed | Self::Flagged)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct Cell {
    pub truth: Truth,
    pub visibility: Visibility,
    /// Collectible warp energy, only ever non-zero on revealed cells.
    pub warp_energy: f64,
}

impl Cell {
    pub const fn is_mine(&self) -> bool {
        self.truth.is_mine()
    }

    /// Count shown to the player, if the cell is revealed and not a mine.
    pub const fn displayed_count(&self) -> Option<u8> {
        match (self.visibility, self.truth) {
            (Visibility::Revealed, Truth::Count(count)) => Some(count),
            _ => None,
        }
    }
}
