use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WarpPhase {
    #[default]
    Inactive,
    Staging,
    Committing,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WarpError {
    #[error("Warp is only available in the warp variant.")]
    NotAvailable,
    #[error("Reveal a cell before warping.")]
    NotStarted,
    #[error("The game is over.")]
    GameOver,
    #[error("Enter warp mode first.")]
    Inactive,
    #[error("Pick a hidden cell to warp first.")]
    NoIntent,
    #[error("Only hidden cells can be warped.")]
    CellRevealed,
    #[error("A warp is already being committed.")]
    AlreadyCommitting,
    #[error("That outcome is impossible on this board.")]
    Blocked,
    #[error("This warp costs {cost:.3} energy but only {pool:.3} is available.")]
    Unaffordable { cost: f64, pool: f64 },
    #[error("No mine layout fits this board.")]
    Infeasible,
    #[error("Solver unavailable: {0}")]
    Solver(#[from] SolverError),
    #[error("The warp would change {} revealed numbers.", .conflicts.len())]
    RepairFailed { conflicts: Vec<Coord2> },
    #[error("The board changed while the warp was planned.")]
    Stale,
}

/// Warp mode, the staged intent and the energy pool.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WarpEngine {
    phase: WarpPhase,
    intent: Option<WarpIntent>,
    pool: f64,
}

impl WarpEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> WarpPhase {
        self.phase
    }

    pub fn intent(&self) -> Option<WarpIntent> {
        self.intent
    }

    pub fn pool(&self) -> f64 {
        self.pool
    }

    pub fn deposit(&mut self, amount: f64) {
        if amount > 0.0 {
            self.pool += amount;
        }
    }

    pub fn enter(&mut self, status: GameStatus) -> Result<(), WarpError> {
        match status {
            GameStatus::NotStarted => Err(WarpError::NotStarted),
            GameStatus::Won | GameStatus::Lost => Err(WarpError::GameOver),
            GameStatus::InProgress => {
                if self.phase == WarpPhase::Inactive {
                    self.phase = WarpPhase::Staging;
                }
                Ok(())
            }
        }
    }

    /// Leaves warp mode and drops the staged intent. Refused mid-commit.
    pub fn exit(&mut self) -> Result<(), WarpError> {
        if self.phase == WarpPhase::Committing {
            return Err(WarpError::AlreadyCommitting);
        }
        self.force_inactive();
        Ok(())
    }

    pub fn force_inactive(&mut self) {
        self.phase = WarpPhase::Inactive;
        self.intent = None;
    }

    /// Stages `intent` on a cell with the given visibility. Staging the current
    /// intent again clears it. Returns what is staged afterwards.
    pub fn stage(
        &mut self,
        intent: WarpIntent,
        visibility: Visibility,
    ) -> Result<Option<WarpIntent>, WarpError> {
        match self.phase {
            WarpPhase::Inactive => return Err(WarpError::Inactive),
            WarpPhase::Committing => return Err(WarpError::AlreadyCommitting),
            WarpPhase::Staging => {}
        }
        if visibility.is_revealed() {
            return Err(WarpError::CellRevealed);
        }

        self.intent = if self.intent == Some(intent) {
            None
        } else {
            Some(intent)
        };
        Ok(self.intent)
    }

    pub fn begin_commit(&mut self) -> Result<WarpIntent, WarpError> {
        match self.phase {
            WarpPhase::Inactive => return Err(WarpError::Inactive),
            WarpPhase::Committing => return Err(WarpError::AlreadyCommitting),
            WarpPhase::Staging => {}
        }
        let intent = self.intent.ok_or(WarpError::NoIntent)?;
        self.phase = WarpPhase::Committing;
        Ok(intent)
    }

    /// The commit failed; the intent stays staged.
    pub fn abort_commit(&mut self) {
        if self.phase == WarpPhase::Committing {
            self.phase = WarpPhase::Staging;
        }
    }

    pub fn finish_commit(&mut self, cost: f64) {
        self.pool = (self.pool - cost).max(0.0);
        self.force_inactive();
    }
}
