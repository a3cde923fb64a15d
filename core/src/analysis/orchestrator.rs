use core::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AnalysisPhase {
    #[default]
    Off,
    /// A solve is in flight.
    Awaiting,
    /// The overlay matches the latest board.
    Ready,
    /// The board changed (or the last solve failed) since the overlay was computed.
    Stale,
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct EndgameState {
    /// Whether the last solve said the position is small enough for endgame search.
    pub solvable: bool,
    pub best_move: Option<Coord2>,
    pub win_probability: Option<f32>,
}

/// Why analysis or endgame mode could not be switched on.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum AnalysisRefusal {
    #[error("Reveal a cell before turning on analysis.")]
    NotStarted,
    #[error("The game is over.")]
    GameOver,
    #[error("Turn on analysis first.")]
    AnalysisOff,
    #[error("Endgame search is not available for this position yet.")]
    EndgameUnavailable,
}

/// Something the player should be told about after a solve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisNotice {
    /// No mine layout fits the revealed numbers and mine count.
    BoardInconsistent,
    /// Every undecided cell is exactly 50/50.
    AllCoinFlips,
}

impl fmt::Display for AnalysisNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BoardInconsistent => {
                f.write_str("No mine layout fits this board. Check the numbers and the mine count.")
            }
            Self::AllCoinFlips => f.write_str("Every remaining cell is a coin flip."),
        }
    }
}

/// Permission to run one `solveBoard` call; hand it back with the result.
#[derive(Clone, Debug, PartialEq)]
pub struct SolveTicket {
    generation: u64,
    query: BoardQuery,
}

impl SolveTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn query(&self) -> &BoardQuery {
        &self.query
    }
}

/// Permission to run the `solveEndgame` call following a successful solve.
#[derive(Clone, Debug, PartialEq)]
pub struct EndgameTicket {
    generation: u64,
    query: BoardQuery,
}

impl EndgameTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn query(&self) -> &BoardQuery {
        &self.query
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SolveDisposition {
    /// Analysis was turned off or a newer request superseded this one.
    Discarded,
    Applied,
    Infeasible,
    Failed,
    /// Probabilities applied; endgame mode wants a follow-up search.
    NeedsEndgame(EndgameTicket),
}

/// Decides when analysis results are requested, accepted, or dropped.
///
/// Holds no board and performs no I/O: callers hand it encoded queries and
/// feed back whatever the solver answered.
#[derive(Clone, Debug, Default)]
pub struct AnalysisOrchestrator {
    enabled: bool,
    endgame_mode: bool,
    phase: AnalysisPhase,
    overlay: Option<ProbabilityOverlay>,
    endgame: EndgameState,
    generation: u64,
    notices: Vec<AnalysisNotice>,
}

impl AnalysisOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn endgame_mode(&self) -> bool {
        self.endgame_mode
    }

    pub fn phase(&self) -> AnalysisPhase {
        self.phase
    }

    pub fn overlay(&self) -> Option<&ProbabilityOverlay> {
        self.overlay.as_ref()
    }

    pub fn endgame(&self) -> &EndgameState {
        &self.endgame
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn needs_refresh(&self) -> bool {
        self.enabled && self.phase == AnalysisPhase::Stale
    }

    /// Switches analysis on if `readiness` allows it. The overlay is stale until the first solve.
    pub fn turn_on(&mut self, readiness: Result<(), AnalysisRefusal>) -> Result<(), AnalysisRefusal> {
        if self.enabled {
            return Ok(());
        }
        readiness?;

        self.enabled = true;
        self.phase = AnalysisPhase::Stale;
        log::debug!("Analysis on");
        Ok(())
    }

    /// Switches analysis off and drops everything, including answers still in flight.
    pub fn turn_off(&mut self) {
        if self.enabled {
            log::debug!("Analysis off");
        }
        self.generation += 1;
        self.enabled = false;
        self.endgame_mode = false;
        self.phase = AnalysisPhase::Off;
        self.overlay = None;
        self.endgame = EndgameState::default();
    }

    /// Returns the new state of the analysis switch.
    pub fn toggle(&mut self, readiness: Result<(), AnalysisRefusal>) -> Result<bool, AnalysisRefusal> {
        if self.enabled {
            self.turn_off();
        } else {
            self.turn_on(readiness)?;
        }
        Ok(self.enabled)
    }

    /// Returns the new state of endgame mode. Turning it off is always allowed.
    pub fn toggle_endgame(&mut self) -> Result<bool, AnalysisRefusal> {
        if self.endgame_mode {
            self.endgame_mode = false;
            self.endgame.best_move = None;
            self.endgame.win_probability = None;
            self.invalidate();
            return Ok(false);
        }

        if !self.enabled {
            return Err(AnalysisRefusal::AnalysisOff);
        }
        if !self.endgame.solvable {
            return Err(AnalysisRefusal::EndgameUnavailable);
        }

        self.endgame_mode = true;
        self.phase = AnalysisPhase::Stale;
        Ok(true)
    }

    /// Marks the overlay as out of date after the board changed. Answers still
    /// in flight were computed for the old board and will be dropped.
    pub fn invalidate(&mut self) {
        if self.enabled {
            self.generation += 1;
            self.phase = AnalysisPhase::Stale;
        }
    }

    /// Nothing on the board is left to analyze.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.overlay = None;
        self.endgame_mode = false;
        self.endgame = EndgameState::default();
        if self.enabled {
            self.phase = AnalysisPhase::Ready;
        }
    }

    pub fn begin_solve(&mut self, query: BoardQuery) -> Option<SolveTicket> {
        if !self.enabled {
            return None;
        }

        self.generation += 1;
        self.phase = AnalysisPhase::Awaiting;
        Some(SolveTicket {
            generation: self.generation,
            query,
        })
    }

    pub fn complete_solve(
        &mut self,
        ticket: SolveTicket,
        result: Result<BoardSolution, SolverError>,
    ) -> SolveDisposition {
        if !self.is_current(ticket.generation) {
            log::debug!(
                "Dropping solve {} (latest is {})",
                ticket.generation,
                self.generation
            );
            return SolveDisposition::Discarded;
        }

        let solution = match result {
            Ok(solution) => solution,
            Err(err) => {
                log::error!("Analysis failed: {err}");
                self.phase = AnalysisPhase::Stale;
                return SolveDisposition::Failed;
            }
        };

        self.endgame.solvable = solution.endgame_eligible;
        if !solution.endgame_eligible && self.endgame_mode {
            log::debug!("Endgame search no longer available, leaving endgame mode");
            self.endgame_mode = false;
            self.endgame.best_move = None;
            self.endgame.win_probability = None;
        }

        let probabilities = match solution.probabilities {
            Some(probabilities) if solution.feasible => probabilities,
            _ => {
                log::warn!("Solver found no mine layout consistent with the board");
                self.overlay = None;
                self.endgame.best_move = None;
                self.endgame.win_probability = None;
                self.phase = AnalysisPhase::Ready;
                self.notices.push(AnalysisNotice::BoardInconsistent);
                return SolveDisposition::Infeasible;
            }
        };

        if all_coin_flips(&ticket.query, &probabilities) {
            self.notices.push(AnalysisNotice::AllCoinFlips);
        }
        self.overlay = Some(ProbabilityOverlay::from_solution(
            &ticket.query,
            &probabilities,
        ));

        if self.endgame_mode {
            SolveDisposition::NeedsEndgame(EndgameTicket {
                generation: ticket.generation,
                query: ticket.query,
            })
        } else {
            self.phase = AnalysisPhase::Ready;
            SolveDisposition::Applied
        }
    }

    /// Returns whether the result was applied.
    pub fn complete_endgame(
        &mut self,
        ticket: EndgameTicket,
        result: Result<EndgameSolution, SolverError>,
    ) -> bool {
        if !self.is_current(ticket.generation) || !self.endgame_mode {
            log::debug!("Dropping endgame result {}", ticket.generation);
            return false;
        }

        match result {
            Ok(solution) => {
                self.endgame.best_move = solution.best_move;
                self.endgame.win_probability = solution.win_probability;
                self.phase = AnalysisPhase::Ready;
            }
            Err(err) => {
                log::error!("Endgame search failed: {err}");
                self.endgame.best_move = None;
                self.endgame.win_probability = None;
                self.phase = AnalysisPhase::Stale;
            }
        }
        true
    }

    pub fn drain_notices(&mut self) -> Vec<AnalysisNotice> {
        core::mem::take(&mut self.notices)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.enabled && generation == self.generation
    }
}
