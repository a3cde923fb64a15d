use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GameStatus {
    /// Mines not placed yet; the first reveal places them.
    #[default]
    NotStarted,
    InProgress,
    Won,
    Lost,
}

impl GameStatus {
    pub const fn is_started(self) -> bool {
        !matches!(self, Self::NotStarted)
    }

    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// Board state machine: placement on first reveal, flood reveal, chords, flags and the
/// win/loss transitions.
#[derive(Clone, Debug)]
pub struct PlayEngine {
    config: GameConfig,
    board: Board,
    placement: Option<MinePlacement>,
    status: GameStatus,
    triggered_mine: Option<Coord2>,
    spawner: Option<EnergySpawner>,
}

impl PlayEngine {
    pub fn new(config: GameConfig, placement: MinePlacement) -> Self {
        Self {
            config,
            board: Board::new(config),
            placement: Some(placement),
            status: GameStatus::NotStarted,
            triggered_mine: None,
            spawner: None,
        }
    }

    /// Enables warp energy spawning on every revealed cell.
    pub fn with_energy(mut self, spawner: EnergySpawner) -> Self {
        self.spawner = Some(spawner);
        self
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_started(&self) -> bool {
        self.status.is_started()
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    pub fn config(&self) -> GameConfig {
        self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn size(&self) -> Coord2 {
        self.board.size()
    }

    pub fn total_mines(&self) -> CellCount {
        self.board.mine_count()
    }

    pub fn mines_left(&self) -> i32 {
        self.board.mines_left()
    }

    pub fn cell_at(&self, coords: Coord2) -> &Cell {
        self.board.cell(coords)
    }

    pub fn triggered_mine(&self) -> Option<Coord2> {
        self.triggered_mine
    }

    pub fn has_energy(&self) -> bool {
        self.spawner.is_some()
    }

    pub fn reveal(&mut self, coords: Coord2) -> Result<RevealOutcome> {
        let coords = self.board.validate_coords(coords)?;
        self.check_not_finished()?;

        if self.board.cell(coords).visibility != Visibility::Unrevealed {
            return Ok(RevealOutcome::NoChange);
        }

        self.ensure_mines_placed(coords)?;

        if self.board.cell(coords).is_mine() {
            self.lose(coords);
            return Ok(RevealOutcome::HitMine);
        }

        let outcome = self.flood_reveal(coords);
        Ok(outcome | self.check_win())
    }

    pub fn chord(&mut self, coords: Coord2) -> Result<RevealOutcome> {
        use RevealOutcome::*;

        let coords = self.board.validate_coords(coords)?;
        self.check_active()?;

        let count = match self.board.cell(coords).displayed_count() {
            Some(count) if count > 0 => count,
            _ => return Ok(NoChange),
        };

        let flagged = self
            .board
            .count_neighbors(coords, |cell| cell.visibility == Visibility::Flagged);
        if flagged != count {
            return Ok(NoChange);
        }

        let targets: Vec<Coord2> = self
            .board
            .iter_neighbors(coords)
            .filter(|&pos| self.board.cell(pos).visibility == Visibility::Unrevealed)
            .collect();

        let mut outcome = NoChange;
        for target in targets {
            let cell = self.board.cell(target);
            if cell.visibility != Visibility::Unrevealed {
                // already opened by an earlier flood in this chord
                continue;
            }
            if cell.is_mine() {
                self.lose(target);
                return Ok(HitMine);
            }
            outcome = outcome | self.flood_reveal(target);
        }

        if outcome.has_update() {
            outcome = outcome | self.check_win();
        }
        Ok(outcome)
    }

    pub fn toggle_flag(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        use MarkOutcome::*;

        let coords = self.board.validate_coords(coords)?;
        self.check_active()?;

        Ok(match self.board.cell(coords).visibility {
            Visibility::Unrevealed => {
                self.board.set_visibility(coords, Visibility::Flagged);
                Changed
            }
            Visibility::Flagged => {
                self.board.set_visibility(coords, Visibility::Unrevealed);
                Changed
            }
            Visibility::Revealed => NoChange,
        })
    }

    /// Picks up energy lying on a revealed cell. Returns the amount collected.
    pub fn collect_energy(&mut self, coords: Coord2) -> Result<f64> {
        let coords = self.board.validate_coords(coords)?;
        self.check_active()?;
        Ok(self.board.take_energy(coords))
    }

    /// Transitions to `Won` once no safe cell remains hidden. Idempotent.
    pub fn check_win(&mut self) -> RevealOutcome {
        if self.status == GameStatus::InProgress && self.board.unrevealed_safe_count() == 0 {
            self.status = GameStatus::Won;
            self.triggered_mine = None;
            log::debug!("Game won");
            RevealOutcome::Won
        } else {
            RevealOutcome::NoChange
        }
    }

    /// Replaces the mine layout mid-game. Visibility and energy are kept.
    pub(crate) fn rewrite_mines(&mut self, layout: &MineLayout) -> Result<()> {
        self.check_active()?;
        self.board.apply_layout(layout)
    }

    /// Flags a hidden cell without going through the player toggle.
    pub(crate) fn mark_flagged(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        let coords = self.board.validate_coords(coords)?;
        self.check_active()?;
        if self.board.cell(coords).visibility == Visibility::Unrevealed {
            self.board.set_visibility(coords, Visibility::Flagged);
            Ok(MarkOutcome::Changed)
        } else {
            Ok(MarkOutcome::NoChange)
        }
    }

    fn ensure_mines_placed(&mut self, start: Coord2) -> Result<()> {
        let Some(placement) = self.placement.take() else {
            return Ok(());
        };

        let layout = placement.layout_for(self.config, start);
        self.board.apply_layout(&layout)?;
        self.status = GameStatus::InProgress;
        Ok(())
    }

    /// Opens `start` and, through an explicit worklist, every cell reachable over zero counts.
    fn flood_reveal(&mut self, start: Coord2) -> RevealOutcome {
        let mut to_visit = vec![start];
        let mut opened = false;

        while let Some(coords) = to_visit.pop() {
            let cell = self.board.cell(coords);
            if cell.visibility != Visibility::Unrevealed {
                continue;
            }
            let Truth::Count(count) = cell.truth else {
                continue;
            };

            self.board.set_visibility(coords, Visibility::Revealed);
            opened = true;

            if let Some(spawner) = &mut self.spawner {
                if let Some(energy) = spawner.roll(count) {
                    log::trace!("Energy {} spawned at {:?}", energy, coords);
                    self.board.set_energy(coords, energy);
                }
            }

            if count == 0 {
                to_visit.extend(
                    self.board
                        .iter_neighbors(coords)
                        .filter(|&pos| self.board.cell(pos).visibility == Visibility::Unrevealed),
                );
            }
        }

        if opened {
            RevealOutcome::Revealed
        } else {
            RevealOutcome::NoChange
        }
    }

    fn lose(&mut self, triggered: Coord2) {
        let mines: Vec<Coord2> = self.board.mine_layout().mine_coords().collect();
        for coords in mines {
            self.board.set_visibility(coords, Visibility::Revealed);
        }
        self.triggered_mine = Some(triggered);
        self.status = GameStatus::Lost;
        log::debug!("Mine hit at {:?}", triggered);
    }

    fn check_active(&self) -> Result<()> {
        match self.status {
            GameStatus::InProgress => Ok(()),
            GameStatus::NotStarted => Err(GameError::NotStarted),
            GameStatus::Won | GameStatus::Lost => Err(GameError::AlreadyEnded),
        }
    }

    fn check_not_finished(&self) -> Result<()> {
        if self.status.is_finished() {
            Err(GameError::AlreadyEnded)
        } else {
            Ok(())
        }
    }
}
