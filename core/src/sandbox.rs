use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// Number written on a revealed sandbox cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SandboxClue {
    Count(u8),
    DontCare,
}

impl Default for SandboxClue {
    fn default() -> Self {
        Self::Count(0)
    }
}

/// Hand-edited position: the player decides what is hidden and what every number says.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SandboxBoard {
    visibility: Array2<Visibility>,
    clues: Array2<SandboxClue>,
    mine_count: CellCount,
}

impl SandboxBoard {
    /// Every cell starts revealed with a zero.
    pub fn new(size: Coord2, mine_count: CellCount) -> Self {
        let size = SandboxLimits::clamp_size(size).to_nd_index();
        Self {
            visibility: Array2::from_elem(size, Visibility::Revealed),
            clues: Array2::default(size),
            mine_count,
        }
    }

    pub fn size(&self) -> Coord2 {
        grid_size(&self.visibility)
    }

    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    pub fn set_mine_count(&mut self, mine_count: CellCount) {
        self.mine_count = mine_count;
    }

    pub fn visibility(&self, coords: Coord2) -> Visibility {
        self.visibility[coords.to_nd_index()]
    }

    pub fn clue(&self, coords: Coord2) -> SandboxClue {
        self.clues[coords.to_nd_index()]
    }

    fn validate(&self, coords: Coord2) -> Result<Coord2> {
        if in_bounds(coords, self.size()) {
            Ok(coords)
        } else {
            Err(GameError::InvalidCoords)
        }
    }

    /// Revealed and hidden swap; a flag is lifted before revealing.
    pub fn toggle_reveal(&mut self, coords: Coord2) -> Result<()> {
        let coords = self.validate(coords)?;
        let next = match self.visibility(coords) {
            Visibility::Revealed => Visibility::Unrevealed,
            Visibility::Unrevealed => Visibility::Revealed,
            Visibility::Flagged => {
                self.shift_neighbors(coords, -1);
                Visibility::Revealed
            }
        };
        self.visibility[coords.to_nd_index()] = next;
        Ok(())
    }

    /// Flags bump the numbers around them; unflagging takes the bump back.
    pub fn toggle_flag(&mut self, coords: Coord2) -> Result<()> {
        let coords = self.validate(coords)?;
        let next = match self.visibility(coords) {
            Visibility::Flagged => {
                self.shift_neighbors(coords, -1);
                Visibility::Unrevealed
            }
            Visibility::Unrevealed | Visibility::Revealed => {
                self.shift_neighbors(coords, 1);
                Visibility::Flagged
            }
        };
        self.visibility[coords.to_nd_index()] = next;
        Ok(())
    }

    /// Writes `digit` on a revealed cell, or clears it back to zero if it already shows `digit`.
    pub fn set_digit(&mut self, coords: Coord2, digit: u8) -> Result<MarkOutcome> {
        let coords = self.validate(coords)?;
        if digit > 8 || !self.visibility(coords).is_revealed() {
            return Ok(MarkOutcome::NoChange);
        }
        let slot = &mut self.clues[coords.to_nd_index()];
        *slot = if *slot == SandboxClue::Count(digit) {
            SandboxClue::Count(0)
        } else {
            SandboxClue::Count(digit)
        };
        Ok(MarkOutcome::Changed)
    }

    pub fn toggle_dont_care(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        let coords = self.validate(coords)?;
        if !self.visibility(coords).is_revealed() {
            return Ok(MarkOutcome::NoChange);
        }
        let slot = &mut self.clues[coords.to_nd_index()];
        *slot = match *slot {
            SandboxClue::DontCare => SandboxClue::Count(0),
            SandboxClue::Count(_) => SandboxClue::DontCare,
        };
        Ok(MarkOutcome::Changed)
    }

    /// Don't-care wraps to zero, numbers stop at 8.
    pub fn scroll_up(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        self.edit_clue(coords, |clue| match clue {
            SandboxClue::DontCare => SandboxClue::Count(0),
            SandboxClue::Count(count) => SandboxClue::Count((count + 1).min(8)),
        })
    }

    /// Zero wraps to don't-care, which stays put.
    pub fn scroll_down(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        self.edit_clue(coords, |clue| match clue {
            SandboxClue::Count(0) | SandboxClue::DontCare => SandboxClue::DontCare,
            SandboxClue::Count(count) => SandboxClue::Count(count - 1),
        })
    }

    pub fn has_hidden_cells(&self) -> bool {
        self.visibility.iter().any(|visibility| visibility.is_unrevealed())
    }

    /// Flags are always sent as mines here: in the sandbox they are part of the puzzle.
    pub fn encode(&self) -> BoardQuery {
        let cells = Array2::from_shape_fn(self.visibility.raw_dim(), |index| {
            match (self.visibility[index], self.clues[index]) {
                (Visibility::Revealed, SandboxClue::Count(count)) => WireCell::Count(count),
                (Visibility::Revealed, SandboxClue::DontCare) => WireCell::DontCare,
                (Visibility::Flagged, _) => WireCell::Flagged,
                (Visibility::Unrevealed, _) => WireCell::Unknown,
            }
        });
        BoardQuery::new(cells, self.mine_count)
    }

    fn edit_clue(
        &mut self,
        coords: Coord2,
        edit: impl FnOnce(SandboxClue) -> SandboxClue,
    ) -> Result<MarkOutcome> {
        let coords = self.validate(coords)?;
        if !self.visibility(coords).is_revealed() {
            return Ok(MarkOutcome::NoChange);
        }
        let slot = &mut self.clues[coords.to_nd_index()];
        let next = edit(*slot);
        if next == *slot {
            return Ok(MarkOutcome::NoChange);
        }
        *slot = next;
        Ok(MarkOutcome::Changed)
    }

    fn shift_neighbors(&mut self, coords: Coord2, delta: i8) {
        for pos in self.visibility.iter_neighbors(coords) {
            if !self.visibility(pos).is_revealed() {
                continue;
            }
            let slot = &mut self.clues[pos.to_nd_index()];
            if let SandboxClue::Count(count) = *slot {
                *slot = SandboxClue::Count(count.saturating_add_signed(delta).min(8));
            }
        }
    }
}

/// Sandbox board with its own analysis overlay.
#[derive(Clone, Debug)]
pub struct SandboxSession {
    board: SandboxBoard,
    analysis: AnalysisOrchestrator,
    events: EventQueue,
}

impl Default for SandboxSession {
    fn default() -> Self {
        Self::new((9, 9), 10)
    }
}

impl SandboxSession {
    pub fn new(size: Coord2, mine_count: CellCount) -> Self {
        Self {
            board: SandboxBoard::new(size, mine_count),
            analysis: AnalysisOrchestrator::new(),
            events: EventQueue::default(),
        }
    }

    pub fn board(&self) -> &SandboxBoard {
        &self.board
    }

    /// Starts over on a fresh board; analysis is switched off.
    pub fn resize(&mut self, size: Coord2, mine_count: CellCount) {
        self.board = SandboxBoard::new(size, mine_count);
        self.analysis.turn_off();
        self.events.push(SessionEvent::BoardMutated);
    }

    pub fn set_mine_count(&mut self, mine_count: CellCount) {
        if self.board.mine_count() != mine_count {
            self.board.set_mine_count(mine_count);
            self.board_mutated();
        }
    }

    pub fn toggle_reveal(&mut self, coords: Coord2) {
        self.apply(|board| board.toggle_reveal(coords).map(|()| MarkOutcome::Changed));
    }

    pub fn toggle_flag(&mut self, coords: Coord2) {
        self.apply(|board| board.toggle_flag(coords).map(|()| MarkOutcome::Changed));
    }

    pub fn set_digit(&mut self, coords: Coord2, digit: u8) {
        self.apply(|board| board.set_digit(coords, digit));
    }

    pub fn toggle_dont_care(&mut self, coords: Coord2) {
        self.apply(|board| board.toggle_dont_care(coords));
    }

    pub fn scroll_up(&mut self, coords: Coord2) {
        self.apply(|board| board.scroll_up(coords));
    }

    pub fn scroll_down(&mut self, coords: Coord2) {
        self.apply(|board| board.scroll_down(coords));
    }

    /// Analysis has no preconditions in the sandbox.
    pub fn toggle_analysis(&mut self) -> bool {
        let enabled = self.analysis.toggle(Ok(())).unwrap_or(false);
        self.events.push(SessionEvent::AnalysisUpdated);
        enabled
    }

    pub fn toggle_endgame(&mut self) -> Result<bool, AnalysisRefusal> {
        let result = self.analysis.toggle_endgame();
        match &result {
            Ok(_) => self.events.push(SessionEvent::AnalysisUpdated),
            Err(refusal) => self.events.alert(refusal),
        }
        result
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain()
    }

    pub fn view(&self) -> BoardView {
        let (rows, cols) = self.board.size();
        let cells = iter_coords(self.board.size())
            .map(|coords| {
                let visibility = self.board.visibility(coords);
                let clue = self.board.clue(coords);
                let mut cell = CellView {
                    visibility,
                    ..Default::default()
                };
                if visibility.is_revealed() {
                    match clue {
                        SandboxClue::Count(count) => cell.count = Some(count),
                        SandboxClue::DontCare => cell.dont_care = true,
                    }
                }
                mark_analysis(&mut cell, coords, &self.analysis);
                cell
            })
            .collect();

        let flagged = self
            .board
            .visibility
            .iter()
            .filter(|&&visibility| visibility == Visibility::Flagged)
            .count();

        BoardView {
            rows,
            cols,
            cells,
            status: GameStatus::InProgress,
            mines_left: i32::from(self.board.mine_count()) - flagged as i32,
            elapsed_secs: 0,
            energy_pool: None,
            warp_phase: WarpPhase::Inactive,
            analysis_phase: self.analysis.phase(),
            endgame_mode: self.analysis.endgame_mode(),
            win_probability: self.analysis.endgame().win_probability,
        }
    }

    fn apply(&mut self, edit: impl FnOnce(&mut SandboxBoard) -> Result<MarkOutcome>) {
        match edit(&mut self.board) {
            Ok(outcome) if outcome.has_update() => self.board_mutated(),
            Ok(_) => {}
            Err(err) => log::debug!("Sandbox edit ignored: {err}"),
        }
    }

    fn board_mutated(&mut self) {
        self.analysis.invalidate();
        self.events.push(SessionEvent::BoardMutated);
    }
}

impl AnalysisHost for SandboxSession {
    fn analysis(&self) -> &AnalysisOrchestrator {
        &self.analysis
    }

    fn analysis_mut(&mut self) -> &mut AnalysisOrchestrator {
        &mut self.analysis
    }

    fn analysis_query(&self) -> Option<BoardQuery> {
        self.board.has_hidden_cells().then(|| self.board.encode())
    }

    fn analysis_updated(&mut self) {
        forward_notices(&mut self.analysis, &mut self.events);
    }
}
