use serde::{Deserialize, Serialize};

use crate::*;

/// What the renderer needs for one cell.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct CellView {
    pub visibility: Visibility,
    /// Adjacency count, only for revealed cells.
    pub count: Option<u8>,
    /// Revealed mine, after a loss.
    pub mine: bool,
    /// The mine that ended the game.
    pub triggered: bool,
    /// Sandbox cell whose number is ignored.
    pub dont_care: bool,
    /// Mine probability in percent, only for hidden unflagged cells while analysis is on.
    pub probability: Option<f32>,
    pub best_move: bool,
    pub warp_intent: Option<WarpOutcome>,
    pub energy: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardView {
    pub rows: Coord,
    pub cols: Coord,
    /// Row-major.
    pub cells: Vec<CellView>,
    pub status: GameStatus,
    pub mines_left: i32,
    pub elapsed_secs: u64,
    /// Present in the warp variant.
    pub energy_pool: Option<f64>,
    pub warp_phase: WarpPhase,
    pub analysis_phase: AnalysisPhase,
    pub endgame_mode: bool,
    pub win_probability: Option<f32>,
}

impl BoardView {
    pub fn cell(&self, (row, col): Coord2) -> Option<&CellView> {
        if !in_bounds((row, col), (self.rows, self.cols)) {
            return None;
        }
        self.cells
            .get(usize::from(row) * usize::from(self.cols) + usize::from(col))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Fills in overlay probability and best-move marks from the orchestrator.
pub(crate) fn mark_analysis(cell: &mut CellView, coords: Coord2, analysis: &AnalysisOrchestrator) {
    if cell.visibility != Visibility::Unrevealed {
        return;
    }
    cell.probability = analysis.overlay().and_then(|overlay| overlay.get(coords));
    cell.best_move = analysis.endgame_mode() && analysis.endgame().best_move == Some(coords);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_lookup_is_row_major() {
        let cells = (0..6)
            .map(|n| CellView {
                count: Some(n),
                ..Default::default()
            })
            .collect();
        let view = BoardView {
            rows: 2,
            cols: 3,
            cells,
            status: GameStatus::InProgress,
            mines_left: 0,
            elapsed_secs: 0,
            energy_pool: None,
            warp_phase: WarpPhase::Inactive,
            analysis_phase: AnalysisPhase::Off,
            endgame_mode: false,
            win_probability: None,
        };

        assert_eq!(view.cell((1, 0)).unwrap().count, Some(3));
        assert_eq!(view.cell((0, 3)), None);
        assert!(view.to_json().unwrap().contains("\"mines_left\":0"));
    }
}
