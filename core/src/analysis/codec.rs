use minewarp_protocol::{
    BoardRequest, BoardResponse, CELL_FLAG, CELL_SAFE, CELL_UNKNOWN, EndgameResponse,
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// What a single cell tells the solver. Integers only appear in [`BoardQuery::to_request`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireCell {
    Count(u8),
    Unknown,
    Flagged,
    /// Revealed cell whose adjacency constraint the solver should ignore.
    DontCare,
    /// Hypothetical: assume this hidden cell is safe.
    ForceSafe,
    /// Hypothetical: assume this hidden cell is a mine.
    ForceMine,
}

impl WireCell {
    pub const fn to_wire(self) -> i32 {
        match self {
            Self::Count(count) => count as i32,
            Self::Unknown => CELL_UNKNOWN,
            Self::Flagged | Self::ForceMine => CELL_FLAG,
            Self::DontCare | Self::ForceSafe => CELL_SAFE,
        }
    }

    /// Cells that were hidden from the player when the board was encoded.
    pub const fn is_hidden(self) -> bool {
        matches!(self, Self::Unknown | Self::Flagged)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FlagSemantics {
    /// Player flags are sent as certain mines. A wrong flag makes the board infeasible.
    Strict,
    /// Player flags are sent as unknown cells.
    #[default]
    Soft,
}

/// A board encoded for the solver, together with the mine count it must satisfy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardQuery {
    cells: Array2<WireCell>,
    mine_count: CellCount,
}

impl BoardQuery {
    pub fn new(cells: Array2<WireCell>, mine_count: CellCount) -> Self {
        Self { cells, mine_count }
    }

    pub fn from_board(board: &Board, flags: FlagSemantics) -> Self {
        let cells = Array2::from_shape_fn(board.size().to_nd_index(), |(row, col)| {
            // indices come from a board of at most 255x255
            let cell = board.cell((row as Coord, col as Coord));
            match (cell.visibility, cell.truth) {
                (Visibility::Revealed, Truth::Count(count)) => WireCell::Count(count),
                (Visibility::Revealed, Truth::Mine) => WireCell::ForceMine,
                (Visibility::Flagged, _) => match flags {
                    FlagSemantics::Strict => WireCell::Flagged,
                    FlagSemantics::Soft => WireCell::Unknown,
                },
                (Visibility::Unrevealed, _) => WireCell::Unknown,
            }
        });
        Self::new(cells, board.mine_count())
    }

    pub fn size(&self) -> Coord2 {
        grid_size(&self.cells)
    }

    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    pub fn cell(&self, coords: Coord2) -> WireCell {
        self.cells[coords.to_nd_index()]
    }

    pub fn set_cell(&mut self, coords: Coord2, cell: WireCell) {
        self.cells[coords.to_nd_index()] = cell;
    }

    pub fn with_cell(mut self, coords: Coord2, cell: WireCell) -> Self {
        self.set_cell(coords, cell);
        self
    }

    pub fn has_hidden_cells(&self) -> bool {
        self.cells.iter().any(|cell| cell.is_hidden())
    }

    pub fn to_request(&self) -> BoardRequest {
        let (rows, cols) = self.size();
        BoardRequest {
            rows: rows.into(),
            cols: cols.into(),
            board: self.cells.iter().map(|cell| cell.to_wire()).collect(),
            mines: self.mine_count.into(),
        }
    }

    pub fn decode_board(&self, response: BoardResponse) -> Result<BoardSolution, SolverError> {
        if !response.feasible {
            return Ok(BoardSolution {
                feasible: false,
                probabilities: None,
                endgame_eligible: response.endgame_eligible,
            });
        }

        let expected = self.cells.len();
        if response.probabilities.len() != expected {
            return Err(SolverError::ShapeMismatch {
                expected,
                actual: response.probabilities.len(),
            });
        }

        let mut probabilities =
            Array2::from_shape_vec(self.cells.raw_dim(), response.probabilities).map_err(|_| {
                SolverError::ShapeMismatch {
                    expected,
                    actual: expected,
                }
            })?;

        for (coords, value) in iter_coords(self.size()).zip(probabilities.iter_mut()) {
            if !value.is_finite() {
                return Err(SolverError::NonFinite(coords));
            }
            *value = value.clamp(0.0, 100.0);
        }

        Ok(BoardSolution {
            feasible: true,
            probabilities: Some(probabilities),
            endgame_eligible: response.endgame_eligible,
        })
    }

    pub fn decode_endgame(
        &self,
        response: EndgameResponse,
    ) -> Result<EndgameSolution, SolverError> {
        if !response.feasible {
            return Ok(EndgameSolution::default());
        }

        if !response.win_probability.is_finite() {
            return Err(SolverError::NonFiniteWinProbability);
        }

        let best_move = response
            .best_move
            .map(|wire| {
                let coords = (
                    Coord::try_from(wire.row).ok(),
                    Coord::try_from(wire.col).ok(),
                );
                match coords {
                    (Some(row), Some(col)) if in_bounds((row, col), self.size()) => Ok((row, col)),
                    _ => Err(SolverError::MoveOutOfBounds {
                        row: wire.row,
                        col: wire.col,
                    }),
                }
            })
            .transpose()?;

        Ok(EndgameSolution {
            feasible: true,
            win_probability: Some(response.win_probability.clamp(0.0, 1.0)),
            best_move,
        })
    }
}

/// Decoded `solveBoard` result.
#[derive(Clone, Debug, PartialEq)]
pub struct BoardSolution {
    pub feasible: bool,
    /// Mine probability in percent for every cell, present when feasible.
    pub probabilities: Option<Array2<f32>>,
    pub endgame_eligible: bool,
}

impl BoardSolution {
    pub fn probability(&self, coords: Coord2) -> Option<f32> {
        self.probabilities
            .as_ref()
            .map(|probabilities| probabilities[coords.to_nd_index()])
    }
}

/// Decoded `solveEndgame` result.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct EndgameSolution {
    pub feasible: bool,
    pub win_probability: Option<f32>,
    pub best_move: Option<Coord2>,
}

/// Per-cell mine probability shown while analysis is on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityOverlay {
    values: Array2<Option<f32>>,
}

impl ProbabilityOverlay {
    /// Keeps probabilities only for cells that were hidden in `query`.
    pub fn from_solution(query: &BoardQuery, probabilities: &Array2<f32>) -> Self {
        let mut values = probabilities.map(|&value| Some(value));
        for (value, cell) in values.iter_mut().zip(query.cells.iter()) {
            if !cell.is_hidden() {
                *value = None;
            }
        }
        Self { values }
    }

    pub fn size(&self) -> Coord2 {
        grid_size(&self.values)
    }

    pub fn get(&self, coords: Coord2) -> Option<f32> {
        self.values.get(coords.to_nd_index()).copied().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Coord2, f32)> + '_ {
        iter_coords(self.size()).filter_map(|coords| Some((coords, self.get(coords)?)))
    }
}

/// Whether every undecided (unknown, unflagged) cell sits at exactly 50%.
pub fn all_coin_flips(query: &BoardQuery, probabilities: &Array2<f32>) -> bool {
    let mut undecided = query
        .cells
        .iter()
        .zip(probabilities.iter())
        .filter(|(cell, _)| matches!(cell, WireCell::Unknown))
        .map(|(_, &value)| value)
        .peekable();

    undecided.peek().is_some() && undecided.all(|value| value == 50.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minewarp_protocol::WireCoord;

    fn started_board() -> Board {
        let mut board = Board::new(GameConfig::new((2, 3), 1));
        let layout = MineLayout::from_mine_coords((2, 3), &[(0, 0)]).unwrap();
        board.apply_layout(&layout).unwrap();
        board.set_visibility((1, 1), Visibility::Revealed);
        board.set_visibility((1, 2), Visibility::Revealed);
        board.set_visibility((0, 0), Visibility::Flagged);
        board
    }

    #[test]
    fn encodes_row_major_with_sentinels() {
        let query = BoardQuery::from_board(&started_board(), FlagSemantics::Strict);

        let request = query.to_request();

        assert_eq!((request.rows, request.cols, request.mines), (2, 3, 1));
        assert_eq!(request.board, vec![-2, -1, -1, -1, 1, 0]);
        assert!(request.is_well_formed());
    }

    #[test]
    fn soft_flags_are_sent_as_unknown() {
        let query = BoardQuery::from_board(&started_board(), FlagSemantics::Soft);

        assert_eq!(query.cell((0, 0)), WireCell::Unknown);
    }

    #[test]
    fn counterfactual_cells_share_the_solver_sentinels() {
        assert_eq!(WireCell::ForceSafe.to_wire(), WireCell::DontCare.to_wire());
        assert_eq!(WireCell::ForceMine.to_wire(), WireCell::Flagged.to_wire());
        assert_eq!(WireCell::Count(8).to_wire(), 8);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let query = BoardQuery::from_board(&started_board(), FlagSemantics::Strict);
        let response = BoardResponse {
            feasible: true,
            probabilities: vec![0.0; 5],
            endgame_eligible: false,
        };

        assert_eq!(
            query.decode_board(response),
            Err(SolverError::ShapeMismatch {
                expected: 6,
                actual: 5
            })
        );
    }

    #[test]
    fn decode_clamps_and_rejects_nan() {
        let query = BoardQuery::from_board(&started_board(), FlagSemantics::Strict);
        let clamped = query
            .decode_board(BoardResponse {
                feasible: true,
                probabilities: vec![100.0, 120.0, -3.0, 50.0, 0.0, 0.0],
                endgame_eligible: true,
            })
            .unwrap();

        assert_eq!(clamped.probability((0, 1)), Some(100.0));
        assert_eq!(clamped.probability((0, 2)), Some(0.0));
        assert!(clamped.endgame_eligible);

        let broken = query.decode_board(BoardResponse {
            feasible: true,
            probabilities: vec![0.0, f32::NAN, 0.0, 0.0, 0.0, 0.0],
            endgame_eligible: false,
        });
        assert_eq!(broken, Err(SolverError::NonFinite((0, 1))));
    }

    #[test]
    fn infeasible_decodes_without_probabilities() {
        let query = BoardQuery::from_board(&started_board(), FlagSemantics::Strict);

        let solution = query
            .decode_board(BoardResponse {
                feasible: false,
                probabilities: Vec::new(),
                endgame_eligible: false,
            })
            .unwrap();

        assert!(!solution.feasible);
        assert_eq!(solution.probabilities, None);
    }

    #[test]
    fn overlay_only_covers_hidden_cells() {
        let query = BoardQuery::from_board(&started_board(), FlagSemantics::Strict);
        let probabilities =
            Array2::from_shape_vec([2, 3], vec![100.0, 25.0, 25.0, 50.0, 0.0, 0.0]).unwrap();

        let overlay = ProbabilityOverlay::from_solution(&query, &probabilities);

        assert_eq!(overlay.get((0, 0)), Some(100.0));
        assert_eq!(overlay.get((0, 1)), Some(25.0));
        assert_eq!(overlay.get((1, 1)), None);
        assert_eq!(overlay.get((5, 5)), None);
        assert_eq!(overlay.iter().count(), 4);
    }

    #[test]
    fn coin_flips_ignore_flags() {
        let query = BoardQuery::from_board(&started_board(), FlagSemantics::Strict);
        let even =
            Array2::from_shape_vec([2, 3], vec![100.0, 50.0, 50.0, 50.0, 0.0, 0.0]).unwrap();
        let uneven =
            Array2::from_shape_vec([2, 3], vec![100.0, 50.0, 25.0, 50.0, 0.0, 0.0]).unwrap();

        assert!(all_coin_flips(&query, &even));
        assert!(!all_coin_flips(&query, &uneven));
    }

    #[test]
    fn endgame_decode_validates_move() {
        let query = BoardQuery::from_board(&started_board(), FlagSemantics::Strict);

        let solution = query
            .decode_endgame(EndgameResponse {
                feasible: true,
                win_probability: 1.5,
                best_move: Some(WireCoord { row: 0, col: 2 }),
            })
            .unwrap();
        assert_eq!(solution.best_move, Some((0, 2)));
        assert_eq!(solution.win_probability, Some(1.0));

        let outside = query.decode_endgame(EndgameResponse {
            feasible: true,
            win_probability: 0.5,
            best_move: Some(WireCoord { row: 2, col: 0 }),
        });
        assert_eq!(outside, Err(SolverError::MoveOutOfBounds { row: 2, col: 0 }));
    }
}
