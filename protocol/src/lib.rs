//! Wire records exchanged with the external mine-probability solver.
//!
//! Boards travel as a flat row-major `Vec<i32>` (`board[row * cols + col]`).
//! Non-negative values are revealed adjacency counts, negative values are the
//! sentinels below. The solver reads `CELL_FLAG` as a certain mine and
//! `CELL_SAFE` as a certain safe cell that carries no constraint.

use serde::{Deserialize, Serialize};

/// Hidden cell with no information.
pub const CELL_UNKNOWN: i32 = -1;

/// Cell known (or assumed) to be a mine.
pub const CELL_FLAG: i32 = -2;

/// Cell known (or assumed) to be safe, without an adjacency constraint.
pub const CELL_SAFE: i32 = -3;

/// Highest adjacency count a cell can carry.
pub const MAX_COUNT: i32 = 8;

/// Input shared by `solveBoard` and `solveEndgame`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardRequest {
    pub rows: u32,
    pub cols: u32,
    pub board: Vec<i32>,
    pub mines: u32,
}

impl BoardRequest {
    pub fn cell_count(&self) -> usize {
        (self.rows as usize) * (self.cols as usize)
    }

    /// Whether `board` has exactly `rows * cols` entries, all inside the sentinel/count range.
    pub fn is_well_formed(&self) -> bool {
        self.board.len() == self.cell_count()
            && self
                .board
                .iter()
                .all(|&value| (CELL_SAFE..=MAX_COUNT).contains(&value))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardResponse {
    /// `false` when no mine configuration satisfies the constraints and mine count.
    pub feasible: bool,
    /// Per-cell mine probability in percent, row-major. Empty when infeasible.
    #[serde(default)]
    pub probabilities: Vec<f32>,
    /// `true` when the unresolved region is small enough for exhaustive endgame search.
    #[serde(default)]
    pub endgame_eligible: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCoord {
    pub row: u32,
    pub col: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndgameResponse {
    pub feasible: bool,
    /// Probability of winning from the current position when playing optimally, in `[0, 1]`.
    #[serde(default)]
    pub win_probability: f32,
    #[serde(default)]
    pub best_move: Option<WireCoord>,
}

pub fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string(value)
}

pub fn from_json<'a, T: Deserialize<'a>>(json: &'a str) -> serde_json::Result<T> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_uses_camel_case_fields() {
        let json = r#"{"feasible":true,"probabilities":[0.0,100.0],"endgameEligible":true}"#;
        let response: BoardResponse = from_json(json).unwrap();

        assert!(response.feasible);
        assert!(response.endgame_eligible);
        assert_eq!(response.probabilities, vec![0.0, 100.0]);
    }

    #[test]
    fn infeasible_response_may_omit_probabilities() {
        let response: BoardResponse = from_json(r#"{"feasible":false}"#).unwrap();

        assert!(!response.feasible);
        assert!(response.probabilities.is_empty());
        assert!(!response.endgame_eligible);
    }

    #[test]
    fn endgame_response_carries_best_move() {
        let json = r#"{"feasible":true,"winProbability":0.5,"bestMove":{"row":1,"col":2}}"#;
        let response: EndgameResponse = from_json(json).unwrap();

        assert_eq!(response.best_move, Some(WireCoord { row: 1, col: 2 }));
        assert_eq!(response.win_probability, 0.5);
    }

    #[test]
    fn well_formed_checks_length_and_range() {
        let mut request = BoardRequest {
            rows: 1,
            cols: 3,
            board: vec![CELL_UNKNOWN, 2, CELL_SAFE],
            mines: 1,
        };
        assert!(request.is_well_formed());

        request.board.push(0);
        assert!(!request.is_well_formed());

        request.board = vec![CELL_UNKNOWN, 9, CELL_FLAG];
        assert!(!request.is_well_formed());
    }

    #[test]
    fn request_serializes_flat_board() {
        let request = BoardRequest {
            rows: 1,
            cols: 2,
            board: vec![CELL_FLAG, 1],
            mines: 1,
        };

        assert_eq!(
            to_json(&request).unwrap(),
            r#"{"rows":1,"cols":2,"board":[-2,1],"mines":1}"#
        );
    }
}
