//! Solvers and fixtures shared by unit tests.

use core::cell::RefCell;
use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use minewarp_protocol::{
    BoardRequest, BoardResponse, CELL_FLAG, CELL_UNKNOWN, EndgameResponse, WireCoord,
};

use crate::*;

/// Enumerates every mine layout of the unknown cells. Only usable on tiny boards.
#[derive(Debug)]
pub struct ExhaustiveSolver {
    /// Largest number of unknown cells that still counts as an endgame.
    pub endgame_limit: usize,
    pub requests: RefCell<Vec<BoardRequest>>,
}

impl Default for ExhaustiveSolver {
    fn default() -> Self {
        Self {
            endgame_limit: 8,
            requests: RefCell::default(),
        }
    }
}

impl ExhaustiveSolver {
    fn probabilities(&self, request: &BoardRequest) -> Option<Vec<f32>> {
        self.requests.borrow_mut().push(request.clone());

        let rows = request.rows as i64;
        let cols = request.cols as i64;
        let board = &request.board;
        let unknown: Vec<usize> = (0..board.len())
            .filter(|&idx| board[idx] == CELL_UNKNOWN)
            .collect();
        assert!(unknown.len() <= 20, "board too large to enumerate");

        let flags = board.iter().filter(|&&value| value == CELL_FLAG).count() as u32;
        let need = request.mines.checked_sub(flags)?;

        let mut hits = vec![0u64; unknown.len()];
        let mut total = 0u64;
        for mask in 0u32..(1 << unknown.len()) {
            if mask.count_ones() != need {
                continue;
            }
            let is_mine = |idx: usize| {
                board[idx] == CELL_FLAG
                    || unknown
                        .iter()
                        .position(|&u| u == idx)
                        .is_some_and(|bit| mask & (1 << bit) != 0)
            };
            let consistent = (0..board.len()).filter(|&idx| board[idx] >= 0).all(|idx| {
                let (row, col) = (idx as i64 / cols, idx as i64 % cols);
                let mut around = 0;
                for d_row in -1..=1 {
                    for d_col in -1..=1 {
                        let (r, c) = (row + d_row, col + d_col);
                        if (d_row, d_col) != (0, 0)
                            && (0..rows).contains(&r)
                            && (0..cols).contains(&c)
                            && is_mine((r * cols + c) as usize)
                        {
                            around += 1;
                        }
                    }
                }
                around == board[idx]
            });
            if consistent {
                total += 1;
                for (bit, hit) in hits.iter_mut().enumerate() {
                    if mask & (1 << bit) != 0 {
                        *hit += 1;
                    }
                }
            }
        }

        if total == 0 {
            return None;
        }

        let mut probabilities: Vec<f32> = board
            .iter()
            .map(|&value| if value == CELL_FLAG { 100.0 } else { 0.0 })
            .collect();
        for (bit, &idx) in unknown.iter().enumerate() {
            probabilities[idx] = (hits[bit] as f64 / total as f64 * 100.0) as f32;
        }
        Some(probabilities)
    }

    fn board_response(&self, request: &BoardRequest) -> BoardResponse {
        let unknown = request.board.iter().filter(|&&v| v == CELL_UNKNOWN).count();
        match self.probabilities(request) {
            Some(probabilities) => BoardResponse {
                feasible: true,
                probabilities,
                endgame_eligible: unknown <= self.endgame_limit,
            },
            None => BoardResponse {
                feasible: false,
                probabilities: Vec::new(),
                endgame_eligible: false,
            },
        }
    }

    /// Picks the safest unknown cell; its safety stands in for the win chance.
    fn endgame_response(&self, request: &BoardRequest) -> EndgameResponse {
        let Some(probabilities) = self.probabilities(request) else {
            return EndgameResponse {
                feasible: false,
                win_probability: 0.0,
                best_move: None,
            };
        };

        let best = (0..request.board.len())
            .filter(|&idx| request.board[idx] == CELL_UNKNOWN)
            .min_by(|&a, &b| probabilities[a].total_cmp(&probabilities[b]));

        EndgameResponse {
            feasible: true,
            win_probability: best.map_or(1.0, |idx| 1.0 - probabilities[idx] / 100.0),
            best_move: best.map(|idx| WireCoord {
                row: idx as u32 / request.cols,
                col: idx as u32 % request.cols,
            }),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl MineSolver for ExhaustiveSolver {
    fn solve_board<'a>(
        &'a self,
        request: &'a BoardRequest,
    ) -> LocalBoxFuture<'a, Result<BoardResponse, SolverError>> {
        async move { Ok(self.board_response(request)) }.boxed_local()
    }

    fn solve_endgame<'a>(
        &'a self,
        request: &'a BoardRequest,
    ) -> LocalBoxFuture<'a, Result<EndgameResponse, SolverError>> {
        async move { Ok(self.endgame_response(request)) }.boxed_local()
    }
}

/// Answers every cell with the same probability.
#[derive(Debug)]
pub struct FixedSolver {
    pub probability: f32,
}

impl MineSolver for FixedSolver {
    fn solve_board<'a>(
        &'a self,
        request: &'a BoardRequest,
    ) -> LocalBoxFuture<'a, Result<BoardResponse, SolverError>> {
        let response = BoardResponse {
            feasible: true,
            probabilities: vec![self.probability; request.cell_count()],
            endgame_eligible: false,
        };
        async move { Ok(response) }.boxed_local()
    }

    fn solve_endgame<'a>(
        &'a self,
        _request: &'a BoardRequest,
    ) -> LocalBoxFuture<'a, Result<EndgameResponse, SolverError>> {
        async move {
            Ok(EndgameResponse {
                feasible: false,
                win_probability: 0.0,
                best_move: None,
            })
        }
        .boxed_local()
    }
}

#[derive(Debug)]
pub struct FailingSolver;

impl MineSolver for FailingSolver {
    fn solve_board<'a>(
        &'a self,
        _request: &'a BoardRequest,
    ) -> LocalBoxFuture<'a, Result<BoardResponse, SolverError>> {
        async move { Err(SolverError::Transport("solver offline".into())) }.boxed_local()
    }

    fn solve_endgame<'a>(
        &'a self,
        _request: &'a BoardRequest,
    ) -> LocalBoxFuture<'a, Result<EndgameResponse, SolverError>> {
        async move { Err(SolverError::Transport("solver offline".into())) }.boxed_local()
    }
}

/// Changes the host's board while the first board solve is running, then
/// answers like [`ExhaustiveSolver`] for the board it was asked about.
pub struct MidSolveEdit<'h, H> {
    host: &'h RefCell<H>,
    edit: RefCell<Option<Box<dyn FnOnce(&mut H) + 'h>>>,
    inner: ExhaustiveSolver,
}

impl<'h, H> MidSolveEdit<'h, H> {
    pub fn new(host: &'h RefCell<H>, edit: impl FnOnce(&mut H) + 'h) -> Self {
        Self {
            host,
            edit: RefCell::new(Some(Box::new(edit))),
            inner: ExhaustiveSolver::default(),
        }
    }
}

impl<H> MineSolver for MidSolveEdit<'_, H> {
    fn solve_board<'a>(
        &'a self,
        request: &'a BoardRequest,
    ) -> LocalBoxFuture<'a, Result<BoardResponse, SolverError>> {
        let edit = self.edit.borrow_mut().take();
        if let Some(edit) = edit {
            edit(&mut *self.host.borrow_mut());
        }
        self.inner.solve_board(request)
    }

    fn solve_endgame<'a>(
        &'a self,
        request: &'a BoardRequest,
    ) -> LocalBoxFuture<'a, Result<EndgameResponse, SolverError>> {
        self.inner.solve_endgame(request)
    }
}

/// Engine with a fixed layout that has not been clicked yet.
pub fn preset_engine(size: Coord2, mines: &[Coord2]) -> PlayEngine {
    let layout = MineLayout::from_mine_coords(size, mines).unwrap();
    let config = GameConfig::new_unchecked(size, layout.mine_count());
    PlayEngine::new(config, MinePlacement::Preset(layout))
}
