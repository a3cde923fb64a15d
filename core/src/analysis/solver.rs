use futures_util::future::LocalBoxFuture;
use minewarp_protocol::{BoardRequest, BoardResponse, EndgameResponse};
use thiserror::Error;

use crate::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("solver call failed: {0}")]
    Transport(String),
    #[error("solver returned {actual} probabilities for a board of {expected} cells")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("solver returned a non-finite probability at {0:?}")]
    NonFinite(Coord2),
    #[error("solver returned a non-finite win probability")]
    NonFiniteWinProbability,
    #[error("solver suggested move ({row}, {col}) outside the board")]
    MoveOutOfBounds { row: u32, col: u32 },
}

/// External constraint solver.
///
/// Calls may complete in any order; callers tag each request with a generation
/// and drop answers that arrive late.
pub trait MineSolver {
    fn solve_board<'a>(
        &'a self,
        request: &'a BoardRequest,
    ) -> LocalBoxFuture<'a, Result<BoardResponse, SolverError>>;

    fn solve_endgame<'a>(
        &'a self,
        request: &'a BoardRequest,
    ) -> LocalBoxFuture<'a, Result<EndgameResponse, SolverError>>;
}

/// Encodes `query`, asks for per-cell probabilities and validates the answer.
pub async fn query_probabilities<S>(
    solver: &S,
    query: &BoardQuery,
) -> Result<BoardSolution, SolverError>
where
    S: MineSolver + ?Sized,
{
    let request = query.to_request();
    let response = solver.solve_board(&request).await?;
    query.decode_board(response)
}

pub async fn query_endgame<S>(solver: &S, query: &BoardQuery) -> Result<EndgameSolution, SolverError>
where
    S: MineSolver + ?Sized,
{
    let request = query.to_request();
    let response = solver.solve_endgame(&request).await?;
    query.decode_endgame(response)
}
