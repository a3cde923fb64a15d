use core::cell::RefCell;

use crate::*;

/// Anything that owns an [`AnalysisOrchestrator`] and can encode its board.
pub trait AnalysisHost {
    fn analysis(&self) -> &AnalysisOrchestrator;

    fn analysis_mut(&mut self) -> &mut AnalysisOrchestrator;

    /// Current board for the solver, or `None` when no cell is left undecided.
    fn analysis_query(&self) -> Option<BoardQuery>;

    /// Called after the orchestrator changed; drain notices and redraw here.
    fn analysis_updated(&mut self);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Analysis is off.
    Idle,
    /// Nothing left to analyze; the overlay was cleared.
    Cleared,
    /// A newer request or a mode change made the answer obsolete.
    Discarded,
    Applied,
    Infeasible,
    Failed,
}

/// Runs one analysis cycle: snapshot the board, ask the solver, apply the answer.
///
/// The host is only borrowed around the synchronous steps, so the board can keep
/// changing while the solver works. Any such change supersedes this cycle.
pub async fn refresh_analysis<H, S>(host: &RefCell<H>, solver: &S) -> RefreshOutcome
where
    H: AnalysisHost,
    S: MineSolver + ?Sized,
{
    let ticket = {
        let mut host = host.borrow_mut();
        if !host.analysis().is_enabled() {
            return RefreshOutcome::Idle;
        }
        match host.analysis_query() {
            Some(query) => host.analysis_mut().begin_solve(query),
            None => {
                host.analysis_mut().clear();
                host.analysis_updated();
                return RefreshOutcome::Cleared;
            }
        }
    };
    let Some(ticket) = ticket else {
        return RefreshOutcome::Idle;
    };

    let result = query_probabilities(solver, ticket.query()).await;
    let disposition = {
        let mut host = host.borrow_mut();
        let disposition = host.analysis_mut().complete_solve(ticket, result);
        if disposition != SolveDisposition::Discarded {
            host.analysis_updated();
        }
        disposition
    };

    match disposition {
        SolveDisposition::Discarded => RefreshOutcome::Discarded,
        SolveDisposition::Applied => RefreshOutcome::Applied,
        SolveDisposition::Infeasible => RefreshOutcome::Infeasible,
        SolveDisposition::Failed => RefreshOutcome::Failed,
        SolveDisposition::NeedsEndgame(endgame) => {
            let result = query_endgame(solver, endgame.query()).await;
            let mut host = host.borrow_mut();
            if host.analysis_mut().complete_endgame(endgame, result) {
                host.analysis_updated();
                RefreshOutcome::Applied
            } else {
                RefreshOutcome::Discarded
            }
        }
    }
}
