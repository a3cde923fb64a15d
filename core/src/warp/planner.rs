use ndarray::Array2;
use rand::prelude::*;

use crate::*;

/// Everything the planner needs, detached from the live session.
#[derive(Clone, Debug)]
pub struct WarpSnapshot {
    pub board: Board,
    pub intent: WarpIntent,
    pub pool: f64,
    pub board_generation: u64,
    pub seed: u64,
}

/// A priced, verified layout change ready to be applied.
#[derive(Clone, Debug, PartialEq)]
pub struct WarpPlan {
    pub intent: WarpIntent,
    pub cost: f64,
    /// `None` when the current layout already has the requested outcome for sure.
    pub layout: Option<MineLayout>,
    pub board_generation: u64,
}

/// Prices the staged intent and, if affordable, finds a mine layout where the
/// intent holds and every revealed number stays the same.
///
/// Hidden cells next to revealed ones are settled one at a time, preferring
/// their current truth. Cells deeper inside keep their mines, and random ones
/// are added or removed to restore the mine count.
pub async fn plan_warp<S>(snapshot: &WarpSnapshot, solver: &S) -> Result<WarpPlan, WarpError>
where
    S: MineSolver + ?Sized,
{
    let board = &snapshot.board;
    let intent = snapshot.intent;
    let coords = board
        .validate_coords(intent.coords)
        .map_err(|_| WarpError::NoIntent)?;
    if board.cell(coords).visibility.is_revealed() {
        return Err(WarpError::CellRevealed);
    }

    let base = BoardQuery::from_board(board, FlagSemantics::Soft);
    let current = query_probabilities(solver, &base).await?;
    let probability = current
        .probability(coords)
        .filter(|_| current.feasible)
        .ok_or(WarpError::Infeasible)?;

    let cost = WarpCost::for_outcome(probability, intent.outcome);
    let cost_value = cost.value().ok_or(WarpError::Blocked)?;
    if !cost.is_affordable(snapshot.pool) {
        return Err(WarpError::Unaffordable {
            cost: cost_value,
            pool: snapshot.pool,
        });
    }

    log::debug!(
        "Warp {:?} to {:?}: p = {}%, cost {}",
        coords,
        intent.outcome,
        probability,
        cost_value
    );

    if cost.is_free() {
        return Ok(WarpPlan {
            intent,
            cost: cost_value,
            layout: None,
            board_generation: snapshot.board_generation,
        });
    }

    let mut fixed: Array2<Option<bool>> = Array2::default(board.size().to_nd_index());
    fixed[coords.to_nd_index()] = Some(intent.outcome.is_mine());

    let counterfactual = conditioned(&base, &fixed);
    let solution = query_probabilities(solver, &counterfactual).await?;
    if !absorb_certainties(&base, &mut fixed, &solution) {
        return Err(WarpError::Infeasible);
    }

    let frontier: Vec<Coord2> = iter_coords(board.size())
        .filter(|&pos| board.is_frontier(pos))
        .collect();
    for pos in frontier {
        if fixed[pos.to_nd_index()].is_some() {
            continue;
        }

        let keep = board.cell(pos).is_mine();
        fixed[pos.to_nd_index()] = Some(keep);
        let attempt = conditioned(&base, &fixed);
        let solution = query_probabilities(solver, &attempt).await?;
        if absorb_certainties(&base, &mut fixed, &solution) {
            log::trace!("Warp repair keeps {:?} as {:?}", pos, WarpOutcome::from_mine(keep));
        } else {
            log::trace!("Warp repair flips {:?} to {:?}", pos, WarpOutcome::from_mine(!keep));
            fixed[pos.to_nd_index()] = Some(!keep);
        }
    }

    let layout = rebalance(board, &fixed, snapshot.seed)?;
    verify(board, &layout, intent)?;

    Ok(WarpPlan {
        intent,
        cost: cost_value,
        layout: Some(layout),
        board_generation: snapshot.board_generation,
    })
}

/// `base` with every fixed cell sent as a hypothetical.
fn conditioned(base: &BoardQuery, fixed: &Array2<Option<bool>>) -> BoardQuery {
    let mut query = base.clone();
    for coords in iter_coords(base.size()) {
        if let Some(is_mine) = fixed[coords.to_nd_index()] {
            query.set_cell(coords, WarpOutcome::from_mine(is_mine).forced_cell());
        }
    }
    query
}

/// Fixes hidden cells the solver is certain about. Returns `false` if infeasible.
fn absorb_certainties(
    base: &BoardQuery,
    fixed: &mut Array2<Option<bool>>,
    solution: &BoardSolution,
) -> bool {
    if !solution.feasible {
        return false;
    }

    for coords in iter_coords(base.size()) {
        let slot = &mut fixed[coords.to_nd_index()];
        if slot.is_some() || !base.cell(coords).is_hidden() {
            continue;
        }
        match solution.probability(coords) {
            Some(p) if p <= 0.0 => *slot = Some(false),
            Some(p) if p >= 100.0 => *slot = Some(true),
            _ => {}
        }
    }
    true
}

/// Builds the new layout and brings the mine count back to the board's total by
/// changing unfixed hidden cells at random.
fn rebalance(board: &Board, fixed: &Array2<Option<bool>>, seed: u64) -> Result<MineLayout, WarpError> {
    let mut layout = MineLayout::empty(board.size());
    let mut free = Vec::new();

    for (coords, cell) in board.iter_cells() {
        let is_mine = match fixed[coords.to_nd_index()] {
            Some(is_mine) => is_mine,
            None if cell.visibility.is_revealed() => false,
            None => {
                free.push(coords);
                cell.is_mine()
            }
        };
        layout.set_mine(coords, is_mine);
    }

    let target = board.mine_count();
    let adding = layout.mine_count() < target;
    let mut candidates: Vec<Coord2> = free
        .into_iter()
        .filter(|&coords| layout.contains_mine(coords) != adding)
        .collect();

    let mut rng = SmallRng::seed_from_u64(seed);
    while layout.mine_count() != target {
        if candidates.is_empty() {
            log::warn!(
                "Warp repair cannot reach {} mines, stuck at {}",
                target,
                layout.mine_count()
            );
            return Err(WarpError::Infeasible);
        }
        let pick = candidates.swap_remove(rng.random_range(0..candidates.len()));
        layout.set_mine(pick, adding);
    }

    Ok(layout)
}

fn verify(board: &Board, layout: &MineLayout, intent: WarpIntent) -> Result<(), WarpError> {
    let mut conflicts: Vec<Coord2> = board
        .iter_cells()
        .filter_map(|(coords, cell)| {
            let shown = cell.displayed_count()?;
            let consistent =
                !layout.contains_mine(coords) && layout.adjacent_mine_count(coords) == shown;
            (!consistent).then_some(coords)
        })
        .collect();

    if layout.contains_mine(intent.coords) != intent.outcome.is_mine() {
        conflicts.push(intent.coords);
    }

    if conflicts.is_empty() {
        Ok(())
    } else {
        log::warn!("Warp repair left {} conflicts", conflicts.len());
        Err(WarpError::RepairFailed { conflicts })
    }
}
