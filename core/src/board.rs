use core::ops::Index;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// Grid of cell records: mine truth, what the player sees, and warp energy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    cells: Array2<Cell>,
    mine_count: CellCount,
    flagged_count: CellCount,
    mines_placed: bool,
}

impl Board {
    pub fn new(config: GameConfig) -> Self {
        Self {
            cells: Array2::default(config.size.to_nd_index()),
            mine_count: config.mines,
            flagged_count: 0,
            mines_placed: false,
        }
    }

    pub fn size(&self) -> Coord2 {
        grid_size(&self.cells)
    }

    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    pub fn flagged_count(&self) -> CellCount {
        self.flagged_count
    }

    /// Remaining-mines counter; negative when the player over-flags.
    pub fn mines_left(&self) -> i32 {
        i32::from(self.mine_count) - i32::from(self.flagged_count)
    }

    pub fn mines_placed(&self) -> bool {
        self.mines_placed
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        if in_bounds(coords, self.size()) {
            Ok(coords)
        } else {
            Err(GameError::InvalidCoords)
        }
    }

    pub fn cell(&self, coords: Coord2) -> &Cell {
        &self.cells[coords.to_nd_index()]
    }

    pub fn iter_neighbors(&self, coords: Coord2) -> NeighborIter {
        self.cells.iter_neighbors(coords)
    }

    pub fn count_neighbors(&self, coords: Coord2, pred: impl Fn(&Cell) -> bool) -> u8 {
        // at most 8 neighbours
        self.iter_neighbors(coords)
            .filter(|&pos| pred(self.cell(pos)))
            .count() as u8
    }

    /// Writes mine truth and adjacency counts from `layout`, keeping visibility and energy.
    pub fn apply_layout(&mut self, layout: &MineLayout) -> Result<()> {
        if layout.size() != self.size() {
            return Err(GameError::InvalidBoardShape);
        }

        for coords in iter_coords(self.size()) {
            self.cells[coords.to_nd_index()].truth = if layout.contains_mine(coords) {
                Truth::Mine
            } else {
                Truth::Count(layout.adjacent_mine_count(coords))
            };
        }
        self.mine_count = layout.mine_count();
        self.mines_placed = true;
        Ok(())
    }

    pub fn mine_layout(&self) -> MineLayout {
        MineLayout::from_mine_mask(self.cells.map(Cell::is_mine))
    }

    pub fn set_visibility(&mut self, coords: Coord2, visibility: Visibility) {
        let cell = &mut self.cells[coords.to_nd_index()];
        match (cell.visibility, visibility) {
            (Visibility::Flagged, Visibility::Flagged) => {}
            (Visibility::Flagged, _) => self.flagged_count -= 1,
            (_, Visibility::Flagged) => self.flagged_count += 1,
            _ => {}
        }
        cell.visibility = visibility;
    }

    pub fn set_energy(&mut self, coords: Coord2, energy: f64) {
        self.cells[coords.to_nd_index()].warp_energy = energy;
    }

    /// Takes whatever energy sits on the cell, leaving zero behind.
    pub fn take_energy(&mut self, coords: Coord2) -> f64 {
        core::mem::take(&mut self.cells[coords.to_nd_index()].warp_energy)
    }

    /// Non-mine cells the player still has to open.
    pub fn unrevealed_safe_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| !cell.is_mine() && !cell.visibility.is_revealed())
            .count()
    }

    pub fn revealed_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.visibility.is_revealed())
            .count()
    }

    pub fn iter_cells(&self) -> impl Iterator<Item = (Coord2, &Cell)> + '_ {
        iter_coords(self.size()).map(|coords| (coords, self.cell(coords)))
    }

    /// Unrevealed cells touching at least one revealed cell.
    pub fn is_frontier(&self, coords: Coord2) -> bool {
        self.cell(coords).visibility.is_unrevealed()
            && self
                .iter_neighbors(coords)
                .any(|pos| self.cell(pos).visibility.is_revealed())
    }
}

impl Index<Coord2> for Board {
    type Output = Cell;

    fn index(&self, coords: Coord2) -> &Self::Output {
        self.cell(coords)
    }
}
