use super::*;

/// Uniform rejection sampling: draw random cells until enough distinct ones, other than
/// the start cell, hold a mine.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomMinefieldGenerator {
    seed: u64,
    start: Coord2,
}

impl RandomMinefieldGenerator {
    pub fn new(seed: u64, start: Coord2) -> Self {
        Self { seed, start }
    }
}

impl MinefieldGenerator for RandomMinefieldGenerator {
    fn generate(self, config: GameConfig) -> MineLayout {
        use rand::prelude::*;

        let (rows, cols) = config.size;
        let mut layout = MineLayout::empty(config.size);

        let free_cells = if in_bounds(self.start, config.size) {
            config.total_cells().saturating_sub(1)
        } else {
            config.total_cells()
        };
        let target = if config.mines > free_cells {
            log::warn!(
                "Minefield cannot fit {} mines next to a safe start, placing {}",
                config.mines,
                free_cells
            );
            free_cells
        } else {
            config.mines
        };

        let mut rng = SmallRng::seed_from_u64(self.seed);
        while layout.mine_count() < target {
            let coords = (rng.random_range(0..rows), rng.random_range(0..cols));
            if coords == self.start || layout.contains_mine(coords) {
                continue;
            }
            layout.set_mine(coords, true);
        }

        log::debug!(
            "Placed {} mines on {}x{} avoiding {:?}",
            layout.mine_count(),
            rows,
            cols,
            self.start
        );
        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn places_exact_mine_count() {
        let config = GameConfig::new((16, 30), 99);

        let layout = RandomMinefieldGenerator::new(42, (8, 15)).generate(config);

        assert_eq!(layout.mine_count(), 99);
        assert_eq!(layout.mine_coords().count(), 99);
    }

    #[test]
    fn never_mines_the_start_cell() {
        for seed in 0..200 {
            let config = GameConfig::new((4, 4), 15);
            let layout = RandomMinefieldGenerator::new(seed, (2, 1)).generate(config);

            assert!(!layout.contains_mine((2, 1)));
            assert_eq!(layout.mine_count(), 15);
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let config = GameConfig::new((9, 9), 10);

        let first = RandomMinefieldGenerator::new(7, (4, 4)).generate(config);
        let second = RandomMinefieldGenerator::new(7, (4, 4)).generate(config);

        assert_eq!(first, second);
    }

    #[test]
    fn overfull_request_is_capped() {
        let config = GameConfig::new_unchecked((2, 2), 4);

        let layout = RandomMinefieldGenerator::new(1, (0, 0)).generate(config);

        assert_eq!(layout.mine_count(), 3);
        assert!(!layout.contains_mine((0, 0)));
    }
}
