use serde::{Deserialize, Serialize};

use crate::*;
pub use random::*;

mod random;

pub trait MinefieldGenerator {
    fn generate(self, config: GameConfig) -> MineLayout;
}

/// How mines are laid out once the first cell is opened.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MinePlacement {
    /// Rejection-sampled layout that never covers the first opened cell.
    Random { seed: u64 },
    /// Fixed layout, applied verbatim. The first opened cell may be a mine.
    Preset(MineLayout),
}

impl MinePlacement {
    pub(crate) fn layout_for(self, config: GameConfig, start: Coord2) -> MineLayout {
        match self {
            Self::Random { seed } => RandomMinefieldGenerator::new(seed, start).generate(config),
            Self::Preset(layout) => layout,
        }
    }
}
