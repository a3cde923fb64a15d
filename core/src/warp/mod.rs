//! Warp variant: energy economy and counterfactual mine rewrites.

pub use cost::*;
pub use energy::*;
pub use planner::*;
pub use state::*;

mod cost;
mod energy;
mod planner;
mod state;
