//! Probability overlay: encoding boards for the external solver and deciding
//! which of its answers to show.

pub use codec::*;
pub use driver::*;
pub use orchestrator::*;
pub use solver::*;

mod codec;
mod driver;
mod orchestrator;
mod solver;
