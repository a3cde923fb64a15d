use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Spawn odds and values indexed by the revealed cell's adjacency count.
///
/// Cells next to more mines spawn energy more often and carry more of it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarpSchedule {
    pub spawn_rate: [f64; 9],
    pub spawn_value: [f64; 9],
}

impl Default for WarpSchedule {
    fn default() -> Self {
        Self {
            spawn_rate: [
                0.0002, 0.0005, 0.0010, 0.0019, 0.0039, 0.0156, 0.0625, 0.25, 1.0,
            ],
            spawn_value: [0.125, 0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0],
        }
    }
}

impl WarpSchedule {
    /// Rates outside `[0, 1]` and negative values are clamped so a hand-edited
    /// config cannot break spawning.
    pub fn sanitized(mut self) -> Self {
        for rate in &mut self.spawn_rate {
            *rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        }
        for value in &mut self.spawn_value {
            *value = if value.is_nan() { 0.0 } else { value.max(0.0) };
        }
        self
    }
}

/// Rolls energy for freshly revealed cells.
#[derive(Clone, Debug)]
pub struct EnergySpawner {
    schedule: WarpSchedule,
    rng: SmallRng,
}

impl EnergySpawner {
    pub fn new(schedule: WarpSchedule, seed: u64) -> Self {
        Self {
            schedule: schedule.sanitized(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn schedule(&self) -> &WarpSchedule {
        &self.schedule
    }

    /// Energy spawned on a cell revealed with adjacency `count`, if any.
    pub fn roll(&mut self, count: u8) -> Option<f64> {
        let index = usize::from(count);
        let rate = *self.schedule.spawn_rate.get(index)?;
        let value = *self.schedule.spawn_value.get(index)?;

        (value > 0.0 && self.rng.random_bool(rate)).then_some(value)
    }
}
