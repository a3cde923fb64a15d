use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    Won,
    Lost,
}

/// Signals for the embedding UI, drained after every call into a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    TimerTick { elapsed_secs: u64 },
    FlagsChanged { mines_left: i32 },
    GameOver { outcome: GameOutcome, elapsed_secs: u64 },
    EnergyChanged { pool: f64 },
    /// Board contents changed; analysis needs a refresh if it is on.
    BoardMutated,
    AnalysisUpdated,
    Alert(String),
}

/// Pending events in the order they were raised.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    events: Vec<SessionEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: SessionEvent) {
        self.events.push(event);
    }

    pub fn alert(&mut self, message: impl ToString) {
        self.push(SessionEvent::Alert(message.to_string()));
    }

    pub fn drain(&mut self) -> Vec<SessionEvent> {
        core::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionEvent> {
        self.events.iter()
    }
}

/// Moves orchestrator notices into the queue as alerts.
pub(crate) fn forward_notices(analysis: &mut AnalysisOrchestrator, events: &mut EventQueue) {
    for notice in analysis.drain_notices() {
        events.alert(notice);
    }
    events.push(SessionEvent::AnalysisUpdated);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_queue_in_order() {
        let mut queue = EventQueue::default();
        queue.push(SessionEvent::BoardMutated);
        queue.alert(AnalysisNotice::AllCoinFlips);

        let events = queue.drain();

        assert_eq!(
            events,
            vec![
                SessionEvent::BoardMutated,
                SessionEvent::Alert("Every remaining cell is a coin flip.".into()),
            ]
        );
        assert!(queue.is_empty());
    }
}
