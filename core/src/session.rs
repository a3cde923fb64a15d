use core::cell::RefCell;
use core::time::Duration;
use web_time::Instant;

use crate::*;

/// Game clock: starts on the first reveal, freezes when the game ends.
#[derive(Clone, Debug, Default)]
struct GameClock {
    started: Option<Instant>,
    frozen: Option<Duration>,
}

impl GameClock {
    fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    fn stop(&mut self) {
        if self.frozen.is_none() {
            self.frozen = Some(self.elapsed());
        }
    }

    fn is_running(&self) -> bool {
        self.started.is_some() && self.frozen.is_none()
    }

    fn elapsed(&self) -> Duration {
        self.frozen
            .or_else(|| self.started.map(|started| started.elapsed()))
            .unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug)]
struct Checkpoint {
    status: GameStatus,
    mines_left: i32,
}

/// One game: the engine, its analysis overlay and the warp state, plus the
/// signals the UI has not picked up yet.
#[derive(Clone, Debug)]
pub struct GameSession {
    config: SessionConfig,
    template: MinePlacement,
    round: u64,
    engine: PlayEngine,
    analysis: AnalysisOrchestrator,
    warp: WarpEngine,
    events: EventQueue,
    board_generation: u64,
    clock: GameClock,
}

impl GameSession {
    pub fn new(config: SessionConfig) -> Self {
        let template = MinePlacement::Random { seed: config.seed };
        Self::with_placement(config, template)
    }

    /// A preset layout also decides the board size and mine count.
    ///
    /// Preset mines are used as given, so unlike a random deal the first
    /// reveal may hit one. Meant for puzzles, replays and tests.
    pub fn with_placement(config: SessionConfig, template: MinePlacement) -> Self {
        let engine = Self::build_engine(&config, template.clone(), 0);
        Self {
            config,
            template,
            round: 0,
            engine,
            analysis: AnalysisOrchestrator::new(),
            warp: WarpEngine::new(),
            events: EventQueue::default(),
            board_generation: 0,
            clock: GameClock::default(),
        }
    }

    fn build_engine(config: &SessionConfig, template: MinePlacement, round: u64) -> PlayEngine {
        let (game, placement) = match template {
            MinePlacement::Random { seed } => (
                config.game(),
                MinePlacement::Random {
                    seed: seed.wrapping_add(round),
                },
            ),
            MinePlacement::Preset(layout) => (
                GameConfig::new_unchecked(layout.size(), layout.mine_count()),
                MinePlacement::Preset(layout),
            ),
        };

        let engine = PlayEngine::new(game, placement);
        match config.variant {
            GameVariant::Classic => engine,
            GameVariant::Warp => engine.with_energy(EnergySpawner::new(
                config.warp.clone(),
                config.seed.wrapping_add(round).rotate_left(17),
            )),
        }
    }

    /// Throws the board away and deals a new one with the same settings.
    pub fn restart(&mut self) {
        self.round += 1;
        self.engine = Self::build_engine(&self.config, self.template.clone(), self.round);
        self.analysis.turn_off();
        self.warp = WarpEngine::new();
        self.clock = GameClock::default();
        self.board_generation += 1;
        self.events.push(SessionEvent::BoardMutated);
        self.events.push(SessionEvent::FlagsChanged {
            mines_left: self.engine.mines_left(),
        });
        self.events.push(SessionEvent::EnergyChanged { pool: 0.0 });
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn engine(&self) -> &PlayEngine {
        &self.engine
    }

    pub fn status(&self) -> GameStatus {
        self.engine.status()
    }

    pub fn warp(&self) -> &WarpEngine {
        &self.warp
    }

    pub fn board_generation(&self) -> u64 {
        self.board_generation
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain()
    }

    pub fn reveal(&mut self, coords: Coord2) -> RevealOutcome {
        if self.warp.phase() != WarpPhase::Inactive {
            log::debug!("Reveal ignored in warp mode");
            return RevealOutcome::NoChange;
        }
        let before = self.checkpoint();
        let outcome = self.engine.reveal(coords).unwrap_or_else(|err| {
            log::debug!("Reveal at {coords:?} ignored: {err}");
            RevealOutcome::NoChange
        });
        self.settle(before, outcome.has_update());
        outcome
    }

    pub fn chord(&mut self, coords: Coord2) -> RevealOutcome {
        if self.warp.phase() != WarpPhase::Inactive {
            log::debug!("Chord ignored in warp mode");
            return RevealOutcome::NoChange;
        }
        let before = self.checkpoint();
        let outcome = self.engine.chord(coords).unwrap_or_else(|err| {
            log::debug!("Chord at {coords:?} ignored: {err}");
            RevealOutcome::NoChange
        });
        self.settle(before, outcome.has_update());
        outcome
    }

    pub fn toggle_flag(&mut self, coords: Coord2) -> MarkOutcome {
        if self.warp.phase() != WarpPhase::Inactive {
            log::debug!("Flag ignored in warp mode");
            return MarkOutcome::NoChange;
        }
        let before = self.checkpoint();
        let outcome = self.engine.toggle_flag(coords).unwrap_or_else(|err| {
            log::debug!("Flag at {coords:?} ignored: {err}");
            MarkOutcome::NoChange
        });
        self.settle(before, outcome.has_update());
        outcome
    }

    /// Picks up energy from a revealed cell into the pool. Works in warp mode too.
    pub fn collect_energy(&mut self, coords: Coord2) -> f64 {
        if self.config.variant != GameVariant::Warp {
            return 0.0;
        }
        let amount = self.engine.collect_energy(coords).unwrap_or_else(|err| {
            log::debug!("Energy pickup at {coords:?} ignored: {err}");
            0.0
        });
        if amount > 0.0 {
            self.warp.deposit(amount);
            self.events.push(SessionEvent::EnergyChanged {
                pool: self.warp.pool(),
            });
        }
        amount
    }

    /// Pushes a timer tick while the clock runs. Returns whole elapsed seconds.
    pub fn tick(&mut self) -> u64 {
        let elapsed_secs = self.clock.elapsed().as_secs();
        if self.clock.is_running() {
            self.events.push(SessionEvent::TimerTick { elapsed_secs });
        }
        elapsed_secs
    }

    pub fn toggle_analysis(&mut self) -> Result<bool, AnalysisRefusal> {
        let readiness = match self.engine.status() {
            GameStatus::NotStarted => Err(AnalysisRefusal::NotStarted),
            GameStatus::Won | GameStatus::Lost => Err(AnalysisRefusal::GameOver),
            GameStatus::InProgress => Ok(()),
        };
        let result = self.analysis.toggle(readiness);
        self.report(&result);
        result
    }

    pub fn toggle_endgame(&mut self) -> Result<bool, AnalysisRefusal> {
        let result = self.analysis.toggle_endgame();
        self.report(&result);
        result
    }

    pub fn toggle_warp_mode(&mut self) -> Result<bool, WarpError> {
        let result = self.check_warp_variant().and_then(|()| match self.warp.phase() {
            WarpPhase::Inactive => self.warp.enter(self.engine.status()).map(|()| true),
            WarpPhase::Staging | WarpPhase::Committing => self.warp.exit().map(|()| false),
        });
        if let Err(err) = &result {
            self.events.alert(err);
        }
        result
    }

    /// Stages, replaces or clears the warp intent. Returns what is staged afterwards.
    pub fn stage_warp(
        &mut self,
        coords: Coord2,
        outcome: WarpOutcome,
    ) -> Result<Option<WarpIntent>, WarpError> {
        self.check_warp_variant()?;
        let Ok(coords) = self.engine.board().validate_coords(coords) else {
            log::debug!("Warp target {coords:?} outside the board");
            return Ok(self.warp.intent());
        };
        let visibility = self.engine.cell_at(coords).visibility;
        self.warp.stage(WarpIntent::new(coords, outcome), visibility)
    }

    /// Locks the staged intent and copies what the planner needs.
    pub fn begin_warp(&mut self) -> Result<WarpSnapshot, WarpError> {
        self.check_warp_variant()?;
        if self.engine.is_finished() {
            return Err(WarpError::GameOver);
        }
        let intent = self.warp.begin_commit()?;
        Ok(WarpSnapshot {
            board: self.engine.board().clone(),
            intent,
            pool: self.warp.pool(),
            board_generation: self.board_generation,
            seed: self
                .config
                .seed
                .wrapping_add(self.round)
                .wrapping_add(self.board_generation),
        })
    }

    /// Applies a finished plan, or puts the intent back on failure.
    pub fn finish_warp(&mut self, plan: Result<WarpPlan, WarpError>) -> Result<RevealOutcome, WarpError> {
        let result = plan.and_then(|plan| self.apply_warp(plan));
        if let Err(err) = &result {
            log::debug!("Warp refused: {err}");
            self.warp.abort_commit();
            self.events.alert(err);
        }
        result
    }

    fn apply_warp(&mut self, plan: WarpPlan) -> Result<RevealOutcome, WarpError> {
        if plan.board_generation != self.board_generation || self.engine.is_finished() {
            return Err(WarpError::Stale);
        }

        let before = self.checkpoint();
        if let Some(layout) = &plan.layout {
            self.engine.rewrite_mines(layout).map_err(|err| {
                log::error!("Warp layout rejected: {err}");
                WarpError::Stale
            })?;
        }

        let coords = plan.intent.coords;
        let outcome = match plan.intent.outcome {
            WarpOutcome::Safe => {
                if self.engine.cell_at(coords).visibility == Visibility::Flagged {
                    self.engine.toggle_flag(coords).map_err(|_| WarpError::Stale)?;
                }
                self.engine.reveal(coords).map_err(|_| WarpError::Stale)?
            }
            WarpOutcome::Mine => {
                self.engine.mark_flagged(coords).map_err(|_| WarpError::Stale)?;
                RevealOutcome::Revealed
            }
        };

        log::debug!("Warp committed at {:?} for {}", coords, plan.cost);
        self.warp.finish_commit(plan.cost);
        self.events.push(SessionEvent::EnergyChanged {
            pool: self.warp.pool(),
        });
        self.settle(before, true);
        Ok(outcome)
    }

    pub fn view(&self) -> BoardView {
        let (rows, cols) = self.engine.size();
        let intent = self
            .warp
            .intent()
            .filter(|_| self.warp.phase() != WarpPhase::Inactive);

        let cells = self
            .engine
            .board()
            .iter_cells()
            .map(|(coords, cell)| {
                let revealed = cell.visibility.is_revealed();
                let mut view = CellView {
                    visibility: cell.visibility,
                    count: cell.displayed_count(),
                    mine: revealed && cell.is_mine(),
                    triggered: self.engine.triggered_mine() == Some(coords),
                    warp_intent: intent
                        .filter(|intent| intent.coords == coords)
                        .map(|intent| intent.outcome),
                    energy: cell.warp_energy,
                    ..Default::default()
                };
                mark_analysis(&mut view, coords, &self.analysis);
                view
            })
            .collect();

        BoardView {
            rows,
            cols,
            cells,
            status: self.engine.status(),
            mines_left: self.engine.mines_left(),
            elapsed_secs: self.clock.elapsed().as_secs(),
            energy_pool: (self.config.variant == GameVariant::Warp).then_some(self.warp.pool()),
            warp_phase: self.warp.phase(),
            analysis_phase: self.analysis.phase(),
            endgame_mode: self.analysis.endgame_mode(),
            win_probability: self.analysis.endgame().win_probability,
        }
    }

    fn check_warp_variant(&self) -> Result<(), WarpError> {
        match self.config.variant {
            GameVariant::Warp => Ok(()),
            GameVariant::Classic => Err(WarpError::NotAvailable),
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            status: self.engine.status(),
            mines_left: self.engine.mines_left(),
        }
    }

    /// Raises the signals implied by a move and handles the start and end of the game.
    fn settle(&mut self, before: Checkpoint, changed: bool) {
        let status = self.engine.status();
        if !before.status.is_started() && status.is_started() {
            self.clock.start();
        }

        if self.engine.mines_left() != before.mines_left {
            self.events.push(SessionEvent::FlagsChanged {
                mines_left: self.engine.mines_left(),
            });
        }

        if changed {
            self.board_generation += 1;
            self.analysis.invalidate();
            self.events.push(SessionEvent::BoardMutated);
        }

        if !before.status.is_finished() && status.is_finished() {
            self.clock.stop();
            self.analysis.turn_off();
            self.warp.force_inactive();
            let outcome = match status {
                GameStatus::Won => GameOutcome::Won,
                _ => GameOutcome::Lost,
            };
            self.events.push(SessionEvent::GameOver {
                outcome,
                elapsed_secs: self.clock.elapsed().as_secs(),
            });
            self.events.push(SessionEvent::AnalysisUpdated);
        }
    }

    fn report<T>(&mut self, result: &Result<T, AnalysisRefusal>) {
        match result {
            Ok(_) => self.events.push(SessionEvent::AnalysisUpdated),
            Err(refusal) => self.events.alert(refusal),
        }
    }
}

impl AnalysisHost for GameSession {
    fn analysis(&self) -> &AnalysisOrchestrator {
        &self.analysis
    }

    fn analysis_mut(&mut self) -> &mut AnalysisOrchestrator {
        &mut self.analysis
    }

    fn analysis_query(&self) -> Option<BoardQuery> {
        if self.engine.status() != GameStatus::InProgress {
            return None;
        }
        let query = BoardQuery::from_board(self.engine.board(), self.config.analysis.flag_semantics);
        query.has_hidden_cells().then_some(query)
    }

    fn analysis_updated(&mut self) {
        forward_notices(&mut self.analysis, &mut self.events);
    }
}

/// Plans and applies the staged warp. The session is only borrowed before and
/// after the solver calls.
pub async fn commit_warp<S>(session: &RefCell<GameSession>, solver: &S) -> Result<RevealOutcome, WarpError>
where
    S: MineSolver + ?Sized,
{
    let snapshot = {
        let mut session = session.borrow_mut();
        let snapshot = session.begin_warp();
        if let Err(err) = &snapshot {
            session.events.alert(err);
        }
        snapshot?
    };
    let plan = plan_warp(&snapshot, solver).await;
    session.borrow_mut().finish_warp(plan)
}
