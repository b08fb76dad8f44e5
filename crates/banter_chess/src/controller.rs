//! Game lifecycle: seating agents, starting a game and reporting on it.

use crate::agents::DecisionAgent;
use crate::config::ChessConfig;
use crate::coordinator::{AbortHandle, GameEvent, Seats, TurnCoordinator, TurnSettings};
use banter_board::{
    BoardManager, Color, GameState, Move, Outcome, Renderer, RulesEngine, Termination,
};
use derive_getters::Getters;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, instrument, warn};

/// Summary of a finished (or unstartable) game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct GameReport {
    /// False when the game could not start or was aborted.
    success: bool,
    /// Final snapshot.
    final_state: GameState,
    /// Final outcome.
    outcome: Outcome,
    /// How the game ended, if it ran.
    termination: Option<Termination>,
    /// Accepted plies.
    total_turns: u32,
    /// Agent solicitations, rejected ones included.
    solicitations: u32,
    /// Why the game did not complete.
    reason_if_aborted: Option<String>,
    /// Accepted moves in UCI order.
    moves: Vec<Move>,
}

impl GameReport {
    fn not_started(final_state: GameState, reason: String) -> Self {
        Self {
            success: false,
            outcome: final_state.outcome(),
            final_state,
            termination: None,
            total_turns: 0,
            solicitations: 0,
            reason_if_aborted: Some(reason),
            moves: Vec::new(),
        }
    }
}

/// Owns the board, the seats and the coordinator for one game at a time.
#[derive(Debug)]
pub struct GameController {
    config: ChessConfig,
    board: BoardManager,
    seats: Seats,
    coordinator: TurnCoordinator,
    abort: AbortHandle,
    agent_timeout: Option<Duration>,
    state_tx: watch::Sender<GameState>,
    events_tx: Option<mpsc::UnboundedSender<GameEvent>>,
}

impl GameController {
    /// Creates a controller with empty seats.
    #[instrument(skip(config, engine), fields(provider = %config.llm().provider(), model = %config.llm().model()))]
    pub fn new(config: ChessConfig, engine: Arc<dyn RulesEngine>) -> Self {
        let board = BoardManager::new(engine);
        info!("Game controller created");
        let state = board.game_state();
        let coordinator = TurnCoordinator::new(
            TurnSettings::from(config.game()),
            state.active_color(),
        );
        let (state_tx, _) = watch::channel(state);
        Self {
            config,
            board,
            seats: Seats::default(),
            coordinator,
            abort: AbortHandle::default(),
            agent_timeout: None,
            state_tx,
            events_tx: None,
        }
    }

    /// Seats both agents.
    pub fn with_agents(
        mut self,
        white: Box<dyn DecisionAgent>,
        black: Box<dyn DecisionAgent>,
    ) -> Self {
        self.seats = Seats::new(white, black);
        self
    }

    /// Attaches a board renderer; diagrams go to agents and events.
    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.board.set_renderer(renderer);
        self
    }

    /// Overrides the configured per-solicitation timeout.
    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = Some(timeout);
        self
    }

    /// Seats one agent.
    #[instrument(skip(self, agent), fields(agent = %agent.name()))]
    pub fn seat(&mut self, color: Color, agent: Box<dyn DecisionAgent>) {
        info!("Agent seated");
        self.seats.seat(color, agent);
    }

    /// Receives progress events for subsequent games.
    pub fn subscribe_events(&mut self) -> mpsc::UnboundedReceiver<GameEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events_tx = Some(tx);
        rx
    }

    /// Receives a snapshot after every solicitation.
    pub fn subscribe_state(&self) -> watch::Receiver<GameState> {
        self.state_tx.subscribe()
    }

    /// Handle that stops the running game at the next solicitation boundary.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Configuration in use.
    pub fn config(&self) -> &ChessConfig {
        &self.config
    }

    /// Board being played on.
    pub fn board(&self) -> &BoardManager {
        &self.board
    }

    /// Coordinator of the current (or last) game.
    pub fn coordinator(&self) -> &TurnCoordinator {
        &self.coordinator
    }

    /// Current snapshot.
    pub fn current_state(&self) -> GameState {
        self.coordinator.current_state(&self.board)
    }

    /// Whether the last started game has finished.
    pub fn is_over(&self) -> bool {
        self.coordinator.phase().is_over()
    }

    /// Winner of the finished game, if there is one.
    pub fn winner(&self) -> Option<Color> {
        if self.is_over() {
            self.current_state().outcome().winner()
        } else {
            None
        }
    }

    /// Plays a full game from the start position.
    ///
    /// `max_turns` overrides the configured ply ceiling. A game that cannot
    /// start comes back with `success == false` and the reason.
    #[instrument(skip(self))]
    pub async fn start(&mut self, max_turns: Option<u32>) -> GameReport {
        if let Err(reason) = self.prepare(max_turns) {
            warn!(%reason, "Game could not start");
            self.idle();
            return GameReport::not_started(self.current_state(), reason);
        }

        info!(
            white = self.seats.name(Color::White).unwrap_or_default(),
            black = self.seats.name(Color::Black).unwrap_or_default(),
            "Starting new game"
        );
        self.state_tx.send_replace(self.board.game_state());
        self.coordinator
            .run(&mut self.board, &mut self.seats, &self.abort)
            .await;

        let report = self.report();
        info!(
            outcome = %report.outcome,
            total_turns = report.total_turns,
            success = report.success,
            "Game completed"
        );
        report
    }

    fn prepare(&mut self, max_turns: Option<u32>) -> Result<(), String> {
        self.config.validate().map_err(|e| e.message)?;

        let missing: Vec<String> = [Color::White, Color::Black]
            .into_iter()
            .filter(|color| !self.seats.is_seated(*color))
            .map(|color| color.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(format!("No agent configured for {}", missing.join(" and ")));
        }

        let mut settings = TurnSettings::from(self.config.game());
        if let Some(max_turns) = max_turns {
            if max_turns == 0 {
                return Err("max_turns must be at least 1".to_string());
            }
            settings = settings.with_max_turns(max_turns);
        }
        if let Some(timeout) = self.agent_timeout {
            settings = settings.with_agent_timeout(timeout);
        }

        if let Some(fen) = self.config.game().start_fen() {
            let start = self
                .board
                .engine()
                .position_from_fen(fen)
                .map_err(|e| e.message)?;
            self.board.set_start_position(start);
        } else {
            self.board.reset();
        }

        self.abort.clear();
        let first = self.board.game_state().active_color();
        let mut coordinator =
            TurnCoordinator::new(settings, first).with_snapshots(self.state_tx.clone());
        if let Some(tx) = &self.events_tx {
            coordinator = coordinator.with_events(tx.clone());
        }
        self.coordinator = coordinator;
        Ok(())
    }

    /// Drops the previous game so nothing of it leaks into a failed start.
    fn idle(&mut self) {
        self.board.reset();
        let state = self.board.game_state();
        self.coordinator =
            TurnCoordinator::new(TurnSettings::from(self.config.game()), state.active_color());
        self.state_tx.send_replace(state);
    }

    fn report(&self) -> GameReport {
        let final_state = self.current_state();
        let termination = self.coordinator.termination().cloned();
        let reason_if_aborted = match &termination {
            Some(Termination::Aborted { reason }) => Some(reason.clone()),
            _ => None,
        };
        GameReport {
            success: reason_if_aborted.is_none(),
            outcome: final_state.outcome(),
            final_state,
            termination,
            total_turns: u32::try_from(self.board.history().len()).unwrap_or(u32::MAX),
            solicitations: self.coordinator.solicitations(),
            reason_if_aborted,
            moves: self.board.history().to_vec(),
        }
    }
}
