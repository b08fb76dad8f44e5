//! Turn coordination between two agents.
//!
//! One turn is one accepted move (a ply). Within a turn the side to move may
//! be asked several times: every rejected proposal is fed back as the reason
//! for the next solicitation, until the retry budget runs out and the side
//! forfeits.

use crate::agents::{AgentError, DecisionAgent, MoveRequest};
use crate::config::GameSettings;
use banter_board::{
    BoardManager, Color, GameState, Move, MoveResult, Outcome, RulesError, Termination,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// Where the game loop stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum TurnPhase {
    /// Waiting for the first proposal of a turn.
    #[display("awaiting move from {}", _0)]
    AwaitingMove(Color),
    /// A proposal was rejected; waiting for another.
    #[display("awaiting retry from {} after {} attempt(s)", color, attempts_used)]
    AwaitingRetry {
        /// Side to move.
        color: Color,
        /// Solicitations already spent this turn.
        attempts_used: u32,
    },
    /// A move was accepted; terminal checks pending.
    #[display("turn resolved for {}", _0)]
    TurnResolved(Color),
    /// Nothing more will be solicited.
    #[display("game over ({})", _0)]
    GameOver(Outcome),
}

impl TurnPhase {
    /// Whether the game has finished.
    pub fn is_over(self) -> bool {
        matches!(self, Self::GameOver(_))
    }

    /// Side being asked for a move, if any.
    pub fn color_to_move(self) -> Option<Color> {
        match self {
            Self::AwaitingMove(color) | Self::AwaitingRetry { color, .. } => Some(color),
            Self::TurnResolved(_) | Self::GameOver(_) => None,
        }
    }
}

/// Bookkeeping for the turn in progress. Discarded when the turn resolves.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct TurnRecord {
    color: Color,
    attempts_used: u32,
    commentary_exchanged: bool,
}

impl TurnRecord {
    fn new(color: Color) -> Self {
        Self {
            color,
            attempts_used: 0,
            commentary_exchanged: false,
        }
    }
}

/// Progress notifications for observers.
#[derive(Debug, Clone)]
pub enum GameEvent {
    /// An agent is being asked for a move.
    TurnStarted {
        /// Side to move.
        color: Color,
        /// Agent name.
        agent: String,
        /// 1-based solicitation number within the turn.
        attempt: u32,
    },
    /// A proposal was turned down.
    MoveRejected {
        /// Side to move.
        color: Color,
        /// Agent name.
        agent: String,
        /// What the agent sent.
        proposal: String,
        /// The board's verdict.
        result: MoveResult,
    },
    /// A move was accepted.
    MoveMade {
        /// Side that moved.
        color: Color,
        /// Agent name.
        agent: String,
        /// The board's verdict.
        result: MoveResult,
        /// Position after the move.
        state: GameState,
    },
    /// An agent said something.
    Commentary {
        /// Speaker.
        color: Color,
        /// Agent name.
        agent: String,
        /// What was said.
        text: String,
    },
    /// The game finished.
    GameOver {
        /// Final outcome.
        outcome: Outcome,
        /// How it ended.
        termination: Termination,
        /// Final snapshot.
        state: GameState,
    },
}

/// The two seats. A game cannot start until both are filled.
#[derive(Default)]
pub struct Seats {
    white: Option<Box<dyn DecisionAgent>>,
    black: Option<Box<dyn DecisionAgent>>,
}

impl std::fmt::Debug for Seats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Seats")
            .field("white", &self.white.as_ref().map(|a| a.name().to_string()))
            .field("black", &self.black.as_ref().map(|a| a.name().to_string()))
            .finish()
    }
}

impl Seats {
    /// Seats both agents.
    pub fn new(white: Box<dyn DecisionAgent>, black: Box<dyn DecisionAgent>) -> Self {
        Self {
            white: Some(white),
            black: Some(black),
        }
    }

    /// Puts `agent` in `color`'s seat, replacing any previous occupant.
    pub fn seat(&mut self, color: Color, agent: Box<dyn DecisionAgent>) {
        *self.slot(color) = Some(agent);
    }

    /// Whether `color` has an agent.
    pub fn is_seated(&self, color: Color) -> bool {
        match color {
            Color::White => self.white.is_some(),
            Color::Black => self.black.is_some(),
        }
    }

    /// Name of the agent playing `color`.
    pub fn name(&self, color: Color) -> Option<&str> {
        match color {
            Color::White => self.white.as_deref().map(|a| a.name()),
            Color::Black => self.black.as_deref().map(|a| a.name()),
        }
    }

    fn agent_mut(&mut self, color: Color) -> Option<&mut (dyn DecisionAgent + 'static)> {
        self.slot(color).as_deref_mut()
    }

    fn slot(&mut self, color: Color) -> &mut Option<Box<dyn DecisionAgent>> {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }
}

/// Cooperative cancellation for a running game.
///
/// Checked between solicitations; a solicitation already in flight finishes
/// (or times out) first.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// Requests that the game stop.
    pub fn abort(&self) {
        info!("Game abort requested");
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether an abort was requested.
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Limits for one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_getters::Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct TurnSettings {
    /// Ceiling on accepted plies.
    max_turns: u32,
    /// Solicitations per turn before forfeit.
    max_nested_turns: u32,
    /// Bound on a single solicitation.
    agent_timeout: Duration,
    /// Relay commentary to the opponent.
    relay_commentary: bool,
}

impl From<&GameSettings> for TurnSettings {
    fn from(settings: &GameSettings) -> Self {
        Self {
            max_turns: *settings.max_turns(),
            max_nested_turns: *settings.max_nested_turns(),
            agent_timeout: Duration::from_secs(*settings.agent_timeout_secs()),
            relay_commentary: *settings.relay_commentary(),
        }
    }
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self::from(&GameSettings::default())
    }
}

/// Drives the turn state machine.
///
/// The coordinator never touches the position itself; every proposal goes
/// through [`BoardManager::make_move_against`].
#[derive(Debug)]
pub struct TurnCoordinator {
    settings: TurnSettings,
    phase: TurnPhase,
    phase_log: Vec<TurnPhase>,
    record: Option<TurnRecord>,
    feedback: Option<String>,
    last_move: Option<(Move, Option<String>)>,
    termination: Option<Termination>,
    final_state: Option<GameState>,
    solicitations: u32,
    events: Option<mpsc::UnboundedSender<GameEvent>>,
    snapshots: Option<watch::Sender<GameState>>,
}

impl TurnCoordinator {
    /// Creates a coordinator waiting on `first` to move.
    #[instrument]
    pub fn new(settings: TurnSettings, first: Color) -> Self {
        let phase = TurnPhase::AwaitingMove(first);
        Self {
            settings,
            phase,
            phase_log: vec![phase],
            record: None,
            feedback: None,
            last_move: None,
            termination: None,
            final_state: None,
            solicitations: 0,
            events: None,
            snapshots: None,
        }
    }

    /// Sends progress events to `tx`.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<GameEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Publishes a snapshot to `tx` after every solicitation.
    pub fn with_snapshots(mut self, tx: watch::Sender<GameState>) -> Self {
        self.snapshots = Some(tx);
        self
    }

    /// Current phase.
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Every phase entered so far, in order.
    pub fn phase_log(&self) -> &[TurnPhase] {
        &self.phase_log
    }

    /// The unresolved turn, if one is in progress.
    pub fn current_turn(&self) -> Option<&TurnRecord> {
        self.record.as_ref()
    }

    /// How the game ended.
    pub fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }

    /// Total solicitations made across all turns.
    pub fn solicitations(&self) -> u32 {
        self.solicitations
    }

    /// Limits in force.
    pub fn settings(&self) -> &TurnSettings {
        &self.settings
    }

    /// Snapshot of the game: the frozen final state once over, otherwise the
    /// board's live state.
    pub fn current_state(&self, board: &BoardManager) -> GameState {
        match &self.final_state {
            Some(state) => state.clone(),
            None => board.game_state(),
        }
    }

    /// Plays until the game is over or `abort` is raised.
    #[instrument(skip_all)]
    pub async fn run(&mut self, board: &mut BoardManager, seats: &mut Seats, abort: &AbortHandle) {
        info!(
            max_turns = self.settings.max_turns,
            max_nested_turns = self.settings.max_nested_turns,
            "Starting game orchestration"
        );
        while !self.phase.is_over() {
            if abort.is_aborted() {
                self.finish_aborted(board, "Game aborted by operator".to_string());
                break;
            }
            self.step(board, seats).await;
        }
        info!(phase = %self.phase, solicitations = self.solicitations, "Game orchestration finished");
    }

    /// Performs one solicitation round and returns the resulting phase.
    ///
    /// Does nothing once the game is over.
    #[instrument(skip_all, fields(phase = %self.phase))]
    pub async fn step(&mut self, board: &mut BoardManager, seats: &mut Seats) -> TurnPhase {
        let (color, attempts_used) = match self.phase {
            TurnPhase::GameOver(_) => return self.phase,
            TurnPhase::AwaitingMove(color) => (color, 0),
            TurnPhase::AwaitingRetry {
                color,
                attempts_used,
            } => (color, attempts_used),
            TurnPhase::TurnResolved(color) => (color.opponent(), 0),
        };

        let state = board.game_state();
        // Custom start positions can already be decided.
        if let (true, Some(termination)) = (state.terminal(), state.termination().cloned()) {
            self.finish(board, state.outcome(), termination);
            return self.phase;
        }

        if let Err(e) = self.solicit(board, seats, color, attempts_used, state).await {
            self.finish_aborted(board, e);
        }
        self.publish(board);
        self.phase
    }

    async fn solicit(
        &mut self,
        board: &mut BoardManager,
        seats: &mut Seats,
        color: Color,
        attempts_used: u32,
        state: GameState,
    ) -> Result<(), String> {
        let record = self.record.get_or_insert_with(|| TurnRecord::new(color));
        record.attempts_used = attempts_used;

        let legal_moves = board.legal_moves().map_err(engine_fault)?;
        let (opponent_move, opponent_commentary) = match &self.last_move {
            Some((mv, commentary)) => (
                Some(*mv),
                commentary.clone().filter(|_| self.settings.relay_commentary),
            ),
            None => (None, None),
        };
        let request = MoveRequest {
            color,
            state: state.clone(),
            legal_moves,
            board_diagram: board.render(),
            feedback: self.feedback.clone(),
            attempt: attempts_used + 1,
            max_attempts: self.settings.max_nested_turns,
            opponent_move,
            opponent_commentary,
            invite_commentary: self.settings.relay_commentary,
        };

        let agent = seats
            .agent_mut(color)
            .ok_or_else(|| format!("No agent seated for {}", color))?;
        let name = agent.name().to_string();
        self.emit(GameEvent::TurnStarted {
            color,
            agent: name.clone(),
            attempt: request.attempt,
        });

        debug!(agent = %name, attempt = request.attempt, "Soliciting move");
        self.solicitations += 1;
        let proposal =
            match tokio::time::timeout(self.settings.agent_timeout, agent.propose_move(&request))
                .await
            {
                Ok(Ok(proposal)) => proposal,
                Ok(Err(e)) => return Err(agent_unavailable(&name, &e)),
                Err(_) => {
                    warn!(agent = %name, timeout = ?self.settings.agent_timeout, "Agent timed out");
                    return Err(format!(
                        "{} did not answer within {:?}",
                        name, self.settings.agent_timeout
                    ));
                }
            };

        if let Some(text) = &proposal.commentary {
            info!(agent = %name, comment = %text, "Agent commentary");
            self.emit(GameEvent::Commentary {
                color,
                agent: name.clone(),
                text: text.clone(),
            });
        }

        let result = board
            .make_move_against(&proposal.mv, &state)
            .map_err(engine_fault)?;

        if result.success() {
            self.resolve_turn(board, color, name, result, proposal.commentary);
        } else {
            self.reject(board, color, name, proposal.mv, result, attempts_used + 1);
        }
        Ok(())
    }

    fn resolve_turn(
        &mut self,
        board: &BoardManager,
        color: Color,
        agent: String,
        result: MoveResult,
        commentary: Option<String>,
    ) {
        self.transition(TurnPhase::TurnResolved(color));
        if let Some(record) = self.record.as_mut() {
            record.commentary_exchanged = commentary.is_some();
        }
        let turn = self.record.take();
        debug!(?turn, "Turn resolved");

        self.feedback = None;
        self.last_move = result.applied().map(|mv| (mv, commentary));
        self.emit(GameEvent::MoveMade {
            color,
            agent,
            result: result.clone(),
            state: board.game_state(),
        });

        match self.terminal_check(board, color, &result) {
            Some((outcome, termination)) => self.finish(board, outcome, termination),
            None => self.transition(TurnPhase::AwaitingMove(color.opponent())),
        }
    }

    fn reject(
        &mut self,
        board: &BoardManager,
        color: Color,
        agent: String,
        proposal: String,
        result: MoveResult,
        attempts_used: u32,
    ) {
        warn!(agent = %agent, proposal = %proposal, reason = %result.message(), attempts_used, "Move rejected");
        if let Some(record) = self.record.as_mut() {
            record.attempts_used = attempts_used;
        }
        self.feedback = Some(result.message().to_string());
        self.emit(GameEvent::MoveRejected {
            color,
            agent,
            proposal,
            result,
        });

        if attempts_used < self.settings.max_nested_turns {
            self.transition(TurnPhase::AwaitingRetry {
                color,
                attempts_used,
            });
        } else {
            warn!(color = %color, attempts_used, "Retry budget exhausted, side forfeits");
            self.finish(board, Outcome::win_for(color.opponent()), Termination::Forfeit { color });
        }
    }

    /// Checkmate, stalemate, draw rules, then the turn ceiling.
    fn terminal_check(
        &self,
        board: &BoardManager,
        mover: Color,
        result: &MoveResult,
    ) -> Option<(Outcome, Termination)> {
        if result.is_checkmate() {
            return Some((Outcome::win_for(mover), Termination::Checkmate));
        }
        if result.is_stalemate() {
            return Some((Outcome::Draw, Termination::Stalemate));
        }
        if let Some(reason) = board.engine().draw_reason(board.position()) {
            return Some((Outcome::Draw, Termination::Draw { reason }));
        }
        let plies = u32::try_from(board.history().len()).unwrap_or(u32::MAX);
        if plies >= self.settings.max_turns {
            info!(plies, max_turns = self.settings.max_turns, "Turn limit reached");
            return Some((Outcome::TurnLimitReached, Termination::TurnLimit));
        }
        None
    }

    fn finish(&mut self, board: &BoardManager, outcome: Outcome, termination: Termination) {
        info!(%outcome, %termination, moves = board.history().len(), "Game over");
        let state = board
            .game_state()
            .concluded(outcome, Some(termination.clone()));
        self.record = None;
        self.termination = Some(termination.clone());
        self.final_state = Some(state.clone());
        self.transition(TurnPhase::GameOver(outcome));
        self.emit(GameEvent::GameOver {
            outcome,
            termination,
            state,
        });
        self.publish(board);
    }

    fn finish_aborted(&mut self, board: &BoardManager, reason: String) {
        warn!(%reason, "Aborting game");
        self.finish(board, Outcome::Aborted, Termination::Aborted { reason });
    }

    fn transition(&mut self, next: TurnPhase) {
        debug!(from = %self.phase, to = %next, "Phase transition");
        self.phase = next;
        self.phase_log.push(next);
    }

    fn emit(&self, event: GameEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).is_err() {
                debug!("Event receiver dropped");
            }
        }
    }

    fn publish(&self, board: &BoardManager) {
        if let Some(tx) = &self.snapshots {
            tx.send_replace(self.current_state(board));
        }
    }
}

fn engine_fault(e: RulesError) -> String {
    format!("Rules engine fault: {}", e.message)
}

fn agent_unavailable(name: &str, e: &AgentError) -> String {
    format!("{} is unavailable: {}", name, e.message)
}
