//! The board manager: single owner of the authoritative position.
//!
//! Parsing, validation and application happen in one call so that no
//! malformed or illegal move can reach the position, and so that an accepted
//! move's [`MoveResult`] always describes the position that was stored.

use crate::engine::{Position, RulesEngine, RulesError};
use crate::render::{Renderer, piece_symbol};
use crate::state::{GameState, MoveResult, Rejection};
use crate::types::{Color, Move, Outcome, Termination};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Owns the position and the accepted move history.
#[derive(Debug)]
pub struct BoardManager {
    engine: Arc<dyn RulesEngine>,
    start: Position,
    position: Position,
    history: Vec<Move>,
    renderer: Option<Box<dyn Renderer>>,
}

impl BoardManager {
    /// Creates a board at the engine's starting position.
    #[instrument(skip(engine))]
    pub fn new(engine: Arc<dyn RulesEngine>) -> Self {
        let start = engine.start_position();
        Self::from_position(engine, start)
    }

    /// Creates a board whose start (and reset) position is `start`.
    #[instrument(skip(engine, start))]
    pub fn from_position(engine: Arc<dyn RulesEngine>, start: Position) -> Self {
        debug!(fen = %engine.encode(&start), "Creating board manager");
        Self {
            engine,
            position: start.clone(),
            start,
            history: Vec::new(),
            renderer: None,
        }
    }

    /// Attaches a rendering collaborator for accepted moves.
    pub fn set_renderer(&mut self, renderer: Box<dyn Renderer>) {
        self.renderer = Some(renderer);
    }

    /// Replaces the start position and resets onto it.
    #[instrument(skip(self, start))]
    pub fn set_start_position(&mut self, start: Position) {
        self.start = start;
        self.reset();
    }

    /// Restores the start position and clears history.
    ///
    /// Snapshots taken before the reset describe a position that no longer
    /// exists; moves proposed against them are rejected as stale.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        self.position = self.start.clone();
        self.history.clear();
        info!("Chess board reset");
    }

    /// Current position.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Accepted moves in order.
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    /// Rules engine in use.
    pub fn engine(&self) -> &Arc<dyn RulesEngine> {
        &self.engine
    }

    /// Renders the current position, if a renderer is attached.
    pub fn render(&self) -> Option<String> {
        self.renderer
            .as_ref()
            .and_then(|r| r.render(&self.position, self.history.last()))
    }

    /// Legal moves in the current position, sorted by UCI text.
    ///
    /// The ordering is stable so prompts and tests are reproducible.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError`] if the engine faults.
    #[instrument(skip(self))]
    pub fn legal_moves(&self) -> Result<Vec<Move>, RulesError> {
        let mut moves = self.engine.legal_moves(&self.position)?;
        moves.sort_by_cached_key(|mv| mv.to_string());
        debug!(count = moves.len(), "Retrieved legal moves");
        Ok(moves)
    }

    /// Parses, validates and applies an untrusted move string.
    ///
    /// Unparseable and illegal input yields `success == false` and leaves the
    /// position untouched.
    ///
    /// # Errors
    ///
    /// Only engine faults are returned as errors.
    #[instrument(skip(self), fields(move_count = self.history.len()))]
    pub fn make_move(&mut self, raw: &str) -> Result<MoveResult, RulesError> {
        let raw = raw.trim();
        let candidate = match Move::parse_uci(raw) {
            Ok(mv) => mv,
            Err(e) => {
                warn!(raw, error = %e, "Invalid move format");
                return Ok(MoveResult::rejected(
                    Rejection::Parse,
                    format!(
                        "Invalid move format: '{}' ({}). Please use UCI format (e.g., 'e2e4').",
                        raw, e
                    ),
                ));
            }
        };

        let legal = self.legal_moves()?;
        if !legal.contains(&candidate) {
            let mover = self.engine.active_color(&self.position);
            warn!(mv = %candidate, color = %mover, "Illegal move");
            return Ok(MoveResult::rejected(
                Rejection::Illegal,
                format!(
                    "Illegal move: {}. It is not a legal move for {} in this position.",
                    candidate,
                    mover.title()
                ),
            ));
        }

        let next = self.engine.apply(&self.position, &candidate)?;

        let is_check = self.engine.is_check(&next);
        let is_checkmate = self.engine.is_checkmate(&next);
        let is_stalemate = !is_checkmate && self.engine.is_stalemate(&next);
        let message = self.describe(&next, candidate, is_check, is_checkmate, is_stalemate);
        let rendering = self
            .renderer
            .as_ref()
            .and_then(|r| r.render(&next, Some(&candidate)));

        self.position = next;
        self.history.push(candidate);

        info!(mv = %candidate, %message, "Move executed");
        Ok(MoveResult::accepted(
            candidate,
            message,
            is_check,
            is_checkmate,
            is_stalemate,
            rendering,
        ))
    }

    /// Like [`make_move`](Self::make_move), but rejects the move as stale when
    /// `seen` no longer describes the current position.
    ///
    /// # Errors
    ///
    /// Only engine faults are returned as errors.
    #[instrument(skip(self, seen), fields(seen_move_count = seen.move_count()))]
    pub fn make_move_against(
        &mut self,
        raw: &str,
        seen: &GameState,
    ) -> Result<MoveResult, RulesError> {
        let move_count = self.move_count();
        if seen.move_count() != move_count
            || seen.position_encoding() != self.engine.encode(&self.position)
        {
            warn!(raw, move_count, "Stale move proposal");
            return Ok(MoveResult::rejected(
                Rejection::Stale,
                format!(
                    "Stale move: '{}' was proposed at move {}, but the board is now at move {}.",
                    raw.trim(),
                    seen.move_count(),
                    move_count
                ),
            ));
        }
        self.make_move(raw)
    }

    /// Snapshot of the current position.
    ///
    /// The outcome reflects the position alone; limits and forfeits are
    /// layered on by the caller with [`GameState::concluded`].
    #[instrument(skip(self))]
    pub fn game_state(&self) -> GameState {
        let engine = &self.engine;
        let position = &self.position;
        let to_move = engine.active_color(position);

        let (outcome, termination) = if engine.is_checkmate(position) {
            (Outcome::win_for(to_move.opponent()), Some(Termination::Checkmate))
        } else if engine.is_stalemate(position) {
            (Outcome::Draw, Some(Termination::Stalemate))
        } else if let Some(reason) = engine.draw_reason(position) {
            (Outcome::Draw, Some(Termination::Draw { reason }))
        } else {
            (Outcome::InProgress, None)
        };

        GameState::new(
            engine.encode(position),
            to_move,
            self.move_count(),
            engine.fullmove_number(position),
            engine.is_check(position),
            outcome,
            termination,
        )
    }

    fn move_count(&self) -> u32 {
        u32::try_from(self.history.len()).unwrap_or(u32::MAX)
    }

    /// "Moved Knight (♘) from g1 to f3." plus a check/mate/stalemate suffix.
    fn describe(
        &self,
        next: &Position,
        mv: Move,
        is_check: bool,
        is_checkmate: bool,
        is_stalemate: bool,
    ) -> String {
        let mut message = match self.engine.piece_at(next, mv.to()) {
            Some(piece) => {
                let name = role_name(piece.role);
                let name = if Color::from(piece.color) == Color::White {
                    capitalize(name)
                } else {
                    name.to_string()
                };
                format!(
                    "Moved {} ({}) from {} to {}.",
                    name,
                    piece_symbol(piece),
                    mv.from(),
                    mv.to()
                )
            }
            None => format!("Moved from {} to {}.", mv.from(), mv.to()),
        };

        if is_checkmate {
            message.push_str(" Checkmate!");
        } else if is_check {
            message.push_str(" Check!");
        } else if is_stalemate {
            message.push_str(" Stalemate!");
        }
        message
    }
}

fn role_name(role: shakmaty::Role) -> &'static str {
    match role {
        shakmaty::Role::Pawn => "pawn",
        shakmaty::Role::Knight => "knight",
        shakmaty::Role::Bishop => "bishop",
        shakmaty::Role::Rook => "rook",
        shakmaty::Role::Queen => "queen",
        shakmaty::Role::King => "king",
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
