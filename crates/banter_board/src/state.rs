//! Immutable results and snapshots produced by the board.

use crate::types::{Color, Move, Outcome, Termination};
use serde::{Deserialize, Serialize};

/// Why a move attempt was turned down.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Rejection {
    /// The text was not a UCI move.
    Parse,
    /// Well formed, but not among the legal moves.
    Illegal,
    /// Proposed against a position that has since changed.
    Stale,
}

/// Outcome of a single move attempt.
///
/// Exactly one is produced per attempt, legal or not, and it is never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResult {
    success: bool,
    message: String,
    is_check: bool,
    is_checkmate: bool,
    is_stalemate: bool,
    rendering: Option<String>,
    applied: Option<Move>,
    rejection: Option<Rejection>,
}

impl MoveResult {
    /// Result for an accepted move. Flags describe the position after the move.
    pub(crate) fn accepted(
        applied: Move,
        message: String,
        is_check: bool,
        is_checkmate: bool,
        is_stalemate: bool,
        rendering: Option<String>,
    ) -> Self {
        Self {
            success: true,
            message,
            is_check,
            is_checkmate,
            is_stalemate,
            rendering,
            applied: Some(applied),
            rejection: None,
        }
    }

    /// Result for a refused move.
    pub(crate) fn rejected(rejection: Rejection, message: String) -> Self {
        Self {
            success: false,
            message,
            is_check: false,
            is_checkmate: false,
            is_stalemate: false,
            rendering: None,
            applied: None,
            rejection: Some(rejection),
        }
    }

    /// Whether the move was applied.
    pub fn success(&self) -> bool {
        self.success
    }

    /// Human-readable outcome or rejection reason.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the side to move is now in check.
    pub fn is_check(&self) -> bool {
        self.is_check
    }

    /// Whether the move delivered mate.
    pub fn is_checkmate(&self) -> bool {
        self.is_checkmate
    }

    /// Whether the move left the opponent stalemated.
    pub fn is_stalemate(&self) -> bool {
        self.is_stalemate
    }

    /// Opaque rendering payload, if a renderer is attached.
    pub fn rendering(&self) -> Option<&str> {
        self.rendering.as_deref()
    }

    /// The move that was applied.
    pub fn applied(&self) -> Option<Move> {
        self.applied
    }

    /// Why the move was refused.
    pub fn rejection(&self) -> Option<Rejection> {
        self.rejection
    }
}

/// Read-only projection of the game at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    position_encoding: String,
    active_color: Color,
    move_count: u32,
    fullmove_number: u32,
    is_check: bool,
    terminal: bool,
    outcome: Outcome,
    termination: Option<Termination>,
}

impl GameState {
    pub(crate) fn new(
        position_encoding: String,
        active_color: Color,
        move_count: u32,
        fullmove_number: u32,
        is_check: bool,
        outcome: Outcome,
        termination: Option<Termination>,
    ) -> Self {
        Self {
            position_encoding,
            active_color,
            move_count,
            fullmove_number,
            is_check,
            terminal: outcome.is_terminal(),
            outcome,
            termination,
        }
    }

    /// Overrides the outcome with one decided outside the position, such as a
    /// turn limit, a forfeit or an abort.
    pub fn concluded(mut self, outcome: Outcome, termination: Option<Termination>) -> Self {
        self.terminal = outcome.is_terminal();
        self.outcome = outcome;
        self.termination = termination;
        self
    }

    /// FEN of the position.
    pub fn position_encoding(&self) -> &str {
        &self.position_encoding
    }

    /// Side to move.
    pub fn active_color(&self) -> Color {
        self.active_color
    }

    /// Number of accepted moves (plies) so far.
    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    /// FEN fullmove number.
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// Whether the side to move is in check.
    pub fn is_check(&self) -> bool {
        self.is_check
    }

    /// Whether the game has ended.
    pub fn terminal(&self) -> bool {
        self.terminal
    }

    /// Current classification.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// How the game ended, once it has.
    pub fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }
}
