//! Rules engine adapter.
//!
//! The orchestration layer performs no rule logic of its own. Every legality
//! decision, move application and terminal query goes through a
//! [`RulesEngine`]; [`ShakmatyEngine`] is the production implementation.

use crate::types::{Color, DrawReason, Move};
use derive_more::{Display, Error};
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Piece, Position as _, Square};
use tracing::{debug, error, instrument};

/// Halfmove clock value at which the fifty-move rule applies.
const FIFTY_MOVE_HALFMOVES: u32 = 100;

/// Number of occurrences that makes a repetition draw.
const REPETITION_LIMIT: usize = 3;

/// Authoritative game position.
///
/// Wraps the rules engine's board together with the repetition keys of every
/// position reached so far, so that repetition draws can be answered from the
/// position alone.
#[derive(Debug, Clone)]
pub struct Position {
    chess: Chess,
    repetition_keys: Vec<String>,
}

impl Position {
    /// Wraps a shakmaty position as the first position of a game.
    pub fn new(chess: Chess) -> Self {
        let key = repetition_key(&chess);
        Self {
            chess,
            repetition_keys: vec![key],
        }
    }

    /// Underlying shakmaty position.
    pub fn chess(&self) -> &Chess {
        &self.chess
    }

    /// How many times the current position has occurred, including now.
    pub fn repetitions(&self) -> usize {
        match self.repetition_keys.last() {
            Some(current) => self
                .repetition_keys
                .iter()
                .filter(|key| *key == current)
                .count(),
            None => 0,
        }
    }

    fn successor(&self, chess: Chess) -> Self {
        let mut repetition_keys = self.repetition_keys.clone();
        repetition_keys.push(repetition_key(&chess));
        Self {
            chess,
            repetition_keys,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(Chess::default())
    }
}

/// Placement, side to move, castling rights and en passant square.
fn repetition_key(chess: &Chess) -> String {
    let fen = Fen::from_position(chess.clone(), EnPassantMode::Legal).to_string();
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// Legality and terminal-state capability consumed by the board.
pub trait RulesEngine: Send + Sync + std::fmt::Debug {
    /// The canonical starting position.
    fn start_position(&self) -> Position;

    /// Builds a position from FEN.
    ///
    /// # Errors
    ///
    /// Fails if the FEN is malformed or describes an illegal setup.
    fn position_from_fen(&self, fen: &str) -> Result<Position, RulesError>;

    /// All legal moves in `position`, in any order.
    fn legal_moves(&self, position: &Position) -> Result<Vec<Move>, RulesError>;

    /// Applies `mv` to `position` and returns the successor.
    ///
    /// # Errors
    ///
    /// Fails when `mv` is not legal in `position` or the engine faults.
    fn apply(&self, position: &Position, mv: &Move) -> Result<Position, RulesError>;

    /// Whether the side to move is in check.
    fn is_check(&self, position: &Position) -> bool;

    /// Whether the side to move is checkmated.
    fn is_checkmate(&self, position: &Position) -> bool;

    /// Whether the side to move has no legal move and is not in check.
    fn is_stalemate(&self, position: &Position) -> bool;

    /// Draw rule that applies to `position`, if any.
    fn draw_reason(&self, position: &Position) -> Option<DrawReason>;

    /// Whether any draw rule applies.
    fn is_draw(&self, position: &Position) -> bool {
        self.draw_reason(position).is_some()
    }

    /// FEN encoding of `position`.
    fn encode(&self, position: &Position) -> String;

    /// Side to move.
    fn active_color(&self, position: &Position) -> Color;

    /// FEN fullmove number.
    fn fullmove_number(&self, position: &Position) -> u32;

    /// Piece standing on `square`.
    fn piece_at(&self, position: &Position, square: Square) -> Option<Piece>;
}

/// Rules engine backed by the `shakmaty` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShakmatyEngine;

impl ShakmatyEngine {
    /// Creates the engine.
    pub fn new() -> Self {
        Self
    }
}

/// Converts an engine move to board notation. Drops and null moves have no
/// counterpart in standard chess.
fn board_move(mv: &shakmaty::Move) -> Option<Move> {
    match mv.to_uci(CastlingMode::Standard) {
        UciMove::Normal {
            from,
            to,
            promotion,
        } => Some(Move::new(from, to, promotion)),
        _ => None,
    }
}

impl RulesEngine for ShakmatyEngine {
    fn start_position(&self) -> Position {
        Position::default()
    }

    #[instrument(skip(self))]
    fn position_from_fen(&self, fen: &str) -> Result<Position, RulesError> {
        let parsed: Fen = fen
            .trim()
            .parse()
            .map_err(|e| RulesError::new(format!("Invalid FEN '{}': {}", fen.trim(), e)))?;
        let chess: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| RulesError::new(format!("Illegal position '{}': {}", fen.trim(), e)))?;
        debug!("Position loaded from FEN");
        Ok(Position::new(chess))
    }

    #[instrument(skip(self, position))]
    fn legal_moves(&self, position: &Position) -> Result<Vec<Move>, RulesError> {
        let moves: Vec<Move> = position
            .chess
            .legal_moves()
            .iter()
            .filter_map(board_move)
            .collect();
        debug!(count = moves.len(), "Enumerated legal moves");
        Ok(moves)
    }

    #[instrument(skip(self, position), fields(mv = %mv))]
    fn apply(&self, position: &Position, mv: &Move) -> Result<Position, RulesError> {
        let legal = position.chess.legal_moves();
        let chosen = legal
            .iter()
            .find(|candidate| board_move(candidate).as_ref() == Some(mv))
            .ok_or_else(|| RulesError::new(format!("{} is not legal in this position", mv)))?;

        let mut next = position.chess.clone();
        next.play_unchecked(chosen);
        Ok(position.successor(next))
    }

    fn is_check(&self, position: &Position) -> bool {
        position.chess.is_check()
    }

    fn is_checkmate(&self, position: &Position) -> bool {
        position.chess.is_checkmate()
    }

    fn is_stalemate(&self, position: &Position) -> bool {
        position.chess.is_stalemate()
    }

    fn draw_reason(&self, position: &Position) -> Option<DrawReason> {
        if position.chess.is_insufficient_material() {
            Some(DrawReason::InsufficientMaterial)
        } else if position.chess.halfmoves() >= FIFTY_MOVE_HALFMOVES {
            Some(DrawReason::FiftyMoveRule)
        } else if position.repetitions() >= REPETITION_LIMIT {
            Some(DrawReason::ThreefoldRepetition)
        } else {
            None
        }
    }

    fn encode(&self, position: &Position) -> String {
        Fen::from_position(position.chess.clone(), EnPassantMode::Legal).to_string()
    }

    fn active_color(&self, position: &Position) -> Color {
        position.chess.turn().into()
    }

    fn fullmove_number(&self, position: &Position) -> u32 {
        position.chess.fullmoves().get()
    }

    fn piece_at(&self, position: &Position, square: Square) -> Option<Piece> {
        position.chess.board().piece_at(square)
    }
}

/// Fault raised by the rules engine.
///
/// The orchestration layer has no fallback rules, so this is always fatal to
/// the game in progress.
#[derive(Debug, Clone, Display, Error)]
#[display("Rules engine error: {} at {}:{}", message, file, line)]
pub struct RulesError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl RulesError {
    /// Creates a new rules engine error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        let message = message.into();
        error!(error_message = %message, "Rules engine error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
