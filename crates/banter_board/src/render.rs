//! Rendering collaborator.
//!
//! A renderer turns a position into an opaque payload that is attached to
//! [`MoveResult`](crate::MoveResult). The board never inspects it.

use crate::engine::Position;
use crate::types::Move;
use shakmaty::{File, Piece, Position as _, Rank, Role, Square};

/// Produces a visual payload for a position.
pub trait Renderer: Send + Sync + std::fmt::Debug {
    /// Renders `position`, highlighting `last_move` when given.
    fn render(&self, position: &Position, last_move: Option<&Move>) -> Option<String>;
}

/// Unicode chess symbol for a piece.
pub fn piece_symbol(piece: Piece) -> char {
    match (piece.role, piece.color) {
        (Role::King, shakmaty::Color::White) => '♔',
        (Role::Queen, shakmaty::Color::White) => '♕',
        (Role::Rook, shakmaty::Color::White) => '♖',
        (Role::Bishop, shakmaty::Color::White) => '♗',
        (Role::Knight, shakmaty::Color::White) => '♘',
        (Role::Pawn, shakmaty::Color::White) => '♙',
        (Role::King, shakmaty::Color::Black) => '♚',
        (Role::Queen, shakmaty::Color::Black) => '♛',
        (Role::Rook, shakmaty::Color::Black) => '♜',
        (Role::Bishop, shakmaty::Color::Black) => '♝',
        (Role::Knight, shakmaty::Color::Black) => '♞',
        (Role::Pawn, shakmaty::Color::Black) => '♟',
    }
}

/// Plain-text board diagram, white at the bottom.
///
/// The origin and destination of the last move are bracketed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl TextRenderer {
    /// Creates a text renderer.
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for TextRenderer {
    fn render(&self, position: &Position, last_move: Option<&Move>) -> Option<String> {
        let board = position.chess().board();
        let highlighted = |square: Square| {
            last_move.is_some_and(|mv| mv.from() == square || mv.to() == square)
        };

        let mut out = String::from("   a  b  c  d  e  f  g  h\n");
        for rank_idx in (0..8u32).rev() {
            out.push_str(&format!("{} ", rank_idx + 1));
            for file_idx in 0..8u32 {
                let square = Square::from_coords(File::new(file_idx), Rank::new(rank_idx));
                let symbol = board.piece_at(square).map_or('·', piece_symbol);
                if highlighted(square) {
                    out.push_str(&format!("[{}]", symbol));
                } else {
                    out.push_str(&format!(" {} ", symbol));
                }
            }
            out.push_str(&format!(" {}\n", rank_idx + 1));
        }
        out.push_str("   a  b  c  d  e  f  g  h");
        Some(out)
    }
}
