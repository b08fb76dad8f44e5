//! Pure chess board logic for agent-driven games.
//!
//! - [`RulesEngine`] / [`ShakmatyEngine`]: the legality oracle
//! - [`BoardManager`]: owns the position, gates every move
//! - [`MoveResult`] / [`GameState`]: immutable results and snapshots
//! - [`Renderer`] / [`TextRenderer`]: optional visual payloads
//!
//! ```
//! use banter_board::{BoardManager, Color, ShakmatyEngine};
//! use std::sync::Arc;
//!
//! let mut board = BoardManager::new(Arc::new(ShakmatyEngine::new()));
//! let result = board.make_move("e2e4").unwrap();
//! assert!(result.success());
//! assert_eq!(board.game_state().active_color(), Color::Black);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod board;
mod engine;
mod render;
mod state;
mod types;

pub use board::BoardManager;
pub use engine::{Position, RulesEngine, RulesError, ShakmatyEngine};
pub use render::{Renderer, TextRenderer, piece_symbol};
pub use state::{GameState, MoveResult, Rejection};
pub use types::{Color, DrawReason, Move, MoveParseError, Outcome, Termination};

// Re-exported so collaborators can implement the traits without a direct
// shakmaty dependency.
pub use shakmaty::{Piece, Role, Square};
