//! Core domain types for chess orchestration.

use serde::{Deserialize, Serialize};
use shakmaty::{Role, Square};
use std::str::FromStr;
use tracing::instrument;

/// Side in the game.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Color {
    /// White (moves first).
    White,
    /// Black.
    Black,
}

impl Color {
    /// Returns the opposing side.
    pub fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Capitalized name for prose ("White", "Black").
    pub fn title(self) -> &'static str {
        match self {
            Color::White => "White",
            Color::Black => "Black",
        }
    }
}

impl From<shakmaty::Color> for Color {
    fn from(color: shakmaty::Color) -> Self {
        match color {
            shakmaty::Color::White => Color::White,
            shakmaty::Color::Black => Color::Black,
        }
    }
}

impl From<Color> for shakmaty::Color {
    fn from(color: Color) -> Self {
        match color {
            Color::White => shakmaty::Color::White,
            Color::Black => shakmaty::Color::Black,
        }
    }
}

/// A move in UCI long algebraic notation: origin, destination, optional promotion.
///
/// Castling is written as the king's two-square move (`e1g1`). A move only
/// means something relative to the position it was proposed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Move {
    from: Square,
    to: Square,
    promotion: Option<Role>,
}

impl Move {
    /// Creates a new move.
    pub fn new(from: Square, to: Square, promotion: Option<Role>) -> Self {
        Self {
            from,
            to,
            promotion,
        }
    }

    /// Origin square.
    pub fn from(&self) -> Square {
        self.from
    }

    /// Destination square.
    pub fn to(&self) -> Square {
        self.to
    }

    /// Promotion piece, if any.
    pub fn promotion(&self) -> Option<Role> {
        self.promotion
    }

    /// Parses UCI text such as `e2e4` or `e7e8q`.
    ///
    /// Surrounding whitespace is ignored and letters are case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`MoveParseError`] when the text is not shaped like a UCI move.
    #[instrument]
    pub fn parse_uci(text: &str) -> Result<Self, MoveParseError> {
        let normalized = text.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(MoveParseError::Empty);
        }
        if !normalized.is_ascii() || !(4..=5).contains(&normalized.len()) {
            return Err(MoveParseError::BadLength(normalized));
        }

        let from = parse_square(&normalized[0..2])?;
        let to = parse_square(&normalized[2..4])?;
        let promotion = match normalized[4..].chars().next() {
            None => None,
            Some('n') => Some(Role::Knight),
            Some('b') => Some(Role::Bishop),
            Some('r') => Some(Role::Rook),
            Some('q') => Some(Role::Queen),
            Some(other) => return Err(MoveParseError::BadPromotion(other)),
        };

        Ok(Self::new(from, to, promotion))
    }
}

fn parse_square(text: &str) -> Result<Square, MoveParseError> {
    let bytes = text.as_bytes();
    let valid = bytes.len() == 2
        && (b'a'..=b'h').contains(&bytes[0])
        && (b'1'..=b'8').contains(&bytes[1]);
    if !valid {
        return Err(MoveParseError::BadSquare(text.to_string()));
    }
    text.parse::<Square>()
        .map_err(|_| MoveParseError::BadSquare(text.to_string()))
}

/// Lowercase UCI letter for a promotion role.
pub(crate) fn promotion_char(role: Role) -> char {
    match role {
        Role::Pawn => 'p',
        Role::Knight => 'n',
        Role::Bishop => 'b',
        Role::Rook => 'r',
        Role::Queen => 'q',
        Role::King => 'k',
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(role) = self.promotion {
            write!(f, "{}", promotion_char(role))?;
        }
        Ok(())
    }
}

impl FromStr for Move {
    type Err = MoveParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_uci(s)
    }
}

impl TryFrom<String> for Move {
    type Error = MoveParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_uci(&value)
    }
}

impl From<Move> for String {
    fn from(mv: Move) -> Self {
        mv.to_string()
    }
}

/// Why a move string could not be read as UCI.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum MoveParseError {
    /// Nothing but whitespace was supplied.
    #[display("empty move")]
    Empty,

    /// Wrong number of characters for a UCI move.
    #[display("'{}' must be 4 or 5 characters", _0)]
    BadLength(String),

    /// A square coordinate was out of range.
    #[display("'{}' is not a square", _0)]
    BadSquare(String),

    /// Unknown promotion letter.
    #[display("'{}' is not a promotion piece (use q, r, b or n)", _0)]
    BadPromotion(char),
}

impl std::error::Error for MoveParseError {}

/// Classification of a finished or ongoing game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    /// Game is ongoing.
    InProgress,
    /// White won.
    WhiteWins,
    /// Black won.
    BlackWins,
    /// Drawn by rule (stalemate, repetition, material, fifty moves).
    Draw,
    /// The configured turn ceiling stopped an otherwise undecided game.
    TurnLimitReached,
    /// The game was aborted by an agent failure, an engine fault or an operator.
    Aborted,
}

impl Outcome {
    /// Outcome in which `color` wins.
    pub fn win_for(color: Color) -> Self {
        match color {
            Color::White => Outcome::WhiteWins,
            Color::Black => Outcome::BlackWins,
        }
    }

    /// Winning side, if any.
    pub fn winner(self) -> Option<Color> {
        match self {
            Outcome::WhiteWins => Some(Color::White),
            Outcome::BlackWins => Some(Color::Black),
            _ => None,
        }
    }

    /// Whether this outcome ends the game.
    pub fn is_terminal(self) -> bool {
        self != Outcome::InProgress
    }
}

/// Draw rule reported by the rules engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DrawReason {
    /// Neither side can mate.
    InsufficientMaterial,
    /// One hundred halfmoves without a capture or pawn move.
    FiftyMoveRule,
    /// Same position three times.
    ThreefoldRepetition,
}

/// How a game ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// Side to move is mated.
    #[display("checkmate")]
    Checkmate,
    /// Side to move has no legal move and is not in check.
    #[display("stalemate")]
    Stalemate,
    /// Drawn by rule.
    #[display("draw by {}", reason)]
    Draw {
        /// Which rule applied.
        reason: DrawReason,
    },
    /// Turn ceiling reached.
    #[display("turn limit")]
    TurnLimit,
    /// A side exhausted its retry budget and lost the game.
    #[display("{} forfeited", color)]
    Forfeit {
        /// The side that forfeited.
        color: Color,
    },
    /// Aborted before a result.
    #[display("aborted: {}", reason)]
    Aborted {
        /// Human-readable abort reason.
        reason: String,
    },
}
