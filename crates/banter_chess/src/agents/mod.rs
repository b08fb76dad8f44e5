//! Decision agents: the two seats at the board.
//!
//! The coordinator treats every agent as untrusted. It hands over a
//! [`MoveRequest`] and gets back free text, which the board validates.

mod llm;
mod random;
mod scripted;

pub use llm::{LlmAgent, parse_reply};
pub use random::RandomAgent;
pub use scripted::{RequestLog, ScriptStep, ScriptedAgent};

use crate::config::{ConfigError, LlmSettings};
use crate::llm_client::LlmClient;
use banter_board::{Color, GameState, Move};
use derive_more::{Display, Error};
use std::str::FromStr;
use tracing::{error, instrument};

/// Everything an agent is told when asked for a move.
#[derive(Debug, Clone)]
pub struct MoveRequest {
    /// Side the agent plays.
    pub color: Color,
    /// Snapshot the proposal will be checked against.
    pub state: GameState,
    /// Legal moves in stable UCI order.
    pub legal_moves: Vec<Move>,
    /// Rendered board, when a renderer is attached.
    pub board_diagram: Option<String>,
    /// Why the previous attempt this turn was rejected.
    pub feedback: Option<String>,
    /// 1-based solicitation number within the turn.
    pub attempt: u32,
    /// Solicitations allowed this turn.
    pub max_attempts: u32,
    /// The opponent's last accepted move.
    pub opponent_move: Option<Move>,
    /// What the opponent said with that move.
    pub opponent_commentary: Option<String>,
    /// Whether commentary will be relayed to the opponent.
    pub invite_commentary: bool,
}

impl MoveRequest {
    /// Whether this is a retry after a rejected proposal.
    pub fn is_retry(&self) -> bool {
        self.attempt > 1
    }
}

/// An agent's answer: untrusted move text plus optional banter.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct Proposal {
    /// Move text, expected to be UCI.
    pub mv: String,
    /// Commentary addressed to the opponent.
    pub commentary: Option<String>,
}

impl Proposal {
    /// A proposal without commentary.
    pub fn silent(mv: impl Into<String>) -> Self {
        Self::new(mv.into(), None)
    }
}

/// A participant that proposes moves for one color.
#[async_trait::async_trait]
pub trait DecisionAgent: Send {
    /// Proposes a move for `request.color`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when the agent cannot answer at all. The
    /// coordinator aborts the game on error; a bad move is not an error.
    async fn propose_move(&mut self, request: &MoveRequest) -> Result<Proposal, AgentError>;

    /// Display name.
    fn name(&self) -> &str;
}

/// The agent could not produce a proposal.
#[derive(Debug, Clone, Display, Error)]
#[display("Agent error: {} at {}:{}", message, file, line)]
pub struct AgentError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl AgentError {
    /// Creates a new agent error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        let message = message.into();
        error!(error_message = %message, "Agent error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Agent selection as written on the command line.
///
/// `llm`, `random`, `random:<seed>` or `script:<move>,<move>,...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentSpec {
    /// LLM-backed agent using the configured provider.
    Llm,
    /// Uniform random legal move, optionally seeded.
    Random(Option<u64>),
    /// Fixed list of moves.
    Script(Vec<String>),
}

impl AgentSpec {
    /// Spec for the `index`-th game of a batch. Seeded random agents get a
    /// distinct seed per game; everything else is unchanged.
    pub fn for_game(&self, index: u32) -> Self {
        match self {
            Self::Random(Some(seed)) => Self::Random(Some(seed.wrapping_add(u64::from(index)))),
            other => other.clone(),
        }
    }

    /// Builds the agent for `color`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an LLM seat has no usable provider settings.
    #[instrument(skip(llm))]
    pub fn build(
        &self,
        color: Color,
        llm: &LlmSettings,
    ) -> Result<Box<dyn DecisionAgent>, ConfigError> {
        let name = format!("Player_{}", color.title());
        Ok(match self {
            Self::Llm => {
                let client = LlmClient::new(llm.create_llm_config()?);
                Box::new(LlmAgent::new(name, client))
            }
            Self::Random(Some(seed)) => Box::new(RandomAgent::seeded(name, *seed)),
            Self::Random(None) => Box::new(RandomAgent::new(name)),
            Self::Script(moves) => Box::new(ScriptedAgent::from_moves(name, moves.clone())),
        })
    }
}

impl FromStr for AgentSpec {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let (kind, arg) = match text.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (text, None),
        };
        match (kind.to_ascii_lowercase().as_str(), arg) {
            ("llm", None) => Ok(Self::Llm),
            ("random", None) => Ok(Self::Random(None)),
            ("random", Some(seed)) => seed
                .trim()
                .parse()
                .map(|seed| Self::Random(Some(seed)))
                .map_err(|e| ConfigError::new(format!("Invalid random seed '{}': {}", seed, e))),
            ("script", Some(moves)) => Ok(Self::Script(
                moves
                    .split(',')
                    .map(str::trim)
                    .filter(|mv| !mv.is_empty())
                    .map(String::from)
                    .collect(),
            )),
            _ => Err(ConfigError::new(format!(
                "Unknown agent '{}'. Expected llm, random[:seed] or script:<moves>",
                text
            ))),
        }
    }
}
