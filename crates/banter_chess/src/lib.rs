//! Banter Chess - two decision agents play chess through a guarded board
//!
//! Agents propose moves as untrusted text; the board validates every one of
//! them against a rules engine, and the coordinator feeds rejections back to
//! the agent until its retry budget for the turn runs out.
//!
//! # Architecture
//!
//! - **Controller**: game lifecycle, reports, abort and observation handles
//! - **Coordinator**: the turn state machine with its nested-turn retry budget
//! - **Agents**: LLM, random and scripted players behind one async trait
//! - **Config**: TOML file plus environment overrides
//!
//! # Example
//!
//! ```no_run
//! use banter_chess::{ChessConfig, GameController, RandomAgent, ShakmatyEngine};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut controller = GameController::new(ChessConfig::default(), Arc::new(ShakmatyEngine::new()))
//!     .with_agents(
//!         Box::new(RandomAgent::seeded("White", 1)),
//!         Box::new(RandomAgent::seeded("Black", 2)),
//!     );
//! let report = controller.start(Some(20)).await;
//! println!("{}", report.outcome());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod agents;
mod config;
mod controller;
mod coordinator;
mod llm_client;

// Crate-level exports - Agents
pub use agents::{
    AgentError, AgentSpec, DecisionAgent, LlmAgent, MoveRequest, Proposal, RandomAgent,
    RequestLog, ScriptStep, ScriptedAgent, parse_reply,
};

// Crate-level exports - Configuration
pub use config::{ChessConfig, ConfigError, GameSettings, LlmSettings};

// Crate-level exports - Game lifecycle
pub use controller::{GameController, GameReport};
pub use coordinator::{
    AbortHandle, GameEvent, Seats, TurnCoordinator, TurnPhase, TurnRecord, TurnSettings,
};

// Crate-level exports - LLM client
pub use llm_client::{LlmClient, LlmConfig, LlmError, LlmProvider};

// Crate-level exports - Board types
pub use banter_board::{
    BoardManager, Color, DrawReason, GameState, Move, MoveResult, Outcome, Rejection,
    RulesEngine, RulesError, ShakmatyEngine, Termination, TextRenderer,
};
