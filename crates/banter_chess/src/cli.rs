//! Command-line interface for banter_chess.

use banter_chess::AgentSpec;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Banter Chess - AI agents play chess and talk about it
#[derive(Parser, Debug)]
#[command(name = "banter_chess")]
#[command(about = "Chess between two decision agents with guarded move validation", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "banter_chess.toml")]
    pub config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Seat and limit overrides shared by `play` and `batch`.
#[derive(clap::Args, Debug, Clone)]
pub struct GameArgs {
    /// White agent: llm, random[:seed] or script:<move>,<move>,...
    #[arg(long, default_value = "llm", value_parser = parse_agent)]
    pub white: AgentSpec,

    /// Black agent: llm, random[:seed] or script:<move>,<move>,...
    #[arg(long, default_value = "llm", value_parser = parse_agent)]
    pub black: AgentSpec,

    /// Maximum accepted moves (plies) before stopping
    #[arg(short, long)]
    pub turns: Option<u32>,

    /// Attempts per turn before a side forfeits
    #[arg(long)]
    pub retries: Option<u32>,

    /// Per-solicitation timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Model name override for LLM seats
    #[arg(long)]
    pub model: Option<String>,

    /// API key override for LLM seats
    #[arg(long)]
    pub api_key: Option<String>,

    /// Starting position in FEN
    #[arg(long)]
    pub fen: Option<String>,

    /// Do not relay commentary between the agents
    #[arg(long)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play one game and narrate it
    Play {
        /// Shared game options
        #[command(flatten)]
        game: GameArgs,

        /// Print the final report as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Play several games concurrently and tally the results
    Batch {
        /// Shared game options
        #[command(flatten)]
        game: GameArgs,

        /// Number of games
        #[arg(short = 'n', long, default_value = "10")]
        games: u32,
    },

    /// List the legal moves of a position
    Moves {
        /// Position in FEN (defaults to the standard start)
        #[arg(long)]
        fen: Option<String>,
    },
}

fn parse_agent(text: &str) -> Result<AgentSpec, String> {
    text.parse().map_err(|e: banter_chess::ConfigError| e.message)
}
