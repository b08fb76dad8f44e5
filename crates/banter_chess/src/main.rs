//! Banter Chess - CLI
//!
//! Runs agent-versus-agent chess games from the terminal.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use banter_chess::{
    AgentSpec, BoardManager, ChessConfig, Color, GameController, GameEvent, GameReport, Outcome,
    RulesEngine, ShakmatyEngine, Termination, TextRenderer,
};
use clap::Parser;
use cli::{Cli, Command, GameArgs};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();
    initialize_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Play { game, json } => run_play(&cli.config, &game, json).await,
        Command::Batch { game, games } => run_batch(&cli.config, &game, games).await,
        Command::Moves { fen } => list_moves(fen.as_deref()),
    }
}

/// Logs go to stderr so stdout carries only the narration or JSON.
fn initialize_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,banter_chess=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Tracing initialized");
}

/// Defaults, file, environment, then command-line flags.
#[instrument(skip(args))]
fn load_config(path: &Path, args: &GameArgs) -> Result<ChessConfig> {
    let config = ChessConfig::load(Some(path)).context("Failed to load configuration")?;

    let mut game = config.game().clone();
    if let Some(turns) = args.turns {
        game = game.with_max_turns(turns);
    }
    if let Some(retries) = args.retries {
        game = game.with_max_nested_turns(retries);
    }
    if let Some(timeout) = args.timeout {
        game = game.with_agent_timeout_secs(timeout);
    }
    if let Some(fen) = &args.fen {
        game = game.with_start_fen(Some(fen.clone()));
    }
    if args.quiet {
        game = game.with_relay_commentary(false);
    }

    let mut llm = config.llm().clone();
    if let Some(model) = &args.model {
        llm = llm.with_model(model.clone());
    }
    if let Some(key) = &args.api_key {
        llm = llm.with_api_key(Some(key.clone()));
    }

    let config = config.with_game(game).with_llm(llm);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn build_controller(config: &ChessConfig, white: &AgentSpec, black: &AgentSpec) -> Result<GameController> {
    let white = white
        .build(Color::White, config.llm())
        .context("Failed to create white agent")?;
    let black = black
        .build(Color::Black, config.llm())
        .context("Failed to create black agent")?;

    Ok(
        GameController::new(config.clone(), Arc::new(ShakmatyEngine::new()))
            .with_renderer(Box::new(TextRenderer::new()))
            .with_agents(white, black),
    )
}

/// Plays one game, narrating events as they arrive.
#[instrument(skip(args))]
async fn run_play(config_path: &Path, args: &GameArgs, json: bool) -> Result<()> {
    let config = load_config(config_path, args)?;
    let mut controller = build_controller(&config, &args.white, &args.black)?;

    let mut events = controller.subscribe_events();
    let narrator = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if !json {
                narrate(&event);
            }
        }
    });

    println!(
        "Starting chess game: {} (White) vs {} (Black)",
        spec_label(&args.white),
        spec_label(&args.black)
    );
    let report = controller.start(None).await;
    drop(controller);
    if let Err(e) = narrator.await {
        warn!(error = %e, "Narrator task failed");
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print_summary(&report);
    }

    if !*report.success() {
        anyhow::bail!(
            "Game did not complete: {}",
            report.reason_if_aborted().as_deref().unwrap_or("unknown reason")
        );
    }
    Ok(())
}

/// Plays `games` independent games concurrently and tallies outcomes.
#[instrument(skip(args))]
async fn run_batch(config_path: &Path, args: &GameArgs, games: u32) -> Result<()> {
    let config = load_config(config_path, args)?;
    let mut set = JoinSet::new();

    for index in 0..games {
        let mut controller =
            build_controller(&config, &args.white.for_game(index), &args.black.for_game(index))?;
        set.spawn(async move { (index, controller.start(None).await) });
    }

    let mut tally: BTreeMap<String, u32> = BTreeMap::new();
    let mut total_turns = 0u64;
    while let Some(joined) = set.join_next().await {
        let (index, report) = joined.context("Game task panicked")?;
        println!(
            "Game {:>3}: {} after {} moves",
            index + 1,
            describe_ending(&report),
            report.total_turns()
        );
        total_turns += u64::from(*report.total_turns());
        *tally.entry(report.outcome().to_string()).or_default() += 1;
    }

    println!("\n=== {} games ===", games);
    for (outcome, count) in &tally {
        println!("{:<20} {}", outcome, count);
    }
    if games > 0 {
        println!("Average length: {:.1} moves", total_turns as f64 / f64::from(games));
    }
    Ok(())
}

/// Prints the legal moves of a position.
fn list_moves(fen: Option<&str>) -> Result<()> {
    let engine = ShakmatyEngine::new();
    let start = match fen {
        Some(fen) => engine.position_from_fen(fen)?,
        None => engine.start_position(),
    };
    let mut board = BoardManager::from_position(Arc::new(engine), start);
    board.set_renderer(Box::new(TextRenderer::new()));

    if let Some(diagram) = board.render() {
        println!("{}", diagram);
    }
    let state = board.game_state();
    println!("{} to move ({})", state.active_color().title(), state.position_encoding());

    let moves: Vec<String> = board.legal_moves()?.iter().map(ToString::to_string).collect();
    println!("{} legal moves: {}", moves.len(), moves.join(" "));
    Ok(())
}

fn narrate(event: &GameEvent) {
    match event {
        GameEvent::TurnStarted {
            color,
            agent,
            attempt,
        } => {
            if *attempt > 1 {
                println!("\n{} ({}) retrying, attempt {}", agent, color.title(), attempt);
            } else {
                println!("\n{} ({}) is thinking...", agent, color.title());
            }
        }
        GameEvent::MoveRejected {
            agent,
            proposal,
            result,
            ..
        } => println!("  {} proposed '{}': {}", agent, proposal, result.message()),
        GameEvent::MoveMade { agent, result, .. } => {
            println!("  {}: {}", agent, result.message());
            if let Some(board) = result.rendering() {
                println!("{}", board);
            }
        }
        GameEvent::Commentary { agent, text, .. } => println!("  {} says: \"{}\"", agent, text),
        GameEvent::GameOver { .. } => {}
    }
}

fn print_summary(report: &GameReport) {
    println!("\n=== GAME OVER ===");
    println!("{}", describe_ending(report));
    println!("Moves played: {}", report.total_turns());
    println!("Moves: {}", move_list(report));
    println!("Final position: {}", report.final_state().position_encoding());
}

fn describe_ending(report: &GameReport) -> String {
    match (report.outcome(), report.termination()) {
        (_, Some(Termination::Forfeit { color })) => format!(
            "{} forfeited after too many invalid moves. {} wins!",
            color.title(),
            color.opponent().title()
        ),
        (Outcome::WhiteWins, _) => "Checkmate! White wins!".to_string(),
        (Outcome::BlackWins, _) => "Checkmate! Black wins!".to_string(),
        (Outcome::Draw, Some(termination)) => format!("Draw ({})", termination),
        (Outcome::Draw, None) => "Draw".to_string(),
        (Outcome::TurnLimitReached, _) => "Turn limit reached".to_string(),
        (Outcome::Aborted, _) => format!(
            "Game aborted: {}",
            report.reason_if_aborted().as_deref().unwrap_or("unknown reason")
        ),
        (Outcome::InProgress, _) => "Game did not finish".to_string(),
    }
}

fn move_list(report: &GameReport) -> String {
    report
        .moves()
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| {
            let plies: Vec<String> = pair.iter().map(ToString::to_string).collect();
            format!("{}. {}", i + 1, plies.join(" "))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn spec_label(spec: &AgentSpec) -> String {
    match spec {
        AgentSpec::Llm => "LLM".to_string(),
        AgentSpec::Random(_) => "Random".to_string(),
        AgentSpec::Script(moves) => format!("Script ({} moves)", moves.len()),
    }
}
