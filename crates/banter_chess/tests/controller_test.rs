//! Tests for the game controller lifecycle and reports.

use banter_chess::{
    AbortHandle, AgentError, ChessConfig, Color, DecisionAgent, GameController, GameEvent,
    GameSettings, LlmSettings, MoveRequest, Outcome, Proposal, RandomAgent, ScriptedAgent, ShakmatyEngine,
    Termination, TextRenderer,
};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn controller(config: ChessConfig) -> GameController {
    GameController::new(config, Arc::new(ShakmatyEngine::new()))
}

fn fools_mate(white_comment: Option<&str>) -> (ScriptedAgent, ScriptedAgent) {
    let white = match white_comment {
        Some(comment) => ScriptedAgent::new("White")
            .then_say("f2f3", comment)
            .then_move("g2g4"),
        None => ScriptedAgent::from_moves("White", ["f2f3", "g2g4"]),
    };
    let black = ScriptedAgent::from_moves("Black", ["e7e5", "d8h4"]);
    (white, black)
}

#[tokio::test]
async fn test_start_without_agents_fails() {
    let mut controller = controller(ChessConfig::default());
    let report = controller.start(None).await;

    assert!(!*report.success());
    let reason = report.reason_if_aborted().as_deref().expect("Reason given");
    assert!(reason.contains("white and black"), "{}", reason);
    assert_eq!(*report.total_turns(), 0);
    assert_eq!(*report.outcome(), Outcome::InProgress);
}

#[tokio::test]
async fn test_start_with_one_agent_names_the_empty_seat() {
    let mut controller = controller(ChessConfig::default());
    controller.seat(Color::White, Box::new(RandomAgent::seeded("White", 1)));

    let report = controller.start(None).await;
    assert!(!*report.success());
    assert_eq!(
        report.reason_if_aborted().as_deref(),
        Some("No agent configured for black")
    );
}

#[tokio::test]
async fn test_zero_turn_ceiling_is_rejected() {
    let (white, black) = fools_mate(None);
    let mut controller =
        controller(ChessConfig::default()).with_agents(Box::new(white), Box::new(black));

    let report = controller.start(Some(0)).await;
    assert!(!*report.success());
    assert!(!controller.is_over());
}

#[tokio::test]
async fn test_invalid_retry_budget_is_rejected() {
    let config =
        ChessConfig::default().with_game(GameSettings::default().with_max_nested_turns(0));
    let (white, black) = fools_mate(None);
    let mut controller = controller(config).with_agents(Box::new(white), Box::new(black));

    let report = controller.start(None).await;
    assert!(!*report.success());
    assert!(
        report
            .reason_if_aborted()
            .as_deref()
            .is_some_and(|reason| reason.contains("max_nested_turns"))
    );
}

#[tokio::test]
async fn test_fools_mate_report() {
    let (white, black) = fools_mate(None);
    let mut controller =
        controller(ChessConfig::default()).with_agents(Box::new(white), Box::new(black));

    let report = controller.start(None).await;

    assert!(*report.success());
    assert_eq!(*report.outcome(), Outcome::BlackWins);
    assert_eq!(report.termination(), &Some(Termination::Checkmate));
    assert_eq!(*report.total_turns(), 4);
    assert_eq!(*report.solicitations(), 4);
    assert!(report.reason_if_aborted().is_none());

    let moves: Vec<String> = report.moves().iter().map(ToString::to_string).collect();
    assert_eq!(moves, vec!["f2f3", "e7e5", "g2g4", "d8h4"]);

    assert!(controller.is_over());
    assert_eq!(controller.winner(), Some(Color::Black));
    assert_eq!(controller.current_state(), *report.final_state());
    assert!(report.final_state().terminal());
}

#[tokio::test]
async fn test_turn_limit_report() {
    let white = ScriptedAgent::from_moves("White", ["e2e4"]);
    let black = ScriptedAgent::new("Black");
    let mut controller =
        controller(ChessConfig::default()).with_agents(Box::new(white), Box::new(black));

    let report = controller.start(Some(1)).await;

    assert!(*report.success());
    assert_eq!(*report.outcome(), Outcome::TurnLimitReached);
    assert_eq!(*report.total_turns(), 1);
    assert_eq!(controller.winner(), None);
    assert_eq!(report.final_state().active_color(), Color::Black);
}

#[tokio::test]
async fn test_forfeit_report() {
    let config =
        ChessConfig::default().with_game(GameSettings::default().with_max_nested_turns(2));
    let white = ScriptedAgent::from_moves("White", ["e2e5", "e2e6"]);
    let black = ScriptedAgent::new("Black");
    let mut controller = controller(config).with_agents(Box::new(white), Box::new(black));

    let report = controller.start(None).await;

    assert!(*report.success());
    assert_eq!(*report.outcome(), Outcome::BlackWins);
    assert_eq!(
        report.termination(),
        &Some(Termination::Forfeit {
            color: Color::White
        })
    );
    assert_eq!(*report.solicitations(), 2);
    assert_eq!(*report.total_turns(), 0);
    assert_eq!(controller.winner(), Some(Color::Black));
}

#[tokio::test]
async fn test_agent_failure_report() {
    let white = ScriptedAgent::from_moves("White", ["e2e4"]);
    let black = ScriptedAgent::new("Black").then_fail("rate limited");
    let mut controller =
        controller(ChessConfig::default()).with_agents(Box::new(white), Box::new(black));

    let report = controller.start(None).await;

    assert!(!*report.success());
    assert_eq!(*report.outcome(), Outcome::Aborted);
    assert_eq!(*report.total_turns(), 1);
    let reason = report.reason_if_aborted().as_deref().expect("Abort reason");
    assert!(reason.contains("rate limited"), "{}", reason);
    assert_eq!(controller.winner(), None);
}

#[tokio::test]
async fn test_timeout_report() {
    let white = ScriptedAgent::new("White").then_stall();
    let black = ScriptedAgent::new("Black");
    let mut controller = controller(ChessConfig::default())
        .with_agents(Box::new(white), Box::new(black))
        .with_agent_timeout(Duration::from_millis(50));

    let report = controller.start(None).await;

    assert!(!*report.success());
    assert_eq!(*report.outcome(), Outcome::Aborted);
    assert!(controller.is_over());
}

/// Plays e2e4 and asks the game to stop while doing so.
struct AbortingAgent {
    abort: AbortHandle,
}

#[async_trait::async_trait]
impl DecisionAgent for AbortingAgent {
    async fn propose_move(&mut self, _request: &MoveRequest) -> Result<Proposal, AgentError> {
        self.abort.abort();
        Ok(Proposal::silent("e2e4"))
    }

    fn name(&self) -> &str {
        "Aborter"
    }
}

#[tokio::test]
async fn test_abort_is_observed_between_rounds() {
    let mut controller = controller(ChessConfig::default());
    let abort = controller.abort_handle();
    controller.seat(Color::White, Box::new(AbortingAgent { abort }));
    controller.seat(Color::Black, Box::new(RandomAgent::seeded("Black", 3)));

    let report = controller.start(None).await;

    assert!(!*report.success());
    assert_eq!(*report.outcome(), Outcome::Aborted);
    assert_eq!(*report.total_turns(), 1, "In-flight move completes first");
    assert_eq!(
        report.reason_if_aborted().as_deref(),
        Some("Game aborted by operator")
    );
}

#[tokio::test]
async fn test_events_and_snapshots() {
    let (white, black) = fools_mate(Some("Careful now."));
    let mut controller = controller(ChessConfig::default())
        .with_renderer(Box::new(TextRenderer::new()))
        .with_agents(Box::new(white), Box::new(black));
    let mut events = controller.subscribe_events();
    let snapshots = controller.subscribe_state();

    let report = controller.start(None).await;

    let mut made = 0;
    let mut comments = Vec::new();
    let mut last = None;
    while let Ok(event) = events.try_recv() {
        match &event {
            GameEvent::MoveMade { result, .. } => {
                made += 1;
                assert!(result.rendering().is_some(), "Renderer payload expected");
            }
            GameEvent::Commentary { color, text, .. } => comments.push((*color, text.clone())),
            _ => {}
        }
        last = Some(event);
    }

    assert_eq!(made, 4);
    assert_eq!(comments, vec![(Color::White, "Careful now.".to_string())]);
    assert!(matches!(
        last,
        Some(GameEvent::GameOver {
            outcome: Outcome::BlackWins,
            ..
        })
    ));
    assert_eq!(*snapshots.borrow(), *report.final_state());
}

#[tokio::test]
async fn test_custom_start_position() {
    let config = ChessConfig::default().with_game(
        GameSettings::default().with_start_fen(Some("k7/8/1K6/8/8/8/8/6Q1 w - - 0 1".to_string())),
    );
    let white = ScriptedAgent::from_moves("White", ["g1g8"]);
    let black = ScriptedAgent::new("Black");
    let mut controller = controller(config).with_agents(Box::new(white), Box::new(black));

    let report = controller.start(None).await;

    assert!(*report.success());
    assert_eq!(*report.outcome(), Outcome::WhiteWins);
    assert_eq!(report.termination(), &Some(Termination::Checkmate));
    assert_eq!(*report.total_turns(), 1);
}

#[tokio::test]
async fn test_invalid_start_position_fails_to_start() {
    let config = ChessConfig::default()
        .with_game(GameSettings::default().with_start_fen(Some("not a position".to_string())));
    let (white, black) = fools_mate(None);
    let mut controller = controller(config).with_agents(Box::new(white), Box::new(black));

    let report = controller.start(None).await;
    assert!(!*report.success());
    assert!(
        report
            .reason_if_aborted()
            .as_deref()
            .is_some_and(|reason| reason.contains("Invalid FEN"))
    );
}

#[tokio::test]
async fn test_restart_plays_a_fresh_game() {
    let (white, black) = fools_mate(None);
    let mut controller =
        controller(ChessConfig::default()).with_agents(Box::new(white), Box::new(black));
    let first = controller.start(None).await;
    assert_eq!(*first.outcome(), Outcome::BlackWins);

    let (white, black) = fools_mate(None);
    controller.seat(Color::White, Box::new(white));
    controller.seat(Color::Black, Box::new(black));
    let second = controller.start(Some(2)).await;

    assert!(*second.success());
    assert_eq!(*second.outcome(), Outcome::TurnLimitReached);
    assert_eq!(*second.total_turns(), 2);
}

#[tokio::test]
async fn test_random_games_always_finish() {
    for seed in 0..5 {
        let mut controller = controller(ChessConfig::default()).with_agents(
            Box::new(RandomAgent::seeded("White", seed)),
            Box::new(RandomAgent::seeded("Black", seed + 100)),
        );
        let report = controller.start(Some(40)).await;

        assert!(*report.success(), "Seed {}: {:?}", seed, report.reason_if_aborted());
        assert!(*report.total_turns() <= 40);
        assert_eq!(*report.solicitations(), *report.total_turns());
        assert_ne!(*report.outcome(), Outcome::InProgress);
    }
}

#[tokio::test]
async fn test_report_serializes_to_json() {
    let (white, black) = fools_mate(None);
    let mut controller =
        controller(ChessConfig::default()).with_agents(Box::new(white), Box::new(black));
    let report = controller.start(None).await;

    let json = serde_json::to_value(&report).expect("Serialize report");
    assert_eq!(json["outcome"], "black_wins");
    assert_eq!(json["termination"]["kind"], "checkmate");
    assert_eq!(json["moves"][3], "d8h4");
    assert_eq!(json["total_turns"], 4);
}

#[tokio::test]
async fn test_failed_restart_reports_a_fresh_board() {
    let (white, black) = fools_mate(None);
    let mut controller =
        controller(ChessConfig::default()).with_agents(Box::new(white), Box::new(black));
    let first = controller.start(None).await;
    assert_eq!(*first.outcome(), Outcome::BlackWins);

    let second = controller.start(Some(0)).await;

    assert!(!*second.success());
    assert_eq!(*second.outcome(), Outcome::InProgress);
    assert!(!second.final_state().terminal());
    assert_eq!(second.final_state().move_count(), 0);
    assert!(second.moves().is_empty());
    assert!(!controller.is_over());
    assert_eq!(controller.winner(), None);
}

/// Log sink shared between the subscriber and the test.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("Log buffer poisoned").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_controller_logs_never_contain_api_key() {
    let logs = CapturedLogs::default();
    let sink = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || sink.clone())
        .finish();

    let config = ChessConfig::default()
        .with_llm(LlmSettings::default().with_api_key(Some("sk-SECRET-123".to_string())));
    tracing::subscriber::with_default(subscriber, || {
        let _controller = controller(config);
    });

    let output =
        String::from_utf8(logs.0.lock().expect("Log buffer poisoned").clone()).expect("UTF-8 logs");
    assert!(output.contains("Game controller created"), "{}", output);
    assert!(!output.contains("sk-SECRET-123"), "{}", output);
}
