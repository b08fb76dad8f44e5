//! Live tests against real LLM providers. Enabled with `--features api`.

use banter_chess::{
    AbortHandle, AgentSpec, BoardManager, ChessConfig, Color, LlmClient, LlmConfig, LlmProvider,
    Seats, ShakmatyEngine, TurnCoordinator, TurnPhase, TurnSettings,
};
use std::sync::Arc;
use tracing::instrument;

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_anthropic_connectivity() {
    dotenvy::dotenv().ok();

    let api_key = std::env::var("ANTHROPIC_API_KEY").expect("ANTHROPIC_API_KEY not set");

    let config = LlmConfig::new(
        LlmProvider::Anthropic,
        api_key,
        "claude-3-5-haiku-latest".to_string(),
        50,
        0.0,
    );

    let client = LlmClient::new(config);

    let response = client
        .generate("You are a helpful assistant.", "Say 'Hello, world!' and nothing else.")
        .await
        .expect("Failed to generate");

    assert!(!response.is_empty(), "Response should not be empty");
    eprintln!("Response: {}", response);
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_openai_connectivity() {
    dotenvy::dotenv().ok();

    let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
    let base_url = std::env::var("LLM_BASE_URL").ok();

    let config = LlmConfig::new(
        LlmProvider::OpenAI,
        api_key,
        "gpt-4o-mini".to_string(),
        50,
        0.0,
    )
    .with_base_url(base_url);

    let client = LlmClient::new(config);

    let response = client
        .generate("You are a helpful assistant.", "Say 'Hello, world!' and nothing else.")
        .await
        .expect("Failed to generate");

    assert!(!response.is_empty(), "Response should not be empty");
    eprintln!("Response: {}", response);
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_llm_agents_play_a_few_moves() {
    dotenvy::dotenv().ok();

    let config = ChessConfig::load(None).expect("Failed to load config");
    let white = AgentSpec::Llm
        .build(Color::White, config.llm())
        .expect("LLM settings");
    let black = AgentSpec::Llm
        .build(Color::Black, config.llm())
        .expect("LLM settings");

    let mut board = BoardManager::new(Arc::new(ShakmatyEngine::new()));
    let mut seats = Seats::new(white, black);
    let settings = TurnSettings::from(config.game()).with_max_turns(4);
    let mut coordinator = TurnCoordinator::new(settings, Color::White);

    coordinator
        .run(&mut board, &mut seats, &AbortHandle::default())
        .await;

    assert!(coordinator.phase().is_over());
    assert_ne!(
        coordinator.phase(),
        TurnPhase::GameOver(banter_chess::Outcome::Aborted),
        "Providers should stay reachable: {:?}",
        coordinator.termination()
    );
    eprintln!("Moves: {:?}", board.history());
}
