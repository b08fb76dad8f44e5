//! Tests for the board manager move gate.

use banter_board::{
    BoardManager, Color, DrawReason, Outcome, Rejection, RulesEngine, ShakmatyEngine,
    Termination, TextRenderer,
};
use std::sync::Arc;

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

fn board() -> BoardManager {
    BoardManager::new(Arc::new(ShakmatyEngine::new()))
}

fn board_from(fen: &str) -> BoardManager {
    let engine = ShakmatyEngine::new();
    let position = engine.position_from_fen(fen).expect("Valid FEN");
    BoardManager::from_position(Arc::new(engine), position)
}

fn play_all(board: &mut BoardManager, moves: &[&str]) {
    for mv in moves {
        let result = board.make_move(mv).expect("Engine fault");
        assert!(result.success(), "{} should be legal: {}", mv, result.message());
    }
}

#[test]
fn test_initial_state() {
    let board = board();
    let state = board.game_state();
    assert_eq!(state.position_encoding(), START_FEN);
    assert_eq!(state.active_color(), Color::White);
    assert_eq!(state.move_count(), 0);
    assert_eq!(state.outcome(), Outcome::InProgress);
    assert!(!state.terminal());
}

#[test]
fn test_legal_moves_start_position_sorted() {
    let board = board();
    let moves: Vec<String> = board
        .legal_moves()
        .expect("Engine fault")
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(moves.len(), 20);
    assert!(moves.contains(&"e2e4".to_string()));
    assert!(moves.contains(&"g1f3".to_string()));

    let mut sorted = moves.clone();
    sorted.sort();
    assert_eq!(moves, sorted, "Legal moves must be in stable UCI order");
}

#[test]
fn test_legal_move_applies_and_flips_side() {
    let mut board = board();
    let result = board.make_move("e2e4").expect("Engine fault");

    assert!(result.success());
    assert!(!result.is_check());
    assert!(!result.is_checkmate());
    assert_eq!(result.message(), "Moved Pawn (♙) from e2 to e4.");
    assert_eq!(result.applied().map(|m| m.to_string()), Some("e2e4".into()));

    let state = board.game_state();
    assert_eq!(state.active_color(), Color::Black);
    assert_eq!(state.move_count(), 1);
    assert!(state.position_encoding().contains(" b "));
}

#[test]
fn test_every_legal_move_matches_engine() {
    let engine = ShakmatyEngine::new();
    let start = engine.start_position();
    let moves = board().legal_moves().expect("Engine fault");

    for mv in moves {
        let mut board = board();
        let result = board.make_move(&mv.to_string()).expect("Engine fault");
        assert!(result.success(), "{} rejected", mv);

        let direct = engine.apply(&start, &mv).expect("Engine rejected legal move");
        assert_eq!(
            board.game_state().position_encoding(),
            engine.encode(&direct),
            "Board diverged from engine after {}",
            mv
        );
    }
}

#[test]
fn test_illegal_move_is_rejected_without_mutation() {
    let mut board = board();
    let before = board.game_state();

    let first = board.make_move("e2e5").expect("Engine fault");
    let second = board.make_move("e2e5").expect("Engine fault");

    assert!(!first.success());
    assert_eq!(first.rejection(), Some(Rejection::Illegal));
    assert!(first.message().contains("e2e5"));
    assert_eq!(first, second, "Rejection must be idempotent");
    assert_eq!(board.game_state(), before);
    assert!(board.history().is_empty());
}

#[test]
fn test_unparseable_move_is_rejected() {
    let mut board = board();
    for raw in ["", "   ", "e2", "knight to f3", "z9z9", "e7e8x"] {
        let result = board.make_move(raw).expect("Engine fault");
        assert!(!result.success(), "{:?} should not parse", raw);
        assert_eq!(result.rejection(), Some(Rejection::Parse));
        assert!(result.message().starts_with("Invalid move format"));
    }
    assert_eq!(board.game_state().position_encoding(), START_FEN);
}

#[test]
fn test_whitespace_and_case_are_normalized() {
    let mut board = board();
    let result = board.make_move("  G1F3\n").expect("Engine fault");
    assert!(result.success(), "{}", result.message());
    assert_eq!(result.message(), "Moved Knight (♘) from g1 to f3.");
}

#[test]
fn test_fools_mate_is_checkmate() {
    let mut board = board();
    play_all(&mut board, &["f2f3", "e7e5", "g2g4"]);

    let result = board.make_move("d8h4").expect("Engine fault");
    assert!(result.success());
    assert!(result.is_check());
    assert!(result.is_checkmate());
    assert!(!result.is_stalemate());
    assert!(result.message().ends_with("Checkmate!"));

    let state = board.game_state();
    assert!(state.terminal());
    assert_eq!(state.outcome(), Outcome::BlackWins);
    assert_eq!(state.termination(), Some(&Termination::Checkmate));
    assert!(board.legal_moves().expect("Engine fault").is_empty());
}

#[test]
fn test_stalemate_is_a_draw() {
    let mut board = board_from("k7/8/1K6/8/8/8/8/2Q5 w - - 0 1");
    let result = board.make_move("c1c7").expect("Engine fault");

    assert!(result.success());
    assert!(result.is_stalemate());
    assert!(!result.is_checkmate());
    assert!(result.message().ends_with("Stalemate!"));

    let state = board.game_state();
    assert_eq!(state.outcome(), Outcome::Draw);
    assert_eq!(state.termination(), Some(&Termination::Stalemate));
}

#[test]
fn test_insufficient_material_draw() {
    let mut board = board_from("k7/8/8/8/8/8/1r6/K7 w - - 0 1");
    play_all(&mut board, &["a1b2"]);

    let state = board.game_state();
    assert_eq!(state.outcome(), Outcome::Draw);
    assert_eq!(
        state.termination(),
        Some(&Termination::Draw {
            reason: DrawReason::InsufficientMaterial
        })
    );
}

#[test]
fn test_fifty_move_draw() {
    let mut board = board_from("k7/8/8/8/8/8/8/KQ6 w - - 99 80");
    assert_eq!(board.game_state().outcome(), Outcome::InProgress);

    play_all(&mut board, &["b1c1"]);
    assert_eq!(
        board.game_state().termination(),
        Some(&Termination::Draw {
            reason: DrawReason::FiftyMoveRule
        })
    );
}

#[test]
fn test_threefold_repetition_draw() {
    let mut board = board();
    let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];

    play_all(&mut board, &shuffle);
    assert_eq!(board.game_state().outcome(), Outcome::InProgress);

    play_all(&mut board, &shuffle);
    assert_eq!(
        board.game_state().termination(),
        Some(&Termination::Draw {
            reason: DrawReason::ThreefoldRepetition
        })
    );
}

#[test]
fn test_promotion_requires_piece() {
    let mut board = board_from("8/P6k/8/8/8/8/8/K7 w - - 0 1");

    let bare = board.make_move("a7a8").expect("Engine fault");
    assert_eq!(bare.rejection(), Some(Rejection::Illegal));

    let promoted = board.make_move("a7a8q").expect("Engine fault");
    assert!(promoted.success(), "{}", promoted.message());
    assert_eq!(promoted.message(), "Moved Queen (♕) from a7 to a8.");
}

fn legal_uci(board: &BoardManager) -> Vec<String> {
    board
        .legal_moves()
        .expect("Engine fault")
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[test]
fn test_castling_is_written_as_king_move() {
    let mut board = board();
    play_all(
        &mut board,
        &["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6"],
    );

    let legal = legal_uci(&board);
    assert!(legal.contains(&"e1g1".to_string()), "{:?}", legal);
    assert!(!legal.contains(&"e1h1".to_string()), "{:?}", legal);

    let rook_square = board.make_move("e1h1").expect("Engine fault");
    assert_eq!(rook_square.rejection(), Some(Rejection::Illegal));

    let castled = board.make_move("e1g1").expect("Engine fault");
    assert!(castled.success(), "{}", castled.message());
    assert_eq!(castled.message(), "Moved King (♔) from e1 to g1.");
    assert!(
        board
            .game_state()
            .position_encoding()
            .contains("RNBQ1RK1 b kq"),
        "Rook lands on f1 and white loses castling rights"
    );

    play_all(&mut board, &["f8e7", "d2d3"]);
    let black_rook_square = board.make_move("e8h8").expect("Engine fault");
    assert_eq!(black_rook_square.rejection(), Some(Rejection::Illegal));
    let black_castled = board.make_move("e8g8").expect("Engine fault");
    assert!(black_castled.success(), "{}", black_castled.message());
}

#[test]
fn test_en_passant_capture() {
    let mut board = board();
    play_all(&mut board, &["e2e4", "a7a6", "e4e5", "d7d5"]);
    assert!(legal_uci(&board).contains(&"e5d6".to_string()));

    let result = board.make_move("e5d6").expect("Engine fault");
    assert!(result.success(), "{}", result.message());
    assert_eq!(
        board.game_state().position_encoding(),
        "rnbqkbnr/1pp1pppp/p2P4/8/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 3",
        "Captured pawn leaves d5"
    );
}

#[test]
fn test_en_passant_expires_after_one_move() {
    let mut board = board();
    play_all(
        &mut board,
        &["e2e4", "a7a6", "e4e5", "d7d5", "h2h3", "h7h6"],
    );

    let late = board.make_move("e5d6").expect("Engine fault");
    assert_eq!(late.rejection(), Some(Rejection::Illegal));
}

#[test]
fn test_stale_proposal_is_rejected() {
    let mut board = board();
    let seen = board.game_state();
    play_all(&mut board, &["e2e4"]);
    let after = board.game_state();

    let result = board.make_move_against("d2d4", &seen).expect("Engine fault");
    assert!(!result.success());
    assert_eq!(result.rejection(), Some(Rejection::Stale));
    assert_eq!(board.game_state(), after);

    let fresh = board.make_move_against("e7e5", &after).expect("Engine fault");
    assert!(fresh.success());
}

#[test]
fn test_reset_restores_start() {
    let mut board = board();
    play_all(&mut board, &["e2e4", "e7e5"]);
    board.reset();

    assert!(board.history().is_empty());
    assert_eq!(board.game_state().position_encoding(), START_FEN);
    assert_eq!(board.game_state().move_count(), 0);
}

#[test]
fn test_reset_returns_to_custom_start() {
    let fen = "k7/8/1K6/8/8/8/8/2Q5 w - - 0 1";
    let mut board = board_from(fen);
    play_all(&mut board, &["c1c2"]);
    board.reset();
    assert_eq!(board.game_state().position_encoding(), fen);
}

#[test]
fn test_renderer_payload_attached() {
    let mut board = board();
    board.set_renderer(Box::new(TextRenderer::new()));

    let result = board.make_move("e2e4").expect("Engine fault");
    let payload = result.rendering().expect("Renderer attached");
    assert!(payload.contains("[♙]"), "Destination should be highlighted");
    assert!(payload.contains("a  b  c"));

    let rejected = board.make_move("e2e4").expect("Engine fault");
    assert!(rejected.rendering().is_none());
}

#[test]
fn test_invalid_fen_is_an_engine_error() {
    let engine = ShakmatyEngine::new();
    assert!(engine.position_from_fen("not a fen").is_err());
    assert!(engine.position_from_fen("8/8/8/8/8/8/8/8 w - - 0 1").is_err());

    // Side not to move is already in check.
    let error = engine
        .position_from_fen("k7/8/1K6/8/8/8/8/7Q w - - 0 1")
        .expect_err("Opposite check");
    assert!(error.message.contains("Illegal position"), "{}", error);
}
