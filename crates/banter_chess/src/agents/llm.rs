//! LLM-backed agent.

use super::{AgentError, DecisionAgent, MoveRequest, Proposal};
use crate::llm_client::LlmClient;
use banter_board::{Color, Move};
use std::fmt::Write as _;
use tracing::{debug, info, instrument, warn};

/// Plays one color by prompting a language model.
#[derive(Debug, Clone)]
pub struct LlmAgent {
    name: String,
    client: LlmClient,
}

impl LlmAgent {
    /// Creates an agent backed by `client`.
    pub fn new(name: impl Into<String>, client: LlmClient) -> Self {
        Self {
            name: name.into(),
            client,
        }
    }

    fn system_prompt(color: Color) -> String {
        format!(
            "You are a chess grandmaster playing as {color} in a friendly game against another AI. \
             Choose strong moves and answer in UCI notation (e.g. e2e4, g1f3, e7e8q). \
             Keep any commentary short, good-natured and free of spoilers about your plans.",
            color = color.title()
        )
    }

    /// Builds the per-turn prompt.
    pub(crate) fn user_prompt(request: &MoveRequest) -> String {
        let state = &request.state;
        let mut prompt = String::new();

        let _ = writeln!(
            prompt,
            "Move {}, {} to play.",
            state.fullmove_number(),
            request.color.title()
        );
        let _ = writeln!(prompt, "Position (FEN): {}", state.position_encoding());
        if let Some(diagram) = &request.board_diagram {
            let _ = writeln!(prompt, "\n{}", diagram);
        }
        if state.is_check() {
            let _ = writeln!(prompt, "You are in check.");
        }
        if let Some(mv) = request.opponent_move {
            let _ = writeln!(prompt, "Your opponent just played {}.", mv);
        }
        if let Some(comment) = &request.opponent_commentary {
            let _ = writeln!(prompt, "Your opponent says: \"{}\"", comment);
        }

        let legal: Vec<String> = request.legal_moves.iter().map(Move::to_string).collect();
        let _ = writeln!(prompt, "Legal moves: {}", legal.join(", "));

        if let Some(feedback) = &request.feedback {
            let _ = writeln!(
                prompt,
                "\nYour previous answer was rejected: {}\nThis is attempt {} of {}; \
                 running out of attempts forfeits the game.",
                feedback, request.attempt, request.max_attempts
            );
        }

        let _ = writeln!(prompt, "\nReply in exactly this format:");
        let _ = writeln!(prompt, "MOVE: <one move from the legal list>");
        if request.invite_commentary {
            let _ = writeln!(prompt, "COMMENT: <one or two sentences for your opponent>");
        }
        prompt
    }
}

#[async_trait::async_trait]
impl DecisionAgent for LlmAgent {
    #[instrument(skip(self, request), fields(agent = %self.name, attempt = request.attempt))]
    async fn propose_move(&mut self, request: &MoveRequest) -> Result<Proposal, AgentError> {
        let system = Self::system_prompt(request.color);
        let user = Self::user_prompt(request);
        debug!(prompt_length = user.len(), "Prompting model");

        let reply = self
            .client
            .generate(&system, &user)
            .await
            .map_err(|e| AgentError::new(format!("{} could not reach the model: {}", self.name, e)))?;

        let proposal = parse_reply(&reply);
        info!(mv = %proposal.mv, has_comment = proposal.commentary.is_some(), "Model proposed move");
        Ok(proposal)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Extracts a move and optional commentary from free-form model output.
///
/// A `MOVE:` line wins; otherwise the first UCI-shaped token is taken, and
/// failing that the first non-empty line is passed through so the board can
/// explain what was wrong with it. Commentary comes from a `COMMENT:` line.
pub fn parse_reply(reply: &str) -> Proposal {
    let mut labelled_move = None;
    let mut comment_lines: Vec<&str> = Vec::new();
    let mut in_comment = false;

    for line in reply.lines() {
        let cleaned = line.trim().trim_matches(|c: char| c == '*' || c == '`').trim();
        if let Some(rest) = strip_label(cleaned, "move:") {
            labelled_move = Some(first_token(rest));
            in_comment = false;
        } else if let Some(rest) = strip_label(cleaned, "comment:") {
            in_comment = true;
            if !rest.is_empty() {
                comment_lines.push(rest);
            }
        } else if in_comment && !cleaned.is_empty() {
            comment_lines.push(cleaned);
        }
    }

    if labelled_move.is_none() {
        warn!("Reply had no MOVE line, falling back to the first UCI token");
    }
    let mv = labelled_move
        .or_else(|| uci_token(reply))
        .or_else(|| {
            reply
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(String::from)
        })
        .unwrap_or_default();

    let commentary = Some(comment_lines.join(" "))
        .map(|text| text.trim_matches('"').trim().to_string())
        .filter(|text| !text.is_empty());

    Proposal::new(mv, commentary)
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    head.eq_ignore_ascii_case(label)
        .then(|| line[label.len()..].trim_start_matches(['*', ' ']).trim())
}

fn clean_token(token: &str) -> &str {
    token.trim_matches(|c: char| !c.is_ascii_alphanumeric())
}

fn first_token(text: &str) -> String {
    text.split_whitespace()
        .next()
        .map(clean_token)
        .unwrap_or_default()
        .to_string()
}

fn uci_token(text: &str) -> Option<String> {
    text.split_whitespace()
        .map(clean_token)
        .find(|token| Move::parse_uci(token).is_ok())
        .map(String::from)
}
