//! Agent that replays a fixed script.
//!
//! Used by the `script:` seat on the command line and throughout the tests,
//! where it also stands in for broken or unresponsive agents.

use super::{AgentError, DecisionAgent, MoveRequest, Proposal};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// One scripted reaction to a solicitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Answer with this proposal.
    Propose(Proposal),
    /// Fail the solicitation.
    Fail(String),
    /// Never answer.
    Stall,
}

/// Shared record of every request an agent received.
pub type RequestLog = Arc<Mutex<Vec<MoveRequest>>>;

/// Replays [`ScriptStep`]s in order. Running out of script is an error.
#[derive(Debug)]
pub struct ScriptedAgent {
    name: String,
    steps: VecDeque<ScriptStep>,
    requests: RequestLog,
}

impl ScriptedAgent {
    /// Creates an agent with an empty script.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: VecDeque::new(),
            requests: RequestLog::default(),
        }
    }

    /// Creates an agent that plays `moves` silently.
    pub fn from_moves<I, S>(name: impl Into<String>, moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        moves
            .into_iter()
            .fold(Self::new(name), |agent, mv| agent.then_move(mv))
    }

    /// Appends a silent move.
    pub fn then_move(self, mv: impl Into<String>) -> Self {
        self.then(ScriptStep::Propose(Proposal::silent(mv)))
    }

    /// Appends a move with commentary.
    pub fn then_say(self, mv: impl Into<String>, commentary: impl Into<String>) -> Self {
        self.then(ScriptStep::Propose(Proposal::new(
            mv.into(),
            Some(commentary.into()),
        )))
    }

    /// Appends a failed solicitation.
    pub fn then_fail(self, reason: impl Into<String>) -> Self {
        self.then(ScriptStep::Fail(reason.into()))
    }

    /// Appends a solicitation that never completes.
    pub fn then_stall(self) -> Self {
        self.then(ScriptStep::Stall)
    }

    /// Appends any step.
    pub fn then(mut self, step: ScriptStep) -> Self {
        self.steps.push_back(step);
        self
    }

    /// Handle on the requests received so far.
    pub fn requests(&self) -> RequestLog {
        Arc::clone(&self.requests)
    }
}

#[async_trait::async_trait]
impl DecisionAgent for ScriptedAgent {
    async fn propose_move(&mut self, request: &MoveRequest) -> Result<Proposal, AgentError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        match self.steps.pop_front() {
            Some(ScriptStep::Propose(proposal)) => {
                debug!(agent = %self.name, mv = %proposal.mv, "Scripted proposal");
                Ok(proposal)
            }
            Some(ScriptStep::Fail(reason)) => Err(AgentError::new(format!(
                "{} failed: {}",
                self.name, reason
            ))),
            Some(ScriptStep::Stall) => {
                warn!(agent = %self.name, "Scripted agent stalling");
                std::future::pending().await
            }
            None => Err(AgentError::new(format!("{} ran out of moves", self.name))),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
