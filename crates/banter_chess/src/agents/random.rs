//! Random legal-move agent for offline games and tests.

use super::{AgentError, DecisionAgent, MoveRequest, Proposal};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

/// Picks uniformly among the legal moves it is offered.
#[derive(Debug)]
pub struct RandomAgent {
    name: String,
    rng: StdRng,
}

impl RandomAgent {
    /// Creates an agent seeded from the operating system.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a reproducible agent.
    pub fn seeded(name: impl Into<String>, seed: u64) -> Self {
        Self {
            name: name.into(),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

#[async_trait::async_trait]
impl DecisionAgent for RandomAgent {
    async fn propose_move(&mut self, request: &MoveRequest) -> Result<Proposal, AgentError> {
        let mv = request
            .legal_moves
            .choose(&mut self.rng)
            .ok_or_else(|| AgentError::new(format!("{} was offered no legal moves", self.name)))?;
        debug!(agent = %self.name, mv = %mv, "Random agent chose move");
        Ok(Proposal::silent(mv.to_string()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
