//! Session identity selection.
//!
//! A user agent is drawn from the configured pool once per session. The
//! random source is injected so tests (and reproducible runs) can seed it.

use std::sync::Mutex;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Picks identities from a fixed pool using a shared, seedable RNG.
#[derive(Debug)]
pub struct IdentityPool {
    user_agents: Vec<String>,
    rng: Mutex<StdRng>,
}

impl IdentityPool {
    /// Pool seeded from OS entropy.
    pub fn new(user_agents: Vec<String>) -> Self {
        Self::with_rng(user_agents, StdRng::from_entropy())
    }

    /// Pool with an explicit random source.
    pub fn with_rng(user_agents: Vec<String>, rng: StdRng) -> Self {
        Self {
            user_agents,
            rng: Mutex::new(rng),
        }
    }

    /// Pool seeded with a fixed value; selection order is reproducible.
    pub fn seeded(user_agents: Vec<String>, seed: u64) -> Self {
        Self::with_rng(user_agents, StdRng::seed_from_u64(seed))
    }

    /// Draw the user agent for a new session, `None` when the pool is empty.
    pub fn pick_user_agent(&self) -> Option<String> {
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        self.user_agents.choose(&mut *rng).cloned()
    }
}
