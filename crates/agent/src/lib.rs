//! The Hydra orchestration engine.
//!
//! A run follows a bounded **complete → dispatch → observe** cycle:
//!
//! 1. **Seed** the transcript with the system prompt, recent history, and the new user turn
//! 2. **Complete** against the configured provider, offering the tool catalog
//! 3. **If tool calls**: dispatch them concurrently, append the results, go to 2
//! 4. **If a final turn**: validate it into a [`StructuredResponse`](hydra_core::response::StructuredResponse)
//!
//! The cycle stops after [`EngineLimits::max_iterations`] completions even if
//! the model keeps asking for tools.

pub mod error;
pub mod loop_runner;
pub mod prompt;
pub mod validator;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use error::{ErrorClass, RunError};
pub use loop_runner::{RunOutcome, SupportAgent};
pub use validator::{ValidationError, validate};

/// Hard caps enforced by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLimits {
    /// Completion calls per run
    pub max_iterations: usize,
    /// Embeddings kept on an answer; extras are dropped
    pub max_embeddings: usize,
    /// Candidates allowed on an ambiguity; more is an error
    pub max_ambiguity_candidates: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            max_embeddings: 6,
            max_ambiguity_candidates: 4,
        }
    }
}
