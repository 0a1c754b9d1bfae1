//! Agent module - drives presentation generation.
//!
//! The driver runs a bounded "tools in a loop" exchange:
//! 1. Seed the conversation with the fixed tool protocol and the user's brief
//! 2. Ask the model for one step and execute whatever tools it requests
//! 3. Stop once `save_presentation` is seen, the model requests no tools, or
//!    the step budget runs out
//! 4. Claim the newest `.pptx` in the workspace as the run's result

pub mod artifact;
mod driver;
mod prompt;

pub use driver::{LoopExit, PresentationAgent, RunError, RunFailure, RunOutcome};
pub use prompt::build_system_prompt;
