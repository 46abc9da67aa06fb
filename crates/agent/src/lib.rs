//! The agent orchestration loop for codewright.
//!
//! Each user turn follows an **ask → act → observe** cycle:
//!
//! 1. **Receive** a user message and append it to the conversation
//! 2. **Build the tool catalog** (local tools plus any remote tools)
//! 3. **Send to the model** the full history and the catalog
//! 4. **If tool calls**: execute them, append one result per call, loop back to step 2
//! 5. **If text**: append it and return it to the caller
//!
//! The loop continues until the model answers with text only or the
//! iteration ceiling is reached.

pub mod executor;
pub mod orchestrator;
pub mod surface;

#[cfg(test)]
mod test_helpers;

pub use executor::{ToolExecution, ToolExecutor};
pub use orchestrator::{
    LIMIT_REACHED_TEXT, Orchestrator, OrchestratorBuilder, TurnOutcome, TurnReply, TurnState,
};
pub use surface::{Catalog, ToolRoute, ToolSurface};
pub use tokio_util::sync::CancellationToken;
