//! Conversation orchestration runtime.
//!
//! This crate drives a bounded multi-turn conversation against an
//! inference service, routes model-requested tool calls to the local
//! engines, and folds results back into the pending message queue.
//!
//! # Overview
//!
//! - **InferenceBackend**: a trait abstracting the hosted inference
//!   service (Azure OpenAI Responses, or a scripted mock in tests).
//! - **Dispatcher**: validates and routes `{tool, input}` pairs to the
//!   query engine or the script sandbox, enforcing the query-before-script
//!   ordering dependency.
//! - **Orchestrator**: the turn loop: send pending items, partition the
//!   response into assistant text and tool calls, dispatch, fold back,
//!   repeat until the model stops calling tools or the iteration budget
//!   runs out.
//!
//! Tool failures are soft: they surface as error-tagged tool output the
//! model can react to. Inference failures are hard: they abort the run.

mod backend;
mod error;
mod item;
mod orchestrator;
mod tools;

pub use backend::{AzureBackend, InferenceBackend, OutputItem, TurnRequest, TurnResponse};
pub use error::{Error, Result};
pub use item::{CallOrigin, ConversationItem, Role, ToolCallRequest};
pub use orchestrator::{DEFAULT_MAX_ITERATIONS, Orchestrator, RunOutcome};
pub use tools::{
    Dispatcher, QUERY_TOOL, SCRIPT_TOOL, ScriptRunner, TableQuery, ToolOutcome, ToolSpec,
};
