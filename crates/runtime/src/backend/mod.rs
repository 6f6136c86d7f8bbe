//! Inference service abstraction.
//!
//! The orchestrator only sees this interface. The real backend talks to
//! Azure OpenAI's Responses API; tests script a mock.

mod azure;

pub use azure::AzureBackend;

use crate::item::ConversationItem;
use crate::tools::ToolSpec;
use crate::Result;
use std::future::Future;

/// One request to the inference service.
///
/// Only the pending items are sent; history is reconstructed server-side
/// from the continuation token of the previous turn (absent on the first
/// pass).
#[derive(Debug, Clone)]
pub struct TurnRequest<'a> {
    pub items: &'a [ConversationItem],
    pub tools: &'a [ToolSpec],
    pub previous_response_id: Option<&'a str>,
}

/// An item of a turn's output, in the order the service produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputItem {
    /// An assistant text fragment.
    Text(String),
    /// A formal tool call with a service-issued correlation id.
    ToolCall {
        call_id: String,
        name: String,
        input: String,
    },
}

/// The service's response to one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResponse {
    /// Continuation token for the next turn.
    pub response_id: Option<String>,
    pub output: Vec<OutputItem>,
}

/// Trait for inference service backends.
pub trait InferenceBackend: Send + Sync {
    /// Send one turn and get the structured response.
    fn respond(&self, request: TurnRequest<'_>)
    -> impl Future<Output = Result<TurnResponse>> + Send;
}
