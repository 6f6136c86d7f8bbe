//! The conversation turn loop.

use crate::Result;
use crate::backend::{InferenceBackend, OutputItem, TurnRequest};
use crate::item::{CallOrigin, ConversationItem, ToolCallRequest};
use crate::tools::{Dispatcher, QUERY_TOOL, SCRIPT_TOOL, ScriptRunner, TableQuery};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Default iteration ceiling for one orchestration run.
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

static SQL_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```sql\s*\n(.*?)```").expect("valid regex"));
static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```rhai\s*\n(.*?)```").expect("valid regex"));

/// How an orchestration run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The model stopped requesting tools.
    Complete { iterations: usize },
    /// The iteration ceiling was hit with work still pending.
    LimitReached,
}

/// Drives the bounded request/response loop against the inference service.
///
/// Each pass sends only the current pending items; the service
/// reconstructs history from the continuation token of the previous turn.
/// Tool calls are dispatched strictly in the order they were received,
/// one at a time, since later calls in the same turn may depend on the table
/// produced by earlier ones.
pub struct Orchestrator<B, Q, S> {
    backend: B,
    dispatcher: Dispatcher<Q, S>,
    pending: Vec<ConversationItem>,
    previous_response_id: Option<String>,
    max_iterations: usize,
}

impl<B, Q, S> Orchestrator<B, Q, S>
where
    B: InferenceBackend,
    Q: TableQuery,
    S: ScriptRunner,
{
    pub fn new(backend: B, dispatcher: Dispatcher<Q, S>) -> Self {
        Self {
            backend,
            dispatcher,
            pending: Vec::new(),
            previous_response_id: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Queue an item for the next turn. Call before `run` to seed the
    /// conversation.
    pub fn push(&mut self, item: ConversationItem) {
        self.pending.push(item);
    }

    /// Run the loop to completion or to the iteration ceiling.
    ///
    /// An inference failure aborts the whole run; there is no retry.
    pub async fn run(&mut self) -> Result<RunOutcome> {
        for iteration in 1..=self.max_iterations {
            if self.pending.is_empty() {
                return Ok(RunOutcome::Complete {
                    iterations: iteration - 1,
                });
            }

            info!(iteration, items = self.pending.len(), "sending turn");
            println!("----------------------------------------");
            println!(
                "Iteration {iteration}: sending {} item(s) to the model.",
                self.pending.len()
            );

            let response = self
                .backend
                .respond(TurnRequest {
                    items: &self.pending,
                    tools: self.dispatcher.manifest(),
                    previous_response_id: self.previous_response_id.as_deref(),
                })
                .await?;

            if response.response_id.is_some() {
                self.previous_response_id = response.response_id;
            }

            let (assistant_text, mut calls) = partition(response.output);

            if assistant_text.is_empty() {
                println!("\nAssistant did not return a direct message this round.\n");
            } else {
                println!("\nAssistant:\n{assistant_text}\n");
            }

            // A model not using formal tool calls may still emit fenced
            // code blocks; pick those up as synthesized calls.
            if calls.is_empty() {
                calls = synthesize_calls(&assistant_text);
                if !calls.is_empty() {
                    debug!(count = calls.len(), "synthesized calls from code blocks");
                }
            }

            if calls.is_empty() {
                println!("No tool calls requested. Conversation complete.\n");
                return Ok(RunOutcome::Complete { iterations: iteration });
            }

            println!("Model requested {} tool call(s).", calls.len());

            self.pending.clear();
            for call in calls {
                println!("\n[Tool call] {} (call_id={})", call.name, call.call_id);
                println!("Input preview:\n{}", preview(&call.input, 200));

                let outcome = self.dispatcher.dispatch(&call.name, &call.input);
                let rendered = outcome.render();
                println!("Output:\n{}", rendered.trim());

                let folded = match call.origin {
                    CallOrigin::Model => ConversationItem::tool_output(call.call_id, rendered),
                    CallOrigin::Synthesized => ConversationItem::user(format!(
                        "[system] Executed code block:\n{rendered}"
                    )),
                };
                self.pending.push(folded);
            }
        }

        println!("Reached iteration limit before the conversation completed.\n");
        Ok(RunOutcome::LimitReached)
    }
}

/// Split a turn's output into concatenated assistant text and the ordered
/// tool calls, preserving the order calls were received in.
fn partition(output: Vec<OutputItem>) -> (String, Vec<ToolCallRequest>) {
    let mut fragments = Vec::new();
    let mut calls = Vec::new();

    for item in output {
        match item {
            OutputItem::Text(text) => fragments.push(text),
            OutputItem::ToolCall {
                call_id,
                name,
                input,
            } => calls.push(ToolCallRequest {
                call_id,
                name,
                input,
                origin: CallOrigin::Model,
            }),
        }
    }

    (fragments.join("\n").trim().to_string(), calls)
}

/// Extract ```sql and ```rhai fenced blocks from assistant text as tool
/// calls with synthesized `auto-` correlation ids.
fn synthesize_calls(text: &str) -> Vec<ToolCallRequest> {
    let mut calls = Vec::new();
    for (block, tool) in [(&SQL_BLOCK, QUERY_TOOL), (&SCRIPT_BLOCK, SCRIPT_TOOL)] {
        for capture in block.captures_iter(text) {
            let input = capture[1].trim().to_string();
            if input.is_empty() {
                continue;
            }
            calls.push(ToolCallRequest {
                call_id: format!("auto-{}", Uuid::new_v4()),
                name: tool.to_string(),
                input,
                origin: CallOrigin::Synthesized,
            });
        }
    }
    calls
}

fn preview(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(max).collect();
        format!("{cut}…")
    }
}
