//! Conversation items and tool-call requests.

use serde::{Deserialize, Serialize};

/// Role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One item in the pending conversation queue.
///
/// Ordering in the queue reflects causal order: a tool output always
/// follows the request that produced it within the same logical
/// conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationItem {
    /// A plain message.
    Message { role: Role, content: String },
    /// The output of a tool call, correlated by the service-issued id.
    ToolOutput { call_id: String, output: String },
}

impl ConversationItem {
    pub fn system(content: impl Into<String>) -> Self {
        Self::Message {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::Message {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Message {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn tool_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::ToolOutput {
            call_id: call_id.into(),
            output: output.into(),
        }
    }
}

/// Where a tool call came from.
///
/// The service issues formal tool calls with its own correlation ids;
/// the orchestrator also synthesizes calls from fenced code blocks in
/// assistant text. The two fold back into the conversation differently:
/// formal calls as tool outputs, synthesized ones as user messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOrigin {
    Model,
    Synthesized,
}

/// A tool call to execute, produced by one inference turn and consumed
/// within the same loop iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub name: String,
    pub input: String,
    pub origin: CallOrigin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_roles() {
        assert_eq!(
            ConversationItem::system("s"),
            ConversationItem::Message {
                role: Role::System,
                content: "s".to_string()
            }
        );
        assert!(matches!(
            ConversationItem::user("u"),
            ConversationItem::Message {
                role: Role::User,
                ..
            }
        ));
        assert!(matches!(
            ConversationItem::tool_output("id", "out"),
            ConversationItem::ToolOutput { .. }
        ));
    }
}
