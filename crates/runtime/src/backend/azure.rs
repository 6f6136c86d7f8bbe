//! Azure OpenAI Responses API backend.

use super::{InferenceBackend, OutputItem, TurnRequest, TurnResponse};
use crate::item::{ConversationItem, Role};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Backend for an Azure OpenAI deployment speaking the v1 Responses API.
pub struct AzureBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    deployment: String,
}

impl AzureBackend {
    /// Create a backend for `{endpoint}/openai/v1/responses`.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            deployment: deployment.into(),
        }
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    fn url(&self) -> String {
        format!("{}/openai/v1/responses", self.endpoint)
    }
}

impl std::fmt::Display for AzureBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "azure({}, {})", self.endpoint, self.deployment)
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    input: Vec<ApiInputItem<'a>>,
    tools: Vec<ApiTool<'a>>,
    text: TextFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_response_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiInputItem<'a> {
    Message {
        role: &'static str,
        content: &'a str,
    },
    FunctionCallOutput {
        #[serde(rename = "type")]
        item_type: &'static str,
        call_id: &'a str,
        output: &'a str,
    },
}

impl<'a> From<&'a ConversationItem> for ApiInputItem<'a> {
    fn from(item: &'a ConversationItem) -> Self {
        match item {
            ConversationItem::Message { role, content } => Self::Message {
                role: match role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content,
            },
            ConversationItem::ToolOutput { call_id, output } => Self::FunctionCallOutput {
                item_type: "function_call_output",
                call_id,
                output,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiTool<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    name: &'a str,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct TextFormat {
    format: FormatType,
}

#[derive(Debug, Serialize)]
struct FormatType {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    id: Option<String>,
    #[serde(default)]
    output: Vec<ApiOutputItem>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiOutputItem {
    Message {
        #[serde(default)]
        content: Vec<ApiContent>,
    },
    CustomToolCall {
        call_id: String,
        name: String,
        #[serde(default)]
        input: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContent {
    OutputText { text: String },
    #[serde(other)]
    Other,
}

impl InferenceBackend for AzureBackend {
    async fn respond(&self, request: TurnRequest<'_>) -> Result<TurnResponse> {
        let api_request = ApiRequest {
            model: &self.deployment,
            input: request.items.iter().map(ApiInputItem::from).collect(),
            tools: request
                .tools
                .iter()
                .map(|tool| ApiTool {
                    tool_type: "custom",
                    name: tool.name,
                    description: tool.description,
                })
                .collect(),
            text: TextFormat {
                format: FormatType {
                    format_type: "text",
                },
            },
            previous_response_id: request.previous_response_id,
        };

        let response = self
            .client
            .post(self.url())
            .header("api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Api(e.to_string()))?;

        let output = api_response
            .output
            .into_iter()
            .filter_map(|item| match item {
                ApiOutputItem::Message { content } => {
                    let text: String = content
                        .into_iter()
                        .filter_map(|c| match c {
                            ApiContent::OutputText { text } => Some(text),
                            ApiContent::Other => None,
                        })
                        .collect();
                    let text = text.trim().to_string();
                    (!text.is_empty()).then_some(OutputItem::Text(text))
                }
                ApiOutputItem::CustomToolCall {
                    call_id,
                    name,
                    input,
                } => Some(OutputItem::ToolCall {
                    call_id,
                    name,
                    input,
                }),
                ApiOutputItem::Other => None,
            })
            .collect();

        Ok(TurnResponse {
            response_id: api_response.id,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolSpec;

    #[test]
    fn request_serializes_to_the_wire_shape() {
        let items = vec![
            ConversationItem::system("be useful"),
            ConversationItem::tool_output("call_1", "species,n\nsetosa,50"),
        ];
        let tools = vec![ToolSpec {
            name: "sql_exec_csv",
            description: "runs SQL",
        }];

        let request = ApiRequest {
            model: "gpt-5",
            input: items.iter().map(ApiInputItem::from).collect(),
            tools: tools
                .iter()
                .map(|tool| ApiTool {
                    tool_type: "custom",
                    name: tool.name,
                    description: tool.description,
                })
                .collect(),
            text: TextFormat {
                format: FormatType {
                    format_type: "text",
                },
            },
            previous_response_id: Some("resp_1"),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["input"][0]["role"], "system");
        assert_eq!(json["input"][1]["type"], "function_call_output");
        assert_eq!(json["input"][1]["call_id"], "call_1");
        assert_eq!(json["tools"][0]["type"], "custom");
        assert_eq!(json["text"]["format"]["type"], "text");
        assert_eq!(json["previous_response_id"], "resp_1");
    }

    #[test]
    fn response_parses_text_and_tool_calls() {
        let body = r#"{
            "id": "resp_2",
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "content": [{"type": "output_text", "text": "Running SQL now."}]},
                {"type": "custom_tool_call", "call_id": "call_9", "name": "sql_exec_csv", "input": "select 1"}
            ]
        }"#;

        let parsed: ApiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.id.as_deref(), Some("resp_2"));
        assert_eq!(parsed.output.len(), 3);
        assert!(matches!(parsed.output[0], ApiOutputItem::Other));
        assert!(matches!(
            parsed.output[2],
            ApiOutputItem::CustomToolCall { ref name, .. } if name == "sql_exec_csv"
        ));
    }
}
