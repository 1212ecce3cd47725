//! Message types read from the agent's stream-json output.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A content block inside an assistant message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text
    Text {
        /// The text
        text: String,
    },
    /// Extended thinking
    Thinking {
        /// Thinking content
        thinking: String,
        /// Signature over the thinking content
        #[serde(default)]
        signature: String,
    },
    /// A tool invocation
    ToolUse {
        /// Tool use id
        id: String,
        /// Tool name
        name: String,
        /// Tool input
        #[serde(default)]
        input: Value,
    },
    /// Output of a tool invocation
    ToolResult {
        /// Id of the tool use this answers
        tool_use_id: String,
        /// Result content, text or structured
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<Value>,
        /// Whether the tool failed
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

/// One message from the agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Echoed user input
    User {
        /// User text
        content: String,
    },
    /// Assistant turn
    Assistant {
        /// Content blocks in order
        content: Vec<ContentBlock>,
    },
    /// System notice, such as session init
    System {
        /// Notice subtype
        subtype: String,
        /// Remaining fields
        data: Value,
    },
    /// Final message of a query
    Result {
        /// Result subtype, e.g. `success` or `error_max_turns`
        subtype: String,
        /// Whether the query ended in error
        is_error: bool,
        /// Turns taken
        num_turns: u32,
        /// Session id
        session_id: String,
        /// Wall time in milliseconds
        duration_ms: u64,
        /// Total cost in USD
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_cost_usd: Option<f64>,
        /// Final text result
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
        /// Validated output when a JSON schema was requested
        #[serde(default, skip_serializing_if = "Option::is_none")]
        structured_output: Option<Value>,
    },
}

impl Message {
    /// Parse one line of stream-json output.
    ///
    /// Returns `Ok(None)` for blank lines and message types this crate does
    /// not model.
    pub fn parse_line(line: &str) -> Result<Option<Message>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let json: Value = serde_json::from_str(line).map_err(|source| Error::JsonDecode {
            line: line.to_string(),
            source,
        })?;
        Self::from_json(json)
    }

    /// Convert a decoded stream-json value into a message.
    pub fn from_json(json: Value) -> Result<Option<Message>> {
        let msg_type = json
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("Missing 'type' field", &json))?;

        match msg_type {
            "user" => Ok(parse_user(&json)),
            "assistant" => parse_assistant(&json).map(Some),
            "system" => Ok(Some(parse_system(json))),
            "result" => Ok(Some(parse_result(&json))),
            other => {
                debug!("Ignoring message type: {}", other);
                Ok(None)
            }
        }
    }

    /// Text blocks of an assistant message, empty for other messages.
    pub fn text_blocks(&self) -> impl Iterator<Item = &str> {
        let blocks: &[ContentBlock] = match self {
            Message::Assistant { content } => content,
            _ => &[],
        };
        blocks.iter().filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Structured payload of a result message.
    ///
    /// Prefers `structured_output`; falls back to parsing the `result` text
    /// as JSON. `None` for other messages or a non-JSON result.
    pub fn result_json(&self) -> Option<Value> {
        match self {
            Message::Result {
                structured_output: Some(value),
                ..
            } => Some(value.clone()),
            Message::Result {
                result: Some(text), ..
            } => serde_json::from_str(text).ok(),
            _ => None,
        }
    }

    /// Whether this is the final message of a query.
    pub fn is_result(&self) -> bool {
        matches!(self, Message::Result { .. })
    }

    /// Session id reported by a result message, if non-empty.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Message::Result { session_id, .. } if !session_id.is_empty() => Some(session_id),
            _ => None,
        }
    }
}

fn invalid(reason: &str, json: &Value) -> Error {
    Error::Other(format!("Invalid agent message ({}): {}", reason, json))
}

fn parse_user(json: &Value) -> Option<Message> {
    // Array content carries tool results back to the model; not user text.
    let content = json.get("message")?.get("content")?.as_str()?;
    Some(Message::User {
        content: content.to_string(),
    })
}

fn parse_assistant(json: &Value) -> Result<Message> {
    let blocks = json
        .get("message")
        .and_then(|message| message.get("content"))
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("Missing 'message.content' array", json))?;

    let mut content = Vec::with_capacity(blocks.len());
    for block in blocks {
        match block.get("type").and_then(Value::as_str) {
            Some("text" | "thinking" | "tool_use" | "tool_result") => {
                let parsed = ContentBlock::deserialize(block)
                    .map_err(|e| invalid(&format!("Bad content block: {}", e), block))?;
                content.push(parsed);
            }
            other => debug!("Skipping content block type: {:?}", other),
        }
    }

    Ok(Message::Assistant { content })
}

fn parse_system(mut json: Value) -> Message {
    let subtype = json
        .get("subtype")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    if let Some(map) = json.as_object_mut() {
        map.remove("type");
        map.remove("subtype");
    }
    Message::System {
        subtype,
        data: json,
    }
}

fn parse_result(json: &Value) -> Message {
    let str_field = |key: &str| json.get(key).and_then(Value::as_str).map(str::to_string);

    Message::Result {
        subtype: str_field("subtype").unwrap_or_else(|| "unknown".to_string()),
        is_error: json.get("is_error").and_then(Value::as_bool).unwrap_or(false),
        num_turns: json
            .get("num_turns")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0),
        session_id: str_field("session_id").unwrap_or_default(),
        duration_ms: json.get("duration_ms").and_then(Value::as_u64).unwrap_or(0),
        total_cost_usd: json.get("total_cost_usd").and_then(Value::as_f64),
        result: str_field("result"),
        structured_output: json
            .get("structured_output")
            .filter(|value| !value.is_null())
            .cloned(),
    }
}
