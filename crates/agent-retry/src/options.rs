//! Agent options passed through to the agent command.
//!
//! The retrier never looks inside these; they only travel to whichever
//! [`AgentQuery`](crate::AgentQuery) runs the request.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

const MAX_TOOL_NAME_LENGTH: usize = 100;

/// How the agent asks for permission before using tools
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    /// Prompt for anything not explicitly allowed
    #[default]
    Default,
    /// Accept file edits without prompting
    AcceptEdits,
    /// Plan only, no tool execution
    Plan,
    /// Skip all permission checks
    BypassPermissions,
}

impl PermissionMode {
    /// Value passed to `--permission-mode`.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::Plan => "plan",
            PermissionMode::BypassPermissions => "bypassPermissions",
        }
    }
}

impl fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A specialised sub-agent the main agent can delegate to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubAgent {
    /// When the main agent should use this sub-agent
    pub description: String,
    /// System prompt for the sub-agent
    pub prompt: String,
    /// Tools the sub-agent may use; `None` inherits the parent's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
    /// Model alias, e.g. `sonnet` or `haiku`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl SubAgent {
    /// Sub-agent with a description and prompt.
    pub fn new(description: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            prompt: prompt.into(),
            tools: None,
            model: None,
        }
    }

    /// Restrict the sub-agent's tools.
    pub fn tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    /// Pick a model for the sub-agent.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Parse sub-agent definitions from JSON.
///
/// The document maps each name to `{description, prompt, tools?, model?}`,
/// the same shape passed to the agent as `--agents`.
///
/// # Errors
///
/// Returns `Error::Config` if the text is not such a map.
pub fn parse_agents(json: &str) -> Result<BTreeMap<String, SubAgent>> {
    serde_json::from_str(json)
        .map_err(|e| Error::Config(format!("Invalid sub-agent definitions: {}", e)))
}

/// Options describing what the agent may do for one query
///
/// # Examples
///
/// ```rust
/// use agent_retry::{AgentOptions, PermissionMode};
///
/// let options = AgentOptions::builder()
///     .system_prompt("You are a helpful coding assistant. Be concise and clear.")
///     .allowed_tools(["Read", "Bash"])
///     .permission_mode(PermissionMode::Default)
///     .max_turns(5)
///     .build();
///
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentOptions {
    /// System prompt for the agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Tools the agent may use without asking
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_tools: Vec<String>,
    /// Tools the agent may never use
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disallowed_tools: Vec<String>,
    /// Permission handling for tool use
    #[serde(default)]
    pub permission_mode: PermissionMode,
    /// Working directory for the agent; inherits the caller's when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    /// Model alias or full model id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Upper bound on agent turns within one query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    /// JSON schema the final result must satisfy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,
    /// Named sub-agents available for delegation
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub agents: BTreeMap<String, SubAgent>,
    /// Session to continue, taken from an earlier result message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<String>,
}

impl AgentOptions {
    /// Create a new options builder
    pub fn builder() -> AgentOptionsBuilder {
        AgentOptionsBuilder::default()
    }

    /// Copy of these options with a different tool set.
    pub fn with_allowed_tools(&self, tools: &[String]) -> Self {
        Self {
            allowed_tools: tools.to_vec(),
            ..self.clone()
        }
    }

    /// Copy of these options continuing `session_id`, or starting fresh.
    pub fn resuming(&self, session_id: Option<&str>) -> Self {
        Self {
            resume: session_id.map(str::to_string),
            ..self.clone()
        }
    }

    /// Validate the options
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if:
    /// - A tool name is empty or too long
    /// - `max_turns` is zero
    /// - A tool is both allowed and disallowed
    /// - A sub-agent has an empty name, description, or prompt
    /// - The output schema is not a JSON object
    /// - The resumed session id is empty
    pub fn validate(&self) -> Result<()> {
        for tool in self.allowed_tools.iter().chain(&self.disallowed_tools) {
            if tool.trim().is_empty() || tool.len() > MAX_TOOL_NAME_LENGTH {
                return Err(Error::Config(format!(
                    "Tool name length must be between 1 and {} characters (got '{}')",
                    MAX_TOOL_NAME_LENGTH, tool
                )));
            }
        }

        if let Some(tool) = self
            .disallowed_tools
            .iter()
            .find(|tool| self.allowed_tools.contains(tool))
        {
            return Err(Error::Config(format!(
                "Tool '{}' cannot be both allowed and disallowed",
                tool
            )));
        }

        if self.max_turns == Some(0) {
            return Err(Error::Config("Max turns must be greater than 0".to_string()));
        }

        if let Some(schema) = &self.output_schema {
            if !schema.is_object() {
                return Err(Error::Config("Output schema must be a JSON object".to_string()));
            }
        }

        if self.resume.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(Error::Config("Resumed session id cannot be empty".to_string()));
        }

        for (name, agent) in &self.agents {
            if name.trim().is_empty() {
                return Err(Error::Config("Sub-agent name cannot be empty".to_string()));
            }
            if agent.description.trim().is_empty() || agent.prompt.trim().is_empty() {
                return Err(Error::Config(format!(
                    "Sub-agent '{}' needs both a description and a prompt",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Builder for [`AgentOptions`]
#[derive(Debug, Default)]
pub struct AgentOptionsBuilder {
    options: AgentOptions,
}

impl AgentOptionsBuilder {
    /// Set the system prompt.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.options.system_prompt = Some(prompt.into());
        self
    }

    /// Replace the allowed tool list.
    pub fn allowed_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.allowed_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the disallowed tool list.
    pub fn disallowed_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.disallowed_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Set the permission mode.
    pub fn permission_mode(mut self, mode: PermissionMode) -> Self {
        self.options.permission_mode = mode;
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.options.cwd = Some(cwd.into());
        self
    }

    /// Set the model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.options.model = Some(model.into());
        self
    }

    /// Limit agent turns.
    pub fn max_turns(mut self, turns: u32) -> Self {
        self.options.max_turns = Some(turns);
        self
    }

    /// Require the result to match a JSON schema.
    pub fn output_schema(mut self, schema: serde_json::Value) -> Self {
        self.options.output_schema = Some(schema);
        self
    }

    /// Register a sub-agent.
    pub fn agent(mut self, name: impl Into<String>, agent: SubAgent) -> Self {
        self.options.agents.insert(name.into(), agent);
        self
    }

    /// Continue an earlier session.
    pub fn resume(mut self, session_id: impl Into<String>) -> Self {
        self.options.resume = Some(session_id.into());
        self
    }

    /// Finish building.
    pub fn build(self) -> AgentOptions {
        self.options
    }
}
