//! Settings for the retry policy, call deadline and agent command.
//!
//! Settings come from a TOML file, then environment overrides, then
//! command-line overrides, then validation:
//!
//! ```toml
//! [retry]
//! max_attempts = 3
//! base_delay_secs = 1.0
//! timeout_secs = 30
//!
//! [agent]
//! program = "claude"
//! model = "sonnet"
//! max_turns = 5
//! ```
//!
//! The file is `agent-retry.toml` in the working directory unless
//! `AGENT_RETRY_CONFIG` names another one. A missing default file means
//! defaults; a missing explicit file is an error.

use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::options::{AgentOptions, PermissionMode};
use crate::policy::RetryPolicy;
use crate::process::{CommandQuery, DEFAULT_PROGRAM};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Default settings file name
pub const DEFAULT_CONFIG_FILE: &str = "agent-retry.toml";

// Environment variable names
pub const ENV_CONFIG_PATH: &str = "AGENT_RETRY_CONFIG";
pub const ENV_MAX_ATTEMPTS: &str = "AGENT_RETRY_MAX_ATTEMPTS";
pub const ENV_BASE_DELAY_SECS: &str = "AGENT_RETRY_BASE_DELAY_SECS";
pub const ENV_TIMEOUT_SECS: &str = "AGENT_RETRY_TIMEOUT_SECS";
pub const ENV_PROGRAM: &str = "AGENT_RETRY_PROGRAM";
pub const ENV_MODEL: &str = "AGENT_RETRY_MODEL";

const MAX_TIMEOUT_SECS: u64 = 3600;

/// Retry section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempt budget per call
    pub max_attempts: u32,
    /// Delay before the second attempt, in seconds
    pub base_delay_secs: f64,
    /// Deadline for the whole call, in seconds
    pub timeout_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 1.0,
            timeout_secs: 30,
        }
    }
}

/// Agent section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Agent program to run
    pub program: PathBuf,
    /// Model alias
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Turn limit passed to the agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    /// System prompt used when the command line gives none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Permission mode for tool use
    pub permission_mode: PermissionMode,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            model: None,
            max_turns: None,
            system_prompt: None,
            permission_mode: PermissionMode::Default,
        }
    }
}

/// Values given on the command line; `None` keeps the loaded value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    pub max_attempts: Option<u32>,
    pub base_delay_secs: Option<f64>,
    pub timeout_secs: Option<u64>,
    pub program: Option<PathBuf>,
}

/// All settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Retry policy and deadline
    pub retry: RetrySettings,
    /// Agent command and defaults
    pub agent: AgentSettings,
}

impl Settings {
    /// Load settings from `path`, or from the default location when `None`,
    /// then apply environment overrides.
    ///
    /// The result is not validated: command-line overrides still apply on
    /// top, so callers run [`Settings::validate`] once they are in.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if an explicit file cannot be read, if any
    /// file cannot be parsed, or if an environment value does not parse.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from));

        let mut settings = match explicit {
            Some(path) => Self::read_file(&path).await?,
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if tokio::fs::try_exists(&default_path).await.unwrap_or(false) {
                    Self::read_file(&default_path).await?
                } else {
                    debug!("No settings file found, using defaults");
                    Self::default()
                }
            }
        };

        settings.merge_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    async fn read_file(path: &Path) -> Result<Self> {
        debug!("Loading settings from: {}", path.display());
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!(
                "Failed to read settings file {}: {}",
                path.display(),
                e
            ))
        })?;
        let settings = Self::from_toml(&content)?;
        info!("Settings loaded from {}", path.display());
        Ok(settings)
    }

    /// Parse settings from TOML text without env overrides or validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse settings: {}", e)))
    }

    /// Apply overrides; `lookup` returns the value of an environment variable.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a numeric override does not parse.
    pub fn merge_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_ATTEMPTS) {
            debug!("Overriding max_attempts from environment: {}", value);
            self.retry.max_attempts = parse_env(ENV_MAX_ATTEMPTS, &value)?;
        }
        if let Some(value) = lookup(ENV_BASE_DELAY_SECS) {
            debug!("Overriding base_delay_secs from environment: {}", value);
            self.retry.base_delay_secs = parse_env(ENV_BASE_DELAY_SECS, &value)?;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_SECS) {
            debug!("Overriding timeout_secs from environment: {}", value);
            self.retry.timeout_secs = parse_env(ENV_TIMEOUT_SECS, &value)?;
        }
        if let Some(value) = lookup(ENV_PROGRAM) {
            debug!("Overriding agent program from environment: {}", value);
            self.agent.program = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_MODEL) {
            self.agent.model = Some(value);
        }
        Ok(())
    }

    /// Apply command-line overrides on top of file and environment values.
    pub fn apply_overrides(&mut self, overrides: &SettingsOverrides) {
        if let Some(max_attempts) = overrides.max_attempts {
            self.retry.max_attempts = max_attempts;
        }
        if let Some(base_delay_secs) = overrides.base_delay_secs {
            self.retry.base_delay_secs = base_delay_secs;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.retry.timeout_secs = timeout_secs;
        }
        if let Some(program) = &overrides.program {
            debug!("Overriding agent program: {}", program.display());
            self.agent.program = program.clone();
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        self.retry_policy()?;

        if self.retry.timeout_secs == 0 || self.retry.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(Error::Config(format!(
                "Timeout must be between 1 and {} seconds (got {})",
                MAX_TIMEOUT_SECS, self.retry.timeout_secs
            )));
        }

        if self.agent.program.as_os_str().is_empty() {
            return Err(Error::Config("Agent program cannot be empty".to_string()));
        }

        if self.agent.max_turns == Some(0) {
            return Err(Error::Config("Max turns must be greater than 0".to_string()));
        }

        Ok(())
    }

    /// Retry policy from the `[retry]` section.
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        RetryPolicy::from_secs_f64(self.retry.max_attempts, self.retry.base_delay_secs)
    }

    /// Call timeout from the `[retry]` section.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.retry.timeout_secs)
    }

    /// Deadline starting now.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.timeout())
    }

    /// Agent options seeded from the `[agent]` section.
    pub fn agent_options(&self) -> AgentOptions {
        AgentOptions {
            system_prompt: self.agent.system_prompt.clone(),
            permission_mode: self.agent.permission_mode,
            model: self.agent.model.clone(),
            max_turns: self.agent.max_turns,
            ..AgentOptions::default()
        }
    }

    /// Agent command from the `[agent]` section.
    pub fn command_query(&self) -> CommandQuery {
        CommandQuery::new(&self.agent.program)
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: '{}' ({})", key, value, e)))
}
