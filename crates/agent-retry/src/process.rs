//! [`AgentQuery`] backed by one run of the agent command per query.
//!
//! The command is started as `<program> -p --output-format stream-json
//! --verbose [flags] <prompt>` and each stdout line is parsed as a
//! [`Message`]. Failures map onto the retry taxonomy:
//!
//! | Failure                    | Error                       | Kind      |
//! |----------------------------|-----------------------------|-----------|
//! | program not found          | `Error::DependencyMissing`  | fatal     |
//! | missing working directory  | `Error::Config`             | fatal     |
//! | non-zero exit              | `Error::Process`            | transient |
//! | non-JSON stdout line       | `Error::JsonDecode`         | unknown   |

use crate::error::{Error, Result};
use crate::message::Message;
use crate::options::AgentOptions;
use crate::query::{AgentQuery, MessageStream};
use async_stream::try_stream;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

/// Default agent program.
pub const DEFAULT_PROGRAM: &str = "claude";

/// Runs the agent command for each query
#[derive(Debug, Clone)]
pub struct CommandQuery {
    program: PathBuf,
    leading_args: Vec<String>,
    extra_args: Vec<String>,
    env: Vec<(String, String)>,
}

impl Default for CommandQuery {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl CommandQuery {
    /// Query through `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            extra_args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Add an argument before the generated flags, e.g. the package name
    /// when `program` is a launcher such as `npx`.
    pub fn leading_arg(mut self, arg: impl Into<String>) -> Self {
        self.leading_args.push(arg.into());
        self
    }

    /// Append an argument after the generated flags, before the prompt.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Set an environment variable for the agent process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// The program this query runs.
    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Command-line arguments for one query.
    pub fn args(&self, prompt: &str, options: &AgentOptions) -> Result<Vec<String>> {
        let mut args = self.leading_args.clone();
        args.extend(["-p", "--output-format", "stream-json", "--verbose"].map(String::from));

        if let Some(system_prompt) = &options.system_prompt {
            args.push("--system-prompt".to_string());
            args.push(system_prompt.clone());
        }

        if !options.allowed_tools.is_empty() {
            args.push("--allowedTools".to_string());
            args.push(options.allowed_tools.join(","));
        }

        if !options.disallowed_tools.is_empty() {
            args.push("--disallowedTools".to_string());
            args.push(options.disallowed_tools.join(","));
        }

        args.push("--permission-mode".to_string());
        args.push(options.permission_mode.to_string());

        if let Some(model) = &options.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }

        if let Some(max_turns) = options.max_turns {
            args.push("--max-turns".to_string());
            args.push(max_turns.to_string());
        }

        if let Some(schema) = &options.output_schema {
            args.push("--json-schema".to_string());
            args.push(serde_json::to_string(schema).map_err(|e| {
                Error::Config(format!("Failed to serialize output schema: {}", e))
            })?);
        }

        if let Some(session_id) = &options.resume {
            args.push("--resume".to_string());
            args.push(session_id.clone());
        }

        if !options.agents.is_empty() {
            args.push("--agents".to_string());
            args.push(serde_json::to_string(&options.agents).map_err(|e| {
                Error::Config(format!("Failed to serialize sub-agents: {}", e))
            })?);
        }

        args.extend(self.extra_args.iter().cloned());
        args.push(prompt.to_string());
        Ok(args)
    }

    fn command(&self, prompt: &str, options: &AgentOptions) -> Result<Command> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args(prompt, options)?);

        if let Some(cwd) = &options.cwd {
            // A missing cwd also spawns as NotFound; report it before that.
            if !cwd.is_dir() {
                return Err(Error::Config(format!(
                    "Working directory does not exist: {}",
                    cwd.display()
                )));
            }
            cmd.current_dir(cwd);
        }

        cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(cmd)
    }

    fn spawn_error(&self, error: std::io::Error) -> Error {
        if error.kind() == std::io::ErrorKind::NotFound {
            Error::DependencyMissing {
                program: self.program.display().to_string(),
            }
        } else {
            Error::Io(error)
        }
    }
}

impl AgentQuery for CommandQuery {
    fn query<'a>(&'a self, prompt: &'a str, options: &'a AgentOptions) -> MessageStream<'a> {
        Box::pin(try_stream! {
            let mut cmd = self.command(prompt, options)?;
            debug!("Executing agent command: {:?}", cmd);

            let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| Error::Other("Agent stdout was not captured".to_string()))?;

            // Drain stderr alongside stdout so a chatty process cannot block.
            let stderr_task = child.stderr.take().map(|mut stderr| {
                tokio::spawn(async move {
                    let mut buf = String::new();
                    if let Err(e) = stderr.read_to_string(&mut buf).await {
                        debug!("Failed to read agent stderr: {}", e);
                    }
                    buf
                })
            });

            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                if let Some(message) = Message::parse_line(&line)? {
                    yield message;
                }
            }

            let status = child.wait().await?;
            if !status.success() {
                let stderr = match stderr_task {
                    Some(task) => task.await.unwrap_or_default(),
                    None => String::new(),
                };
                Err::<(), _>(Error::Process {
                    exit_code: status.code(),
                    stderr: stderr.trim().to_string(),
                })?;
            }
        })
    }
}
