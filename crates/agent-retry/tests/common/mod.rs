//! Shared fixtures for integration tests.

#![allow(dead_code)]

use agent_retry::{AgentOptions, AgentQuery, ContentBlock, Error, Message, MessageStream};
use futures::stream::{self, StreamExt};
use std::sync::Mutex;
use tokio::time::Instant;

/// What one scripted attempt does
#[derive(Debug, Clone)]
pub enum Step {
    /// Fail with a non-zero exit
    Transient,
    /// Fail because the agent command is missing
    Missing,
    /// Emit a line that is not JSON
    Garbage,
    /// Emit the messages and finish
    Reply(Vec<Message>),
    /// Emit the messages, then never finish
    Hang(Vec<Message>),
}

/// One recorded query
#[derive(Debug, Clone)]
pub struct Call {
    pub at: Instant,
    pub prompt: String,
    pub allowed_tools: Vec<String>,
    pub resume: Option<String>,
}

/// An agent that plays back a script, one step per query.
///
/// The last step repeats once the script runs out.
pub struct ScriptedAgent {
    steps: Vec<Step>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedAgent {
    pub fn new(steps: Vec<Step>) -> Self {
        assert!(!steps.is_empty(), "script needs at least one step");
        Self {
            steps,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl AgentQuery for ScriptedAgent {
    fn query<'a>(&'a self, prompt: &'a str, options: &'a AgentOptions) -> MessageStream<'a> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                at: Instant::now(),
                prompt: prompt.to_string(),
                allowed_tools: options.allowed_tools.clone(),
                resume: options.resume.clone(),
            });
            calls.len() - 1
        };
        let step = self.steps[index.min(self.steps.len() - 1)].clone();

        match step {
            Step::Transient => stream::iter(vec![Err(Error::Process {
                exit_code: Some(1),
                stderr: "temporarily unavailable".to_string(),
            })])
            .boxed(),
            Step::Missing => stream::iter(vec![Err(Error::DependencyMissing {
                program: "claude".to_string(),
            })])
            .boxed(),
            Step::Garbage => stream::iter(vec![Err(Error::JsonDecode {
                line: "<html>".to_string(),
                source: serde_json::from_str::<serde_json::Value>("<html>").unwrap_err(),
            })])
            .boxed(),
            Step::Reply(messages) => stream::iter(messages.into_iter().map(Ok)).boxed(),
            Step::Hang(messages) => stream::iter(messages.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed(),
        }
    }
}

pub fn text(text: &str) -> Message {
    Message::Assistant {
        content: vec![ContentBlock::Text {
            text: text.to_string(),
        }],
    }
}

pub fn result(result: &str) -> Message {
    result_in("session-1", result)
}

pub fn result_in(session_id: &str, result: &str) -> Message {
    Message::Result {
        subtype: "success".to_string(),
        is_error: false,
        num_turns: 1,
        session_id: session_id.to_string(),
        duration_ms: 25,
        total_cost_usd: Some(0.001),
        result: Some(result.to_string()),
        structured_output: None,
    }
}
