//! Multi-turn conversations over one agent session.
//!
//! Every turn is a separate retried query. Context carries over because
//! each turn resumes the session id reported by the previous turn's result
//! message.

use crate::deadline::Deadline;
use crate::message::Message;
use crate::options::AgentOptions;
use crate::outcome::RequestOutcome;
use crate::policy::RetryPolicy;
use crate::query::AgentQuery;
use crate::retrier::RequestRetrier;
use tracing::{debug, info, warn};

/// A sequence of prompts sent as turns of one session
///
/// # Examples
///
/// ```rust,no_run
/// use agent_retry::{
///     AgentOptions, CommandQuery, Conversation, Deadline, RequestRetrier, RetryPolicy,
/// };
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let retrier = RequestRetrier::new("chat");
/// let agent = CommandQuery::default();
/// let policy = RetryPolicy::default();
/// let mut conversation = Conversation::new(&retrier, &agent, AgentOptions::default());
///
/// for prompt in ["What's the capital of France?", "What's the population of that city?"] {
///     let outcome = conversation
///         .send(prompt, &policy, Deadline::after(Duration::from_secs(30)))
///         .await;
///     if !outcome.is_success() {
///         break;
///     }
/// }
/// # }
/// ```
pub struct Conversation<'a> {
    retrier: &'a RequestRetrier,
    agent: &'a dyn AgentQuery,
    options: AgentOptions,
    session_id: Option<String>,
    turns: u32,
}

impl<'a> Conversation<'a> {
    /// Start a conversation; the first turn opens a fresh session unless
    /// `options.resume` names one.
    pub fn new(
        retrier: &'a RequestRetrier,
        agent: &'a dyn AgentQuery,
        options: AgentOptions,
    ) -> Self {
        let session_id = options.resume.clone();
        Self {
            retrier,
            agent,
            options,
            session_id,
            turns: 0,
        }
    }

    /// Continue an existing session instead of opening a new one.
    pub fn resume(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Session the next turn will resume, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Number of turns that succeeded.
    pub fn turns(&self) -> u32 {
        self.turns
    }

    /// Send one turn.
    ///
    /// The turn runs under its own policy and deadline. A successful turn
    /// adopts the session id of its last result message; a failed turn
    /// leaves the session unchanged.
    pub async fn send(
        &mut self,
        prompt: &str,
        policy: &RetryPolicy,
        deadline: Deadline,
    ) -> RequestOutcome<Message> {
        let options = self.options.resuming(self.session_id.as_deref());
        debug!(
            turn = self.turns + 1,
            session_id = ?self.session_id,
            "Sending conversation turn"
        );

        let outcome = self
            .retrier
            .query(self.agent, prompt, &options, policy, deadline)
            .await;

        match &outcome {
            RequestOutcome::Success { items, .. } => {
                self.turns += 1;
                match items.iter().rev().find_map(Message::session_id) {
                    Some(id) => {
                        if self.session_id.as_deref() != Some(id) {
                            info!(session_id = %id, "Conversation session started");
                        }
                        self.session_id = Some(id.to_string());
                    }
                    None => warn!(turn = self.turns, "Turn finished without a session id"),
                }
            }
            other => warn!(
                turn = self.turns + 1,
                outcome = %other.kind(),
                "Conversation turn did not succeed"
            ),
        }

        outcome
    }
}
