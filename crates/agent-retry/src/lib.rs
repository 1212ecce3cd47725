//! # agent-retry
//!
//! Retry, backoff and deadline handling for calls to a conversational
//! agent CLI.
//!
//! The core is [`RequestRetrier::execute`]: it runs a streaming request up to
//! [`RetryPolicy::max_attempts`] times, sleeps `base_delay * 2^(n-1)` after
//! the n-th transient failure, gives up immediately on fatal errors, and
//! reports a distinct [`RequestOutcome::Timeout`] when the [`Deadline`]
//! fires. Around it sit the agent glue pieces: [`AgentOptions`], the
//! [`AgentQuery`] seam with its subprocess implementation
//! [`CommandQuery`], stream-json [`Message`]s, multi-turn
//! [`Conversation`]s, and capability [`degrade`]-ation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agent_retry::{AgentOptions, CommandQuery, Deadline, RequestRetrier, RetryPolicy};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> agent_retry::Result<()> {
//!     let options = AgentOptions::builder()
//!         .allowed_tools(["Read"])
//!         .max_turns(5)
//!         .build();
//!     let policy = RetryPolicy::new(3, Duration::from_secs(1))?;
//!
//!     let outcome = RequestRetrier::new("summarize")
//!         .query(
//!             &CommandQuery::default(),
//!             "Read the Cargo.toml file and summarize it.",
//!             &options,
//!             &policy,
//!             Deadline::after(Duration::from_secs(30)),
//!         )
//!         .await;
//!
//!     for message in outcome.into_result()? {
//!         for text in message.text_blocks() {
//!             println!("Agent: {}", text);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod conversation;
pub mod deadline;
pub mod degrade;
pub mod error;
pub mod message;
pub mod options;
pub mod output;
pub mod outcome;
pub mod policy;
pub mod process;
pub mod query;
pub mod retrier;

pub use config::{Settings, SettingsOverrides};
pub use conversation::Conversation;
pub use deadline::Deadline;
pub use degrade::{degrade, CapabilityTier, DegradeReport, TierAttempt};
pub use error::{Error, ErrorCode, ErrorKind, Result};
pub use message::{ContentBlock, Message};
pub use options::{parse_agents, AgentOptions, AgentOptionsBuilder, PermissionMode, SubAgent};
pub use outcome::{OutcomeKind, RequestOutcome};
pub use policy::RetryPolicy;
pub use process::CommandQuery;
pub use query::{AgentQuery, MessageStream};
pub use retrier::RequestRetrier;
