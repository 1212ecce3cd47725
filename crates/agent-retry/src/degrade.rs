//! Graceful degradation across capability tiers.
//!
//! Tiers are tried in order, each under the same retry policy and the same
//! call deadline. A tier that exhausts its retries on transient errors
//! hands over to the next one. Anything else ends the walk: success,
//! fatal and unclassified errors, and timeouts.

use crate::deadline::Deadline;
use crate::error::{Error, ErrorKind, Result};
use crate::message::Message;
use crate::options::AgentOptions;
use crate::outcome::{OutcomeKind, RequestOutcome};
use crate::policy::RetryPolicy;
use crate::query::AgentQuery;
use crate::retrier::RequestRetrier;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A named tool set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityTier {
    /// Human-readable name, e.g. "Full capabilities"
    pub label: String,
    /// Tools allowed at this tier
    pub allowed_tools: Vec<String>,
}

impl CapabilityTier {
    /// Create a tier.
    pub fn new<I, S>(label: impl Into<String>, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            allowed_tools: tools.into_iter().map(Into::into).collect(),
        }
    }

    /// Full, limited and minimal file/shell tool sets.
    pub fn defaults() -> Vec<CapabilityTier> {
        vec![
            CapabilityTier::new(
                "Full capabilities",
                ["Read", "Write", "Bash", "Grep", "Glob"],
            ),
            CapabilityTier::new("Limited capabilities", ["Read", "Bash"]),
            CapabilityTier::new("Minimal capabilities", ["Read"]),
        ]
    }
}

/// What happened at one tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierAttempt {
    /// Tier label
    pub label: String,
    /// How the tier ended
    pub outcome: OutcomeKind,
    /// Attempts made at this tier
    pub attempts: u32,
}

/// Result of a degradation walk
#[derive(Debug)]
pub struct DegradeReport<T> {
    /// Tiers tried, in order
    pub tiers: Vec<TierAttempt>,
    /// Outcome of the last tier tried
    pub outcome: RequestOutcome<T>,
}

impl<T> DegradeReport<T> {
    /// Label of the tier that succeeded, if any.
    pub fn succeeded_with(&self) -> Option<&str> {
        if !self.outcome.is_success() {
            return None;
        }
        self.tiers.last().map(|tier| tier.label.as_str())
    }
}

/// Try each tier in order until one succeeds.
///
/// # Errors
///
/// Returns `Error::Config` if `tiers` is empty.
pub async fn degrade(
    retrier: &RequestRetrier,
    agent: &dyn AgentQuery,
    prompt: &str,
    base_options: &AgentOptions,
    tiers: &[CapabilityTier],
    policy: &RetryPolicy,
    deadline: Deadline,
) -> Result<DegradeReport<Message>> {
    let mut tried = Vec::with_capacity(tiers.len());
    let mut last: Option<RequestOutcome<Message>> = None;

    for tier in tiers {
        if let Some(previous) = &last {
            if previous.error_kind() != Some(ErrorKind::Transient) {
                break;
            }
            if let Some(error) = previous.error() {
                warn!(tier = %tier.label, "Previous tier failed, degrading: {}", error);
            }
        }

        info!(tier = %tier.label, "Trying capability tier");
        let options = base_options.with_allowed_tools(&tier.allowed_tools);
        let outcome = retrier
            .query(agent, prompt, &options, policy, deadline)
            .await;

        tried.push(TierAttempt {
            label: tier.label.clone(),
            outcome: outcome.kind(),
            attempts: outcome.attempts(),
        });
        last = Some(outcome);
    }

    let outcome = last.ok_or_else(|| {
        Error::Config("At least one capability tier is required".to_string())
    })?;
    match outcome.kind() {
        OutcomeKind::Success => info!(tiers = tried.len(), "Degradation succeeded"),
        kind => warn!(tiers = tried.len(), outcome = %kind, "Degradation gave up"),
    }

    Ok(DegradeReport {
        tiers: tried,
        outcome,
    })
}
