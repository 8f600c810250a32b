//! Incident report types handed to the publisher.

use chrono::{DateTime, Utc};

/// A cluster event as it appears in a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLine {
    pub reason: String,
    pub message: String,
}

impl EventLine {
    pub fn new(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            message: message.into(),
        }
    }
}

/// Everything needed to publish one restart incident.
#[derive(Debug, Clone)]
pub struct RestartReport {
    /// Pod name
    pub pod: String,
    /// Pod namespace
    pub namespace: String,
    /// Start time of the restarted pod
    pub restart_time: DateTime<Utc>,
    /// Correlated cluster events, in provider order
    pub events: Vec<EventLine>,
    /// Raw log tail
    pub logs: String,
    /// Model analysis text
    pub analysis: String,
}

/// Result of publishing a [`RestartReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Parent message posted; `replies_posted` of the three replies succeeded.
    Published {
        message_ref: crate::MessageRef,
        replies_posted: usize,
    },
    /// Parent message failed, so no replies were attempted.
    ParentFailed,
}

impl PublishOutcome {
    #[must_use]
    pub const fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}
