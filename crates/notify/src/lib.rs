//! Threaded restart notifications.
//!
//! This crate renders pod restart incidents and publishes them to a
//! messaging channel as one parent message plus threaded replies.
//!
//! # Usage
//!
//! ```no_run
//! use notify::{Notifier, RestartReport};
//!
//! # async fn run(report: RestartReport) {
//! let notifier = Notifier::from_env("#pod-restarts");
//! let outcome = notifier.publish(&report).await;
//! # let _ = outcome;
//! # }
//! ```
//!
//! # Configuration
//!
//! - `SLACK_BOT_TOKEN`: Slack bot token (enables the Slack channel)
//! - `NOTIFY_DISABLED`: Set to "true" to disable all notifications
//!
//! # Threading
//!
//! The parent summary is posted first. Its [`MessageRef`] is the thread key
//! for the events, logs and analysis replies, which are posted strictly in
//! that order. If the parent fails no replies are posted.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod error;
pub mod format;
pub mod report;

pub use channels::slack::SlackChannel;
pub use channels::ThreadedChannel;
pub use error::ChannelError;
pub use report::{EventLine, PublishOutcome, RestartReport};

use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Environment variable to disable all notifications.
const ENV_NOTIFY_DISABLED: &str = "NOTIFY_DISABLED";

/// Opaque reference to a posted message (Slack `ts`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageRef(String);

impl MessageRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Publishes restart reports to a single threaded channel.
pub struct Notifier {
    channel: Option<Arc<dyn ThreadedChannel>>,
}

impl Notifier {
    /// Create a notifier posting to the Slack `channel`, configured from
    /// environment variables.
    #[must_use]
    pub fn from_env(channel: &str) -> Self {
        let disabled = std::env::var(ENV_NOTIFY_DISABLED)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        if disabled {
            info!("Notifications disabled via NOTIFY_DISABLED");
            return Self::disabled();
        }

        let slack = SlackChannel::from_env(channel);
        if slack.enabled() {
            info!(channel, "Slack notifications enabled");
        } else {
            warn!("SLACK_BOT_TOKEN not set, restart notifications will fail to post");
        }

        Self::with_channel(Arc::new(slack))
    }

    /// Create a notifier with a specific channel.
    #[must_use]
    pub fn with_channel(channel: Arc<dyn ThreadedChannel>) -> Self {
        Self {
            channel: Some(channel),
        }
    }

    /// Create a disabled notifier (for testing or when notifications are off).
    #[must_use]
    pub const fn disabled() -> Self {
        Self { channel: None }
    }

    /// Check if notifications can be sent at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.channel.is_some()
    }

    /// Post a new top-level message.
    ///
    /// Failures are logged and yield `None`; callers must not post threaded
    /// replies without a reference.
    pub async fn post_message(&self, text: &str) -> Option<MessageRef> {
        let Some(channel) = &self.channel else {
            debug!("Notifications disabled, skipping message");
            return None;
        };

        match channel.post(text, None).await {
            Ok(msg_ref) => {
                debug!(channel = channel.name(), ts = %msg_ref, "Message posted");
                Some(msg_ref)
            }
            Err(e) => {
                error!(
                    channel = channel.name(),
                    error = %e,
                    "Failed to post message"
                );
                None
            }
        }
    }

    /// Post `text` as a reply in the thread of `parent`.
    ///
    /// Returns whether the reply was accepted.
    pub async fn post_thread_reply(&self, parent: &MessageRef, text: &str) -> bool {
        let Some(channel) = &self.channel else {
            return false;
        };

        match channel.post(text, Some(parent)).await {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    channel = channel.name(),
                    thread_ts = %parent,
                    error = %e,
                    "Failed to post thread reply"
                );
                false
            }
        }
    }

    /// Publish a full restart report: summary, then events, logs and
    /// analysis as threaded replies.
    pub async fn publish(&self, report: &RestartReport) -> PublishOutcome {
        let summary = format::render_summary(&report.pod, &report.namespace, report.restart_time);

        let Some(message_ref) = self.post_message(&summary).await else {
            return PublishOutcome::ParentFailed;
        };

        let replies = [
            format::events_block(&report.events),
            format::logs_block(&report.logs),
            format::analysis_block(&report.analysis),
        ];

        let mut replies_posted = 0;
        for reply in &replies {
            if self.post_thread_reply(&message_ref, reply).await {
                replies_posted += 1;
            }
        }

        PublishOutcome::Published {
            message_ref,
            replies_posted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// Records every post; fails the posts whose index is listed in `fail_on`.
    #[derive(Default)]
    struct RecordingChannel {
        posts: Mutex<Vec<(String, Option<String>)>>,
        fail_on: Vec<usize>,
    }

    #[async_trait]
    impl ThreadedChannel for RecordingChannel {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn enabled(&self) -> bool {
            true
        }

        async fn post(
            &self,
            text: &str,
            thread: Option<&MessageRef>,
        ) -> Result<MessageRef, ChannelError> {
            let mut posts = self.posts.lock().unwrap();
            let index = posts.len();
            posts.push((text.to_string(), thread.map(ToString::to_string)));
            if self.fail_on.contains(&index) {
                return Err(ChannelError::Api("boom".to_string()));
            }
            Ok(MessageRef::new(format!("ts-{index}")))
        }
    }

    fn report() -> RestartReport {
        RestartReport {
            pod: "app-1".to_string(),
            namespace: "ns".to_string(),
            restart_time: chrono::Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            events: vec![EventLine::new("Failed", "OOMKilled")],
            logs: "panic: out of memory".to_string(),
            analysis: "Raise the limit.\nkubectl edit deploy app".to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_posts_replies_in_order_under_parent() {
        let channel = Arc::new(RecordingChannel::default());
        let notifier = Notifier::with_channel(channel.clone());

        let outcome = notifier.publish(&report()).await;
        assert_eq!(
            outcome,
            PublishOutcome::Published {
                message_ref: MessageRef::new("ts-0"),
                replies_posted: 3,
            }
        );

        let posts = channel.posts.lock().unwrap();
        assert_eq!(posts.len(), 4);
        assert!(posts[0].0.contains("`app-1`"));
        assert_eq!(posts[0].1, None);
        assert!(posts[1].0.starts_with("📋 *Events:*"));
        assert!(posts[1].0.contains("Failed: OOMKilled"));
        assert!(posts[2].0.starts_with("📦 *Logs:*"));
        assert!(posts[3].0.starts_with("🤖 *Analysis:*"));
        assert!(posts[3].0.contains("```bash\nkubectl edit deploy app\n```"));
        for post in &posts[1..] {
            assert_eq!(post.1.as_deref(), Some("ts-0"));
        }
    }

    #[tokio::test]
    async fn test_parent_failure_skips_replies() {
        let channel = Arc::new(RecordingChannel {
            fail_on: vec![0],
            ..Default::default()
        });
        let notifier = Notifier::with_channel(channel.clone());

        let outcome = notifier.publish(&report()).await;
        assert_eq!(outcome, PublishOutcome::ParentFailed);
        assert_eq!(channel.posts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reply_failure_does_not_stop_later_replies() {
        let channel = Arc::new(RecordingChannel {
            fail_on: vec![2],
            ..Default::default()
        });
        let notifier = Notifier::with_channel(channel.clone());

        let outcome = notifier.publish(&report()).await;
        assert!(matches!(
            outcome,
            PublishOutcome::Published {
                replies_posted: 2,
                ..
            }
        ));
        assert_eq!(channel.posts.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_disabled_notifier() {
        let notifier = Notifier::disabled();
        assert!(!notifier.is_enabled());
        assert_eq!(notifier.post_message("hi").await, None);
        assert_eq!(notifier.publish(&report()).await, PublishOutcome::ParentFailed);
    }
}
