//! Command-line and environment configuration.

use clap::{Parser, ValueEnum};
use std::time::Duration;

use crate::analysis::{DEFAULT_MODEL, DEFAULT_OLLAMA_URL};

/// Default Slack channel for restart notifications.
pub const DEFAULT_SLACK_CHANNEL: &str = "#pod-restarts";

#[derive(Parser, Debug, Clone)]
#[command(name = "podwatch")]
#[command(about = "Watch pod restarts, analyze them with a local model, and report to Slack")]
#[command(version)]
pub struct Config {
    /// Seconds between pod listings
    #[arg(
        long,
        env = "PODWATCH_POLL_INTERVAL_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval_secs: u64,

    /// Log lines fetched per restarted pod
    #[arg(
        long,
        env = "PODWATCH_LOG_TAIL_LINES",
        default_value_t = 50,
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    pub log_tail_lines: i64,

    /// Slack channel receiving notifications
    #[arg(long, env = "PODWATCH_SLACK_CHANNEL", default_value = DEFAULT_SLACK_CHANNEL)]
    pub slack_channel: String,

    /// Ollama generate endpoint
    #[arg(long, env = "PODWATCH_OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL)]
    pub ollama_url: String,

    /// Model used for analysis
    #[arg(long, env = "PODWATCH_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Deadline for processing one incident, in seconds
    #[arg(long, env = "PODWATCH_ANALYSIS_TIMEOUT_SECS", default_value_t = 300)]
    pub analysis_timeout_secs: u64,

    /// Time in-flight incidents get to finish on shutdown, in seconds
    #[arg(long, env = "PODWATCH_SHUTDOWN_GRACE_SECS", default_value_t = 10)]
    pub shutdown_grace_secs: u64,

    /// Poll cycles a pod may go unseen before it is forgotten
    #[arg(long, env = "PODWATCH_DEDUP_IDLE_CYCLES", default_value_t = 120)]
    pub dedup_idle_cycles: u64,

    /// Maximum number of pods remembered for deduplication
    #[arg(
        long,
        env = "PODWATCH_DEDUP_CAPACITY",
        default_value_t = 10_000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub dedup_capacity: u64,

    /// Log output format
    #[arg(long, env = "PODWATCH_LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn dedup_capacity(&self) -> usize {
        usize::try_from(self.dedup_capacity).unwrap_or(usize::MAX)
    }

    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "podwatch=debug,notify=debug,info"
        } else {
            "podwatch=info,notify=info,warn"
        }
    }
}
