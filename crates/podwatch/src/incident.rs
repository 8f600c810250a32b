//! A recognized restart occurrence.

use chrono::{DateTime, Utc};
use std::fmt;

/// One new container restart, handed by value to its analysis task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incident {
    pub namespace: String,
    pub name: String,
    /// First container observed restarting, used to pick the log stream
    pub container: Option<String>,
    /// Pod start time observed at detection
    pub start_time: DateTime<Utc>,
}

impl Incident {
    /// Dedup key (`namespace/name`).
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for Incident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.namespace, self.name, self.start_time.to_rfc3339())
    }
}
