use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// A single parsed log record
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogLine {
    /// `None` when the line carried no parsable timestamp
    pub timestamp: Option<DateTime<Utc>>,
    pub container: String,
    pub content: String,
    pub is_error: bool,
}

impl LogLine {
    pub fn new(container: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            timestamp: None,
            container: container.into(),
            content: content.into(),
            is_error: false,
        }
    }
}

/// Options for a batch log fetch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogOptions {
    /// Empty means the pod's default container
    pub container: String,
    /// 0 means no limit
    pub tail_lines: i64,
    pub since: Option<Duration>,
    pub previous: bool,
    /// Ignored by batch fetches
    pub follow: bool,
    pub timestamps: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            container: String::new(),
            tail_lines: 100,
            since: None,
            previous: false,
            follow: false,
            timestamps: true,
        }
    }
}

impl LogOptions {
    pub fn for_container(container: impl Into<String>, tail_lines: i64) -> Self {
        Self {
            container: container.into(),
            tail_lines,
            ..Default::default()
        }
    }

    pub fn previous(mut self) -> Self {
        self.previous = true;
        self
    }
}
