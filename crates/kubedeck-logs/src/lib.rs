//! Log processing for kubedeck
//!
//! This crate turns raw container log streams into [`LogLine`]s and provides the
//! search, error and time-window filters the pod views use.

mod filter;
mod merge;
mod parser;

pub use filter::{LogFilter, filter_error_logs, logs_around_time, search_logs};
pub use merge::{merge_container_logs, per_container_tail};
pub use parser::{MAX_LINE_BYTES, is_error_content, parse_line, parse_log_stream};

// Re-export types used in our public API
pub use kubedeck_types::{LogLine, LogOptions};
