use chrono::{DateTime, Duration, Utc};
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

use kubedeck_types::LogLine;

/// Lines whose content contains `query`, ignoring case. An empty query keeps everything.
pub fn search_logs(logs: &[LogLine], query: &str) -> Vec<LogLine> {
    if query.is_empty() {
        return logs.to_vec();
    }

    match RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => logs
            .iter()
            .filter(|l| re.is_match(&l.content))
            .cloned()
            .collect(),
        Err(_) => {
            let needle = query.to_lowercase();
            logs.iter()
                .filter(|l| l.content.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        }
    }
}

/// Lines flagged as errors
pub fn filter_error_logs(logs: &[LogLine]) -> Vec<LogLine> {
    logs.iter().filter(|l| l.is_error).cloned().collect()
}

/// Timestamped lines strictly within `window_minutes` of `target`
pub fn logs_around_time(
    logs: &[LogLine],
    target: DateTime<Utc>,
    window_minutes: i64,
) -> Vec<LogLine> {
    let window = Duration::minutes(window_minutes);
    let start = target - window;
    let end = target + window;

    logs.iter()
        .filter(|l| match l.timestamp {
            Some(ts) => ts > start && ts < end,
            None => false,
        })
        .cloned()
        .collect()
}

/// Line selection for a log view.
///
/// Container and error restrictions always apply. The pattern is matched
/// case-insensitively against the content, and `invert` flips only that match.
#[derive(Clone, Debug, Default)]
pub struct LogFilter {
    pattern: Option<Regex>,
    containers: HashSet<String>,
    errors_only: bool,
    invert: bool,
}

impl LogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match content against a regex, ignoring case. An empty pattern matches everything.
    pub fn pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.pattern = if pattern.is_empty() {
            None
        } else {
            Some(RegexBuilder::new(pattern).case_insensitive(true).build()?)
        };
        Ok(self)
    }

    /// Keep only these containers; no names keeps all
    pub fn containers<I>(mut self, containers: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.containers = containers.into_iter().collect();
        self
    }

    pub fn errors_only(mut self, errors_only: bool) -> Self {
        self.errors_only = errors_only;
        self
    }

    pub fn invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    pub fn matches(&self, line: &LogLine) -> bool {
        if self.errors_only && !line.is_error {
            return false;
        }
        if !self.containers.is_empty() && !self.containers.contains(&line.container) {
            return false;
        }
        match &self.pattern {
            Some(re) => re.is_match(&line.content) != self.invert,
            None => true,
        }
    }

    pub fn apply(&self, logs: &[LogLine]) -> Vec<LogLine> {
        logs.iter().filter(|l| self.matches(l)).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn line(content: &str, is_error: bool) -> LogLine {
        LogLine {
            timestamp: None,
            container: "app".to_string(),
            content: content.to_string(),
            is_error,
        }
    }

    fn at(minute: u32) -> LogLine {
        LogLine {
            timestamp: Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, minute, 0).unwrap()),
            ..line(&format!("minute {minute}"), false)
        }
    }

    #[test]
    fn search_is_case_insensitive_and_literal() {
        let logs = vec![
            line("GET /api/v1 200", false),
            line("get /health 200", false),
            line("POST /api/v1 500", false),
        ];
        assert_eq!(search_logs(&logs, "get").len(), 2);
        assert_eq!(search_logs(&logs, "/api/v1 (").len(), 0);
        assert_eq!(search_logs(&logs, "").len(), 3);
    }

    #[test]
    fn error_filter_keeps_flagged_lines() {
        let logs = vec![line("ok", false), line("boom", true)];
        let errors = filter_error_logs(&logs);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].content, "boom");
    }

    #[test]
    fn window_is_exclusive_and_skips_untimestamped() {
        let logs = vec![at(25), at(28), at(30), at(32), at(35), line("no ts", false)];
        let target = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let picked = logs_around_time(&logs, target, 5);
        let contents: Vec<_> = picked.iter().map(|l| l.content.as_str()).collect();
        assert_eq!(contents, vec!["minute 28", "minute 30", "minute 32"]);
    }

    #[test]
    fn pattern_ignores_case_within_container_scope() {
        let filter = LogFilter::new()
            .pattern("time(out)?")
            .unwrap()
            .containers(["app".to_string()]);
        assert!(filter.matches(&line("request TIMEOUT", false)));

        let mut sidecar = line("request timeout", false);
        sidecar.container = "istio-proxy".to_string();
        assert!(!filter.matches(&sidecar));
    }

    #[test]
    fn errors_only_and_invert_combine() {
        let filter = LogFilter::new()
            .pattern("healthz")
            .unwrap()
            .errors_only(true)
            .invert(true);
        let logs = vec![
            line("GET /healthz failed", true),
            line("db connection refused", true),
            line("started", false),
        ];
        let kept = filter.apply(&logs);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].content, "db connection refused");
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let logs = vec![line("a", false), line("b", true)];
        assert_eq!(LogFilter::new().apply(&logs).len(), 2);
        assert_eq!(LogFilter::new().invert(true).apply(&logs).len(), 2);
        assert!(LogFilter::new().pattern("(").is_err());
    }
}
