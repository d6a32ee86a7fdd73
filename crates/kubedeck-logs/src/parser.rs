use chrono::{DateTime, Utc};
use futures::{AsyncBufRead, AsyncBufReadExt};
use std::io;

use kubedeck_types::LogLine;

/// Longest line kept from a log stream; the remainder of a longer line is dropped
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Lower-case fragments that mark a line as an error
const ERROR_KEYWORDS: [&str; 9] = [
    "error",
    "err:",
    "fatal",
    "panic",
    "exception",
    "failed",
    "failure",
    "crash",
    "critical",
];

/// Width of an RFC3339Nano timestamp with nine fractional digits
const NANO_TIMESTAMP_LEN: usize = 30;
/// Width of an RFC3339 timestamp without fractional seconds
const SECOND_TIMESTAMP_LEN: usize = 20;

/// Read a newline-delimited log stream to EOF and parse every record.
///
/// `has_timestamps` tells the parser the server was asked to prefix each line
/// with its RFC3339 timestamp.
pub async fn parse_log_stream<R>(
    mut reader: R,
    container: &str,
    has_timestamps: bool,
) -> io::Result<Vec<LogLine>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = Vec::new();
    let mut buf = Vec::new();

    while read_line_capped(&mut reader, &mut buf).await? {
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        let raw = String::from_utf8_lossy(&buf);
        lines.push(parse_line(&raw, container, has_timestamps));
    }

    tracing::debug!(container = %container, lines = lines.len(), "parsed log stream");
    Ok(lines)
}

/// Read one line into `buf` without its newline. Returns false at EOF.
async fn read_line_capped<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let mut read_any = false;
    let mut truncated = false;

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            break;
        }
        read_any = true;

        let newline = available.iter().position(|&b| b == b'\n');
        let chunk = match newline {
            Some(pos) => &available[..pos],
            None => available,
        };
        let room = MAX_LINE_BYTES.saturating_sub(buf.len());
        if chunk.len() > room {
            truncated = true;
        }
        buf.extend_from_slice(&chunk[..chunk.len().min(room)]);

        let used = newline.map(|pos| pos + 1).unwrap_or(available.len());
        reader.consume_unpin(used);
        if newline.is_some() {
            break;
        }
    }

    if truncated {
        // Drop a multi-byte character cut in half by the limit
        if let Err(e) = std::str::from_utf8(buf) {
            if e.error_len().is_none() {
                buf.truncate(e.valid_up_to());
            }
        }
    }

    Ok(read_any)
}

/// Parse one raw log line
pub fn parse_line(line: &str, container: &str, has_timestamps: bool) -> LogLine {
    let (timestamp, content) = if has_timestamps {
        split_timestamp(line)
    } else {
        (None, line)
    };

    LogLine {
        timestamp,
        container: container.to_string(),
        content: content.to_string(),
        is_error: is_error_content(content),
    }
}

/// Whether a log message matches the error lexicon
pub fn is_error_content(content: &str) -> bool {
    let lower = content.to_lowercase();
    ERROR_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn split_timestamp(line: &str) -> (Option<DateTime<Utc>>, &str) {
    if line.len() >= NANO_TIMESTAMP_LEN {
        for width in [NANO_TIMESTAMP_LEN, SECOND_TIMESTAMP_LEN] {
            if let Some(ts) = line.get(..width).and_then(parse_rfc3339) {
                let content = line.get(width + 1..).unwrap_or("").trim();
                return (Some(ts), content);
            }
        }
    }

    // Kubelet trims trailing zeros from the fractional part, so the prefix
    // is not always one of the fixed widths above.
    let (token, rest) = line.split_once(' ').unwrap_or((line, ""));
    match parse_rfc3339(token) {
        Some(ts) => (Some(ts), rest.trim()),
        None => (None, line),
    }
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{SecondsFormat, TimeZone};
    use futures::io::Cursor;

    async fn parse(input: &str, has_timestamps: bool) -> Vec<LogLine> {
        parse_log_stream(Cursor::new(input.as_bytes().to_vec()), "app", has_timestamps)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn parses_nano_timestamp_prefix() {
        let lines = parse("2024-01-15T10:30:45.123456789Z INFO: Starting\n", true).await;
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line.content, "INFO: Starting");
        assert!(!line.is_error);
        assert_eq!(line.container, "app");
        let ts = line.timestamp.unwrap();
        assert_eq!(
            ts.to_rfc3339_opts(SecondsFormat::Nanos, true),
            "2024-01-15T10:30:45.123456789Z"
        );
    }

    #[tokio::test]
    async fn parses_second_precision_prefix() {
        let lines = parse("2024-01-15T10:30:45Z connection established to db\n", true).await;
        assert_eq!(
            lines[0].timestamp,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap())
        );
        assert_eq!(lines[0].content, "connection established to db");
    }

    #[tokio::test]
    async fn parses_trimmed_fraction_prefix() {
        let lines = parse("2024-01-15T10:30:45.5Z ready\n", true).await;
        assert!(lines[0].timestamp.is_some());
        assert_eq!(lines[0].content, "ready");
    }

    #[tokio::test]
    async fn keeps_line_without_timestamp() {
        let lines = parse("Error: boom", false).await;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].is_error);
        assert!(lines[0].timestamp.is_none());
        assert_eq!(lines[0].content, "Error: boom");
    }

    #[tokio::test]
    async fn unparsable_prefix_leaves_full_line() {
        let raw = "not a timestamp at all, just a long enough line";
        let lines = parse(raw, true).await;
        assert!(lines[0].timestamp.is_none());
        assert_eq!(lines[0].content, raw);
    }

    #[tokio::test]
    async fn handles_crlf_and_missing_final_newline() {
        let lines = parse("first\r\nsecond", false).await;
        let contents: Vec<_> = lines.iter().map(|l| l.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn truncates_oversized_lines() {
        let mut input = "x".repeat(MAX_LINE_BYTES + 10);
        input.push_str("\nnext\n");
        let lines = parse(&input, false).await;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].content.len(), MAX_LINE_BYTES);
        assert_eq!(lines[1].content, "next");
    }

    #[test]
    fn error_lexicon() {
        assert!(is_error_content("panic: runtime error"));
        assert!(is_error_content("Request FAILED with 500"));
        assert!(is_error_content("CRITICAL disk full"));
        assert!(!is_error_content("all systems nominal"));
    }

    #[test]
    fn multibyte_line_does_not_panic() {
        let line = "─────────────────────────────────────────";
        let parsed = parse_line(line, "app", true);
        assert!(parsed.timestamp.is_none());
        assert_eq!(parsed.content, line);
    }
}
