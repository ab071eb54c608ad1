use std::sync::OnceLock;

use fwctl_logging::fwctl_error;
use regex::Regex;

/// One displayed log line: an uptime token such as `[1m 3s]` and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Empty when the line carried no recognisable token.
    pub timestamp: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(timestamp: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            message: message.into(),
        }
    }

    pub fn untimed(message: impl Into<String>) -> Self {
        Self::new(String::new(), message)
    }
}

const TIMESTAMP_PATTERN: &str = r"\[\d+[smh]\s*\d*[smh]?\s*\d*[smh]?\]";

/// `None` only if the pattern fails to compile; callers then fall back to lines.
fn timestamp_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| match Regex::new(TIMESTAMP_PATTERN) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                fwctl_error!("log timestamp pattern rejected: {}", err);
                None
            }
        })
        .as_ref()
}

fn untimed_lines(body: &str) -> Vec<LogEntry> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(LogEntry::untimed)
        .collect()
}

/// Splits a full `/log` body into entries.
///
/// Every timestamp token starts an entry whose message runs up to the next
/// token. Text before the first token becomes an untimed entry. A body with no
/// tokens at all yields one untimed entry per non-empty line.
pub fn parse_log_entries(body: &str) -> Vec<LogEntry> {
    let Some(pattern) = timestamp_pattern() else {
        return untimed_lines(body);
    };
    let tokens: Vec<_> = pattern.find_iter(body).collect();
    if tokens.is_empty() {
        return untimed_lines(body);
    }

    let mut entries = Vec::with_capacity(tokens.len() + 1);
    let leading = body[..tokens[0].start()].trim();
    if !leading.is_empty() {
        entries.push(LogEntry::untimed(leading));
    }
    for (index, token) in tokens.iter().enumerate() {
        let end = tokens
            .get(index + 1)
            .map(|next| next.start())
            .unwrap_or(body.len());
        let message = body[token.end()..end].trim();
        entries.push(LogEntry::new(token.as_str(), message));
    }
    entries
}
