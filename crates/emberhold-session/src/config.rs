use serde::Deserialize;

use emberhold_protocol::{DEFAULT_INTERRUPT, DEFAULT_MAX_LINE_LEN};

/// Configuration for one connection's I/O pipeline.
///
/// `#[serde(default)]` lets a partial config override just the fields it
/// names.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Longest input line, in code points. Longer lines are discarded
    /// with a notice.
    pub max_line_len: usize,
    /// Messages the writer may fall behind by before senders wait.
    pub outbound_capacity: usize,
    /// Completed lines buffered between the reader and the input loop.
    pub inbound_capacity: usize,
    /// Code point that hangs up the session (Ctrl-C).
    pub interrupt: char,
    /// Sent after every command result.
    pub prompt: String,
    /// Viewport assumed until the client reports its size.
    pub default_width: u16,
    pub default_height: u16,
    /// How long closing a session waits for queued output to drain.
    pub flush_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE_LEN,
            outbound_capacity: 32,
            inbound_capacity: 16,
            interrupt: DEFAULT_INTERRUPT,
            prompt: "> ".to_string(),
            default_width: 80,
            default_height: 24,
            flush_timeout_ms: 2_000,
        }
    }
}
