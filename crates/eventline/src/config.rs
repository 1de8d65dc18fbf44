use serde::Deserialize;
use std::time::Duration;

fn default_eol() -> String {
    "\n".to_string()
}

/// Construction options for an [`EventBuffer`](crate::EventBuffer)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventBufferConfig {
    /// Ceiling in bytes for buffered content and every emitted line (0 = unbounded)
    #[serde(default)]
    pub max_len: usize,

    /// Terminator appended to each emitted line
    #[serde(default = "default_eol")]
    pub eol: String,

    /// Wrap content as `{"<json_field>":"<content>"}` when non-empty
    #[serde(default)]
    pub json_field: String,

    /// Autoflush period in milliseconds (0 = no autoflush)
    #[serde(default)]
    pub flush_interval_ms: u64,
}

impl EventBufferConfig {
    pub fn flush_interval(&self) -> Option<Duration> {
        (self.flush_interval_ms > 0).then(|| Duration::from_millis(self.flush_interval_ms))
    }
}

impl Default for EventBufferConfig {
    fn default() -> Self {
        Self {
            max_len: 0,
            eol: default_eol(),
            json_field: String::new(),
            flush_interval_ms: 0,
        }
    }
}
