use crate::error::{EventBufferError, Result};
use crate::escape::needs_escape;

/// How buffered content is wrapped when it is emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineFormat {
    /// Content is emitted as-is
    Raw,
    /// Content becomes the value of a single-field JSON object
    Json { field: String },
}

impl LineFormat {
    /// Empty field name means raw emission.
    ///
    /// The field name is written into the wrapper verbatim, so names that
    /// would need escaping inside a JSON string are rejected.
    pub fn from_field(field: impl Into<String>) -> Result<Self> {
        let field = field.into();
        if field.is_empty() {
            return Ok(LineFormat::Raw);
        }

        if field.bytes().any(|b| b < 0x20 || needs_escape(b)) {
            return Err(EventBufferError::InvalidJsonField { field });
        }

        Ok(LineFormat::Json { field })
    }
}

/// Fixed bytes placed around content on every emitted line
#[derive(Debug, Clone)]
pub struct Framing {
    prefix: Vec<u8>,
    suffix: Vec<u8>,
}

impl Framing {
    pub fn new(format: &LineFormat, eol: &[u8]) -> Self {
        let (prefix, mut suffix) = match format {
            LineFormat::Raw => (Vec::new(), Vec::new()),
            LineFormat::Json { field } => {
                let mut prefix = Vec::with_capacity(field.len() + 6);
                prefix.extend_from_slice(b"{\"");
                prefix.extend_from_slice(field.as_bytes());
                prefix.extend_from_slice(b"\":\"");
                (prefix, b"\"}".to_vec())
            }
        };
        suffix.extend_from_slice(eol);

        Self { prefix, suffix }
    }

    /// Bytes added to every line beyond the content itself
    pub fn overhead(&self) -> usize {
        self.prefix.len() + self.suffix.len()
    }

    /// Build the line for `content`, never longer than `max_len` when it is
    /// non-zero.
    ///
    /// Content is cut from the end to make room for the overhead. The cut is
    /// byte-wise and may split an escape sequence. When the overhead alone
    /// exceeds `max_len` the content is dropped and the wrapper itself is
    /// cut at the ceiling.
    pub fn render(&self, content: &[u8], max_len: usize) -> Vec<u8> {
        let overhead = self.overhead();
        let mut keep = content.len();
        if max_len > 0 && keep + overhead > max_len {
            keep = max_len.saturating_sub(overhead);
            tracing::debug!(
                content_len = content.len(),
                kept = keep,
                overhead,
                max_len,
                "truncating event to fit line ceiling"
            );
        }

        let mut line = Vec::with_capacity(overhead + keep);
        line.extend_from_slice(&self.prefix);
        line.extend_from_slice(&content[..keep]);
        line.extend_from_slice(&self.suffix);

        if max_len > 0 && line.len() > max_len {
            line.truncate(max_len);
        }

        line
    }
}
