use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventBufferError {
    #[error("Invalid JSON field name {field:?}: contains a byte that cannot appear unescaped in a JSON string")]
    InvalidJsonField { field: String },

    #[error("Autoflush interval must be greater than zero")]
    ZeroInterval,

    #[error("Event buffer is closed")]
    Closed,

    #[error("Autoflush requires a running tokio runtime")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, EventBufferError>;
