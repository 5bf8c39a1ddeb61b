use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Socket or file transport failure, including a peer closing mid-frame.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// A built payload does not fit the configured maximum.
    #[error("payload of {size} bytes exceeds the maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// Unexpected opcode or invalid declared length from the peer.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("session is not connected")]
    NotConnected,
}

impl Error {
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Error::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }

    pub fn violation(msg: impl Into<String>) -> Self {
        Error::ProtocolViolation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
