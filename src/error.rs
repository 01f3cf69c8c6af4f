use std::io;
use thiserror::Error;

/// Failures while decoding STUN wire bytes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    #[error("message of {len} bytes is shorter than the 20-byte STUN header")]
    MalformedMessage { len: usize },
    #[error("invalid magic cookie {0:#010x}")]
    InvalidCookie(u32),
    #[error("attribute at body offset {offset} runs past the end of the message")]
    TruncatedAttribute { offset: usize },
    #[error("XOR-MAPPED-ADDRESS value is {len} bytes, expected 8")]
    AttributeTooShort { len: usize },
    #[error("unsupported address family {0:#04x}")]
    UnsupportedFamily(u8),
}

/// Failures after the request went out: nothing usable came back.
#[derive(Error, Debug)]
pub enum ReceiveError {
    #[error("no response before the timeout")]
    Timeout,
    #[error("failed to read from socket: {0}")]
    Io(#[source] io::Error),
    #[error("unexpected message type {0:#06x}")]
    UnexpectedMessageType(u16),
    #[error("response belongs to a different transaction")]
    TransactionMismatch,
    #[error("malformed response: {0}")]
    Malformed(#[from] CodecError),
    #[error("no XOR-MAPPED-ADDRESS in response")]
    AttributeNotFound,
}

impl ReceiveError {
    /// Maps a failed socket read, folding the platform's timeout flavours into [`ReceiveError::Timeout`].
    pub(crate) fn from_io(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => ReceiveError::Timeout,
            _ => ReceiveError::Io(e),
        }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("failed to send binding request: {0}")]
    Io(#[source] io::Error),
    #[error("sent {sent} of {expected} bytes")]
    Incomplete { sent: usize, expected: usize },
}

/// The four stages a binding transaction can fail at.
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("socket error: {0}")]
    Socket(#[source] io::Error),
    #[error("failed to resolve {host} to an IPv4 address")]
    Resolver {
        host: String,
        #[source]
        source: Option<io::Error>,
    },
    #[error(transparent)]
    Send(#[from] SendError),
    #[error(transparent)]
    Receive(#[from] ReceiveError),
}

impl TransactionError {
    /// Numeric status in the style of the classic `getPublicIPAddress` tool.
    ///
    /// `-4` covers timeouts and read failures, `-5` everything that arrived but
    /// did not yield an address.
    pub fn code(&self) -> i32 {
        match self {
            TransactionError::Socket(_) => -1,
            TransactionError::Resolver { .. } => -2,
            TransactionError::Send(_) => -3,
            TransactionError::Receive(ReceiveError::Timeout | ReceiveError::Io(_)) => -4,
            TransactionError::Receive(_) => -5,
        }
    }
}
