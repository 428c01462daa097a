use std::fmt;

#[derive(Debug)]
pub enum ProtocolError {
    ConnectionClosed,
    TruncatedHeader,
    InvalidStatus(u8),
    FrameTooLarge(usize),
    ShortPayload { expected: usize, received: usize },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::ConnectionClosed =>
                write!(f, "connection closed by peer"),
            ProtocolError::TruncatedHeader =>
                write!(f, "truncated response header"),
            ProtocolError::InvalidStatus(b) =>
                write!(f, "invalid status byte {:#04x}", b),
            ProtocolError::FrameTooLarge(size) =>
                write!(f, "response too large: {} bytes", size),
            ProtocolError::ShortPayload { expected, received } =>
                write!(f, "short payload: expected {} bytes, received {}", expected, received),
        }
    }
}

impl std::error::Error for ProtocolError {}
