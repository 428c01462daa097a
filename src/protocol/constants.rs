//! Protocol constants for clipd network communication

/// Default TCP port for the command protocol
pub const DEFAULT_PORT: u16 = 5000;

/// Response status bytes
pub const STATUS_OK: u8 = b'1';
pub const STATUS_ERR: u8 = b'0';

/// Size of the big-endian length prefix that follows the status byte
pub const LEN_PREFIX_SIZE: usize = 4;

/// Hard cap on a declared response payload. A length prefix above this is
/// a protocol violation, not an allocation request.
pub const MAX_RESPONSE_SIZE: usize = 256 * 1024 * 1024; // 256MB

/// Hard cap on one command line read from a client
pub const MAX_COMMAND_LINE: usize = 4 * 1024;
