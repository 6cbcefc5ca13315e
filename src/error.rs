//! Error types for the znp library.

use thiserror::Error;

use crate::types::DeviceState;

/// The main error type for znp operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Serial port error.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame encoding/decoding error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A waiter's timer fired before a matching frame arrived.
    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Non-success status byte in a synchronous response.
    #[error("device returned status 0x{code:02x}")]
    Status { code: u8 },

    /// The device refused a synchronous request with an `RPC_Error` frame.
    #[error("device rejected request with RPC error 0x{code:02x}")]
    Rpc { code: u8 },

    /// Protocol-level violation (wrong echo, correlation mismatch, ...).
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Payload does not match the expected shape.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// The device entered a state outside the allowed corridor.
    #[error("device entered disallowed state {state:?}")]
    InvalidState { state: DeviceState },

    /// Connection is not established.
    #[error("not connected")]
    NotConnected,

    /// The transport went away while an operation was outstanding.
    #[error("channel closed")]
    ChannelClosed,
}

impl Error {
    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

/// Frame-specific errors.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Frame payload exceeds maximum size.
    #[error("frame too large: {size} bytes exceeds maximum {max}")]
    TooLarge { size: usize, max: usize },

    /// Frame check sequence mismatch.
    #[error("checksum mismatch: expected 0x{expected:02x}, computed 0x{computed:02x}")]
    Checksum { expected: u8, computed: u8 },

    /// Unknown command type nibble in CMD0.
    #[error("unknown command type in CMD0 0x{0:02x}")]
    UnknownType(u8),

    /// Unknown subsystem nibble in CMD0.
    #[error("unknown subsystem in CMD0 0x{0:02x}")]
    UnknownSubsystem(u8),
}

/// Result type alias for znp operations.
pub type Result<T> = std::result::Result<T, Error>;
