//! Protocol errors

use thiserror::Error;

use crate::decode::DecodeError;

/// Errors that can occur during protocol communication
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// A read attempt returned no data before the expected frame was complete.
    /// `received` holds whatever arrived before the timeout.
    #[error("Timeout waiting for response to {command:#04x}: expected {expected} bytes, got {}", received.len())]
    Timeout {
        command: u8,
        expected: usize,
        received: Vec<u8>,
    },

    #[error("Not connected to ECU")]
    NotConnected,

    #[error("ECU not initialised")]
    NotInitialised,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The first response byte did not echo the command that was sent
    #[error("Command echo mismatch: sent {expected:#04x}, received {actual:#04x}")]
    EchoMismatch {
        expected: u8,
        actual: u8,
        response: Vec<u8>,
    },

    #[error("Response size mismatch for {command:#04x}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        command: u8,
        expected: usize,
        actual: usize,
    },

    #[error("Empty command")]
    EmptyCommand,

    #[error("Service stopped")]
    ServiceStopped,

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether the error means the link itself is unusable.
    ///
    /// Timeouts, echo and size mismatches leave the port open and the caller
    /// may retry; transport failures do not.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProtocolError::SerialError(_) | ProtocolError::IoError(_)
        )
    }
}
