//! Serial Protocol Communication
//!
//! Implements the MEMS 1.6 command/response protocol.
//!
//! Every command is a single byte and every response starts with an echo of
//! that byte. There is no length prefix, checksum or terminator, so framing is
//! driven entirely by the [`ResponseSizeTable`].

pub mod commands;
mod connection;
mod error;
mod replay;
mod response;
pub mod serial;
mod transport;

pub use commands::{Actuator, Adjustment, AdjustmentDirection, Command};
pub use connection::{
    Connection, ConnectionConfig, ConnectionState, ConnectionStatus, PortOpener,
};
pub use error::ProtocolError;
pub use replay::{RecordedFrame, ReplayTransport};
pub use response::ResponseSizeTable;
pub use serial::{list_ports, PortInfo};
pub use transport::{EcuTransport, SerialTransport};

/// Baud rate used by the MEMS 1.6 diagnostic port
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default timeout for a single read attempt in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Length of the ECU identifier returned by the `D0` command (echo excluded)
pub const ECU_ID_LEN: usize = 4;
