//! # MemsFCR Core Library
//!
//! Core functionality for the MemsFCR fault code reader.

#![warn(missing_docs)]

//!
//! This library provides:
//! - Serial protocol communication with Rover MEMS 1.6 ECUs
//! - Decoding of the `0x80` and `0x7D` dataframes into engineering units
//! - Rolling statistics and rule-based engine diagnostics
//! - A single-owner ECU service driven over channels
//! - Replay of recorded dataframes without hardware
//!
//! ## Example
//!
//! ```rust,ignore
//! use memsfcr_core::protocol::{Connection, ConnectionConfig};
//!
//! let mut conn = Connection::new(ConnectionConfig::default());
//! conn.connect_and_initialise("/dev/ttyUSB0")?;
//!
//! let snapshot = conn.get_telemetry()?;
//! println!("RPM: {}", snapshot.engine_rpm);
//! println!("{:?}", conn.get_diagnostics().analysis_code);
//! ```

pub mod config;
pub mod decode;
pub mod diagnostics;
pub mod protocol;
pub mod service;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::ReaderConfig;
    pub use crate::decode::{decode, DecodeError, MemsSnapshot};
    pub use crate::diagnostics::{
        AnalysisCode, AnalysisReport, DiagnosticThresholds, Diagnostics, Metric, Stats, Trend,
    };
    pub use crate::protocol::{
        Actuator, Adjustment, Command, Connection, ConnectionConfig, ConnectionState,
        ConnectionStatus, EcuTransport, ProtocolError, ReplayTransport, ResponseSizeTable,
    };
    pub use crate::service::{EcuHandle, EcuService};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
