use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::Duration;

use super::{serial, ProtocolError};

/// Byte-level link to the ECU (a serial port or a replayed recording)
///
/// `read` is bounded by the transport's timeout. `Ok(0)` means nothing
/// arrived before the timeout; it is not end-of-stream and the transport
/// stays usable.
pub trait EcuTransport: Send {
    /// Write the bytes, returning how many were accepted
    fn write(&mut self, data: &[u8]) -> Result<usize, ProtocolError>;

    /// Read whatever is available into `buf`, waiting at most the read timeout
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError>;

    /// Discard any received bytes not yet read, such as the tail of a reply
    /// that arrived after its read timed out
    fn clear_input(&mut self) -> Result<(), ProtocolError>;

    /// Release the underlying handle. Further reads and writes fail.
    fn close(&mut self);

    /// Whether the handle is still held
    fn is_open(&self) -> bool;
}

/// Serial port wrapper implementing [`EcuTransport`]
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    name: String,
}

impl SerialTransport {
    /// Open `name` at `baud_rate` with the given read timeout
    pub fn open(name: &str, baud_rate: u32, timeout: Duration) -> Result<Self, ProtocolError> {
        let port = serial::open_port(name, baud_rate, timeout)?;
        tracing::info!(port = name, baud_rate, "serial port opened");
        Ok(Self {
            port: Some(port),
            name: name.to_string(),
        })
    }

    /// Wrap an already opened port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        let name = port.name().unwrap_or_default();
        Self {
            port: Some(port),
            name,
        }
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, ProtocolError> {
        self.port.as_mut().ok_or(ProtocolError::NotConnected)
    }
}

impl EcuTransport for SerialTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize, ProtocolError> {
        let port = self.port()?;
        port.write_all(data)?;
        port.flush()?;
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        let port = self.port()?;
        match port.read(buf) {
            Ok(n) => Ok(n),
            Err(ref e)
                if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock =>
            {
                Ok(0)
            }
            Err(e) => Err(ProtocolError::IoError(e)),
        }
    }

    fn clear_input(&mut self) -> Result<(), ProtocolError> {
        let port = self.port()?;
        serial::clear_buffers(port.as_mut())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::info!(port = %self.name, "serial port closed");
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}
