//! Connection management
//!
//! Handles the connection lifecycle and command execution with the ECU.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{
    commands::{Actuator, Adjustment, AdjustmentDirection, Command},
    EcuTransport, ProtocolError, ReplayTransport, ResponseSizeTable, SerialTransport,
    DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS, ECU_ID_LEN,
};
use crate::decode::{decode, MemsSnapshot};
use crate::diagnostics::{AnalysisReport, Diagnostics, DiagnosticsConfig};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No port open
    Disconnected,
    /// Port open, handshake not (yet) completed
    Connected,
    /// Handshake in progress
    Initialising,
    /// Handshake completed, ready for commands
    Ready,
    /// The link failed and was closed
    Faulted,
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Serial port name
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Timeout for a single read attempt in milliseconds
    pub timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Connection summary for collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub connected: bool,
    pub initialised: bool,
    /// ECU identifier as lowercase hex, empty until initialised
    pub ecu_id: String,
    /// IAC stepper position from the latest reading
    pub iac_position: u8,
}

/// Opens a transport for a port name. Lets the same [`Connection`] drive a
/// serial port or a recording.
pub type PortOpener = Box<
    dyn FnMut(&str, &ConnectionConfig) -> Result<Box<dyn EcuTransport>, ProtocolError> + Send,
>;

fn serial_opener() -> PortOpener {
    Box::new(|port, config| {
        let transport = SerialTransport::open(
            port,
            config.baud_rate,
            Duration::from_millis(config.timeout_ms),
        )?;
        Ok(Box::new(transport) as Box<dyn EcuTransport>)
    })
}

/// One session with a MEMS ECU
pub struct Connection {
    /// Open transport, `None` while disconnected
    transport: Option<Box<dyn EcuTransport>>,
    opener: PortOpener,
    state: ConnectionState,
    config: ConnectionConfig,
    response_sizes: ResponseSizeTable,
    ecu_id: Option<[u8; ECU_ID_LEN]>,
    last_command: Vec<u8>,
    last_response: Vec<u8>,
    diagnostics: Diagnostics,
    /// Metrics: cumulative bytes/transactions
    tx_bytes: u64,
    rx_bytes: u64,
    transactions: u64,
}

impl Connection {
    /// Create a new serial connection (not yet connected)
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_opener(config, serial_opener())
    }

    /// Create a connection whose transports come from `opener`
    pub fn with_opener(config: ConnectionConfig, opener: PortOpener) -> Self {
        Self {
            transport: None,
            opener,
            state: ConnectionState::Disconnected,
            config,
            response_sizes: ResponseSizeTable::new(),
            ecu_id: None,
            last_command: Vec::new(),
            last_response: Vec::new(),
            diagnostics: Diagnostics::new(),
            tx_bytes: 0,
            rx_bytes: 0,
            transactions: 0,
        }
    }

    /// Create a connection that plays back `replay` whatever port is named
    pub fn replay(config: ConnectionConfig, replay: ReplayTransport) -> Self {
        Self::with_opener(
            config,
            Box::new(move |_, _| Ok(Box::new(replay.clone()) as Box<dyn EcuTransport>)),
        )
    }

    /// Use the given analyzer settings
    pub fn with_diagnostics(mut self, config: DiagnosticsConfig) -> Self {
        self.diagnostics = Diagnostics::with_config(config);
        self
    }

    /// Use a different response size table
    pub fn with_response_sizes(mut self, table: ResponseSizeTable) -> Self {
        self.response_sizes = table;
        self
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether a port is open
    pub fn is_connected(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Connected | ConnectionState::Initialising | ConnectionState::Ready
        )
    }

    /// Whether the handshake has completed
    pub fn is_initialised(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    /// ECU identifier (after handshake)
    pub fn ecu_id(&self) -> Option<&[u8; ECU_ID_LEN]> {
        self.ecu_id.as_ref()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Last command written to the ECU
    pub fn last_command(&self) -> &[u8] {
        &self.last_command
    }

    /// Last response read from the ECU
    pub fn last_response(&self) -> &[u8] {
        &self.last_response
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Get cumulative tx/rx bytes and transaction count
    pub fn get_counters(&self) -> (u64, u64, u64) {
        (self.tx_bytes, self.rx_bytes, self.transactions)
    }

    /// Open `port` and run the handshake unless already done
    pub fn connect_and_initialise(&mut self, port: &str) -> Result<bool, ProtocolError> {
        if !self.is_connected() {
            self.connect(port)?;
        }
        if !self.is_initialised() {
            self.initialise()?;
        }
        Ok(self.is_initialised())
    }

    /// Open the transport for `port`
    pub fn connect(&mut self, port: &str) -> Result<(), ProtocolError> {
        if self.is_connected() {
            return Ok(());
        }

        tracing::info!(port, "opening connection to ECU");
        let transport = (self.opener)(port, &self.config).map_err(|e| {
            tracing::error!(port, error = %e, "error opening port");
            e
        })?;

        self.transport = Some(transport);
        self.config.port_name = port.to_string();
        self.state = ConnectionState::Connected;
        tracing::info!(port, "connected");
        Ok(())
    }

    /// Run the initialisation handshake
    ///
    /// 1. `CA` → `CA`
    /// 2. `75` → `75`
    /// 3. `F4` → `F4 00` (keeps the session alive during setup)
    /// 4. `D0` → `D0 XX XX XX XX` (ECU ID)
    /// 5. `FB` → `FB XX` (IAC position)
    pub fn initialise(&mut self) -> Result<(), ProtocolError> {
        if !self.is_connected() {
            return Err(ProtocolError::NotConnected);
        }

        self.state = ConnectionState::Initialising;
        match self.handshake() {
            Ok((ecu_id, iac)) => {
                self.ecu_id = Some(ecu_id);
                self.diagnostics.set_iac_baseline(iac);
                self.state = ConnectionState::Ready;
                tracing::info!(ecu_id = %hex::encode(ecu_id), iac, "ECU initialised");
                Ok(())
            }
            Err(e) => {
                // a fatal error has already faulted the link
                if self.state == ConnectionState::Initialising {
                    self.state = ConnectionState::Connected;
                }
                tracing::warn!(error = %e, "ECU initialisation failed");
                Err(e)
            }
        }
    }

    fn handshake(&mut self) -> Result<([u8; ECU_ID_LEN], u8), ProtocolError> {
        self.transact(&Command::InitCommandA.bytes())?;
        self.transact(&Command::InitCommandB.bytes())?;
        self.transact(&Command::Heartbeat.bytes())?;

        let response = self.transact(&Command::RequestEcuId.bytes())?;
        let ecu_id: [u8; ECU_ID_LEN] = response
            .get(1..=ECU_ID_LEN)
            .and_then(|id| id.try_into().ok())
            .ok_or(ProtocolError::SizeMismatch {
                command: Command::RequestEcuId.byte(),
                expected: ECU_ID_LEN + 1,
                actual: response.len(),
            })?;

        let response = self.transact(&Command::GetIacPosition.bytes())?;
        let iac = *response.get(1).ok_or(ProtocolError::SizeMismatch {
            command: Command::GetIacPosition.byte(),
            expected: 2,
            actual: response.len(),
        })?;
        Ok((ecu_id, iac))
    }

    /// Close the transport and forget the session
    pub fn disconnect(&mut self) -> Result<(), ProtocolError> {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
            tracing::info!(port = %self.config.port_name, "disconnected");
        }
        self.ecu_id = None;
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    /// Send a one-shot command and return the ECU response
    pub fn send_command(&mut self, cmd: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        if !self.is_connected() {
            return Err(ProtocolError::NotConnected);
        }
        self.transact(cmd)
    }

    /// Read both dataframes, decode them and feed the analyzer
    pub fn get_telemetry(&mut self) -> Result<MemsSnapshot, ProtocolError> {
        if !self.is_connected() {
            return Err(ProtocolError::NotConnected);
        }
        if !self.is_initialised() {
            return Err(ProtocolError::NotInitialised);
        }
        self.read_telemetry()
    }

    fn read_telemetry(&mut self) -> Result<MemsSnapshot, ProtocolError> {
        let frame80 = self.transact(&Command::RequestData80.bytes())?;
        let frame7d = self.transact(&Command::RequestData7D.bytes())?;

        let snapshot = decode(&frame80, &frame7d, Utc::now()).map_err(|e| {
            tracing::error!(error = %e, "unable to decode dataframes");
            e
        })?;

        self.diagnostics.add(snapshot.clone());
        self.diagnostics.analyse();

        Ok(snapshot)
    }

    /// Report from the most recent analysis
    pub fn get_diagnostics(&self) -> AnalysisReport {
        self.diagnostics.report().clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            state: self.state,
            connected: self.is_connected(),
            initialised: self.is_initialised(),
            ecu_id: self.ecu_id.map(hex::encode).unwrap_or_default(),
            iac_position: self.diagnostics.report().iac_position,
        }
    }

    pub fn heartbeat(&mut self) -> Result<Vec<u8>, ProtocolError> {
        self.send_command(&Command::Heartbeat.bytes())
    }

    pub fn clear_faults(&mut self) -> Result<Vec<u8>, ProtocolError> {
        self.send_command(&Command::ClearFaults.bytes())
    }

    pub fn reset_adjustments(&mut self) -> Result<Vec<u8>, ProtocolError> {
        self.send_command(&Command::ResetAdjustments.bytes())
    }

    pub fn reset_ecu(&mut self) -> Result<Vec<u8>, ProtocolError> {
        self.send_command(&Command::ResetEcu.bytes())
    }

    /// Switch an actuator on or off
    pub fn activate(&mut self, actuator: Actuator, on: bool) -> Result<Vec<u8>, ProtocolError> {
        self.send_command(&[actuator.command_byte(on)])
    }

    /// Step an adjustable setting; the response value byte is the new setting
    pub fn adjust(
        &mut self,
        adjustment: Adjustment,
        direction: AdjustmentDirection,
    ) -> Result<Vec<u8>, ProtocolError> {
        self.send_command(&[adjustment.command_byte(direction)])
    }

    /// Write a command and read its complete response
    fn transact(&mut self, cmd: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let result = self.write_command(cmd).and_then(|_| self.read_response(cmd));
        if let Err(e) = &result {
            if e.is_fatal() {
                self.fault(e);
            }
        }
        result
    }

    fn write_command(&mut self, cmd: &[u8]) -> Result<(), ProtocolError> {
        if cmd.is_empty() {
            return Err(ProtocolError::EmptyCommand);
        }
        let transport = self.transport.as_mut().ok_or(ProtocolError::NotConnected)?;

        // a late reply to an earlier command would otherwise be read as this one's
        transport.clear_input()?;

        self.last_command = cmd.to_vec();
        let n = transport.write(cmd)?;
        self.tx_bytes = self.tx_bytes.saturating_add(n as u64);
        tracing::trace!(command = %hex::encode(cmd), "FCR >");
        Ok(())
    }

    /// Read until the tabulated size is reached or a read comes back empty
    fn read_response(&mut self, cmd: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let command = cmd[0];
        let expected = self.response_sizes.size_for(cmd);
        let transport = self.transport.as_mut().ok_or(ProtocolError::NotConnected)?;

        let mut buffer = vec![0u8; expected];
        let mut data = Vec::with_capacity(expected);

        while data.len() < expected {
            let n = transport.read(&mut buffer)?;
            if n == 0 {
                tracing::warn!(
                    command = %format!("{:02x}", command),
                    expected,
                    received = data.len(),
                    "serial read timed out"
                );
                self.last_response = data.clone();
                return Err(ProtocolError::Timeout {
                    command,
                    expected,
                    received: data,
                });
            }
            data.extend_from_slice(&buffer[..n]);
        }

        self.rx_bytes = self.rx_bytes.saturating_add(data.len() as u64);
        self.transactions = self.transactions.saturating_add(1);
        self.last_response = data.clone();
        tracing::trace!(response = %hex::encode(&data), "ECU <");

        if data.len() > expected {
            tracing::warn!(expected, actual = data.len(), "dataframe size mismatch");
            return Err(ProtocolError::SizeMismatch {
                command,
                expected,
                actual: data.len(),
            });
        }

        if data[0] != command {
            tracing::warn!(
                expected = %format!("{:02x}", command),
                actual = %format!("{:02x}", data[0]),
                "expecting command echo"
            );
            return Err(ProtocolError::EchoMismatch {
                expected: command,
                actual: data[0],
                response: data,
            });
        }

        Ok(data)
    }

    fn fault(&mut self, error: &ProtocolError) {
        tracing::error!(error = %error, "serial link failed, closing");
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.ecu_id = None;
        self.state = ConnectionState::Faulted;
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Transport that returns scripted replies in order
    #[derive(Default)]
    struct MockTransport {
        replies: VecDeque<Vec<u8>>,
        pending: VecDeque<u8>,
        // bytes of a stalled reply that arrive after the reader gives up
        late: VecDeque<u8>,
        // (reply index, bytes delivered before the stall)
        stall: Option<(usize, usize)>,
        replies_sent: usize,
        written: Arc<Mutex<Vec<u8>>>,
        fail_on_write: bool,
        fail_after_writes: Option<usize>,
        writes: usize,
        open: bool,
    }

    impl MockTransport {
        fn new(replies: Vec<Vec<u8>>) -> Self {
            Self {
                replies: replies.into(),
                open: true,
                ..Default::default()
            }
        }
    }

    impl EcuTransport for MockTransport {
        fn write(&mut self, data: &[u8]) -> Result<usize, ProtocolError> {
            if self.fail_on_write || matches!(self.fail_after_writes, Some(n) if self.writes >= n) {
                return Err(ProtocolError::IoError(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "unplugged",
                )));
            }
            self.writes += 1;
            self.written.lock().unwrap().extend_from_slice(data);
            if let Some(reply) = self.replies.pop_front() {
                match self.stall {
                    Some((index, delivered)) if index == self.replies_sent => {
                        let split = delivered.min(reply.len());
                        self.pending.extend(&reply[..split]);
                        self.late.extend(&reply[split..]);
                    }
                    _ => self.pending.extend(reply),
                }
                self.replies_sent += 1;
            }
            Ok(data.len())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
            if self.pending.is_empty() && !self.late.is_empty() {
                // time out now, the rest turns up once the reader has given up
                self.pending.append(&mut self.late);
                return Ok(0);
            }
            // hand out at most 3 bytes per read to exercise accumulation
            let n = buf.len().min(self.pending.len()).min(3);
            for slot in buf.iter_mut().take(n) {
                *slot = self.pending.pop_front().unwrap();
            }
            Ok(n)
        }

        fn clear_input(&mut self) -> Result<(), ProtocolError> {
            self.pending.clear();
            Ok(())
        }

        fn close(&mut self) {
            self.open = false;
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }

    fn connection_with(mock: MockTransport) -> Connection {
        let mut slot = Some(mock);
        Connection::with_opener(
            ConnectionConfig::default(),
            Box::new(move |_, _| {
                slot.take()
                    .map(|m| Box::new(m) as Box<dyn EcuTransport>)
                    .ok_or_else(|| ProtocolError::ConnectionFailed("used".into()))
            }),
        )
    }

    fn handshake_replies() -> Vec<Vec<u8>> {
        vec![
            vec![0xCA],
            vec![0x75],
            vec![0xF4, 0x00],
            vec![0xD0, 0x99, 0x00, 0x03, 0x03],
            vec![0xFB, 0x2A],
        ]
    }

    #[test]
    fn test_connection_config_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.timeout_ms, 2000);
    }

    #[test]
    fn test_handshake() {
        let mock = MockTransport::new(handshake_replies());
        let written = mock.written.clone();
        let mut conn = connection_with(mock);

        assert!(conn.connect_and_initialise("/dev/ttyUSB0").unwrap());
        assert_eq!(conn.state(), ConnectionState::Ready);
        assert_eq!(conn.ecu_id(), Some(&[0x99, 0x00, 0x03, 0x03]));
        assert_eq!(*written.lock().unwrap(), vec![0xCA, 0x75, 0xF4, 0xD0, 0xFB]);

        let status = conn.status();
        assert!(status.connected);
        assert!(status.initialised);
        assert_eq!(status.ecu_id, "99000303");
        assert_eq!(status.iac_position, 0x2A);
    }

    #[test]
    fn test_handshake_echo_mismatch_aborts() {
        let mut replies = handshake_replies();
        replies[1] = vec![0x00];
        let mut conn = connection_with(MockTransport::new(replies));

        let err = conn.connect_and_initialise("/dev/ttyUSB0").unwrap_err();
        assert!(matches!(err, ProtocolError::EchoMismatch { expected: 0x75, .. }));
        assert!(!conn.is_initialised());
        assert_eq!(conn.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_handshake_timeout_aborts() {
        let mut replies = handshake_replies();
        replies.truncate(3);
        let mut conn = connection_with(MockTransport::new(replies));

        let err = conn.connect_and_initialise("/dev/ttyUSB0").unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout { command: 0xD0, .. }));
        assert!(!conn.is_initialised());
        assert!(conn.ecu_id().is_none());
    }

    #[test]
    fn test_send_command_accumulates_partial_reads() {
        let mut replies = handshake_replies();
        replies.push(vec![0xD0, 0x01, 0x02, 0x03, 0x04]);
        let mut conn = connection_with(MockTransport::new(replies));
        conn.connect_and_initialise("port").unwrap();

        let response = conn.send_command(&[0xD0]).unwrap();
        assert_eq!(response, vec![0xD0, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(conn.last_command(), &[0xD0]);
        assert_eq!(conn.last_response(), response.as_slice());
    }

    #[test]
    fn test_timeout_returns_partial_response() {
        let mut replies = handshake_replies();
        replies.push(vec![0x80, 0x1c, 0x03]);
        let mut conn = connection_with(MockTransport::new(replies));
        conn.connect_and_initialise("port").unwrap();

        match conn.send_command(&[0x80]) {
            Err(ProtocolError::Timeout {
                command,
                expected,
                received,
            }) => {
                assert_eq!(command, 0x80);
                assert_eq!(expected, 29);
                assert_eq!(received, vec![0x80, 0x1c, 0x03]);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        // a timeout leaves the link usable
        assert_eq!(conn.state(), ConnectionState::Ready);
    }

    #[test]
    fn test_over_long_response_is_size_mismatch() {
        let mut replies = handshake_replies();
        replies.push(vec![0xD0, 0x01, 0x02, 0x03, 0x04, 0x05]);
        let mut conn = connection_with(MockTransport::new(replies));
        conn.connect_and_initialise("port").unwrap();

        let err = conn.send_command(&[0xD0]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::SizeMismatch {
                command: 0xD0,
                expected: 5,
                actual: 6
            }
        ));
    }

    #[test]
    fn test_echo_mismatch_is_not_fatal() {
        let mut replies = handshake_replies();
        replies.push(vec![0xCC, 0x00]);
        replies.push(vec![0xF4, 0x00]);
        let mut conn = connection_with(MockTransport::new(replies));
        conn.connect_and_initialise("port").unwrap();

        let err = conn.send_command(&[0xF4]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::EchoMismatch {
                expected: 0xF4,
                actual: 0xCC,
                ..
            }
        ));
        assert_eq!(conn.heartbeat().unwrap(), vec![0xF4, 0x00]);
    }

    #[test]
    fn test_write_failure_faults_connection() {
        let mut mock = MockTransport::new(Vec::new());
        mock.fail_on_write = true;
        let mut conn = connection_with(mock);
        conn.connect("port").unwrap();

        let err = conn.send_command(&[0xF4]).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(conn.state(), ConnectionState::Faulted);
        assert!(!conn.is_connected());
        assert!(matches!(
            conn.send_command(&[0xF4]),
            Err(ProtocolError::NotConnected)
        ));
    }

    #[test]
    fn test_late_bytes_discarded_before_next_command() {
        let mut replies = handshake_replies();
        let mut frame = vec![0u8; 29];
        frame[0] = 0x80;
        replies.push(frame);
        replies.push(vec![0xF4, 0x00]);
        let mut mock = MockTransport::new(replies);
        mock.stall = Some((5, 3));
        let mut conn = connection_with(mock);
        conn.connect_and_initialise("port").unwrap();

        assert!(matches!(
            conn.send_command(&[0x80]),
            Err(ProtocolError::Timeout { received, .. }) if received.len() == 3
        ));
        // the tail of the 0x80 frame must not be taken as the F4 reply
        assert_eq!(conn.send_command(&[0xF4]).unwrap(), vec![0xF4, 0x00]);
        assert_eq!(conn.state(), ConnectionState::Ready);
    }

    #[test]
    fn test_fault_forgets_ecu_id() {
        let mut mock = MockTransport::new(handshake_replies());
        mock.fail_after_writes = Some(5);
        let mut conn = connection_with(mock);
        conn.connect_and_initialise("port").unwrap();
        assert_eq!(conn.status().ecu_id, "99000303");

        assert!(conn.send_command(&[0xF4]).unwrap_err().is_fatal());
        assert_eq!(conn.state(), ConnectionState::Faulted);
        assert!(conn.ecu_id().is_none());
        assert!(conn.status().ecu_id.is_empty());
    }

    #[test]
    fn test_commands_require_connection() {
        let mut conn = Connection::new(ConnectionConfig::default());
        assert!(matches!(
            conn.send_command(&[0xF4]),
            Err(ProtocolError::NotConnected)
        ));
        assert!(matches!(
            conn.get_telemetry(),
            Err(ProtocolError::NotConnected)
        ));
    }

    #[test]
    fn test_telemetry_requires_initialisation() {
        let mut conn = connection_with(MockTransport::new(Vec::new()));
        conn.connect("port").unwrap();
        assert!(matches!(
            conn.get_telemetry(),
            Err(ProtocolError::NotInitialised)
        ));
    }

    #[test]
    fn test_empty_command_rejected() {
        let mut conn = connection_with(MockTransport::new(Vec::new()));
        conn.connect("port").unwrap();
        assert!(matches!(
            conn.send_command(&[]),
            Err(ProtocolError::EmptyCommand)
        ));
    }

    #[test]
    fn test_actuator_and_adjustment_bytes_sent() {
        let mut replies = handshake_replies();
        replies.push(vec![0x11, 0x00]);
        replies.push(vec![0x91, 0x05]);
        let mock = MockTransport::new(replies);
        let written = mock.written.clone();
        let mut conn = connection_with(mock);
        conn.connect_and_initialise("port").unwrap();

        conn.activate(Actuator::FuelPump, true).unwrap();
        let response = conn
            .adjust(Adjustment::IdleSpeed, AdjustmentDirection::Increment)
            .unwrap();
        assert_eq!(response, vec![0x91, 0x05]);
        assert_eq!(&written.lock().unwrap()[5..], &[0x11, 0x91]);
    }

    #[test]
    fn test_disconnect() {
        let mut conn = connection_with(MockTransport::new(handshake_replies()));
        conn.connect_and_initialise("port").unwrap();
        conn.disconnect().unwrap();

        let status = conn.status();
        assert_eq!(status.state, ConnectionState::Disconnected);
        assert!(!status.connected);
        assert!(!status.initialised);
        assert!(status.ecu_id.is_empty());
    }
}
