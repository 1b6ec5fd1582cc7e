//! Scenario replay
//!
//! Answers commands from a recording instead of a live ECU so the reader can
//! be demonstrated and tested without hardware.

use std::collections::VecDeque;
use std::io::BufRead;

use super::{commands::Command, EcuTransport, ProtocolError};
use crate::decode::{DecodeError, FRAME_7D_LEN, FRAME_80_LEN};

/// ECU ID reported by a replayed ECU
const REPLAY_ECU_ID: [u8; 4] = [0x99, 0x00, 0x03, 0x03];

/// Offset of the IAC position in dataframe `0x80`
const IAC_POSITION_OFFSET: usize = 19;

/// A recorded pair of dataframes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFrame {
    pub frame80: Vec<u8>,
    pub frame7d: Vec<u8>,
}

impl RecordedFrame {
    /// Build from raw frame bytes. Frames must be full length.
    pub fn new(frame80: Vec<u8>, frame7d: Vec<u8>) -> Result<Self, DecodeError> {
        if frame80.len() < FRAME_80_LEN {
            return Err(DecodeError::FrameTooShort {
                command: Command::RequestData80.byte(),
                expected: FRAME_80_LEN,
                actual: frame80.len(),
            });
        }
        if frame7d.len() < FRAME_7D_LEN {
            return Err(DecodeError::FrameTooShort {
                command: Command::RequestData7D.byte(),
                expected: FRAME_7D_LEN,
                actual: frame7d.len(),
            });
        }
        Ok(Self { frame80, frame7d })
    }

    /// Build from hex strings as found in recorded logs
    pub fn from_hex(frame80: &str, frame7d: &str) -> Result<Self, DecodeError> {
        let d80 = hex::decode(frame80.trim()).map_err(|e| DecodeError::InvalidHex(e.to_string()))?;
        let d7d = hex::decode(frame7d.trim()).map_err(|e| DecodeError::InvalidHex(e.to_string()))?;
        Self::new(d80, d7d)
    }
}

/// Transport that plays back recorded dataframes
///
/// `80` and `7D` are answered from the current recording, which advances
/// after each `7D` and loops back to the start at the end. Every other command
/// gets the reply a healthy ECU would give.
#[derive(Debug, Clone)]
pub struct ReplayTransport {
    frames: Vec<RecordedFrame>,
    position: usize,
    pending: VecDeque<u8>,
    open: bool,
}

impl ReplayTransport {
    /// Create a replay over the given recordings
    pub fn new(frames: Vec<RecordedFrame>) -> Self {
        Self {
            frames,
            position: 0,
            pending: VecDeque::new(),
            open: true,
        }
    }

    /// Load recordings from CSV with `0x80_raw` and `0x7d_raw` columns
    pub fn from_csv<R: BufRead>(reader: R) -> Result<Self, ProtocolError> {
        let mut lines = reader.lines();
        let header = match lines.next() {
            Some(line) => line?,
            None => return Ok(Self::new(Vec::new())),
        };

        let columns: Vec<&str> = header.split(',').map(str::trim).collect();
        let find = |name: &str| {
            columns
                .iter()
                .position(|c| c.eq_ignore_ascii_case(name))
                .ok_or_else(|| DecodeError::MissingColumn(name.to_string()))
        };
        let col80 = find("0x80_raw")?;
        let col7d = find("0x7d_raw")?;

        let mut frames = Vec::new();
        for line in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            let (Some(d80), Some(d7d)) = (fields.get(col80), fields.get(col7d)) else {
                tracing::warn!(line = %line, "skipping short replay row");
                continue;
            };
            frames.push(RecordedFrame::from_hex(d80, d7d)?);
        }

        tracing::info!(frames = frames.len(), "loaded replay scenario");
        Ok(Self::new(frames))
    }

    /// Number of recorded frame pairs
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether there is anything to play back
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Index of the frame pair that will be served next
    pub fn position(&self) -> usize {
        self.position
    }

    fn current(&self) -> Option<&RecordedFrame> {
        self.frames.get(self.position)
    }

    fn advance(&mut self) {
        if self.frames.is_empty() {
            return;
        }
        self.position += 1;
        if self.position >= self.frames.len() {
            tracing::debug!("reached end of scenario, restarting from beginning");
            self.position = 0;
        }
    }

    fn respond(&mut self, command: u8) -> Vec<u8> {
        match Command::from_byte(command) {
            Some(Command::InitCommandA) | Some(Command::InitCommandB) => vec![command],
            Some(Command::RequestEcuId) => {
                let mut r = vec![command];
                r.extend_from_slice(&REPLAY_ECU_ID);
                r
            }
            Some(Command::RequestData80) => self
                .current()
                .map(|f| f.frame80[..FRAME_80_LEN].to_vec())
                .unwrap_or_default(),
            Some(Command::RequestData7D) => {
                let reply = self
                    .current()
                    .map(|f| f.frame7d[..FRAME_7D_LEN].to_vec())
                    .unwrap_or_default();
                self.advance();
                reply
            }
            Some(Command::GetIacPosition) => {
                let iac = self
                    .current()
                    .map(|f| f.frame80[IAC_POSITION_OFFSET])
                    .unwrap_or(0);
                vec![command, iac]
            }
            _ if command == 0x0A => vec![command],
            _ => vec![command, 0x00],
        }
    }
}

impl EcuTransport for ReplayTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize, ProtocolError> {
        if !self.open {
            return Err(ProtocolError::NotConnected);
        }
        for &byte in data {
            let reply = self.respond(byte);
            self.pending.extend(reply);
        }
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        if !self.open {
            return Err(ProtocolError::NotConnected);
        }
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn clear_input(&mut self) -> Result<(), ProtocolError> {
        if !self.open {
            return Err(ProtocolError::NotConnected);
        }
        self.pending.clear();
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.pending.clear();
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded(rpm_low: u8) -> RecordedFrame {
        let mut f80 = vec![0u8; FRAME_80_LEN];
        f80[0] = 0x80;
        f80[3] = rpm_low;
        f80[IAC_POSITION_OFFSET] = 40;
        let mut f7d = vec![0u8; FRAME_7D_LEN];
        f7d[0] = 0x7d;
        RecordedFrame::new(f80, f7d).unwrap()
    }

    fn exchange(t: &mut ReplayTransport, cmd: u8) -> Vec<u8> {
        t.write(&[cmd]).unwrap();
        let mut buf = [0u8; 64];
        let n = t.read(&mut buf).unwrap();
        buf[..n].to_vec()
    }

    #[test]
    fn test_init_and_generic_replies() {
        let mut t = ReplayTransport::new(vec![recorded(1)]);
        assert_eq!(exchange(&mut t, 0xCA), vec![0xCA]);
        assert_eq!(exchange(&mut t, 0x75), vec![0x75]);
        assert_eq!(exchange(&mut t, 0xF4), vec![0xF4, 0x00]);
        assert_eq!(exchange(&mut t, 0xD0), vec![0xD0, 0x99, 0x00, 0x03, 0x03]);
        assert_eq!(exchange(&mut t, 0xFB), vec![0xFB, 40]);
    }

    #[test]
    fn test_frames_advance_and_loop() {
        let mut t = ReplayTransport::new(vec![recorded(1), recorded(2)]);
        assert_eq!(exchange(&mut t, 0x80)[3], 1);
        assert_eq!(exchange(&mut t, 0x7D).len(), FRAME_7D_LEN);
        assert_eq!(exchange(&mut t, 0x80)[3], 2);
        exchange(&mut t, 0x7D);
        assert_eq!(t.position(), 0);
        assert_eq!(exchange(&mut t, 0x80)[3], 1);
    }

    #[test]
    fn test_empty_replay_times_out() {
        let mut t = ReplayTransport::new(Vec::new());
        assert!(exchange(&mut t, 0x80).is_empty());
    }

    #[test]
    fn test_clear_input_drops_unread_reply() {
        let mut t = ReplayTransport::new(vec![recorded(1)]);
        t.write(&[0x80]).unwrap();
        t.clear_input().unwrap();
        assert_eq!(exchange(&mut t, 0xF4), vec![0xF4, 0x00]);
    }

    #[test]
    fn test_closed_replay_rejects_io() {
        let mut t = ReplayTransport::new(vec![recorded(1)]);
        t.close();
        assert!(!t.is_open());
        assert!(matches!(t.write(&[0x80]), Err(ProtocolError::NotConnected)));
    }

    #[test]
    fn test_from_csv() {
        let f = recorded(7);
        let csv = format!(
            "time,0x80_raw,0x7d_raw\n12:00:00,{},{}\n\n",
            hex::encode(&f.frame80),
            hex::encode(&f.frame7d)
        );
        let t = ReplayTransport::from_csv(csv.as_bytes()).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.frames[0], f);
    }

    #[test]
    fn test_from_csv_missing_column() {
        let result = ReplayTransport::from_csv("time,0x80_raw\n".as_bytes());
        match result {
            Err(ProtocolError::Decode(DecodeError::MissingColumn(column))) => {
                assert_eq!(column, "0x7d_raw")
            }
            other => panic!("expected missing column, got {:?}", other.map(|t| t.len())),
        }
    }

    #[test]
    fn test_recorded_frame_too_short() {
        assert!(RecordedFrame::from_hex("8000", &"7d".repeat(33)).is_err());
    }
}
