//! Protocol commands
//!
//! Defines the single-byte commands understood by the MEMS 1.6 ECU.

use serde::{Deserialize, Serialize};

/// Protocol commands for ECU communication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Keep the ECU diagnostic session alive (`F4`)
    Heartbeat,

    /// Request dataframe `0x80`
    RequestData80,

    /// Request dataframe `0x7D`
    RequestData7D,

    /// First step of the initialisation sequence (`CA`)
    InitCommandA,

    /// Second step of the initialisation sequence (`75`)
    InitCommandB,

    /// Request the ECU identifier (`D0`)
    RequestEcuId,

    /// Clear stored fault codes (`CC`)
    ClearFaults,

    /// Read the idle air control stepper position (`FB`)
    GetIacPosition,

    /// Clear all adjustments (`0F`)
    ResetAdjustments,

    /// Clear all computed and learnt settings (`FA`)
    ResetEcu,

    /// Pulse the injectors (`F7`)
    TestInjectors,

    /// Fire the ignition coil (`F8`)
    FireCoil,

    /// Step the IAC valve open (`FD`)
    OpenIac,

    /// Step the IAC valve closed (`FE`)
    CloseIac,
}

impl Command {
    /// Get the command byte sent on the wire
    pub fn byte(&self) -> u8 {
        match self {
            Command::Heartbeat => 0xF4,
            Command::RequestData80 => 0x80,
            Command::RequestData7D => 0x7D,
            Command::InitCommandA => 0xCA,
            Command::InitCommandB => 0x75,
            Command::RequestEcuId => 0xD0,
            Command::ClearFaults => 0xCC,
            Command::GetIacPosition => 0xFB,
            Command::ResetAdjustments => 0x0F,
            Command::ResetEcu => 0xFA,
            Command::TestInjectors => 0xF7,
            Command::FireCoil => 0xF8,
            Command::OpenIac => 0xFD,
            Command::CloseIac => 0xFE,
        }
    }

    /// Command as a one-byte frame ready to write
    pub fn bytes(&self) -> [u8; 1] {
        [self.byte()]
    }

    /// Look up a command from its wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.byte() == byte)
    }

    /// Every named command
    pub const ALL: [Command; 14] = [
        Command::Heartbeat,
        Command::RequestData80,
        Command::RequestData7D,
        Command::InitCommandA,
        Command::InitCommandB,
        Command::RequestEcuId,
        Command::ClearFaults,
        Command::GetIacPosition,
        Command::ResetAdjustments,
        Command::ResetEcu,
        Command::TestInjectors,
        Command::FireCoil,
        Command::OpenIac,
        Command::CloseIac,
    ];
}

/// Actuators that can be switched on and off for testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actuator {
    FuelPump,
    PtcRelay,
    AirconRelay,
    PurgeValve,
    O2Heater,
    BoostValve,
    Fan1,
    Fan2,
}

impl Actuator {
    /// Command byte that switches the actuator on
    pub fn on_byte(&self) -> u8 {
        self.off_byte() | 0x10
    }

    /// Command byte that switches the actuator off
    pub fn off_byte(&self) -> u8 {
        match self {
            Actuator::FuelPump => 0x01,
            Actuator::PtcRelay => 0x02,
            Actuator::AirconRelay => 0x03,
            Actuator::PurgeValve => 0x08,
            Actuator::O2Heater => 0x09,
            Actuator::BoostValve => 0x0B,
            Actuator::Fan1 => 0x0D,
            Actuator::Fan2 => 0x0E,
        }
    }

    /// Command byte for the requested state
    pub fn command_byte(&self, on: bool) -> u8 {
        if on {
            self.on_byte()
        } else {
            self.off_byte()
        }
    }
}

/// Direction of an adjustment step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentDirection {
    Increment,
    Decrement,
}

/// ECU settings that can be stepped up or down
///
/// | Setting                 | Decrement | Increment |
/// | ----------------------- | --------- | --------- |
/// | Short term fuel trim    |     7A    |     79    |
/// | Long term fuel trim     |     7C    |     7B    |
/// | Idle decay              |     8A    |     89    |
/// | Idle speed              |     92    |     91    |
/// | Ignition advance offset |     94    |     93    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    ShortTermFuelTrim,
    LongTermFuelTrim,
    IdleDecay,
    IdleSpeed,
    IgnitionAdvanceOffset,
}

impl Adjustment {
    /// Command byte that increases the setting
    pub fn increment_byte(&self) -> u8 {
        match self {
            Adjustment::ShortTermFuelTrim => 0x79,
            Adjustment::LongTermFuelTrim => 0x7B,
            Adjustment::IdleDecay => 0x89,
            Adjustment::IdleSpeed => 0x91,
            Adjustment::IgnitionAdvanceOffset => 0x93,
        }
    }

    /// Command byte that decreases the setting
    pub fn decrement_byte(&self) -> u8 {
        self.increment_byte() + 1
    }

    /// Command byte for the requested direction
    pub fn command_byte(&self, direction: AdjustmentDirection) -> u8 {
        match direction {
            AdjustmentDirection::Increment => self.increment_byte(),
            AdjustmentDirection::Decrement => self.decrement_byte(),
        }
    }
}
