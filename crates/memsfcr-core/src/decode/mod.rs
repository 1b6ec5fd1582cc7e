//! Dataframe decoding
//!
//! Turns a pair of raw `0x80`/`0x7D` replies into a [`MemsSnapshot`] in
//! engineering units. Every scale and offset is applied here and only here.

mod frame;

pub use frame::{Dataframe7d, Dataframe80, FRAME_7D_LEN, FRAME_80_LEN};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Temperature sensors report degrees C offset by this amount
pub const TEMPERATURE_OFFSET: i16 = 55;

/// DTC0 bit set when the coolant temperature sensor has failed
pub const COOLANT_SENSOR_FAULT: u8 = 0x01;
/// DTC0 bit set when the intake air temperature sensor has failed
pub const AIR_SENSOR_FAULT: u8 = 0x02;
/// DTC1 bit set on a fuel pump circuit fault
pub const FUEL_PUMP_FAULT: u8 = 0x02;
/// DTC1 bit set on a throttle pot circuit fault
pub const THROTTLE_POT_FAULT: u8 = 0x80;

/// Stepper count at which the IAC valve is fully open
const IAC_FULLY_OPEN_STEPS: f64 = 180.0;

/// Errors raised while decoding raw frames
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Frame {command:#04x} too short: expected {expected} bytes, got {actual}")]
    FrameTooShort {
        command: u8,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid hex frame: {0}")]
    InvalidHex(String),

    #[error("Recording has no {0} column")]
    MissingColumn(String),
}

/// One engine reading computed from dataframes `0x80` and `0x7D`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub engine_rpm: u16,
    /// Degrees C
    pub coolant_temp: i16,
    pub ambient_temp: i16,
    pub intake_air_temp: i16,
    pub fuel_temp: i16,
    /// kPa
    pub manifold_absolute_pressure: f64,
    /// Volts
    pub battery_voltage: f64,
    /// Volts
    pub throttle_pot: f64,
    pub idle_switch: bool,
    pub aircon_switch: bool,
    pub park_neutral_switch: bool,
    pub dtc0: u8,
    pub dtc1: u8,
    pub idle_set_point: u8,
    pub idle_hot: i16,
    /// Raw stepper count, 0 closed to 180 fully open
    pub iac_position: u8,
    /// Stepper position as a percentage of fully open
    pub iac_position_percent: u8,
    pub idle_speed_deviation: u16,
    pub ignition_advance_offset_80: u8,
    /// Degrees
    pub ignition_advance: f64,
    /// Milliseconds
    pub coil_time: f64,
    pub crankshaft_position_sensor: bool,
    pub ignition_switch: bool,
    pub throttle_angle: u16,
    pub air_fuel_ratio: f64,
    pub dtc2: u8,
    /// Millivolts
    pub lambda_voltage: u16,
    pub lambda_frequency: u8,
    pub lambda_duty_cycle: u8,
    pub lambda_status: u8,
    pub closed_loop: bool,
    /// Signed trim around zero
    pub long_term_fuel_trim: i16,
    pub short_term_fuel_trim: u8,
    /// Short term trim as a signed correction around zero
    pub fuel_trim_correction: i16,
    pub carbon_canister_purge_valve: u8,
    pub dtc3: u8,
    pub idle_base_position: u8,
    pub dtc4: u8,
    pub ignition_advance_offset_7d: i16,
    pub idle_speed_offset: i16,
    pub dtc5: u8,
    pub jack_count: u8,

    pub coolant_temp_sensor_fault: bool,
    pub intake_air_temp_sensor_fault: bool,
    pub fuel_pump_circuit_fault: bool,
    pub throttle_pot_circuit_fault: bool,

    /// Raw `0x80` frame, hex encoded
    pub dataframe80: String,
    /// Raw `0x7D` frame, hex encoded
    pub dataframe7d: String,
}

fn round_2dp(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// IAC stepper count as a percentage of fully open, capped at 100
pub fn iac_percent(steps: u8) -> u8 {
    (f64::from(steps) / (IAC_FULLY_OPEN_STEPS / 100.0))
        .round()
        .min(100.0) as u8
}

fn temperature(raw: u8) -> i16 {
    i16::from(raw) - TEMPERATURE_OFFSET
}

/// Decode a pair of raw frames captured at `timestamp`
///
/// Only the frame length is checked. Any byte value decodes.
pub fn decode(
    frame80: &[u8],
    frame7d: &[u8],
    timestamp: DateTime<Utc>,
) -> Result<MemsSnapshot, DecodeError> {
    let df80 = Dataframe80::parse(frame80)?;
    let df7d = Dataframe7d::parse(frame7d)?;

    Ok(MemsSnapshot {
        timestamp,
        engine_rpm: df80.engine_rpm,
        coolant_temp: temperature(df80.coolant_temp),
        ambient_temp: temperature(df80.ambient_temp),
        intake_air_temp: temperature(df80.intake_air_temp),
        fuel_temp: temperature(df80.fuel_temp),
        manifold_absolute_pressure: f64::from(df80.manifold_absolute_pressure),
        battery_voltage: f64::from(df80.battery_voltage) / 10.0,
        throttle_pot: round_2dp(f64::from(df80.throttle_pot) * 0.02),
        idle_switch: df80.idle_switch != 0,
        aircon_switch: df80.aircon_switch == 1,
        park_neutral_switch: df80.park_neutral_switch == 1,
        dtc0: df80.dtc0,
        dtc1: df80.dtc1,
        idle_set_point: df80.idle_set_point,
        idle_hot: i16::from(df80.idle_hot) - 35,
        iac_position: df80.iac_position,
        iac_position_percent: iac_percent(df80.iac_position),
        idle_speed_deviation: df80.idle_speed_deviation,
        ignition_advance_offset_80: df80.ignition_advance_offset,
        ignition_advance: f64::from(df80.ignition_advance) / 2.0 - 24.0,
        coil_time: round_2dp(f64::from(df80.coil_time) * 0.002),
        crankshaft_position_sensor: df80.crankshaft_position_sensor != 0,
        ignition_switch: df7d.ignition_switch != 0,
        throttle_angle: u16::from(df7d.throttle_angle) * 6 / 10,
        air_fuel_ratio: f64::from(df7d.air_fuel_ratio) / 10.0,
        dtc2: df7d.dtc2,
        lambda_voltage: u16::from(df7d.lambda_voltage) * 5,
        lambda_frequency: df7d.lambda_frequency,
        lambda_duty_cycle: df7d.lambda_duty_cycle,
        lambda_status: df7d.lambda_status,
        closed_loop: df7d.loop_indicator != 0,
        long_term_fuel_trim: i16::from(df7d.long_term_fuel_trim) - 128,
        short_term_fuel_trim: df7d.short_term_fuel_trim,
        fuel_trim_correction: i16::from(df7d.short_term_fuel_trim) - 100,
        carbon_canister_purge_valve: df7d.carbon_canister_purge_valve,
        dtc3: df7d.dtc3,
        idle_base_position: df7d.idle_base_position,
        dtc4: df7d.dtc4,
        ignition_advance_offset_7d: i16::from(df7d.ignition_advance_offset) - 48,
        idle_speed_offset: (i16::from(df7d.idle_speed_offset) - 128) * 25,
        dtc5: df7d.dtc5,
        jack_count: df7d.jack_count,
        coolant_temp_sensor_fault: df80.dtc0 & COOLANT_SENSOR_FAULT != 0,
        intake_air_temp_sensor_fault: df80.dtc0 & AIR_SENSOR_FAULT != 0,
        fuel_pump_circuit_fault: df80.dtc1 & FUEL_PUMP_FAULT != 0,
        throttle_pot_circuit_fault: df80.dtc1 & THROTTLE_POT_FAULT != 0,
        dataframe80: hex::encode(&frame80[..FRAME_80_LEN]),
        dataframe7d: hex::encode(&frame7d[..FRAME_7D_LEN]),
    })
}

/// Decode a pair of hex-encoded frames, as stored in [`MemsSnapshot::dataframe80`]
/// and [`MemsSnapshot::dataframe7d`]
pub fn decode_hex(
    frame80: &str,
    frame7d: &str,
    timestamp: DateTime<Utc>,
) -> Result<MemsSnapshot, DecodeError> {
    let d80 = hex::decode(frame80.trim()).map_err(|e| DecodeError::InvalidHex(e.to_string()))?;
    let d7d = hex::decode(frame7d.trim()).map_err(|e| DecodeError::InvalidHex(e.to_string()))?;
    decode(&d80, &d7d, timestamp)
}
