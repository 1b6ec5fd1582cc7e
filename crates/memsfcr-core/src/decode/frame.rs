//! Raw dataframe layouts
//!
//! Byte-for-byte views of the replies to `0x80` and `0x7D`. Multi-byte fields
//! are big-endian.

use byteorder::{BigEndian, ByteOrder};

use super::DecodeError;
use crate::protocol::commands::Command;

/// Length of the reply to `0x80`
pub const FRAME_80_LEN: usize = 29;

/// Length of the reply to `0x7D`
pub const FRAME_7D_LEN: usize = 33;

/// Dataframe returned by the ECU in reply to `0x80`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dataframe80 {
    pub command: u8,
    pub bytes_in_frame: u8,
    pub engine_rpm: u16,
    pub coolant_temp: u8,
    pub ambient_temp: u8,
    pub intake_air_temp: u8,
    pub fuel_temp: u8,
    pub manifold_absolute_pressure: u8,
    pub battery_voltage: u8,
    pub throttle_pot: u8,
    pub idle_switch: u8,
    pub aircon_switch: u8,
    pub park_neutral_switch: u8,
    pub dtc0: u8,
    pub dtc1: u8,
    pub idle_set_point: u8,
    pub idle_hot: u8,
    pub uk8011: u8,
    pub iac_position: u8,
    pub idle_speed_deviation: u16,
    pub ignition_advance_offset: u8,
    pub ignition_advance: u8,
    pub coil_time: u16,
    pub crankshaft_position_sensor: u8,
    pub uk801a: u8,
    pub uk801b: u8,
}

impl Dataframe80 {
    /// Parse the first [`FRAME_80_LEN`] bytes of `data`
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        check_frame(Command::RequestData80.byte(), data, FRAME_80_LEN)?;

        Ok(Self {
            command: data[0],
            bytes_in_frame: data[1],
            engine_rpm: BigEndian::read_u16(&data[2..4]),
            coolant_temp: data[4],
            ambient_temp: data[5],
            intake_air_temp: data[6],
            fuel_temp: data[7],
            manifold_absolute_pressure: data[8],
            battery_voltage: data[9],
            throttle_pot: data[10],
            idle_switch: data[11],
            aircon_switch: data[12],
            park_neutral_switch: data[13],
            dtc0: data[14],
            dtc1: data[15],
            idle_set_point: data[16],
            idle_hot: data[17],
            uk8011: data[18],
            iac_position: data[19],
            idle_speed_deviation: BigEndian::read_u16(&data[20..22]),
            ignition_advance_offset: data[22],
            ignition_advance: data[23],
            coil_time: BigEndian::read_u16(&data[24..26]),
            crankshaft_position_sensor: data[26],
            uk801a: data[27],
            uk801b: data[28],
        })
    }
}

/// Dataframe returned by the ECU in reply to `0x7D`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dataframe7d {
    pub command: u8,
    pub bytes_in_frame: u8,
    pub ignition_switch: u8,
    pub throttle_angle: u8,
    pub uk7d03: u8,
    pub air_fuel_ratio: u8,
    pub dtc2: u8,
    pub lambda_voltage: u8,
    pub lambda_frequency: u8,
    pub lambda_duty_cycle: u8,
    pub lambda_status: u8,
    pub loop_indicator: u8,
    pub long_term_fuel_trim: u8,
    pub short_term_fuel_trim: u8,
    pub carbon_canister_purge_valve: u8,
    pub dtc3: u8,
    pub idle_base_position: u8,
    pub uk7d10: u8,
    pub dtc4: u8,
    pub ignition_advance_offset: u8,
    pub idle_speed_offset: u8,
    pub uk7d14: u8,
    pub uk7d15: u8,
    pub dtc5: u8,
    /// Bytes 0x17 to 0x1e, meaning unknown
    pub unknown: [u8; 8],
    pub jack_count: u8,
}

impl Dataframe7d {
    /// Parse the first [`FRAME_7D_LEN`] bytes of `data`
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        check_frame(Command::RequestData7D.byte(), data, FRAME_7D_LEN)?;

        let mut unknown = [0u8; 8];
        unknown.copy_from_slice(&data[24..32]);

        Ok(Self {
            command: data[0],
            bytes_in_frame: data[1],
            ignition_switch: data[2],
            throttle_angle: data[3],
            uk7d03: data[4],
            air_fuel_ratio: data[5],
            dtc2: data[6],
            lambda_voltage: data[7],
            lambda_frequency: data[8],
            lambda_duty_cycle: data[9],
            lambda_status: data[10],
            loop_indicator: data[11],
            long_term_fuel_trim: data[12],
            short_term_fuel_trim: data[13],
            carbon_canister_purge_valve: data[14],
            dtc3: data[15],
            idle_base_position: data[16],
            uk7d10: data[17],
            dtc4: data[18],
            ignition_advance_offset: data[19],
            idle_speed_offset: data[20],
            uk7d14: data[21],
            uk7d15: data[22],
            dtc5: data[23],
            unknown,
            jack_count: data[32],
        })
    }
}

fn check_frame(command: u8, data: &[u8], expected: usize) -> Result<(), DecodeError> {
    if data.len() < expected {
        return Err(DecodeError::FrameTooShort {
            command,
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}
