use serde::{Deserialize, Serialize};

use crate::decode::MemsSnapshot;

/// Snapshot fields tracked by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    EngineRpm,
    CoolantTemp,
    IntakeAirTemp,
    ManifoldAbsolutePressure,
    BatteryVoltage,
    ThrottlePot,
    IacPosition,
    IdleSpeedDeviation,
    IgnitionAdvance,
    CoilTime,
    LambdaVoltage,
    LongTermFuelTrim,
    FuelTrimCorrection,
}

impl Metric {
    pub const ALL: [Metric; 13] = [
        Metric::EngineRpm,
        Metric::CoolantTemp,
        Metric::IntakeAirTemp,
        Metric::ManifoldAbsolutePressure,
        Metric::BatteryVoltage,
        Metric::ThrottlePot,
        Metric::IacPosition,
        Metric::IdleSpeedDeviation,
        Metric::IgnitionAdvance,
        Metric::CoilTime,
        Metric::LambdaVoltage,
        Metric::LongTermFuelTrim,
        Metric::FuelTrimCorrection,
    ];

    /// Read this metric from a snapshot
    pub fn extract(&self, s: &MemsSnapshot) -> f64 {
        match self {
            Metric::EngineRpm => f64::from(s.engine_rpm),
            Metric::CoolantTemp => f64::from(s.coolant_temp),
            Metric::IntakeAirTemp => f64::from(s.intake_air_temp),
            Metric::ManifoldAbsolutePressure => s.manifold_absolute_pressure,
            Metric::BatteryVoltage => s.battery_voltage,
            Metric::ThrottlePot => s.throttle_pot,
            Metric::IacPosition => f64::from(s.iac_position),
            Metric::IdleSpeedDeviation => f64::from(s.idle_speed_deviation),
            Metric::IgnitionAdvance => s.ignition_advance,
            Metric::CoilTime => s.coil_time,
            Metric::LambdaVoltage => f64::from(s.lambda_voltage),
            Metric::LongTermFuelTrim => f64::from(s.long_term_fuel_trim),
            Metric::FuelTrimCorrection => f64::from(s.fuel_trim_correction),
        }
    }
}
