//! Rule-based engine diagnosis
//!
//! Rules run in a fixed order. Where two rules touch the same field, or both
//! assign a diagnosis code, the later rule wins.

use serde::{Deserialize, Serialize};

use super::{Metric, SampleStats};
use crate::decode::MemsSnapshot;

/// Diagnosis label for the current sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisCode {
    #[default]
    Optimal,
    /// Idle speed outside the band for the current engine temperature
    IdleSpeedFault,
    /// Manifold pressure out of range for the engine state
    MapFault,
    /// Engine speed is off target while the IAC stepper reads zero
    IacFault,
    /// IAC stepper parked below its working range
    IacStuckClosed,
    /// IAC stepper parked above its working range
    IacStuckOpen,
    /// Lambda sensor voltage outside its operating band in closed loop
    LambdaFault,
}

/// Limits the rules compare against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticThresholds {
    /// Mean coolant temperature (C) for the engine to count as warm
    pub operating_temp: f64,
    /// Coolant std-dev must stay below this to count as a stable reading
    pub max_coolant_std_dev: f64,
    /// RPM std-dev at or below which engine speed is steady
    pub max_idle_rpm_std_dev: f64,
    pub min_idle_cold_rpm: f64,
    pub max_idle_cold_rpm: f64,
    pub min_idle_warm_rpm: f64,
    pub max_idle_warm_rpm: f64,
    /// Idle manifold pressure band (kPa)
    pub min_idle_map: f64,
    pub max_idle_map: f64,
    /// Manifold pressure (kPa) must exceed this with the engine stopped
    pub min_engine_off_map: f64,
    /// Idle speed deviation that counts as an idle error
    pub max_idle_error: f64,
    /// IAC working range in stepper counts
    pub min_iac_steps: f64,
    pub max_iac_steps: f64,
    /// Lambda voltage band (mV) in closed loop
    pub min_lambda_mv: f64,
    pub max_lambda_mv: f64,
}

impl Default for DiagnosticThresholds {
    fn default() -> Self {
        Self {
            operating_temp: 80.0,
            max_coolant_std_dev: 5.0,
            max_idle_rpm_std_dev: 10.0,
            min_idle_cold_rpm: 900.0,
            max_idle_cold_rpm: 1200.0,
            min_idle_warm_rpm: 700.0,
            max_idle_warm_rpm: 900.0,
            min_idle_map: 20.0,
            max_idle_map: 45.0,
            min_engine_off_map: 90.0,
            max_idle_error: 50.0,
            min_iac_steps: 10.0,
            max_iac_steps: 160.0,
            min_lambda_mv: 10.0,
            max_lambda_mv: 900.0,
        }
    }
}

/// Engine health derived from one analysis cycle
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analysis_code: AnalysisCode,
    pub is_engine_running: bool,
    pub is_engine_warming: bool,
    pub is_at_operating_temp: bool,
    pub is_engine_idle: bool,
    pub is_engine_idle_fault: bool,
    pub is_cruising: bool,
    pub is_closed_loop: bool,
    pub closed_loop_expected: bool,
    pub map_fault: bool,
    pub idle_air_control_fault: bool,
    pub lambda_fault: bool,
    pub coolant_temp_sensor_fault: bool,
    pub intake_air_temp_sensor_fault: bool,
    pub fuel_pump_circuit_fault: bool,
    pub throttle_pot_circuit_fault: bool,
    /// IAC stepper position in steps
    pub iac_position: u8,
}

impl AnalysisReport {
    /// Whether any rule or ECU fault bit reports a problem
    pub fn has_fault(&self) -> bool {
        self.is_engine_idle_fault
            || self.map_fault
            || self.idle_air_control_fault
            || self.lambda_fault
            || self.coolant_temp_sensor_fault
            || self.intake_air_temp_sensor_fault
            || self.fuel_pump_circuit_fault
            || self.throttle_pot_circuit_fault
    }
}

/// Run the rule set over `sample` (oldest first) and its statistics
///
/// `iac_baseline` is reported as the IAC position while the sample is empty.
pub fn analyse(
    sample: &[MemsSnapshot],
    stats: &SampleStats,
    thresholds: &DiagnosticThresholds,
    iac_baseline: u8,
) -> AnalysisReport {
    let Some(latest) = sample.last() else {
        return AnalysisReport {
            is_engine_warming: true,
            iac_position: iac_baseline,
            ..Default::default()
        };
    };

    let t = thresholds;
    let mean = |m: Metric| stats.get(m).map(|s| s.mean);
    let std_dev = |m: Metric| stats.get(m).map(|s| s.std_dev);

    let mut report = AnalysisReport {
        iac_position: latest.iac_position,
        ..Default::default()
    };

    // 1. running
    report.is_engine_running = latest.engine_rpm != 0;

    // 2. operating temperature, from a stable coolant reading
    report.is_at_operating_temp = matches!(
        (mean(Metric::CoolantTemp), std_dev(Metric::CoolantTemp)),
        (Some(m), Some(sd)) if m >= t.operating_temp && sd < t.max_coolant_std_dev
    );
    report.is_engine_warming = !report.is_at_operating_temp;

    // 3. idle / cruise. A steady engine is idle; above the warm idle band it
    // is also cruising, and the idle band checks no longer apply.
    let (min_idle, max_idle) = if report.is_at_operating_temp {
        (t.min_idle_warm_rpm, t.max_idle_warm_rpm)
    } else {
        (t.min_idle_cold_rpm, t.max_idle_cold_rpm)
    };
    if let (Some(rpm), Some(rpm_sd)) = (mean(Metric::EngineRpm), std_dev(Metric::EngineRpm)) {
        if report.is_engine_running && rpm_sd <= t.max_idle_rpm_std_dev {
            report.is_engine_idle = true;
            report.is_cruising = rpm > t.max_idle_warm_rpm;
        }
        if report.is_engine_idle
            && !report.is_cruising
            && (rpm < min_idle || rpm > max_idle)
        {
            report.is_engine_idle_fault = true;
            report.analysis_code = AnalysisCode::IdleSpeedFault;
        }
    }
    let at_idle = report.is_engine_idle && !report.is_cruising;

    // 4. manifold pressure
    if let Some(map) = mean(Metric::ManifoldAbsolutePressure) {
        let idle_fault = at_idle && (map < t.min_idle_map || map > t.max_idle_map);
        let off_fault = !report.is_engine_running && map <= t.min_engine_off_map;
        if idle_fault || off_fault {
            report.map_fault = true;
            report.analysis_code = AnalysisCode::MapFault;
        }
    }

    // 5. closed loop, informational only
    report.closed_loop_expected =
        report.is_at_operating_temp && (report.is_engine_idle || report.is_cruising);
    report.is_closed_loop = latest.closed_loop;

    // 6. idle air control
    if report.is_engine_running
        && f64::from(latest.idle_speed_deviation) >= t.max_idle_error
        && latest.iac_position == 0
    {
        report.idle_air_control_fault = true;
        report.analysis_code = AnalysisCode::IacFault;
    }
    if let Some(iac) = mean(Metric::IacPosition) {
        if iac < t.min_iac_steps {
            report.idle_air_control_fault = true;
            report.analysis_code = AnalysisCode::IacStuckClosed;
        }
        if iac > t.max_iac_steps {
            report.idle_air_control_fault = true;
            report.analysis_code = AnalysisCode::IacStuckOpen;
        }
    }

    // 7. lambda, only meaningful in closed loop
    if report.is_engine_running && report.is_closed_loop {
        if let Some(lambda) = stats.get(Metric::LambdaVoltage) {
            if lambda.min < t.min_lambda_mv || lambda.max > t.max_lambda_mv {
                report.lambda_fault = true;
                report.analysis_code = AnalysisCode::LambdaFault;
            }
        }
    }

    report.coolant_temp_sensor_fault = latest.coolant_temp_sensor_fault;
    report.intake_air_temp_sensor_fault = latest.intake_air_temp_sensor_fault;
    report.fuel_pump_circuit_fault = latest.fuel_pump_circuit_fault;
    report.throttle_pot_circuit_fault = latest.throttle_pot_circuit_fault;

    report
}
