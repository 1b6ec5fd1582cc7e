//! End-to-end sessions against recorded dataframes

use memsfcr_core::prelude::*;
use memsfcr_core::protocol::RecordedFrame;
use pretty_assertions::assert_eq;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("memsfcr_core=debug")
        .with_test_writer()
        .try_init();
}

fn warm_idle_replay() -> ReplayTransport {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join("warm_idle.csv");
    let file = File::open(path).unwrap();
    ReplayTransport::from_csv(BufReader::new(file)).unwrap()
}

#[test]
fn test_recording_loads() {
    let replay = warm_idle_replay();
    assert_eq!(replay.len(), 30);
    assert_eq!(replay.position(), 0);
}

#[test]
fn test_replay_session_status() {
    init_tracing();
    let mut conn = Connection::replay(ConnectionConfig::default(), warm_idle_replay());

    assert!(conn.connect_and_initialise("warm_idle.csv").unwrap());
    assert_eq!(
        conn.status(),
        ConnectionStatus {
            state: ConnectionState::Ready,
            connected: true,
            initialised: true,
            ecu_id: "99000303".to_string(),
            iac_position: 40,
        }
    );

    // calling again is a no-op once ready
    assert!(conn.connect_and_initialise("warm_idle.csv").unwrap());
}

#[test]
fn test_replay_telemetry_decodes() {
    init_tracing();
    let mut conn = Connection::replay(ConnectionConfig::default(), warm_idle_replay());
    conn.connect_and_initialise("replay").unwrap();

    let snapshot = conn.get_telemetry().unwrap();
    assert_eq!(snapshot.engine_rpm, 820);
    assert_eq!(snapshot.coolant_temp, 88);
    assert_eq!(snapshot.intake_air_temp, 30);
    assert_eq!(snapshot.manifold_absolute_pressure, 35.0);
    assert_eq!(snapshot.battery_voltage, 13.8);
    assert_eq!(snapshot.throttle_pot, 0.2);
    assert_eq!(snapshot.iac_position, 40);
    assert_eq!(snapshot.lambda_voltage, 450);
    assert!(snapshot.closed_loop);
    assert_eq!(snapshot.long_term_fuel_trim, 0);
    assert_eq!(snapshot.fuel_trim_correction, 0);
    assert_eq!(snapshot.dataframe80.len(), 58);
    assert_eq!(snapshot.dataframe7d.len(), 66);

    let snapshot = conn.get_telemetry().unwrap();
    assert_eq!(snapshot.engine_rpm, 825);
    assert_eq!(snapshot.lambda_voltage, 470);
}

#[test]
fn test_replay_warm_idle_diagnosis() {
    init_tracing();
    let mut conn = Connection::replay(ConnectionConfig::default(), warm_idle_replay());
    conn.connect_and_initialise("replay").unwrap();

    for _ in 0..30 {
        conn.get_telemetry().unwrap();
    }

    let report = conn.get_diagnostics();
    assert_eq!(report.analysis_code, AnalysisCode::Optimal);
    assert!(report.is_engine_running);
    assert!(report.is_at_operating_temp);
    assert!(report.is_engine_idle);
    assert!(!report.is_cruising);
    assert!(report.closed_loop_expected);
    assert!(report.is_closed_loop);
    assert!(!report.has_fault());

    let rpm = conn.diagnostics().stats().get(Metric::EngineRpm).unwrap();
    assert_eq!(rpm.min, 820.0);
    assert_eq!(rpm.max, 830.0);
    assert_eq!(rpm.mean, 825.0);
    assert!(rpm.std_dev <= 10.0);
}

#[test]
fn test_replay_wraps_around() {
    let mut conn = Connection::replay(ConnectionConfig::default(), warm_idle_replay());
    conn.connect_and_initialise("replay").unwrap();

    let first = conn.get_telemetry().unwrap();
    for _ in 0..29 {
        conn.get_telemetry().unwrap();
    }
    let again = conn.get_telemetry().unwrap();
    assert_eq!(first.dataframe80, again.dataframe80);
    assert_eq!(conn.diagnostics().len(), 31);
}

#[test]
fn test_empty_recording_times_out_on_telemetry() {
    let mut conn = Connection::replay(ConnectionConfig::default(), ReplayTransport::new(Vec::new()));
    conn.connect_and_initialise("replay").unwrap();

    match conn.get_telemetry() {
        Err(ProtocolError::Timeout {
            command, received, ..
        }) => {
            assert_eq!(command, 0x80);
            assert!(received.is_empty());
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert!(conn.is_initialised());
}

#[test]
fn test_faulty_frame_sets_sensor_faults() {
    let mut f80 = vec![0u8; 29];
    f80[0] = 0x80;
    f80[14] = 0x03;
    f80[15] = 0x82;
    let mut f7d = vec![0u8; 33];
    f7d[0] = 0x7d;
    let replay = ReplayTransport::new(vec![RecordedFrame::new(f80, f7d).unwrap()]);

    let mut conn = Connection::replay(ConnectionConfig::default(), replay);
    conn.connect_and_initialise("replay").unwrap();
    conn.get_telemetry().unwrap();

    let report = conn.get_diagnostics();
    assert!(report.coolant_temp_sensor_fault);
    assert!(report.intake_air_temp_sensor_fault);
    assert!(report.fuel_pump_circuit_fault);
    assert!(report.throttle_pot_circuit_fault);
}
