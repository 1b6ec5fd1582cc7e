//! Command implementations

use anyhow::{bail, Context, Result};
use memsfcr_core::config::ReaderConfig;
use memsfcr_core::decode::MemsSnapshot;
use memsfcr_core::diagnostics::AnalysisReport;
use memsfcr_core::protocol::{list_ports, Connection, ProtocolError, ReplayTransport};
use memsfcr_core::service::{EcuHandle, EcuService};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// One line of `read`/`replay` output
#[derive(Serialize)]
struct Reading<'a> {
    snapshot: &'a MemsSnapshot,
    diagnostics: &'a AnalysisReport,
}

pub fn ports() -> Result<()> {
    let ports = list_ports();
    if ports.is_empty() {
        eprintln!("No serial ports found");
        return Ok(());
    }

    for port in ports {
        match (&port.product, port.vid, port.pid) {
            (Some(product), Some(vid), Some(pid)) => {
                println!("{}\t{:04x}:{:04x}\t{}", port.name, vid, pid, product)
            }
            _ => println!("{}", port.name),
        }
    }
    Ok(())
}

pub async fn read(config: &ReaderConfig, port: &str, count: u64, interval_ms: u64) -> Result<()> {
    if port.is_empty() {
        bail!("No serial port given and none configured");
    }

    let connection = Connection::new(config.connection.clone())
        .with_diagnostics(config.diagnostics.clone());
    let handle = EcuService::spawn(connection).context("Failed to start ECU service")?;

    run_session(&handle, port, count, interval_ms).await
}

pub async fn replay(config: &ReaderConfig, file: &Path, count: u64, interval_ms: u64) -> Result<()> {
    let reader = File::open(file)
        .with_context(|| format!("Failed to open scenario {}", file.display()))?;
    let replay = ReplayTransport::from_csv(BufReader::new(reader))
        .with_context(|| format!("Failed to load scenario {}", file.display()))?;
    if replay.is_empty() {
        bail!("Scenario {} has no recorded dataframes", file.display());
    }

    let count = if count == 0 { replay.len() as u64 } else { count };
    let connection = Connection::replay(config.connection.clone(), replay)
        .with_diagnostics(config.diagnostics.clone());
    let handle = EcuService::spawn(connection).context("Failed to start ECU service")?;

    let name = file.display().to_string();
    run_session(&handle, &name, count, interval_ms).await
}

pub async fn command(config: &ReaderConfig, port: &str, command: &str) -> Result<()> {
    let bytes = hex::decode(command.trim()).context("Command must be hex, e.g. cc")?;
    if bytes.is_empty() {
        bail!("Empty command");
    }

    let connection = Connection::new(config.connection.clone());
    let handle = EcuService::spawn(connection).context("Failed to start ECU service")?;
    handle
        .connect_and_initialise(port)
        .await
        .with_context(|| format!("Failed to initialise ECU on {}", port))?;

    let response = handle.send_command(&bytes).await;
    let _ = handle.shutdown().await;

    let response = response.with_context(|| format!("Command {} failed", command))?;
    println!("{}", hex::encode(response));
    Ok(())
}

/// Initialise, then print readings until `count` is reached (0 = forever)
/// or the user interrupts.
async fn run_session(handle: &EcuHandle, port: &str, count: u64, interval_ms: u64) -> Result<()> {
    handle
        .connect_and_initialise(port)
        .await
        .with_context(|| format!("Failed to initialise ECU on {}", port))?;

    let status = handle.status().await?;
    tracing::info!(ecu_id = %status.ecu_id, "ECU ready");

    let mut taken = 0u64;
    let result = loop {
        if count != 0 && taken >= count {
            break Ok(());
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break Ok(());
            }
            reading = read_once(handle) => {
                if let Err(e) = reading {
                    break Err(e);
                }
            }
        }
        taken += 1;

        if interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        }
    };

    let _ = handle.shutdown().await;
    result
}

async fn read_once(handle: &EcuHandle) -> Result<()> {
    match handle.get_telemetry().await {
        Ok(snapshot) => {
            let diagnostics = handle.get_diagnostics().await?;
            let line = serde_json::to_string(&Reading {
                snapshot: &snapshot,
                diagnostics: &diagnostics,
            })?;
            println!("{}", line);
            Ok(())
        }
        // a bad frame costs one reading, not the session
        Err(
            e @ (ProtocolError::Timeout { .. }
            | ProtocolError::EchoMismatch { .. }
            | ProtocolError::SizeMismatch { .. }
            | ProtocolError::Decode(_)),
        ) => {
            tracing::warn!(error = %e, "skipping reading");
            Ok(())
        }
        Err(e) => Err(e).context("Lost connection to ECU"),
    }
}
