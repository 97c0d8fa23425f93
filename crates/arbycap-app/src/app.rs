use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use arbycap_capture::{
    CaptureController, CapturePaths, EepromFile, EmulationLoop, LoopEvent, PatternSource,
};
use arbycap_core::{CaptureConfig, CaptureError, Resolution};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const RECORD_SECS_ENV: &str = "ARBYCAP_RECORD_SECS";

/// Demo run over the synthetic pattern source.
///
/// # Flow
/// 1. Load `CaptureConfig` (`ARBYCAP_CONFIG`, defaults otherwise)
/// 2. Spawn the emulation loop at the configured fps, EEPROM kept in
///    `eeprom_file`
/// 3. Take one snapshot, then record `ARBYCAP_RECORD_SECS` seconds (default
///    3, max 600). Ctrl-C ends the recording early.
/// 4. Stop the loop and list the files written
pub async fn run() -> Result<()> {
    let record_secs: u64 = std::env::var(RECORD_SECS_ENV)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3)
        .clamp(1, 600);

    let config = CaptureConfig::from_env().context("Loading capture config")?;
    let paths = CapturePaths::from_config(&config);
    paths
        .ensure_dir()
        .map_err(|e| CaptureError::DirectoryUnavailable {
            reason: format!("{}: {}", paths.dir().display(), e),
        })?;
    info!("Captures go to {}", paths.dir().display());

    let resolution = Resolution::ARDUBOY;
    let controller = CaptureController::new(resolution, paths);
    let eeprom = EepromFile::new(&config.eeprom_file);
    let (handle, events) = EmulationLoop::spawn_with_eeprom(
        PatternSource::new(resolution),
        controller,
        config.target_fps,
        Some(eeprom),
    )
    .context("Spawning emulation thread")?;
    let reporter = tokio::spawn(report_events(events));

    handle.request_one_shot();
    handle.start_capturing();
    info!("Recording {}s at {} fps (Ctrl-C to stop early)", record_secs, config.target_fps);

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(record_secs)) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted, finishing capture"),
    }
    handle.stop_capturing();

    let frames = tokio::task::spawn_blocking(move || {
        let frames = handle.frames_produced();
        handle.stop();
        frames
    })
    .await
    .context("Joining emulation thread")?;

    let saved = reporter.await.context("Event reporter")?;
    info!("{} frames produced, {} file(s) saved", frames, saved.len());
    for path in &saved {
        info!("  {}", path.display());
    }
    Ok(())
}

/// Logs loop events until the loop exits. Returns every saved file.
async fn report_events(mut events: mpsc::Receiver<LoopEvent>) -> Vec<PathBuf> {
    let mut saved = Vec::new();
    while let Some(event) = events.recv().await {
        match event {
            LoopEvent::CaptureStarted => info!("Recording..."),
            LoopEvent::CaptureSaved { path, kind } => {
                info!("Saved {}: {}", kind, path.display());
                saved.push(path);
            }
            LoopEvent::CaptureFailed { kind } => warn!("Could not save {}", kind),
            LoopEvent::Status { fps, frames } => info!("{:.1} fps, {} frames", fps, frames),
            LoopEvent::Leds(leds) => debug!("LEDs: {:?}", leds),
            LoopEvent::Halted => warn!("Source halted"),
        }
    }
    saved
}
