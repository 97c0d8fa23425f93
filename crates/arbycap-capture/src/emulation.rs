//! `EmulationLoop` — the frame-producing thread.
//!
//! ```text
//! EmulationHandle ──LoopCommand──► [arbycap-emu thread]
//!                                   PixelSource::step ─► CaptureController
//!                                   FramePacer (sleep)
//!                 ◄──LoopEvent────
//! ```
//!
//! The thread owns the source and the controller, so every GIF writer call
//! happens on it. Other threads only talk to it through the command channel.
//! Commands are drained once per tick; events are sent with `try_send` and
//! dropped when the receiver falls behind. EEPROM is loaded into the source
//! before the first tick and saved after the last.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use arbycap_core::{Button, CaptureKind, LedState};
use arbycap_gif::Storage;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::controller::{CaptureController, ShotOutcome};
use crate::eeprom::EepromFile;
use crate::pacer::{FpsCounter, FramePacer};
use crate::source::PixelSource;

const COMMAND_QUEUE: usize = 64;
const EVENT_QUEUE: usize = 64;
const STATUS_INTERVAL: Duration = Duration::from_secs(1);

// ── Messages ──────────────────────────────────────────────────────────────────

/// Requests to the loop thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopCommand {
    RequestOneShot,
    StartCapturing,
    StopCapturing,
    SetFps(u32),
    Button(Button, bool),
    Stop,
}

/// Reports from the loop thread.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopEvent {
    CaptureStarted,
    CaptureSaved { path: PathBuf, kind: CaptureKind },
    CaptureFailed { kind: CaptureKind },
    /// Sent about once a second.
    Status { fps: f32, frames: u64 },
    /// LED state after a tick, sent when it differs from the previous tick.
    Leds(LedState),
    /// The source stopped producing frames.
    Halted,
}

// ── EmulationLoop ─────────────────────────────────────────────────────────────

pub struct EmulationLoop<P, S: Storage> {
    source: P,
    controller: CaptureController<S>,
    pacer: FramePacer,
    eeprom: Option<EepromFile>,
    commands: mpsc::Receiver<LoopCommand>,
    events: mpsc::Sender<LoopEvent>,
    stop: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
}

impl<P, S> EmulationLoop<P, S>
where
    P: PixelSource + 'static,
    S: Storage + Send + 'static,
    S::Sink: Send,
{
    /// Starts the loop on its own thread at `fps` frames per second.
    ///
    /// Returns the handle used to drive it and the event receiver.
    pub fn spawn(
        source: P,
        controller: CaptureController<S>,
        fps: u32,
    ) -> io::Result<(EmulationHandle, mpsc::Receiver<LoopEvent>)> {
        Self::spawn_with_eeprom(source, controller, fps, None)
    }

    /// Like [`spawn`](Self::spawn), with the source's persistent memory kept
    /// in `eeprom` across runs.
    pub fn spawn_with_eeprom(
        source: P,
        controller: CaptureController<S>,
        fps: u32,
        eeprom: Option<EepromFile>,
    ) -> io::Result<(EmulationHandle, mpsc::Receiver<LoopEvent>)> {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
        let stop = Arc::new(AtomicBool::new(false));
        let frames = Arc::new(AtomicU64::new(0));

        let emu = Self {
            source,
            controller,
            pacer: FramePacer::new(fps, Instant::now()),
            eeprom,
            commands: cmd_rx,
            events: event_tx,
            stop: Arc::clone(&stop),
            frames: Arc::clone(&frames),
        };
        let thread = thread::Builder::new()
            .name("arbycap-emu".to_owned())
            .spawn(move || emu.run())?;

        let handle = EmulationHandle { commands: cmd_tx, stop, frames, thread: Some(thread) };
        Ok((handle, event_rx))
    }

    fn run(mut self) {
        let resolution = self.source.resolution();
        let mut pixels = vec![0; resolution.total_pixels()];
        let mut fps_counter = FpsCounter::new();
        let mut last_status = Instant::now();
        let mut last_leds = None;
        if let Some(file) = &self.eeprom {
            self.source.set_eeprom(&file.load());
        }
        info!("Emulation loop started ({} @ {} fps)", resolution, self.pacer.fps());

        while !self.stop.load(Ordering::Relaxed) {
            if !self.drain_commands() {
                break;
            }

            if !self.source.step(&mut pixels) {
                info!("Source halted after {} frames", self.frames.load(Ordering::Relaxed));
                self.emit(LoopEvent::Halted);
                break;
            }

            let leds = self.source.leds();
            if last_leds != Some(leds) {
                last_leds = Some(leds);
                self.emit(LoopEvent::Leds(leds));
            }

            let outcome = self.controller.on_frame_produced(&pixels);
            match outcome.shot {
                Some(ShotOutcome::Saved(path)) => {
                    self.emit(LoopEvent::CaptureSaved { path, kind: CaptureKind::Shot })
                }
                Some(ShotOutcome::Failed) => {
                    self.emit(LoopEvent::CaptureFailed { kind: CaptureKind::Shot })
                }
                None => {}
            }
            if outcome.recorded == Some(false) {
                debug!("Frame {} missing from movie", self.frames.load(Ordering::Relaxed));
            }

            self.frames.fetch_add(1, Ordering::Relaxed);
            fps_counter.tick();
            if last_status.elapsed() >= STATUS_INTERVAL {
                last_status = Instant::now();
                self.emit(LoopEvent::Status {
                    fps: fps_counter.fps(),
                    frames: self.frames.load(Ordering::Relaxed),
                });
            }

            if let Some(delay) = self.pacer.delay_after_frame(Instant::now()) {
                thread::sleep(delay);
            }
        }

        // Never leave the work file behind.
        if self.controller.is_capturing() {
            self.stop_capturing();
        }
        if let (Some(file), Some(data)) = (&self.eeprom, self.source.eeprom()) {
            if let Err(e) = file.save(&data) {
                warn!("Cannot save EEPROM to {}: {}", file.path().display(), e);
            }
        }
        info!("Emulation loop stopped");
    }

    /// Applies queued commands. False once the loop should exit.
    fn drain_commands(&mut self) -> bool {
        loop {
            let cmd = match self.commands.try_recv() {
                Ok(cmd) => cmd,
                Err(mpsc::error::TryRecvError::Empty) => return true,
                Err(mpsc::error::TryRecvError::Disconnected) => return false,
            };
            debug!("Loop command: {:?}", cmd);
            match cmd {
                LoopCommand::RequestOneShot => self.controller.request_one_shot(),
                LoopCommand::StartCapturing => {
                    if self.controller.is_capturing() {
                        warn!("Already capturing");
                    } else if self.controller.start_capturing() {
                        info!("Capture started");
                        self.emit(LoopEvent::CaptureStarted);
                    } else {
                        self.emit(LoopEvent::CaptureFailed { kind: CaptureKind::Movie });
                    }
                }
                LoopCommand::StopCapturing => {
                    if self.controller.is_capturing() {
                        self.stop_capturing();
                    }
                }
                LoopCommand::SetFps(fps) => self.pacer.set_fps(fps),
                LoopCommand::Button(button, pressed) => self.source.set_button(button, pressed),
                LoopCommand::Stop => return false,
            }
        }
    }

    fn stop_capturing(&mut self) {
        let event = match self.controller.stop_capturing() {
            Some(path) => LoopEvent::CaptureSaved { path, kind: CaptureKind::Movie },
            None => LoopEvent::CaptureFailed { kind: CaptureKind::Movie },
        };
        self.emit(event);
    }

    fn emit(&self, event: LoopEvent) {
        if let Err(e) = self.events.try_send(event) {
            debug!("Loop event dropped: {}", e);
        }
    }
}

// ── EmulationHandle ───────────────────────────────────────────────────────────

/// Drives a running [`EmulationLoop`]. Dropping it stops and joins the thread.
pub struct EmulationHandle {
    commands: mpsc::Sender<LoopCommand>,
    stop: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl EmulationHandle {
    pub fn request_one_shot(&self) {
        self.send(LoopCommand::RequestOneShot);
    }

    pub fn start_capturing(&self) {
        self.send(LoopCommand::StartCapturing);
    }

    pub fn stop_capturing(&self) {
        self.send(LoopCommand::StopCapturing);
    }

    pub fn set_fps(&self, fps: u32) {
        self.send(LoopCommand::SetFps(fps));
    }

    pub fn press(&self, button: Button, pressed: bool) {
        self.send(LoopCommand::Button(button, pressed));
    }

    /// Total frames produced since the loop started.
    pub fn frames_produced(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Stops the loop and waits for the thread to exit. An open capture is
    /// finished first. Blocks; call from a blocking context.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn send(&self, cmd: LoopCommand) {
        if let Err(e) = self.commands.try_send(cmd) {
            warn!("Loop command not delivered: {}", e);
        }
    }

    fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        // Commands queued before this point are still applied.
        if self.commands.try_send(LoopCommand::Stop).is_err() {
            self.stop.store(true, Ordering::Relaxed);
        }
        if thread.join().is_err() {
            warn!("Emulation thread panicked");
        }
    }
}

impl Drop for EmulationHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
