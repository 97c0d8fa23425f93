//! Boundary to the emulator engine.
//!
//! The engine is opaque: it consumes button events, produces one W×H frame
//! per tick, exposes its LEDs and holds persistent memory (EEPROM). Setup and
//! teardown belong to whoever constructs the implementation (teardown on
//! drop).

use arbycap_core::{blank_eeprom, Argb, Button, LedState, Resolution, BLACK, WHITE};

/// Something that renders one frame per emulation tick.
pub trait PixelSource: Send {
    fn resolution(&self) -> Resolution;

    fn set_button(&mut self, button: Button, pressed: bool);

    /// Runs one logical frame and writes it into `pixels` (W×H, row-major).
    /// Returns `false` once the engine has halted.
    fn step(&mut self, pixels: &mut [Argb]) -> bool;

    fn leds(&self) -> LedState {
        LedState::default()
    }

    /// Replaces persistent memory. Called before the first tick.
    fn set_eeprom(&mut self, _data: &[u8]) {}

    /// Current persistent memory, read when the loop exits. `None` if the
    /// engine has none.
    fn eeprom(&self) -> Option<Vec<u8>> {
        None
    }
}

// ── PatternSource ─────────────────────────────────────────────────────────────

/// Deterministic stand-in for the engine: a checkerboard scrolling one pixel
/// per tick. Holding A inverts it; the RGB LED blinks red once a second at
/// 60 fps. EEPROM byte 0 counts frames, wrapping.
pub struct PatternSource {
    resolution: Resolution,
    tick: u64,
    buttons: [bool; 6],
    halt_after: Option<u64>,
    eeprom: Vec<u8>,
}

impl PatternSource {
    /// Checker cell edge in pixels.
    const CELL: usize = 8;

    pub fn new(resolution: Resolution) -> Self {
        Self { resolution, tick: 0, buttons: [false; 6], halt_after: None, eeprom: blank_eeprom() }
    }

    /// Stops producing frames after `frames` ticks.
    pub fn halt_after(mut self, frames: u64) -> Self {
        self.halt_after = Some(frames);
        self
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }
}

impl PixelSource for PatternSource {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn set_button(&mut self, button: Button, pressed: bool) {
        self.buttons[button.index()] = pressed;
    }

    fn step(&mut self, pixels: &mut [Argb]) -> bool {
        if self.halt_after.is_some_and(|limit| self.tick >= limit) {
            return false;
        }

        let width = self.resolution.width as usize;
        let offset = self.tick as usize;
        let inverted = self.buttons[Button::A.index()];
        for (i, px) in pixels.iter_mut().enumerate() {
            let (x, y) = (i % width, i / width);
            let lit = ((x + offset) / Self::CELL + y / Self::CELL) % 2 == 0;
            *px = if lit != inverted { WHITE } else { BLACK };
        }

        self.tick += 1;
        self.eeprom[0] = self.eeprom[0].wrapping_add(1);
        true
    }

    fn leds(&self) -> LedState {
        LedState { red: if self.tick % 60 < 30 { 0xFF } else { 0 }, ..Default::default() }
    }

    fn set_eeprom(&mut self, data: &[u8]) {
        let n = data.len().min(self.eeprom.len());
        self.eeprom[..n].copy_from_slice(&data[..n]);
    }

    fn eeprom(&self) -> Option<Vec<u8>> {
        Some(self.eeprom.clone())
    }
}
