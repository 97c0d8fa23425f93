use serde::{Deserialize, Serialize};

// MARK: - Resolution

/// Display resolution of the emulated handheld.
///
/// GIF stores canvas dimensions as 16-bit values, so the fields are `u16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u16,
    pub height: u16,
}

impl Resolution {
    /// 128×64 monochrome OLED.
    pub const ARDUBOY: Self = Self { width: 128, height: 64 };

    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Number of pixels in one frame (W×H).
    pub fn total_pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::ARDUBOY
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

// MARK: - Pixels

/// Packed `0xAARRGGBB` pixel as produced by the emulator. Alpha is ignored.
pub type Argb = u32;

/// Opaque black.
pub const BLACK: Argb = 0xFF00_0000;
/// Opaque white.
pub const WHITE: Argb = 0xFFFF_FFFF;

/// Packs an opaque pixel.
pub const fn rgb(r: u8, g: u8, b: u8) -> Argb {
    0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Splits a packed pixel into its red, green and blue channels.
pub const fn channels(pixel: Argb) -> (u8, u8, u8) {
    ((pixel >> 16) as u8, (pixel >> 8) as u8, pixel as u8)
}

// MARK: - Buttons

/// Handheld buttons, in the order the emulator engine indexes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
}

impl Button {
    pub const ALL: [Button; 6] = [
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::A,
        Button::B,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

// MARK: - EEPROM

/// Size of the handheld's persistent memory in bytes.
pub const EEPROM_SIZE: usize = 1024;

/// Erased EEPROM contents.
pub fn blank_eeprom() -> Vec<u8> {
    vec![0xFF; EEPROM_SIZE]
}

// MARK: - LedState

/// RGB LED plus the RX/TX activity LEDs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedState {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub rx: bool,
    pub tx: bool,
}

// MARK: - CaptureKind

/// What a finished capture file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureKind {
    /// Single still frame.
    Shot,
    /// Animated recording.
    Movie,
}

impl std::fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shot => write!(f, "shot"),
            Self::Movie => write!(f, "movie"),
        }
    }
}
