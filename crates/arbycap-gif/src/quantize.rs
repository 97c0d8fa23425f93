//! True-color → 1-bit palette mapping.

use arbycap_core::{channels, Argb};

/// Weights at or above this value map to white.
pub const WHITE_THRESHOLD: u32 = 512;

/// Integer luma weight `306·R + 601·G + 117·B`.
pub fn luma_weight(pixel: Argb) -> u32 {
    let (r, g, b) = channels(pixel);
    306 * r as u32 + 601 * g as u32 + 117 * b as u32
}

/// Palette index for a luma weight: 1 (white) at or above the threshold.
pub fn index_for_weight(weight: u32) -> u8 {
    u8::from(weight >= WHITE_THRESHOLD)
}

pub fn quantize(pixel: Argb) -> u8 {
    index_for_weight(luma_weight(pixel))
}

pub fn quantize_frame(pixels: &[Argb]) -> Vec<u8> {
    pixels.iter().map(|&px| quantize(px)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbycap_core::{rgb, BLACK, WHITE};

    #[test]
    fn threshold_boundary() {
        assert_eq!(index_for_weight(511), 0);
        assert_eq!(index_for_weight(512), 1);
        assert_eq!(index_for_weight(0), 0);
        assert_eq!(index_for_weight(u32::MAX), 1);
    }

    #[test]
    fn weights_channels() {
        assert_eq!(luma_weight(rgb(1, 0, 0)), 306);
        assert_eq!(luma_weight(rgb(0, 1, 0)), 601);
        assert_eq!(luma_weight(rgb(0, 0, 1)), 117);
        assert_eq!(luma_weight(rgb(255, 255, 255)), 1024 * 255);
    }

    #[test]
    fn dim_pixels_near_threshold() {
        // 306 + 117 = 423
        assert_eq!(quantize(rgb(1, 0, 1)), 0);
        // 4 * 117 = 468
        assert_eq!(quantize(rgb(0, 0, 4)), 0);
        // 306 + 2 * 117 = 540
        assert_eq!(quantize(rgb(1, 0, 2)), 1);
        // a single green step is already white
        assert_eq!(quantize(rgb(0, 1, 0)), 1);
    }

    #[test]
    fn alpha_is_ignored() {
        assert_eq!(quantize(0x0000_0000), 0);
        assert_eq!(quantize(0x00FF_FFFF), 1);
        assert_eq!(quantize(BLACK), 0);
        assert_eq!(quantize(WHITE), 1);
    }

    #[test]
    fn frame_keeps_order() {
        let frame = [BLACK, WHITE, WHITE, BLACK, rgb(0, 0, 5)];
        assert_eq!(quantize_frame(&frame), vec![0, 1, 1, 0, 1]);
    }
}
