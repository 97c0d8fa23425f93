//! GIF-flavoured LZW compression.
//!
//! Variable-width codes, LSB-first, packed into length-prefixed sub-blocks of
//! at most 254 bytes. The dictionary is an open-addressed hash table of
//! `(symbol, prefix)` pairs with a relatively-prime secondary probe, and is
//! cleared once all 4096 codes are taken.
//!
//! ```text
//! [init code size] [len] [len bytes] [len] [len bytes] ...
//!                  └──────── written by LzwEncoder ──────┘
//! ```
//!
//! The zero-length terminator that closes the data block belongs to the
//! caller.

use std::io::{self, Write};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Widest code the decoder has to handle.
pub const MAX_BITS: u32 = 12;
/// Dictionary capacity; no code at or above this value is ever assigned.
pub const MAX_CODES: u32 = 1 << MAX_BITS;
/// Hash table size (prime, ~80% occupancy at capacity).
pub const HASH_SIZE: usize = 5003;
/// Largest payload of one sub-block.
pub const MAX_SUB_BLOCK: usize = 254;

const EMPTY_SLOT: i32 = -1;

/// Shift that spreads symbols across the hash range: 8 minus the number of
/// doublings that take `HASH_SIZE` to 64 Ki.
const fn hash_shift() -> u32 {
    let mut shift = 0;
    let mut size = HASH_SIZE;
    while size < 65_536 {
        shift += 1;
        size *= 2;
    }
    8 - shift
}

const fn max_code(n_bits: u32) -> u32 {
    (1 << n_bits) - 1
}

// ── LzwEncoder ────────────────────────────────────────────────────────────────

/// One-shot LZW encoder for a single image's index stream.
///
/// Built fresh for every frame; [`LzwEncoder::encode`] consumes it so the
/// dictionary never outlives the frame it was built for.
pub struct LzwEncoder {
    init_code_size: u8,
    init_bits: u32,
    n_bits: u32,
    max_code: u32,
    clear_code: u32,
    eof_code: u32,
    free_entry: u32,
    clear_pending: bool,

    htab: Vec<i32>,
    codetab: Vec<u16>,

    bit_accum: u32,
    bit_count: u32,
    packet: Vec<u8>,
}

impl LzwEncoder {
    /// `color_depth` is the palette depth in bits; GIF requires a minimum
    /// code size of 2 even for 1-bit images.
    pub fn new(color_depth: u8) -> Self {
        let init_code_size = color_depth.clamp(2, 8);
        let init_bits = init_code_size as u32 + 1;
        let clear_code = 1 << init_code_size;
        Self {
            init_code_size,
            init_bits,
            n_bits: init_bits,
            max_code: max_code(init_bits),
            clear_code,
            eof_code: clear_code + 1,
            free_entry: clear_code + 2,
            clear_pending: false,
            htab: vec![EMPTY_SLOT; HASH_SIZE],
            codetab: vec![0; HASH_SIZE],
            bit_accum: 0,
            bit_count: 0,
            packet: Vec::with_capacity(MAX_SUB_BLOCK),
        }
    }

    /// Minimum code size byte written ahead of the sub-blocks.
    pub(crate) fn init_code_size(&self) -> u8 {
        self.init_code_size
    }

    /// Writes the code size byte and the packed sub-blocks for `indices`.
    ///
    /// Every index must be below `1 << init_code_size`.
    pub fn encode<W: Write>(mut self, indices: &[u8], out: &mut W) -> io::Result<()> {
        out.write_all(&[self.init_code_size])?;
        self.compress(indices, out)
    }

    fn compress<W: Write>(&mut self, indices: &[u8], out: &mut W) -> io::Result<()> {
        let shift = hash_shift();
        let mut symbols = indices.iter().map(|&s| s as u32);

        self.output(self.clear_code, out)?;

        let Some(mut ent) = symbols.next() else {
            return self.output(self.eof_code, out);
        };

        'symbols: for c in symbols {
            debug_assert!(c < self.clear_code, "index {c} out of palette range");
            let fcode = ((c << MAX_BITS) + ent) as i32;
            let mut i = ((c << shift) ^ ent) as usize;

            if self.htab[i] == fcode {
                ent = self.codetab[i] as u32;
                continue;
            }
            if self.htab[i] != EMPTY_SLOT {
                let disp = if i == 0 { 1 } else { HASH_SIZE - i };
                loop {
                    i = if i >= disp { i - disp } else { i + HASH_SIZE - disp };
                    if self.htab[i] == fcode {
                        ent = self.codetab[i] as u32;
                        continue 'symbols;
                    }
                    if self.htab[i] == EMPTY_SLOT {
                        break;
                    }
                }
            }

            self.output(ent, out)?;
            ent = c;
            if self.free_entry < MAX_CODES {
                self.codetab[i] = self.free_entry as u16;
                self.free_entry += 1;
                self.htab[i] = fcode;
            } else {
                self.clear_block(out)?;
            }
        }

        self.output(ent, out)?;
        self.output(self.eof_code, out)
    }

    /// Table full: forget every entry and tell the decoder to do the same.
    fn clear_block<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        self.htab.fill(EMPTY_SLOT);
        self.free_entry = self.clear_code + 2;
        self.clear_pending = true;
        self.output(self.clear_code, out)
    }

    /// Appends `code` at the current width, then adjusts the width for the
    /// next code.
    fn output<W: Write>(&mut self, code: u32, out: &mut W) -> io::Result<()> {
        self.bit_accum &= (1 << self.bit_count) - 1;
        self.bit_accum |= code << self.bit_count;
        self.bit_count += self.n_bits;

        while self.bit_count >= 8 {
            self.push_byte(self.bit_accum as u8, out)?;
            self.bit_accum >>= 8;
            self.bit_count -= 8;
        }

        if self.clear_pending {
            self.n_bits = self.init_bits;
            self.max_code = max_code(self.n_bits);
            self.clear_pending = false;
        } else if self.free_entry > self.max_code {
            self.n_bits += 1;
            self.max_code = if self.n_bits == MAX_BITS {
                MAX_CODES
            } else {
                max_code(self.n_bits)
            };
        }

        if code == self.eof_code {
            while self.bit_count > 0 {
                self.push_byte(self.bit_accum as u8, out)?;
                self.bit_accum >>= 8;
                self.bit_count = self.bit_count.saturating_sub(8);
            }
            self.flush_packet(out)?;
        }
        Ok(())
    }

    fn push_byte<W: Write>(&mut self, byte: u8, out: &mut W) -> io::Result<()> {
        self.packet.push(byte);
        if self.packet.len() >= MAX_SUB_BLOCK {
            self.flush_packet(out)?;
        }
        Ok(())
    }

    fn flush_packet<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if !self.packet.is_empty() {
            out.write_all(&[self.packet.len() as u8])?;
            out.write_all(&self.packet)?;
            self.packet.clear();
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Concatenates sub-block payloads, checking the length prefixes.
    fn unblock(data: &[u8]) -> Vec<u8> {
        let mut payload = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            let len = data[pos] as usize;
            assert!(len > 0, "unexpected terminator inside encoder output");
            assert!(len <= MAX_SUB_BLOCK, "sub-block of {} bytes", len);
            payload.extend_from_slice(&data[pos + 1..pos + 1 + len]);
            pos += 1 + len;
        }
        assert_eq!(pos, data.len(), "sub-block overran the stream");
        payload
    }

    fn encode(indices: &[u8], depth: u8) -> Vec<u8> {
        let mut out = Vec::new();
        LzwEncoder::new(depth).encode(indices, &mut out).unwrap();
        out
    }

    fn decode(encoded: &[u8]) -> Vec<u8> {
        let code_size = encoded[0];
        let payload = unblock(&encoded[1..]);
        weezl::decode::Decoder::new(weezl::BitOrder::Lsb, code_size)
            .decode(&payload)
            .expect("conforming LZW stream")
    }

    /// Deterministic pseudo-random bits (xorshift32).
    fn noise(len: usize, mut state: u32, modulo: u32) -> Vec<u8> {
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state % modulo) as u8
            })
            .collect()
    }

    #[test]
    fn hash_shift_matches_table_size() {
        assert_eq!(hash_shift(), 4);
    }

    #[test]
    fn minimum_code_size_is_two() {
        assert_eq!(LzwEncoder::new(1).init_code_size(), 2);
        assert_eq!(LzwEncoder::new(2).init_code_size(), 2);
        assert_eq!(LzwEncoder::new(8).init_code_size(), 8);
    }

    #[test]
    fn single_symbol_exact_bytes() {
        // clear(4), 0, eof(5) at 3 bits, LSB first: 0b1_0100_0100
        assert_eq!(encode(&[0], 1), vec![0x02, 0x02, 0x44, 0x01]);
    }

    #[test]
    fn empty_stream_is_clear_then_eof() {
        // clear(4), eof(5) at 3 bits: 100 101 → 0x2C
        assert_eq!(encode(&[], 1), vec![0x02, 0x01, 0x2C]);
    }

    #[test]
    fn uniform_frame_roundtrip() {
        for value in [0u8, 1] {
            let indices = vec![value; 128 * 64];
            let encoded = encode(&indices, 1);
            assert_eq!(decode(&encoded), indices);
        }
    }

    #[test]
    fn checkerboard_roundtrip() {
        let indices: Vec<u8> = (0..128 * 64).map(|i| ((i + i / 128) % 2) as u8).collect();
        assert_eq!(decode(&encode(&indices, 1)), indices);
    }

    #[test]
    fn dictionary_overflow_roundtrip() {
        // Enough incompressible input to fill the table several times.
        let indices = noise(200_000, 0x2545_F491, 2);
        let encoded = encode(&indices, 1);
        assert_eq!(decode(&encoded), indices);
    }

    #[test]
    fn eight_bit_roundtrip() {
        let indices = noise(50_000, 0x1234_5678, 256);
        assert_eq!(decode(&encode(&indices, 8)), indices);
    }

    #[test]
    fn sub_blocks_are_bounded() {
        let encoded = encode(&noise(20_000, 7, 2), 1);
        // unblock asserts every length prefix is within 1..=254
        let payload = unblock(&encoded[1..]);
        assert!(payload.len() > MAX_SUB_BLOCK);
    }
}
