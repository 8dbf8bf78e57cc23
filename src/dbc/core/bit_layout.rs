//! Bit positions of DBC signals inside a payload.
//!
//! Intel (little-endian) signals count bits linearly through the byte array.
//! Motorola (big-endian) signals follow the DBC "sawtooth": the start bit is the
//! MSB and the field continues towards bit 0 of the same byte, then into bit 7
//! of the next byte. [`flip_bit_pos`] maps between the two numberings.

use crate::dbc::types::{errors::LayoutError, signal::Endianness};

/// Bytes reachable by a `u16` bit index; no signal can touch a byte past this.
pub const MAX_ADDRESSABLE_BYTES: usize = (u16::MAX as usize + 1) / 8;

/// Mirrors a bit position inside its byte: `8 * (b / 8) + 7 - b % 8`.
#[inline]
pub fn flip_bit_pos(bit: u16) -> u16 {
    8 * (bit / 8) + 7 - bit % 8
}

/// Absolute index of the `i`-th bit of a signal (0 = most significant bit of the field).
#[inline]
pub fn bit_index(start_bit: u16, i: u16, endian: Endianness) -> u16 {
    match endian {
        Endianness::Intel => start_bit.saturating_add(i),
        Endianness::Motorola => flip_bit_pos(flip_bit_pos(start_bit).saturating_add(i)),
    }
}

/// Returns `(msb, lsb)` for a signal layout.
pub fn msb_lsb(start_bit: u16, size: u16, endian: Endianness) -> (u16, u16) {
    let end_bit: u16 = bit_index(start_bit, size.saturating_sub(1), endian);
    match endian {
        Endianness::Intel => (end_bit, start_bit),
        Endianness::Motorola => (start_bit, end_bit),
    }
}

#[inline]
fn low_mask(bits: u16) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Extracts the unsigned raw value of a field spanning `lsb..=msb`.
///
/// Walks from the byte holding the MSB towards the byte holding the LSB,
/// shifting the accumulated value left as bytes are consumed. Returns `0` when
/// `data` is too short to contain the MSB byte. Sign handling is left to the caller.
pub fn decode_raw(data: &[u8], msb: u16, lsb: u16, size: u16, endian: Endianness) -> u64 {
    let msb_byte: usize = (msb / 8) as usize;
    if msb_byte >= data.len() {
        return 0;
    }
    let lsb_byte: usize = (lsb / 8) as usize;

    if msb_byte == lsb_byte {
        return (data[msb_byte] as u64 >> (lsb & 7)) & low_mask(size);
    }

    let step: isize = match endian {
        Endianness::Intel => -1,
        Endianness::Motorola => 1,
    };
    let mut val: u64 = 0;
    let mut bits: i32 = size as i32;
    let mut i: isize = msb_byte as isize;
    while i >= 0 && (i as usize) < data.len() && bits > 0 {
        let idx: usize = i as usize;
        let cur_msb: u16 = if idx == msb_byte { msb & 7 } else { 7 };
        let cur_lsb: u16 = if idx == lsb_byte { lsb & 7 } else { 0 };
        let nbits: u16 = cur_msb - cur_lsb + 1;
        let chunk: u64 = (data[idx] as u64 >> cur_lsb) & low_mask(nbits);
        val = (val << nbits) | chunk;
        bits -= nbits as i32;
        i += step;
    }
    val
}

/// Writes the low `size` bits of `raw` into the field spanning `lsb..=msb`.
///
/// Inverse of [`decode_raw`]; bits outside the field are left untouched.
/// Returns `false` (and writes nothing) when `data` cannot hold the whole field.
pub fn encode_raw(data: &mut [u8], msb: u16, lsb: u16, size: u16, endian: Endianness, raw: u64) -> bool {
    let msb_byte: usize = (msb / 8) as usize;
    let lsb_byte: usize = (lsb / 8) as usize;
    if msb_byte >= data.len() || lsb_byte >= data.len() || size == 0 {
        return false;
    }

    let step: isize = match endian {
        Endianness::Intel => -1,
        Endianness::Motorola => 1,
    };
    let mut remaining: u16 = size;
    let mut i: isize = msb_byte as isize;
    while i >= 0 && (i as usize) < data.len() && remaining > 0 {
        let idx: usize = i as usize;
        let cur_msb: u16 = if idx == msb_byte { msb & 7 } else { 7 };
        let cur_lsb: u16 = if idx == lsb_byte { lsb & 7 } else { 0 };
        let nbits: u16 = (cur_msb - cur_lsb + 1).min(remaining);
        let shift: u32 = (remaining - nbits) as u32;
        let chunk: u8 = (raw.checked_shr(shift).unwrap_or(0) & low_mask(nbits)) as u8;
        let field: u8 = (low_mask(nbits) as u8) << cur_lsb;
        data[idx] = (data[idx] & !field) | (chunk << cur_lsb);
        remaining -= nbits;
        i += step;
    }
    true
}

/// Verify that (start_bit, size) fits within a payload of `bytes` bytes.
///
/// - Intel: the field occupies bits [start, start + len - 1] on a linear 0..(8*bytes-1) plane.
/// - Motorola: in the flipped (MSB-first) numbering the field occupies
///   [flip(start), flip(start) + len - 1].
pub fn check_signal_fits(
    bytes: u32,
    start_bit: u16,
    size: u16,
    endian: Endianness,
) -> Result<(), LayoutError> {
    if size == 0 {
        return Err(LayoutError::ZeroBitLength);
    }
    let total_bits: usize = bytes as usize * 8;

    match endian {
        Endianness::Intel => {
            let end: usize = start_bit as usize + size as usize - 1;
            if end < total_bits {
                Ok(())
            } else {
                Err(LayoutError::IntelOutOfBounds {
                    end,
                    total_bits,
                    bytes,
                })
            }
        }
        Endianness::Motorola => {
            if start_bit as usize >= total_bits {
                return Err(LayoutError::MotorolaStartOutOfBounds {
                    start: start_bit as usize,
                    total_bits,
                    bytes,
                });
            }
            let flipped_end: usize = flip_bit_pos(start_bit) as usize + size as usize - 1;
            if flipped_end >= total_bits {
                return Err(LayoutError::MotorolaEndOutOfBounds {
                    end: flipped_end,
                    total_bits,
                    bytes,
                });
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_is_involution() {
        for b in 0u16..512 {
            assert_eq!(flip_bit_pos(flip_bit_pos(b)), b);
        }
        assert_eq!(flip_bit_pos(0), 7);
        assert_eq!(flip_bit_pos(7), 0);
        assert_eq!(flip_bit_pos(8), 15);
    }

    #[test]
    fn test_msb_lsb_intel() {
        for start in 0u16..56 {
            for size in 1u16..=8 {
                let (msb, lsb) = msb_lsb(start, size, Endianness::Intel);
                assert_eq!(lsb, start);
                assert_eq!(msb, start + size - 1);
                assert_eq!(bit_index(start, 0, Endianness::Intel), start);
            }
        }
    }

    #[test]
    fn test_msb_lsb_motorola() {
        // 16-bit field starting at the MSB of byte 0 ends at bit 8 (LSB of byte 1)
        assert_eq!(msb_lsb(7, 16, Endianness::Motorola), (7, 8));
        // 12-bit field from bit 3: 4 bits in byte 0, 8 bits in byte 1
        assert_eq!(msb_lsb(3, 12, Endianness::Motorola), (3, 8));
        for start in 0u16..56 {
            let (msb, _) = msb_lsb(start, 4, Endianness::Motorola);
            assert_eq!(msb, start);
        }
    }

    #[test]
    fn test_decode_intel() {
        let data = [0x10, 0x00, 0, 0, 0, 0, 0, 0];
        assert_eq!(decode_raw(&data, 15, 0, 16, Endianness::Intel), 16);

        let data = [0x34, 0x12];
        assert_eq!(decode_raw(&data, 15, 0, 16, Endianness::Intel), 0x1234);

        // 4 bits straddling a byte boundary: bits 6..=9
        let data = [0b1100_0000, 0b0000_0010];
        assert_eq!(decode_raw(&data, 9, 6, 4, Endianness::Intel), 0b1011);
    }

    #[test]
    fn test_decode_motorola() {
        let data = [0x12, 0x34];
        assert_eq!(decode_raw(&data, 7, 8, 16, Endianness::Motorola), 0x1234);

        let data = [0x0A, 0xBC];
        assert_eq!(decode_raw(&data, 3, 8, 12, Endianness::Motorola), 0xABC);
    }

    #[test]
    fn test_decode_short_payload() {
        let data = [0xFF];
        assert_eq!(decode_raw(&data, 15, 8, 8, Endianness::Intel), 0);
        assert_eq!(decode_raw(&[], 7, 0, 8, Endianness::Intel), 0);
    }

    #[test]
    fn test_encode_preserves_neighbours() {
        let mut data = [0xFFu8; 2];
        assert!(encode_raw(&mut data, 9, 6, 4, Endianness::Intel, 0));
        assert_eq!(data, [0x3F, 0xFC]);

        let mut data = [0u8; 2];
        assert!(encode_raw(&mut data, 3, 8, 12, Endianness::Motorola, 0xABC));
        assert_eq!(data, [0x0A, 0xBC]);
        assert_eq!(decode_raw(&data, 3, 8, 12, Endianness::Motorola), 0xABC);
    }

    #[test]
    fn test_encode_rejects_short_payload() {
        let mut data = [0u8; 1];
        assert!(!encode_raw(&mut data, 15, 0, 16, Endianness::Intel, 0xFFFF));
        assert_eq!(data, [0]);
    }

    #[test]
    fn test_check_signal_fits() {
        assert!(check_signal_fits(8, 0, 64, Endianness::Intel).is_ok());
        assert!(matches!(
            check_signal_fits(8, 60, 8, Endianness::Intel),
            Err(LayoutError::IntelOutOfBounds { end: 67, .. })
        ));
        assert!(check_signal_fits(8, 7, 64, Endianness::Motorola).is_ok());
        assert!(matches!(
            check_signal_fits(1, 0, 2, Endianness::Motorola),
            Err(LayoutError::MotorolaEndOutOfBounds { .. })
        ));
        assert!(matches!(
            check_signal_fits(8, 0, 0, Endianness::Intel),
            Err(LayoutError::ZeroBitLength)
        ));
    }
}
