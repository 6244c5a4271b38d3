// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Prefix varint and zig-zag numeric codecs.
//!
//! Unsigned values are packed with the byte count encoded in the low bits of
//! the first byte: a value occupying `k` bytes starts with `k - 1` zero bits
//! followed by a one bit, with the magnitude shifted above the marker. A
//! decoder counts trailing zero bits of the first byte to recover `k`, then
//! right-shifts the little-endian load by `k`. This trades a little bit
//! manipulation for avoiding a per-byte continuation branch and is the
//! dominant hot path of the engine.
//!
//! Signed values zig-zag map to unsigned first (`(v << 1) ^ (v >> 63)`),
//! interleaving small negatives with small positives so both stay short.

/// Largest encoded length: a full 64-bit value needs `ceil(64 / 7)` bytes.
pub const MAX_VARINT_LEN: usize = 10;

/// Encode `value` into `out`, returning the number of bytes used (1..=10).
#[inline]
pub fn encode_u64(value: u64, out: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    let len = core::cmp::max(1, (bits + 6) / 7);
    // Marker bit sits at position len - 1; payload starts at bit len.
    let raw: u128 = (u128::from(value) << len) | (1u128 << (len - 1));
    let le = raw.to_le_bytes();
    out[..len].copy_from_slice(&le[..len]);
    len
}

/// Number of bytes an encoded value will occupy, given its first byte.
///
/// A zero first byte means the marker lives in the second byte (lengths 9
/// and 10); `second` is only inspected in that case. Returns `None` for the
/// impossible all-zero prefix.
#[inline]
pub fn encoded_len(first: u8, second: u8) -> Option<usize> {
    if first != 0 {
        Some(first.trailing_zeros() as usize + 1)
    } else if second != 0 {
        let len = 8 + second.trailing_zeros() as usize + 1;
        (len <= MAX_VARINT_LEN).then_some(len)
    } else {
        None
    }
}

/// Decode a value from exactly `len` little-endian bytes (as computed by
/// [`encoded_len`]). Returns `None` if the payload overflows 64 bits.
#[inline]
pub fn decode_u64(bytes: &[u8], len: usize) -> Option<u64> {
    debug_assert!(len >= 1 && len <= MAX_VARINT_LEN && bytes.len() >= len);
    let mut le = [0u8; 16];
    le[..len].copy_from_slice(&bytes[..len]);
    let shifted = u128::from_le_bytes(le) >> len;
    u64::try_from(shifted).ok()
}

#[inline]
pub fn zigzag_i64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub fn unzigzag_i64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

#[inline]
pub fn zigzag_i32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

#[inline]
pub fn unzigzag_i32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: u64) -> (u64, usize) {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let len = encode_u64(value, &mut buf);
        let second = if len > 1 { buf[1] } else { 0 };
        let decoded_len = encoded_len(buf[0], second).expect("valid prefix");
        assert_eq!(decoded_len, len);
        (decode_u64(&buf, len).expect("in range"), len)
    }

    #[test]
    fn test_varint_small_values_single_byte() {
        for v in 0..128u64 {
            let (back, len) = roundtrip(v);
            assert_eq!(back, v);
            assert_eq!(len, 1);
        }
    }

    #[test]
    fn test_varint_byte_count_boundaries() {
        // Each (value, expected length) pair straddles a 7-bit boundary.
        let cases: &[(u64, usize)] = &[
            (0, 1),
            (1, 1),
            (127, 1),
            (128, 2),
            (16_383, 2),
            (16_384, 3),
            (2_097_151, 3),
            (2_097_152, 4),
            (268_435_455, 4),
            (268_435_456, 5),
            (u64::from(u32::MAX), 5),
            (1 << 35, 6),
            (1 << 42, 7),
            (1 << 49, 8),
            (1 << 56, 9),
            ((1 << 63) - 1, 9),
            (1 << 63, 10),
            (u64::MAX, 10),
        ];
        for &(value, expected_len) in cases {
            let (back, len) = roundtrip(value);
            assert_eq!(back, value, "value {:#x}", value);
            assert_eq!(len, expected_len, "value {:#x}", value);
        }
    }

    #[test]
    fn test_varint_exhaustive_u16_range() {
        for v in 0..=u16::MAX {
            let (back, _) = roundtrip(u64::from(v));
            assert_eq!(back, u64::from(v));
        }
    }

    #[test]
    fn test_varint_statistical_u64() {
        for _ in 0..20_000 {
            let v = fastrand::u64(..);
            let (back, _) = roundtrip(v);
            assert_eq!(back, v);
        }
        // Bias toward each length bucket as well.
        for shift in 0..64 {
            let v = fastrand::u64(..) >> shift;
            let (back, _) = roundtrip(v);
            assert_eq!(back, v);
        }
    }

    #[test]
    fn test_varint_rejects_all_zero_prefix() {
        assert_eq!(encoded_len(0, 0), None);
    }

    #[test]
    fn test_zigzag_sign_recovery() {
        let cases: &[i64] = &[0, 1, -1, 63, -64, 64, i64::MIN, i64::MAX];
        for &v in cases {
            assert_eq!(unzigzag_i64(zigzag_i64(v)), v);
        }
        // Small magnitudes map to small codes regardless of sign.
        assert_eq!(zigzag_i64(0), 0);
        assert_eq!(zigzag_i64(-1), 1);
        assert_eq!(zigzag_i64(1), 2);
        assert_eq!(zigzag_i64(-2), 3);
    }

    #[test]
    fn test_zigzag_i32_full_boundaries() {
        for &v in &[0i32, 1, -1, i32::MIN, i32::MAX] {
            assert_eq!(unzigzag_i32(zigzag_i32(v)), v);
        }
        for _ in 0..10_000 {
            let v = fastrand::i32(..);
            assert_eq!(unzigzag_i32(zigzag_i32(v)), v);
        }
    }
}
