//! Functions for reading and writing sub-fields of a binary field.
//!
//! A binary field is an unsigned integer holding one header slot (e.g. the
//! IPv4 `ver_hdrlen` byte). An attribute is a contiguous range of bits of that
//! integer, described by a mask and the shift of its lowest bit.
//!
//! ```
//! use ostinato_protocols::codec::{extract, inject};
//!
//! // Version in the high nibble, header length in the low nibble.
//! let raw = inject(0, 4, 0xf0, 4);
//! let raw = inject(raw, 5, 0x0f, 0);
//! assert_eq!(raw, 0x45);
//! assert_eq!(extract(raw, 0xf0, 4), 4);
//! ```

/// Return the bits of `raw` selected by `mask`, shifted down by `shift`.
pub fn extract(raw: u64, mask: u64, shift: u32) -> u64 {
    (raw & mask) >> shift
}

/// Write `value` at `shift` into the bits of `raw` selected by `mask`.
///
/// Bits outside of `mask` are preserved, and bits of the shifted value outside
/// of `mask` are dropped.
pub fn inject(raw: u64, value: u64, mask: u64, shift: u32) -> u64 {
    (raw & !mask) | (value.checked_shl(shift).unwrap_or(0) & mask)
}

/// Position of the lowest set bit of `mask` (0 for an empty mask).
pub const fn shift_of(mask: u64) -> u32 {
    if mask == 0 {
        0
    } else {
        mask.trailing_zeros()
    }
}

/// Largest value that fits in the bits of `mask`.
pub const fn max_value(mask: u64) -> u64 {
    mask >> shift_of(mask)
}

#[cfg(test)]
mod tests {
    use crate::codec::{extract, inject, max_value, shift_of};

    #[test]
    fn test_shift_of() {
        assert_eq!(shift_of(0), 0);
        assert_eq!(shift_of(0xff), 0);
        assert_eq!(shift_of(0xf0), 4);
        assert_eq!(shift_of(0x0e), 1);
        assert_eq!(shift_of(0xe000), 13);
        assert_eq!(shift_of(0xffff_ffff_ffff), 0);
    }

    #[test]
    fn test_max_value() {
        assert_eq!(max_value(0xf0), 15);
        assert_eq!(max_value(0x0e), 7);
        assert_eq!(max_value(0x1fff), 0x1fff);
        assert_eq!(max_value(0x04), 1);
    }

    #[test]
    fn test_inject_preserves_other_bits() {
        let raw = 0b1010_0101;
        assert_eq!(inject(raw, 0b1111, 0xf0, 4), 0b1111_0101);
        assert_eq!(inject(raw, 0, 0x0f, 0), 0b1010_0000);
    }

    #[test]
    fn test_inject_drops_overflow() {
        // 0x1f does not fit in a nibble: only the low four bits are kept.
        assert_eq!(inject(0, 0x1f, 0x0f, 0), 0x0f);
        assert_eq!(inject(0, 0x1f, 0xf0, 4), 0xf0);
        assert_eq!(inject(0x0f, 3, 0x30, 4), 0x3f);
    }

    #[test]
    fn test_inject_idempotent() {
        for raw in [0u64, 0x5a, 0xff, 0x1234] {
            for value in 0..16 {
                let once = inject(raw, value, 0x3c, 2);
                assert_eq!(inject(once, value, 0x3c, 2), once);
            }
        }
    }

    #[test]
    fn test_round_trip() {
        let masks = [(0xf0, 4), (0x0f, 0), (0x0e, 1), (0x1fff, 0), (0xe000, 13)];
        for (mask, shift) in masks {
            for raw in [0u64, 0xffff, 0xa5a5] {
                for value in 0..=max_value(mask) {
                    assert_eq!(extract(inject(raw, value, mask, shift), mask, shift), value);
                }
            }
        }
    }

    #[test]
    fn test_large_shift() {
        assert_eq!(inject(0, 1, 0, 64), 0);
        assert_eq!(extract(0xffff_ffff_ffff, 0xffff_ffff_ffff, 0), 0xffff_ffff_ffff);
    }
}
