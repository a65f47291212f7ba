//! 16-bit word primitives.
//!
//! Every memory cell, register and instruction is a [`Word`]. Arithmetic on
//! words always wraps modulo 2^16; helpers here extract the fixed-position
//! instruction fields and widen signed immediates.

/// The machine's universal 16-bit unit.
pub type Word = u16;

/// Mask with the low `bit_count` bits set.
#[inline]
pub const fn low_mask(bit_count: u32) -> Word {
    if bit_count >= 16 {
        0xFFFF
    } else {
        (1 << bit_count) - 1
    }
}

/// Extract bits `hi..=lo` of `word`, shifted down to bit 0.
#[inline]
pub const fn field(word: Word, hi: u32, lo: u32) -> Word {
    (word >> lo) & low_mask(hi - lo + 1)
}

/// Extract a single bit as a flag.
#[inline]
pub const fn bit(word: Word, index: u32) -> bool {
    (word >> index) & 1 == 1
}

/// Widen the low `bit_count` bits of `bits` to a 16-bit two's-complement value.
///
/// If bit `bit_count - 1` is set the upper bits are filled with ones,
/// otherwise the value is returned as-is. Bits above `bit_count` in the
/// input are ignored.
///
/// ```
/// use lc3::word::sign_extend;
/// assert_eq!(sign_extend(0b11101, 5), 0xFFFD); // -3
/// assert_eq!(sign_extend(0b01101, 5), 13);
/// ```
#[inline]
pub const fn sign_extend(bits: Word, bit_count: u32) -> Word {
    let bits = bits & low_mask(bit_count);
    if bit_count == 0 || bit_count >= 16 {
        return bits;
    }
    if (bits >> (bit_count - 1)) & 1 == 1 {
        bits | (0xFFFF << bit_count)
    } else {
        bits
    }
}

/// Interpret a word as a signed two's-complement value.
#[inline]
pub const fn as_signed(word: Word) -> i16 {
    word as i16
}
