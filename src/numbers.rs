use std::fmt::{Display, Formatter};

/// Shows a word as `0x` followed by four upper case hex digits, for log fields.
#[derive(Copy, Clone)]
pub struct Hex(pub u16);

impl Display for Hex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06X}", self.0)
    }
}

/// Implements sign extension as described at [Sign extension](https://en.wikipedia.org/wiki/Sign_extension).
///
/// Only the lowest `valid_bits` bits of `bits` are considered, higher bits are discarded first.
#[must_use]
pub const fn sign_extend(bits: u16, valid_bits: u8) -> u16 {
    debug_assert!(valid_bits > 0 && valid_bits <= 16, "valid_bits out of range");
    if valid_bits >= 16 {
        return bits;
    }
    let bits = bits & ((1 << valid_bits) - 1);
    if (bits >> (valid_bits - 1)) & 1 == 1 {
        // negative: 1-extend
        bits | (0xFFFF << valid_bits)
    } else {
        // positive, already 0-extended
        bits
    }
}

/// Interprets the 16 bits as a two's complement number.
#[must_use]
pub const fn twos_complement_to_decimal(bin_rep: u16) -> i16 {
    bin_rep.cast_signed()
}

#[expect(clippy::unusual_byte_groupings)]
#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;
    use yare::parameterized;

    #[gtest]
    fn test_hex_display() {
        expect_that!(Hex(0x3000).to_string(), eq("0x3000"));
        expect_that!(Hex(0xfe).to_string(), eq("0x00FE"));
    }

    #[parameterized(
        imm5_positive = { 0b0_1110, 5, 14 },
        imm5_negative = { 0b1_1110, 5, 0xFFFE },
        imm5_minus_one = { 0b1_1111, 5, 0xFFFF },
        offset6_min = { 0b10_0000, 6, 0xFFE0 },
        offset9_max = { 0b0_1111_1111, 9, 0x00FF },
        offset9_negative = { 0b1_1011_1100, 9, 0xFFBC },
        offset11_negative = { 0b100_0000_0000, 11, 0xFC00 },
        higher_bits_ignored = { 0b1111_0000_0001, 5, 1 },
        full_width = { 0x8001, 16, 0x8001 },
    )]
    fn test_sign_extend(bits: u16, valid_bits: u8, expected: u16) {
        assert_eq!(sign_extend(bits, valid_bits), expected);
    }

    #[gtest]
    fn test_sign_extend_fills_upper_bits_exactly_when_sign_bit_set() {
        for valid_bits in 1..16u8 {
            let upper_mask: u16 = 0xFFFF << valid_bits;
            for bits in [0u16, 1, 0x5555, 0xAAAA, 0x7FFF, 0xFFFF] {
                let truncated = bits & !upper_mask;
                let sign_set = (truncated >> (valid_bits - 1)) & 1 == 1;
                let res = sign_extend(bits, valid_bits);
                if sign_set {
                    expect_that!(res & upper_mask, eq(upper_mask));
                } else {
                    expect_that!(res, eq(truncated));
                }
                expect_that!(res & !upper_mask, eq(truncated));
            }
        }
    }

    #[gtest]
    fn test_twos_complement_to_decimal() {
        expect_that!(twos_complement_to_decimal(0), eq(0));
        expect_that!(twos_complement_to_decimal(0x7FFF), eq(i16::MAX));
        expect_that!(twos_complement_to_decimal(0x8000), eq(i16::MIN));
        expect_that!(twos_complement_to_decimal(0xFFF6), eq(-10));
    }
}
