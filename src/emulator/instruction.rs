use crate::numbers;
use std::fmt::{Debug, Formatter};

/// A fetched instruction word, the opcode sits in bits 15 to 12.
/// The field accessors do not check that a field is meaningful for the opcode.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Instruction(u16);

impl Instruction {
    /// Bits `from..=to`, shifted down to bit 0.
    ///
    /// # Panics
    /// - in debug builds, when `to < from` or `to > 15`
    #[must_use]
    pub fn get_bit_range(self, from: u8, to: u8) -> u16 {
        debug_assert!(
            to >= from,
            "wrong direction of from: {from:?} and to: {to:?}"
        );
        debug_assert!(
            (00..u16::BITS).contains(&u32::from(to)),
            "index: {to:?} to u16 is greater than maximum value {:?}",
            u16::BITS - 1
        );
        let width = u32::from(to - from) + 1;
        (self.0 >> from) & (u16::MAX >> (u16::BITS - width))
    }
    /// Gives the value of a bit range of at most 8 bits.
    /// See [`Instruction::get_bit_range()`]
    #[must_use]
    pub fn get_bit_range_u8(self, from: u8, to: u8) -> u8 {
        debug_assert!(to - from < 8, "bit range too wide for u8");
        self.get_bit_range(from, to).to_le_bytes()[0]
    }
    #[must_use]
    pub fn get_bit(self, index: u8) -> bool {
        self.get_bit_range(index, index) & 1 != 0
    }
    #[must_use]
    pub fn op_code(self) -> u8 {
        self.get_bit_range_u8(12, 15)
    }
    /// DR for operates and loads, SR for stores.
    #[must_use]
    pub fn dr_number(self) -> u8 {
        self.get_bit_range_u8(9, 11)
    }
    #[must_use]
    pub fn sr1_number(self) -> u8 {
        self.get_bit_range_u8(6, 8)
    }
    #[must_use]
    pub fn base_r_number(self) -> u8 {
        self.get_bit_range_u8(6, 8)
    }
    #[must_use]
    pub fn sr2_number(self) -> u8 {
        self.get_bit_range_u8(0, 2)
    }
    #[must_use]
    pub fn is_immediate(self) -> bool {
        self.get_bit(5)
    }
    /// Sign extended `imm5`.
    #[must_use]
    pub fn get_immediate(self) -> u16 {
        numbers::sign_extend(self.get_bit_range(0, 4), 5)
    }
    /// The `nzp` bits of BR.
    #[must_use]
    pub fn condition_bits(self) -> u16 {
        self.get_bit_range(9, 11)
    }
    #[must_use]
    pub fn trap_vector(self) -> u8 {
        self.get_bit_range_u8(0, 7)
    }
    /// Offset of the lowest `len` bits, sign extended to 16 bits.
    /// Adding it with wrapping arithmetic subtracts negative offsets.
    #[must_use]
    pub fn pc_offset(self, len: u8) -> u16 {
        numbers::sign_extend(self.get_bit_range(0, len - 1), len)
    }
}

impl Debug for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Op: {:04b}, DR: {:03b}, PC_Off: {:09b}",
            self.op_code(),
            self.dr_number(),
            self.get_bit_range(0, 8)
        )
    }
}

impl From<u16> for Instruction {
    fn from(bits: u16) -> Self {
        Self(bits)
    }
}

#[expect(clippy::unusual_byte_groupings)]
#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;
    use yare::parameterized;

    #[parameterized(
        add_register = { 0x16C1, 0b0001, 3, 3, false, 1 },
        add_immediate = { 0x1E2E, 0b0001, 7, 0, true, 6 },
        and_register = { 0x5B87, 0b0101, 5, 6, false, 7 },
        not = { 0x947F, 0b1001, 2, 1, true, 7 },
    )]
    fn test_instr_operate_fields(
        raw: u16,
        op: u8,
        dr: u8,
        sr1: u8,
        immediate: bool,
        sr2: u8,
    ) {
        let sut = Instruction::from(raw);
        assert_eq!(sut.op_code(), op);
        assert_eq!(sut.dr_number(), dr);
        assert_eq!(sut.sr1_number(), sr1);
        assert_eq!(sut.is_immediate(), immediate);
        assert_eq!(sut.sr2_number(), sr2);
    }
    #[gtest]
    pub fn test_instr_immediate_is_sign_extended() {
        // ADD R7, R0, #14
        expect_that!(Instruction::from(0x1E2E).get_immediate(), eq(14));
        // ADD R7, R0, #-14
        expect_that!(Instruction::from(0x1E32).get_immediate(), eq(0xFFF2));
    }
    #[gtest]
    pub fn test_instr_full_width_range() {
        let sut = Instruction::from(0xBEEF);
        expect_that!(sut.get_bit_range(0, 15), eq(0xBEEF));
        expect_that!(sut.op_code(), eq(0xB));
    }
    #[gtest]
    pub fn test_instr_negative_offsets() {
        // BR nzp, PCoffset9: -1
        let sut = Instruction::from(0b0000_111_111111111);
        expect_that!(sut.condition_bits(), eq(0b111));
        expect_that!(sut.pc_offset(9), eq(0xFFFF));
        // JSR PCoffset11: -1024
        let sut = Instruction::from(0b0100_1_10000000000);
        expect_that!(sut.pc_offset(11), eq(0xFC00));
        // LDR offset6: -32
        let sut = Instruction::from(0b0110_010_110_100000);
        expect_that!(sut.base_r_number(), eq(6));
        expect_that!(sut.pc_offset(6), eq(0xFFE0));
    }
    #[gtest]
    pub fn test_instr_trap_vector() {
        let sut = Instruction::from(0xF025);
        expect_that!(sut.op_code(), eq(0xF));
        expect_that!(sut.trap_vector(), eq(0x25));
    }
    #[gtest]
    #[should_panic(expected = "wrong direction of from: 2 and to: 1")]
    pub fn test_instr_get_bit_range_wrong_order() {
        let sut = Instruction::from(0b1010_101_101010101);
        let _ = sut.get_bit_range(2, 1);
    }
    #[gtest]
    #[should_panic(expected = "index: 16 to u16 is greater than maximum value 15")]
    pub fn test_instr_get_bit_range_index_too_large() {
        let sut = Instruction::from(0b1010_101_101010101);
        let _ = sut.get_bit_range(2, 16);
    }
}
