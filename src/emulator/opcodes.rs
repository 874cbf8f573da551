//! Instruction handlers, one function per opcode.
//!
//! Field layouts are written most significant bit first, `imm5`, `off6`, `off9` and `off11` are
//! two's complement and sign-extended before use. Handlers that produce a register value update
//! the condition flag from it.
use crate::emulator::instruction::Instruction;
use crate::hardware::memory::Memory;
use crate::hardware::registers::{Registers, from_binary};
use std::io;

/// The 16 values of the opcode field.
/// `Rti` and `Reserved` have no implementation, fetching them is fatal.
#[repr(u8)]
#[derive(enumn::N, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Opcode {
    Br = 0b0000,
    Add = 0b0001,
    Ld = 0b0010,
    St = 0b0011,
    Jsr = 0b0100,
    And = 0b0101,
    Ldr = 0b0110,
    Str = 0b0111,
    Rti = 0b1000,
    Not = 0b1001,
    Ldi = 0b1010,
    Sti = 0b1011,
    JmpOrRet = 0b1100,
    Reserved = 0b1101,
    Lea = 0b1110,
    Trap = 0b1111,
}

/// Stores `value` in DR and sets the condition flag from it.
fn set_dr(i: Instruction, r: &mut Registers, value: u16) {
    let dr = i.dr_number();
    r.set(dr, from_binary(value));
    r.update_conditional_register(dr);
}

/// Second ALU operand: `imm5` when bit 5 is set, otherwise SR2.
fn alu_operand(i: Instruction, r: &Registers) -> u16 {
    if i.is_immediate() {
        i.get_immediate()
    } else {
        r.get(i.sr2_number()).as_binary()
    }
}

/// PC (already incremented) plus `off9`.
fn pc_relative(i: Instruction, r: &Registers) -> u16 {
    r.pc().as_binary().wrapping_add(i.pc_offset(9))
}

/// BaseR plus `off6`.
fn base_relative(i: Instruction, r: &Registers) -> u16 {
    r.get(i.base_r_number())
        .as_binary()
        .wrapping_add(i.pc_offset(6))
}

/// ADD, `0001 DR SR1 0 00 SR2` or `0001 DR SR1 1 imm5`.
/// The sum wraps modulo 2^16.
pub fn add(i: Instruction, r: &mut Registers) {
    let sum = r
        .get(i.sr1_number())
        .as_binary()
        .wrapping_add(alu_operand(i, r));
    set_dr(i, r, sum);
}

/// AND, `0101 DR SR1 0 00 SR2` or `0101 DR SR1 1 imm5`.
pub fn and(i: Instruction, r: &mut Registers) {
    let bits = r.get(i.sr1_number()).as_binary() & alu_operand(i, r);
    set_dr(i, r, bits);
}

/// NOT, `1001 DR SR1 111111`.
pub fn not(i: Instruction, r: &mut Registers) {
    let complement = !r.get(i.sr1_number()).as_binary();
    set_dr(i, r, complement);
}

/// BR, `0000 n z p off9`.
///
/// Branches when one of the selected bits matches the current
/// [`ConditionFlag`](crate::hardware::registers::ConditionFlag). `nzp = 000` never branches.
pub fn br(i: Instruction, r: &mut Registers) {
    let selected = i.condition_bits();
    if selected & r.get_conditional_register().bits() != 0 {
        let target = pc_relative(i, r);
        r.set_pc(target);
    }
}

/// JSR `0100 1 off11` or JSRR `0100 0 00 BaseR 000000`.
///
/// The return address ends up in R7. The JSRR target is read first, so `JSRR R7` jumps to
/// the previous content of R7.
pub fn jsr(i: Instruction, r: &mut Registers) {
    let return_address = r.pc();
    let target = if i.get_bit(11) {
        return_address.as_binary().wrapping_add(i.pc_offset(11))
    } else {
        r.get(i.base_r_number()).as_binary()
    };
    r.set_pc(target);
    r.set(7, return_address);
}

/// JMP `1100 000 BaseR 000000`, RET is the `BaseR = 7` form.
pub fn jmp_or_ret(i: Instruction, r: &mut Registers) {
    let target = r.get(i.base_r_number()).as_binary();
    r.set_pc(target);
}

/// LD, `0010 DR off9`.
/// # Errors
/// - polling the keyboard failed
pub fn ld(i: Instruction, r: &mut Registers, memory: &mut Memory) -> io::Result<()> {
    let value = memory.read(pc_relative(i, r))?;
    set_dr(i, r, value);
    Ok(())
}

/// LDI, `1010 DR off9`. The word at PC + `off9` is the address of the value.
/// # Errors
/// - polling the keyboard failed
pub fn ldi(i: Instruction, r: &mut Registers, memory: &mut Memory) -> io::Result<()> {
    let pointer = memory.read(pc_relative(i, r))?;
    let value = memory.read(pointer)?;
    set_dr(i, r, value);
    Ok(())
}

/// LDR, `0110 DR BaseR off6`.
/// # Errors
/// - polling the keyboard failed
pub fn ldr(i: Instruction, r: &mut Registers, memory: &mut Memory) -> io::Result<()> {
    let value = memory.read(base_relative(i, r))?;
    set_dr(i, r, value);
    Ok(())
}

/// LEA, `1110 DR off9`. Only the address is computed, memory is not touched.
pub fn lea(i: Instruction, r: &mut Registers) {
    let address = pc_relative(i, r);
    set_dr(i, r, address);
}

/// ST, `0011 SR off9`.
pub fn st(i: Instruction, r: &Registers, memory: &mut Memory) {
    memory.write(pc_relative(i, r), r.get(i.dr_number()).as_binary());
}

/// STI, `1011 SR off9`. The word at PC + `off9` is the address written to.
/// # Errors
/// - polling the keyboard failed
pub fn sti(i: Instruction, r: &Registers, memory: &mut Memory) -> io::Result<()> {
    let pointer = memory.read(pc_relative(i, r))?;
    memory.write(pointer, r.get(i.dr_number()).as_binary());
    Ok(())
}

/// STR, `0111 SR BaseR off6`.
pub fn str(i: Instruction, r: &Registers, memory: &mut Memory) {
    memory.write(base_relative(i, r), r.get(i.dr_number()).as_binary());
}
