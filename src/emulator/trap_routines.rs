//! The OS services reachable through the TRAP instruction.
use crate::errors::ExecutionError;
use crate::hardware::memory::{MEMORY_SIZE_U16, Memory};
use crate::hardware::registers::{Registers, from_binary};
use std::io;
use std::io::Write;
use std::ops::ControlFlow;

/// The trap vectors with a service routine.
#[repr(u8)]
#[derive(enumn::N, Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrapVector {
    Getc = 0x20,
    Out = 0x21,
    Puts = 0x22,
    In = 0x23,
    Putsp = 0x24,
    Halt = 0x25,
}

/// Runs the service routine for `vector`.
///
/// Vectors without a routine are ignored, apart from a warning.
pub fn dispatch(
    vector: u8,
    regs: &mut Registers,
    mem: &mut Memory,
    stdout: &mut impl Write,
) -> ControlFlow<Result<(), ExecutionError>> {
    let Some(trap) = TrapVector::n(vector) else {
        tracing::warn!("Ignoring unknown trap vector {vector:#04X}");
        return ControlFlow::Continue(());
    };
    tracing::debug!(?trap, "Trap");
    match trap {
        TrapVector::Getc => get_c(regs, mem),
        TrapVector::Out => out(regs, stdout),
        TrapVector::Puts => put_s(regs, mem, stdout),
        TrapVector::In => in_trap(regs, mem, stdout),
        TrapVector::Putsp => put_sp(regs, mem, stdout),
        TrapVector::Halt => halt(stdout),
    }
}

fn read_character_into_r0(regs: &mut Registers, mem: &mut Memory) -> io::Result<u8> {
    let c = mem.keyboard_mut().read_character()?;
    regs.set(0, from_binary(u16::from(c)));
    regs.update_conditional_register(0);
    Ok(c)
}

/// GETC (0x20): blocks for one key and puts it into R0 without echo.
pub fn get_c(regs: &mut Registers, mem: &mut Memory) -> ControlFlow<Result<(), ExecutionError>> {
    match read_character_into_r0(regs, mem) {
        Ok(_) => ControlFlow::Continue(()),
        Err(e) => wrap_io_error_in_cf(e),
    }
}

/// IN (0x23): GETC with a prompt before and an echo of the key after.
pub fn in_trap(
    regs: &mut Registers,
    mem: &mut Memory,
    stdout: &mut impl Write,
) -> ControlFlow<Result<(), ExecutionError>> {
    write_out(b"Enter a character: ", stdout)?;
    match read_character_into_r0(regs, mem) {
        Ok(c) => write_out(&[c], stdout),
        Err(e) => wrap_io_error_in_cf(e),
    }
}

/// OUT (0x21): the low byte of R0.
pub fn out(regs: &Registers, stdout: &mut impl Write) -> ControlFlow<Result<(), ExecutionError>> {
    write_out(&[low_byte(regs.get(0).as_binary())], stdout)
}

const fn low_byte(word: u16) -> u8 {
    word.to_le_bytes()[0]
}
const fn high_byte(word: u16) -> u8 {
    word.to_le_bytes()[1]
}

/// Words from the address in R0 on, up to the terminating zero word, wrapping at the end
/// of memory and visiting every address at most once.
fn zero_terminated_words(regs: &Registers, mem: &Memory) -> impl Iterator<Item = u16> {
    let start = regs.get(0).as_binary();
    (0..MEMORY_SIZE_U16)
        .scan(start, |address, _| {
            let word = mem[*address];
            *address = address.wrapping_add(1);
            Some(word)
        })
        .take_while(|word| *word != 0)
}

/// PUTS (0x22): one character per word, the low byte, starting at the address in R0.
pub fn put_s(
    regs: &Registers,
    mem: &Memory,
    stdout: &mut impl Write,
) -> ControlFlow<Result<(), ExecutionError>> {
    let s: Vec<u8> = zero_terminated_words(regs, mem).map(low_byte).collect();
    write_out(&s, stdout)
}

/// PUTSP (0x24): two characters per word, low byte first.
/// Output ends at the first zero byte, even in the middle of a word.
pub fn put_sp(
    regs: &Registers,
    mem: &Memory,
    stdout: &mut impl Write,
) -> ControlFlow<Result<(), ExecutionError>> {
    let s: Vec<u8> = zero_terminated_words(regs, mem)
        .flat_map(|word| [low_byte(word), high_byte(word)])
        .take_while(|b| *b != 0)
        .collect();
    write_out(&s, stdout)
}

/// HALT (0x25): prints the halt notice and stops the loop.
pub fn halt(stdout: &mut impl Write) -> ControlFlow<Result<(), ExecutionError>> {
    write_out(b"\nHALT\n", stdout)?;
    tracing::info!("Program halted");
    ControlFlow::Break(Ok(()))
}

fn write_out(data: &[u8], stdout: &mut impl Write) -> ControlFlow<Result<(), ExecutionError>> {
    match stdout.write_all(data).and_then(|()| stdout.flush()) {
        Ok(()) => ControlFlow::Continue(()),
        Err(e) => wrap_io_error_in_cf(e),
    }
}

fn wrap_io_error_in_cf(error: io::Error) -> ControlFlow<Result<(), ExecutionError>, ()> {
    ControlFlow::Break(Err(ExecutionError::from(error)))
}
