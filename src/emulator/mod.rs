//! The fetch-decode-execute engine and its public facade.
pub mod instruction;
pub mod opcodes;
#[cfg(test)]
pub(crate) mod test_helpers;
pub mod trap_routines;

use crate::cancellation::CancellationToken;
use crate::emulator::instruction::Instruction;
use crate::emulator::opcodes::Opcode;
use crate::errors::{ExecutionError, LoadProgramError};
use crate::hardware::keyboard::KeyboardInputProvider;
use crate::hardware::memory::{LoadedImage, Memory};
use crate::hardware::registers::Registers;
use crate::numbers::Hex;
use std::fmt::{Debug, Formatter};
use std::fs;
use std::io::Write;
use std::ops::ControlFlow;
use std::path::Path;

/// Number of executed instructions after which pending console events are processed,
/// so that cancellation is noticed in programs that never read the keyboard.
const KEYBOARD_REFRESH_INTERVAL: u64 = 1024;

/// The public facing emulator used to run LC-3 programs.
pub struct Emulator {
    pub(crate) registers: Registers,
    pub(crate) memory: Memory,
    cancellation: CancellationToken,
    running: bool,
    instructions_executed: u64,
}

impl Debug for Emulator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emulator")
            .field("registers", &self.registers)
            .field("memory", &self.memory)
            .field("running", &self.running)
            .field("instructions_executed", &self.instructions_executed)
            .finish_non_exhaustive()
    }
}

impl Emulator {
    /// Creates an emulator with zeroed memory and registers, PC at `0x3000`.
    /// Cancelling `cancellation` stops [`Emulator::execute`] before the next instruction.
    #[must_use]
    pub fn new(keyboard: Box<dyn KeyboardInputProvider>, cancellation: CancellationToken) -> Self {
        Self {
            registers: Registers::new(),
            memory: Memory::new(keyboard),
            cancellation,
            running: false,
            instructions_executed: 0,
        }
    }

    /// Loads an image file, see [`Memory::load_image`].
    ///
    /// # Errors
    /// - file cannot be read
    /// - image is missing the origin word
    pub fn load_image_file(&mut self, path: impl AsRef<Path>) -> Result<LoadedImage, LoadProgramError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| LoadProgramError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_image_bytes(&bytes)
    }

    /// Loads an image from memory, see [`Memory::load_image`].
    ///
    /// # Errors
    /// - image is missing the origin word
    pub fn load_image_bytes(&mut self, bytes: &[u8]) -> Result<LoadedImage, LoadProgramError> {
        self.memory.load_image(bytes)
    }

    #[must_use]
    pub const fn registers(&self) -> &Registers {
        &self.registers
    }
    pub const fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }
    #[must_use]
    pub const fn memory(&self) -> &Memory {
        &self.memory
    }
    pub const fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }
    /// True while [`Emulator::execute`] has not reached HALT or an error.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }
    #[must_use]
    pub const fn instructions_executed(&self) -> u64 {
        self.instructions_executed
    }
    /// Resets registers to their initial state, memory is kept.
    pub fn reset_registers(&mut self) {
        self.registers = Registers::new();
    }

    /// Executes instructions from the current PC until the HALT trap.
    ///
    /// # Errors
    /// - an illegal opcode was fetched
    /// - execution was cancelled
    /// - reading the keyboard or writing to `stdout` failed
    pub fn execute(&mut self, stdout: &mut impl Write) -> Result<(), ExecutionError> {
        self.running = true;
        let res = loop {
            if let ControlFlow::Break(res) = self.check_cancellation() {
                break res;
            }
            if let ControlFlow::Break(res) = self.step(stdout) {
                break res;
            }
        };
        self.running = false;
        res
    }

    fn check_cancellation(&mut self) -> ControlFlow<Result<(), ExecutionError>> {
        if self.instructions_executed % KEYBOARD_REFRESH_INTERVAL == 0
            && let Err(e) = self.memory.keyboard_mut().refresh()
        {
            return ControlFlow::Break(Err(e.into()));
        }
        if self.cancellation.is_cancelled() {
            tracing::info!("Execution cancelled");
            return ControlFlow::Break(Err(ExecutionError::Interrupted));
        }
        ControlFlow::Continue(())
    }

    /// Fetches, decodes and executes exactly one instruction.
    ///
    /// `Break(Ok(()))` signals HALT, `Break(Err(_))` a fatal error.
    pub fn step(&mut self, stdout: &mut impl Write) -> ControlFlow<Result<(), ExecutionError>> {
        let address = self.registers.pc().as_binary();
        let i = match self.memory.read(address) {
            Ok(bits) => Instruction::from(bits),
            Err(e) => return ControlFlow::Break(Err(e.into())),
        };
        self.registers.fetch_increment_pc();
        self.instructions_executed += 1;
        tracing::trace!(address = %Hex(address), instruction = ?i);

        let r = &mut self.registers;
        let mem = &mut self.memory;
        let io_result = match Opcode::n(i.op_code()) {
            Some(Opcode::Add) => {
                opcodes::add(i, r);
                Ok(())
            }
            Some(Opcode::And) => {
                opcodes::and(i, r);
                Ok(())
            }
            Some(Opcode::Not) => {
                opcodes::not(i, r);
                Ok(())
            }
            Some(Opcode::Br) => {
                opcodes::br(i, r);
                Ok(())
            }
            Some(Opcode::JmpOrRet) => {
                opcodes::jmp_or_ret(i, r);
                Ok(())
            }
            Some(Opcode::Jsr) => {
                opcodes::jsr(i, r);
                Ok(())
            }
            Some(Opcode::Ld) => opcodes::ld(i, r, mem),
            Some(Opcode::Ldi) => opcodes::ldi(i, r, mem),
            Some(Opcode::Ldr) => opcodes::ldr(i, r, mem),
            Some(Opcode::Lea) => {
                opcodes::lea(i, r);
                Ok(())
            }
            Some(Opcode::St) => {
                opcodes::st(i, r, mem);
                Ok(())
            }
            Some(Opcode::Sti) => opcodes::sti(i, r, mem),
            Some(Opcode::Str) => {
                opcodes::str(i, r, mem);
                Ok(())
            }
            Some(Opcode::Trap) => {
                r.set(7, r.pc());
                return trap_routines::dispatch(i.trap_vector(), r, mem, stdout);
            }
            Some(Opcode::Rti | Opcode::Reserved) | None => {
                tracing::error!(address = %Hex(address), instruction = ?i, "Illegal opcode");
                return ControlFlow::Break(Err(ExecutionError::IllegalOpcode {
                    opcode: i.op_code(),
                    address,
                }));
            }
        };
        match io_result {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) => ControlFlow::Break(Err(e.into())),
        }
    }
}
