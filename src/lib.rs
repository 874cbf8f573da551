//! # LC-3 Virtual Machine.
//!
//! `lc3-vm` runs machine-code images for the LC-3 system.
//! Images are loaded via [`emulator::Emulator::load_image_file`] and run until the HALT trap.
//!
//!  # Example
//! ```
//! use lc3_vm::cancellation::CancellationToken;
//! use lc3_vm::emulator::Emulator;
//! use lc3_vm::hardware::keyboard::ChannelInputProvider;
//! use std::sync::mpsc;
//!
//! let (_sender, receiver) = mpsc::channel();
//! let keyboard = Box::new(ChannelInputProvider::new(receiver));
//! let mut emu = Emulator::new(keyboard, CancellationToken::new());
//! // .ORIG x3000, ADD R1, R1, #7, HALT
//! emu.load_image_bytes(&[0x30, 0x00, 0x12, 0x67, 0xF0, 0x25]).unwrap();
//! let mut output = Vec::new();
//! emu.execute(&mut output).unwrap();
//! assert_eq!(emu.registers().get(1).as_decimal(), 7);
//! assert_eq!(output, b"\nHALT\n");
//! ```
//! # Errors
//! - Image is missing the origin word
//! - Illegal opcode fetched
//! - Execution interrupted

pub mod cancellation;
pub mod emulator;
pub mod errors;
pub mod hardware;
pub(crate) mod numbers;
pub mod terminal;
