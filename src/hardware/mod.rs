//! The emulated hardware: register file, memory with its device registers and the keyboard.
pub mod keyboard;
pub mod memory;
pub mod registers;
