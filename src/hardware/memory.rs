//! Memory layout, by convention only:
//! - `0x0000..=0x00FF` trap vector table
//! - `0x0100..=0x01FF` interrupt vector table
//! - `0x0200..=0x2FFF` operating system and supervisor stack
//! - `0x3000..=0xFDFF` user programs
//! - `0xFE00..=0xFFFF` device registers
use crate::errors::LoadProgramError;
use crate::hardware::keyboard::KeyboardInputProvider;
use crate::numbers::Hex;
use std::fmt::{Debug, Formatter};
use std::io;
use std::ops::{Index, IndexMut};

pub const PROGRAM_SECTION_START: u16 = 0x3000;
/// Number of addressable `u16` words.
pub const MEMORY_SIZE_U16: usize = 1 << 16;

/// Memory regions mapped to IO functionality.
#[repr(u16)]
#[derive(enumn::N, Debug, Copy, Clone, PartialEq, Eq)]
pub enum MemoryMappedIOLocations {
    /// Keyboard Status Register, bit 15 is set while a key is ready
    Kbsr = 0xFE00,
    /// Keyboard Data Register, bits 7 to 0 hold the last typed character
    Kbdr = 0xFE02,
}

/// Origin and size of an image loaded by [`Memory::load_image`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    pub origin: u16,
    pub word_count: usize,
}

/// An abstraction for the LC-3 memory excluding registers.
///
/// Indexing accesses the stored words directly. [`Memory::read`] and [`Memory::write`] are
/// the accesses of running instructions, where reading the keyboard status register polls
/// the keyboard.
pub struct Memory {
    /// Index equals memory address
    data: Box<[u16]>,
    keyboard: Box<dyn KeyboardInputProvider>,
}

impl Debug for Memory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let used = self.data.iter().filter(|w| **w != 0).count();
        write!(
            f,
            "Memory {{ non-zero words: {used}, KBSR: {:#06X}, KBDR: {:#06X} }}",
            self[MemoryMappedIOLocations::Kbsr as u16],
            self[MemoryMappedIOLocations::Kbdr as u16]
        )
    }
}

impl Index<u16> for Memory {
    type Output = u16;
    fn index(&self, index: u16) -> &Self::Output {
        &self.data[usize::from(index)]
    }
}
impl IndexMut<u16> for Memory {
    fn index_mut(&mut self, index: u16) -> &mut Self::Output {
        &mut self.data[usize::from(index)]
    }
}

impl Memory {
    const KEYBOARD_STATUS_REGISTER_SET: u16 = 1 << 15;
    const KEYBOARD_STATUS_REGISTER_UNSET: u16 = 0;

    #[must_use]
    pub fn new(keyboard: Box<dyn KeyboardInputProvider>) -> Self {
        Self {
            data: vec![0x0u16; MEMORY_SIZE_U16].into_boxed_slice(),
            keyboard,
        }
    }

    /// Reads a word on behalf of an instruction.
    ///
    /// Every read of the keyboard status register polls the keyboard: a pending character sets
    /// the ready bit and lands in the keyboard data register, otherwise the status is cleared.
    ///
    /// # Errors
    /// - polling the keyboard failed
    pub fn read(&mut self, address: u16) -> io::Result<u16> {
        if MemoryMappedIOLocations::n(address) == Some(MemoryMappedIOLocations::Kbsr) {
            if let Some(c) = self.keyboard.poll_character()? {
                self[MemoryMappedIOLocations::Kbsr as u16] = Self::KEYBOARD_STATUS_REGISTER_SET;
                self[MemoryMappedIOLocations::Kbdr as u16] = u16::from(c);
            } else {
                self[MemoryMappedIOLocations::Kbsr as u16] = Self::KEYBOARD_STATUS_REGISTER_UNSET;
            }
        }
        Ok(self[address])
    }

    /// Writes a word on behalf of an instruction.
    /// Device registers are stored like ordinary memory.
    pub fn write(&mut self, address: u16, value: u16) {
        self[address] = value;
    }

    pub fn keyboard_mut(&mut self) -> &mut dyn KeyboardInputProvider {
        self.keyboard.as_mut()
    }

    /// Loads an image: the first big-endian word is the origin, all following big-endian words
    /// are stored from there on. Words that do not fit below the end of memory are dropped,
    /// a trailing odd byte is ignored.
    ///
    /// # Errors
    /// - Image is shorter than the origin word
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<LoadedImage, LoadProgramError> {
        let Some((header, rest)) = bytes.split_first_chunk::<2>() else {
            return Err(LoadProgramError::ProgramMissingOrigHeader);
        };
        let origin = u16::from_be_bytes(*header);
        let capacity = MEMORY_SIZE_U16 - usize::from(origin);
        let available = rest.len() / 2;
        if available > capacity {
            tracing::warn!(
                origin = %Hex(origin),
                dropped_words = available - capacity,
                "Image does not fit into memory, truncating"
            );
        }
        let start = usize::from(origin);
        let mut word_count = 0;
        for (slot, word) in self.data[start..]
            .iter_mut()
            .zip(rest.chunks_exact(2))
        {
            *slot = u16::from_be_bytes([word[0], word[1]]);
            word_count += 1;
        }
        tracing::info!(
            origin = %Hex(origin),
            word_count,
            "Loaded image"
        );
        Ok(LoadedImage { origin, word_count })
    }
}
