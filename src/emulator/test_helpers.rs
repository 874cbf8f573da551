use crate::cancellation::CancellationToken;
use crate::emulator::Emulator;
use crate::hardware::keyboard::ChannelInputProvider;
use crate::hardware::memory::{Memory, PROGRAM_SECTION_START};
use crate::hardware::registers::Registers;
use std::io;
use std::io::Write;
use std::sync::mpsc;

pub struct StringWriter {
    vec: Vec<u8>,
}
impl Write for StringWriter {
    fn write(&mut self, data: &[u8]) -> Result<usize, io::Error> {
        self.vec.write(data)
    }
    fn flush(&mut self) -> Result<(), io::Error> {
        Ok(())
    }
}
impl StringWriter {
    pub fn new() -> Self {
        let vec = Vec::<u8>::with_capacity(120);
        Self { vec }
    }
    pub fn get_string(&self) -> String {
        String::from_utf8(self.vec.clone()).unwrap()
    }
}

/// Big-endian image bytes with `origin` header.
pub fn image_bytes(origin: u16, words: &[u16]) -> Vec<u8> {
    std::iter::once(origin)
        .chain(words.iter().copied())
        .flat_map(u16::to_be_bytes)
        .collect()
}

fn channel_keyboard(input: &[u8]) -> ChannelInputProvider {
    let (sender, receiver) = mpsc::channel();
    for b in input {
        sender.send(*b).unwrap();
    }
    ChannelInputProvider::new(receiver)
}

/// Memory with `program` at the start of the program section and no keyboard input.
pub fn create_memory(program: &[u16]) -> Memory {
    let mut mem = Memory::new(Box::new(channel_keyboard(b"")));
    mem.load_image(&image_bytes(PROGRAM_SECTION_START, program))
        .expect("Error loading program");
    mem
}

/// Emulator with `input` as the complete keyboard input.
pub fn emulator_with_input(program: &[u16], input: &[u8]) -> Emulator {
    let mut emu = Emulator::new(Box::new(channel_keyboard(input)), CancellationToken::new());
    emu.load_image_bytes(&image_bytes(PROGRAM_SECTION_START, program))
        .expect("Error loading program");
    emu
}

pub struct FakeEmulator {
    inner: Emulator,
    program: Vec<u16>,
    stdout: StringWriter,
}
impl FakeEmulator {
    pub fn new(program_no_header: &[u16]) -> Self {
        Self {
            inner: emulator_with_input(program_no_header, b""),
            program: program_no_header.to_vec(),
            stdout: StringWriter::new(),
        }
    }
    pub fn add_stdin_input(&mut self, input: &[u8]) -> &mut Self {
        self.inner = emulator_with_input(&self.program, input);
        self
    }
    pub fn get_parts(&mut self) -> (&mut Registers, &mut Memory, &mut StringWriter) {
        (
            &mut self.inner.registers,
            &mut self.inner.memory,
            &mut self.stdout,
        )
    }
}
