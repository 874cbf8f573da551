//! Console mode handling, kept out of the emulator core.
use crossterm::terminal;
use std::io;
use std::io::Write;

/// Switching the console between raw and normal mode.
pub trait TerminalMode {
    /// Non-canonical, non-echoing input.
    ///
    /// # Errors
    /// - the console mode could not be changed
    fn enter_raw_mode(&mut self) -> io::Result<()>;
    /// # Errors
    /// - the console mode could not be changed
    fn restore_mode(&mut self) -> io::Result<()>;
}

/// The real terminal via crossterm.
#[derive(Debug, Default, Copy, Clone)]
pub struct CrosstermTerminal;

impl TerminalMode for CrosstermTerminal {
    fn enter_raw_mode(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()
    }
    fn restore_mode(&mut self) -> io::Result<()> {
        terminal::disable_raw_mode()
    }
}

/// Raw mode for as long as the lock lives, restored on drop.
pub struct RawLock<T: TerminalMode> {
    terminal: T,
}

impl<T: TerminalMode> RawLock<T> {
    /// # Errors
    /// - raw mode could not be entered, the mode is left unchanged
    pub fn acquire(mut terminal: T) -> io::Result<Self> {
        terminal.enter_raw_mode()?;
        Ok(Self { terminal })
    }
}

impl<T: TerminalMode> Drop for RawLock<T> {
    fn drop(&mut self) {
        // terminal stays in raw mode but no means to repair
        if let Err(e) = self.terminal.restore_mode() {
            tracing::error!("Error resetting terminal {e}");
        }
    }
}

/// Output while raw mode is active: `\n` does not return the cursor there,
/// so it is written as `\r\n`.
pub struct RawModeWriter<W: Write> {
    inner: W,
}

impl<W: Write> RawModeWriter<W> {
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> Write for RawModeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for (idx, part) in buf.split(|b| *b == b'\n').enumerate() {
            if idx > 0 {
                self.inner.write_all(b"\r\n")?;
            }
            self.inner.write_all(part)?;
        }
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct FakeTerminal {
        calls: Rc<RefCell<Vec<&'static str>>>,
        fail_enter: bool,
    }
    impl TerminalMode for FakeTerminal {
        fn enter_raw_mode(&mut self) -> io::Result<()> {
            if self.fail_enter {
                return Err(io::Error::other("not a terminal"));
            }
            self.calls.borrow_mut().push("enter");
            Ok(())
        }
        fn restore_mode(&mut self) -> io::Result<()> {
            self.calls.borrow_mut().push("restore");
            Ok(())
        }
    }

    #[gtest]
    fn test_raw_lock_restores_on_drop() {
        let terminal = FakeTerminal::default();
        {
            let _lock = RawLock::acquire(terminal.clone()).unwrap();
            assert_eq!(*terminal.calls.borrow(), vec!["enter"]);
        }
        assert_eq!(*terminal.calls.borrow(), vec!["enter", "restore"]);
    }

    #[gtest]
    fn test_raw_lock_failed_acquire_does_not_restore() {
        let terminal = FakeTerminal {
            fail_enter: true,
            ..FakeTerminal::default()
        };
        expect_that!(RawLock::acquire(terminal.clone()).is_err(), eq(true));
        expect_that!(terminal.calls.borrow().is_empty(), eq(true));
    }

    #[gtest]
    fn test_raw_mode_writer_expands_newlines() {
        let mut writer = RawModeWriter::new(Vec::new());
        writer.write_all(b"\nHello\nWorld").unwrap();
        writer.write_all(b"!\n").unwrap();
        assert_eq!(writer.inner, b"\r\nHello\r\nWorld!\r\n".to_vec());
    }
}
