use crate::cancellation::CancellationToken;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, poll, read};
use std::collections::VecDeque;
use std::io;
use std::io::Read;
use std::sync::mpsc;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

/// Providing Keyboard Input independent of an implementation.
pub trait KeyboardInputProvider {
    /// Returns a pending character if there is one, does not block.
    ///
    /// # Errors
    /// - the underlying input could not be queried
    fn poll_character(&mut self) -> io::Result<Option<u8>>;
    /// Blocks until a character is available.
    ///
    /// # Errors
    /// - the input is closed or could not be read
    /// - `Interrupted` if reading was cancelled
    fn read_character(&mut self) -> io::Result<u8>;
    /// Processes pending input events without consuming a character,
    /// so that cancellation requests are noticed.
    ///
    /// # Errors
    /// - the underlying input could not be queried
    fn refresh(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Source of console key presses.
pub trait KeyEventSource {
    /// Whether an event can be read without blocking.
    ///
    /// # Errors
    /// - the console could not be queried
    fn has_event(&mut self) -> io::Result<bool>;
    /// Blocks for the next event, `None` if it is not a key press.
    ///
    /// # Errors
    /// - the console could not be read
    fn read_key_press(&mut self) -> io::Result<Option<KeyEvent>>;
}

/// Console events as delivered by crossterm, which has to be in raw mode.
pub struct CrosstermEvents;

impl KeyEventSource for CrosstermEvents {
    fn has_event(&mut self) -> io::Result<bool> {
        poll(Duration::ZERO)
    }
    fn read_key_press(&mut self) -> io::Result<Option<KeyEvent>> {
        Ok(read()?.as_key_press_event())
    }
}

/// Reads keys from the terminal.
///
/// Keys that arrive before the program asks for them are queued. Every look at the console
/// drains all ready events, so CTRL-C is noticed however many keys are queued before it.
pub struct TerminalInputProvider<E: KeyEventSource = CrosstermEvents> {
    events: E,
    pending: VecDeque<u8>,
    cancellation: CancellationToken,
}

impl TerminalInputProvider {
    #[must_use]
    pub const fn new(cancellation: CancellationToken) -> Self {
        Self::with_events(CrosstermEvents, cancellation)
    }
}

impl<E: KeyEventSource> TerminalInputProvider<E> {
    #[must_use]
    pub const fn with_events(events: E, cancellation: CancellationToken) -> Self {
        Self {
            events,
            pending: VecDeque::new(),
            cancellation,
        }
    }
    /// Maps a key event to the byte a LC-3 program sees.
    /// CTRL-C cancels execution instead.
    fn handle_key(&mut self, event: KeyEvent) -> Option<u8> {
        if event.code == KeyCode::Char('c') && event.modifiers.contains(KeyModifiers::CONTROL) {
            self.cancellation.cancel();
            return None;
        }
        match event.code {
            KeyCode::Enter => Some(b'\n'),
            KeyCode::Backspace => Some(0x08),
            KeyCode::Tab => Some(b'\t'),
            KeyCode::Esc => Some(0x1B),
            KeyCode::Char(c) if c.is_ascii() => u8::try_from(c).ok(),
            _ => None,
        }
    }
    /// Blocks for one event and queues the character it maps to.
    fn read_event(&mut self) -> io::Result<()> {
        if let Some(event) = self.events.read_key_press()?
            && let Some(c) = self.handle_key(event)
        {
            self.pending.push_back(c);
        }
        Ok(())
    }
    fn drain_ready_events(&mut self) -> io::Result<()> {
        while self.events.has_event()? {
            self.read_event()?;
        }
        Ok(())
    }
    fn check_cancelled(&self) -> io::Result<()> {
        if self.cancellation.is_cancelled() {
            Err(io::Error::from(io::ErrorKind::Interrupted))
        } else {
            Ok(())
        }
    }
}

impl<E: KeyEventSource> KeyboardInputProvider for TerminalInputProvider<E> {
    fn poll_character(&mut self) -> io::Result<Option<u8>> {
        self.drain_ready_events()?;
        Ok(self.pending.pop_front())
    }
    fn read_character(&mut self) -> io::Result<u8> {
        loop {
            self.check_cancelled()?;
            if let Some(c) = self.pending.pop_front() {
                return Ok(c);
            }
            self.read_event()?;
        }
    }
    fn refresh(&mut self) -> io::Result<()> {
        self.drain_ready_events()
    }
}

/// Keyboard input fed through a channel, e.g. from a non-interactive stdin.
pub struct ChannelInputProvider {
    receiver: Receiver<u8>,
}

impl ChannelInputProvider {
    #[must_use]
    pub const fn new(receiver: Receiver<u8>) -> Self {
        Self { receiver }
    }
    /// Drains `reader` on a background thread, the channel closes at end of input.
    #[must_use]
    pub fn from_reader(mut reader: impl Read + Send + 'static) -> Self {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = [0u8; 256];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if buf[..n].iter().any(|b| sender.send(*b).is_err()) {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        tracing::warn!("Stopped reading keyboard input: {e}");
                        break;
                    }
                }
            }
        });
        Self::new(receiver)
    }
}

impl KeyboardInputProvider for ChannelInputProvider {
    fn poll_character(&mut self) -> io::Result<Option<u8>> {
        match self.receiver.try_recv() {
            Ok(c) => Ok(Some(c)),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => Ok(None),
        }
    }
    fn read_character(&mut self) -> io::Result<u8> {
        self.receiver.recv().map_err(|_| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "end of keyboard input")
        })
    }
}
