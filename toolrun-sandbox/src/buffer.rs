//! In-memory stand-ins for the standard streams.
//!
//! A [`CapturedStream`] behaves like a small text file: writes append at the
//! end and move the cursor there, reads consume from the cursor. Tools that
//! "close" their output cannot discard it; [`CapturedStream::close`] is a
//! no-op so the sandbox can still collect the content afterwards.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

pub const STDIN_NAME: &str = "<stdin>";
pub const STDOUT_NAME: &str = "<stdout>";
pub const STDERR_NAME: &str = "<stderr>";

/// Line-ending translation applied to text written into a buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Newline {
    /// Keep `\n` as written.
    #[default]
    Lf,
    /// Translate `\n` into the host line ending.
    Platform,
    /// Translate `\n` into `\r\n`.
    CrLf,
}

impl Newline {
    pub fn line_ending(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::Platform if cfg!(windows) => "\r\n",
            Self::Platform => "\n",
        }
    }

    pub(crate) fn translate(self, bytes: &[u8]) -> Cow<'_, [u8]> {
        let ending = self.line_ending().as_bytes();
        if ending == b"\n" || !bytes.contains(&b'\n') {
            return Cow::Borrowed(bytes);
        }

        let mut translated = Vec::with_capacity(bytes.len() + bytes.len() / 8);
        for &byte in bytes {
            if byte == b'\n' {
                translated.extend_from_slice(ending);
            } else {
                translated.push(byte);
            }
        }
        Cow::Owned(translated)
    }
}

#[derive(Debug, Default)]
struct StreamState {
    bytes: Vec<u8>,
    position: usize,
}

impl StreamState {
    fn remaining(&self) -> &[u8] {
        self.bytes.get(self.position..).unwrap_or_default()
    }
}

/// Shared, cloneable handle to one captured stream. Clones observe the same
/// storage and cursor.
#[derive(Clone)]
pub struct CapturedStream {
    name: &'static str,
    newline: Newline,
    state: Arc<Mutex<StreamState>>,
}

impl fmt::Debug for CapturedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CapturedStream")
            .field("name", &self.name)
            .field("newline", &self.newline)
            .field("len", &state.bytes.len())
            .field("position", &state.position)
            .finish()
    }
}

impl CapturedStream {
    pub fn new(name: &'static str, newline: Newline) -> Self {
        Self {
            name,
            newline,
            state: Arc::new(Mutex::new(StreamState::default())),
        }
    }

    pub fn stdout(newline: Newline) -> Self {
        Self::new(STDOUT_NAME, newline)
    }

    pub fn stderr(newline: Newline) -> Self {
        Self::new(STDERR_NAME, newline)
    }

    /// Input buffer pre-loaded with `text` and rewound, ready to be read by a tool.
    pub fn stdin_with(text: &str, newline: Newline) -> Self {
        let stream = Self::new(STDIN_NAME, newline);
        stream.write_str(text);
        stream.seek_to_start();
        stream
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn newline(&self) -> Newline {
        self.newline
    }

    /// Append text at the end of the buffer and move the cursor past it.
    pub fn write_str(&self, text: &str) {
        self.append(text.as_bytes());
    }

    fn append(&self, bytes: &[u8]) {
        let translated = self.newline.translate(bytes);
        let mut state = self.state.lock();
        state.bytes.extend_from_slice(&translated);
        state.position = state.bytes.len();
    }

    /// Read everything from the cursor to the end.
    pub fn read_text(&self) -> String {
        let mut state = self.state.lock();
        let text = String::from_utf8_lossy(state.remaining()).into_owned();
        state.position = state.bytes.len();
        text
    }

    /// Read up to and including the next `\n`, or the rest of the buffer.
    pub fn read_line(&self) -> String {
        let mut state = self.state.lock();
        let remaining = state.remaining();
        let take = remaining
            .iter()
            .position(|&byte| byte == b'\n')
            .map_or(remaining.len(), |index| index + 1);
        let line = String::from_utf8_lossy(remaining.get(..take).unwrap_or_default()).into_owned();
        state.position += take;
        line
    }

    pub fn seek_to_start(&self) {
        self.state.lock().position = 0;
    }

    /// Tools close their standard streams during cleanup; the content must
    /// survive that, so closing does nothing.
    pub fn close(&self) {}

    /// Full content from position zero.
    pub fn get_value(&self) -> String {
        self.seek_to_start();
        self.read_text()
    }

    pub fn len(&self) -> usize {
        self.state.lock().bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when both handles share the same storage.
    pub fn same_stream(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl Write for CapturedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Write for &CapturedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for CapturedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(&mut &*self, buf)
    }
}

impl Read for &CapturedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        let remaining = state.remaining();
        let count = remaining.len().min(buf.len());
        if let (Some(target), Some(source)) = (buf.get_mut(..count), remaining.get(..count)) {
            target.copy_from_slice(source);
        }
        state.position += count;
        Ok(count)
    }
}
