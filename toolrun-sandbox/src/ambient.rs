//! Process-wide ambient slots seen by in-process tools.
//!
//! There are exactly four: the argument vector and the three standard streams.
//! A tool running in-process reads its arguments with [`args`], reads input
//! through [`stdin`] and writes through [`stdout`] / [`stderr`]. Outside a
//! sandboxed run the stream slots are [`StreamSlot::Inherited`] and pass
//! through to the real process streams.
//!
//! Slots can only be overwritten while holding the [`AmbientLock`], through
//! [`substitute_argv`] and [`substitute_stream`].

use std::io::{self, Read, Write};

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::buffer::CapturedStream;
use crate::cwd::AmbientLock;
use crate::substitute::Substitution;

/// One of the three standard stream slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmbientStream {
    Stdin,
    Stdout,
    Stderr,
}

impl AmbientStream {
    fn label(self) -> &'static str {
        match self {
            Self::Stdin => "stdin",
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// What a stream slot currently points at.
#[derive(Debug, Clone, Default)]
pub enum StreamSlot {
    /// The real process stream.
    #[default]
    Inherited,
    Captured(CapturedStream),
}

impl StreamSlot {
    pub fn is_inherited(&self) -> bool {
        matches!(self, Self::Inherited)
    }

    pub fn captured(&self) -> Option<&CapturedStream> {
        match self {
            Self::Inherited => None,
            Self::Captured(stream) => Some(stream),
        }
    }
}

impl PartialEq for StreamSlot {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Inherited, Self::Inherited) => true,
            (Self::Captured(left), Self::Captured(right)) => left.same_stream(right),
            _ => false,
        }
    }
}

impl Eq for StreamSlot {}

struct AmbientState {
    argv: RwLock<Vec<String>>,
    stdin: RwLock<StreamSlot>,
    stdout: RwLock<StreamSlot>,
    stderr: RwLock<StreamSlot>,
}

impl AmbientState {
    fn stream(&self, which: AmbientStream) -> &RwLock<StreamSlot> {
        match which {
            AmbientStream::Stdin => &self.stdin,
            AmbientStream::Stdout => &self.stdout,
            AmbientStream::Stderr => &self.stderr,
        }
    }
}

static AMBIENT: Lazy<AmbientState> = Lazy::new(|| AmbientState {
    argv: RwLock::new(
        std::env::args_os()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect(),
    ),
    stdin: RwLock::new(StreamSlot::Inherited),
    stdout: RwLock::new(StreamSlot::Inherited),
    stderr: RwLock::new(StreamSlot::Inherited),
});

/// The current argument vector; `args()[0]` names the running tool.
pub fn args() -> Vec<String> {
    AMBIENT.argv.read().clone()
}

pub fn stream_slot(which: AmbientStream) -> StreamSlot {
    AMBIENT.stream(which).read().clone()
}

/// Observed values of every ambient slot plus the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbientSnapshot {
    pub argv: Vec<String>,
    pub stdin: StreamSlot,
    pub stdout: StreamSlot,
    pub stderr: StreamSlot,
    pub cwd: Option<std::path::PathBuf>,
}

pub fn snapshot() -> AmbientSnapshot {
    AmbientSnapshot {
        argv: args(),
        stdin: stream_slot(AmbientStream::Stdin),
        stdout: stream_slot(AmbientStream::Stdout),
        stderr: stream_slot(AmbientStream::Stderr),
        cwd: std::env::current_dir().ok(),
    }
}

pub fn substitute_argv(lock: &AmbientLock, argv: Vec<String>) -> Substitution<'_, Vec<String>> {
    Substitution::install(lock, &AMBIENT.argv, "argv", argv)
}

pub fn substitute_stream(
    lock: &AmbientLock,
    which: AmbientStream,
    stream: CapturedStream,
) -> Substitution<'_, StreamSlot> {
    Substitution::install(
        lock,
        AMBIENT.stream(which),
        which.label(),
        StreamSlot::Captured(stream),
    )
}

/// Writer bound to the stdout or stderr slot, resolved on every write.
#[derive(Debug, Clone, Copy)]
pub struct AmbientWriter {
    which: AmbientStream,
}

pub fn stdout() -> AmbientWriter {
    AmbientWriter {
        which: AmbientStream::Stdout,
    }
}

pub fn stderr() -> AmbientWriter {
    AmbientWriter {
        which: AmbientStream::Stderr,
    }
}

impl Write for AmbientWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match stream_slot(self.which) {
            StreamSlot::Captured(mut stream) => stream.write(buf),
            StreamSlot::Inherited if self.which == AmbientStream::Stderr => {
                io::stderr().write(buf)
            }
            StreamSlot::Inherited => io::stdout().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match stream_slot(self.which) {
            StreamSlot::Captured(_) => Ok(()),
            StreamSlot::Inherited if self.which == AmbientStream::Stderr => io::stderr().flush(),
            StreamSlot::Inherited => io::stdout().flush(),
        }
    }
}

/// Reader bound to the stdin slot.
#[derive(Debug, Clone, Copy)]
pub struct AmbientReader;

pub fn stdin() -> AmbientReader {
    AmbientReader
}

impl Read for AmbientReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match stream_slot(AmbientStream::Stdin) {
            StreamSlot::Captured(mut stream) => stream.read(buf),
            StreamSlot::Inherited => io::stdin().read(buf),
        }
    }
}
