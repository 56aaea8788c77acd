use std::borrow::Cow;
use std::ffi::OsString;
use std::ops::DerefMut;
use std::path::Path;
use std::sync::Mutex;
use std::{fmt, io};

use tracing_subscriber::fmt::MakeWriter;

#[cfg(test)]
pub mod fake;

mod real;
pub use real::RealEnv;

/// ANSI colour code for errors.
pub const RED: u8 = 31;

pub trait Env {
    /// Get an iterator over the command line arguments passed to the program
    ///
    /// Equivalent to [`std::env::args_os`]
    fn args_os(&self) -> impl Iterator<Item = OsString>;

    /// Get a reference to stdout
    ///
    /// Equivalent to [`std::io::stdout`]
    fn stdout(&self) -> Stream<impl io::Write>;

    /// Get a reference to stderr
    ///
    /// Equivalent to [`std::io::stderr`]
    fn stderr(&self) -> Stream<impl io::Write + Send + Sync + 'static>;

    /// Get a reader for stdin
    ///
    /// Equivalent to [`std::io::stdin`]
    fn stdin(&self) -> impl io::Read;

    /// Make relative paths absolute.
    fn in_cwd<'a>(&self, path: &'a impl AsRef<Path>) -> Cow<'a, Path>;

    /// Get the number of seconds since the UNIX epoch.
    fn seconds_since_epoch(&self) -> u32;
}

/// A type with an infallible `write_fmt` method for use with [`write!`] macros
///
/// This ensures that we don't have to `use` either [`std::fmt::Write`] or
/// [`std::io::Write`]. Additionally, this `write_fmt` does not return a
/// result. This means that we can use the [`write!`] and [`writeln`] macros
/// without handling errors.
pub struct Stream<T: io::Write> {
    writer: Mutex<T>,
    is_terminal: bool,
}

impl<'writer, T: io::Write + 'writer> MakeWriter<'writer> for Stream<T> {
    type Writer = &'writer Self;

    fn make_writer(&'writer self) -> Self::Writer {
        self
    }
}

impl<T: io::Write> io::Write for &Stream<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.deref_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.deref_mut().flush()
    }
}

impl<T: io::Write> Stream<T> {
    pub fn new(writer: T, is_terminal: bool) -> Self {
        Stream {
            writer: Mutex::new(writer),
            is_terminal,
        }
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, T>> {
        self.writer
            .lock()
            .map_err(|_| io::Error::other("output stream lock poisoned"))
    }

    pub fn write_fmt(&mut self, args: fmt::Arguments<'_>) {
        // Errors are ignored, just like `println` does. If stdout or stderr
        // are gone, there is nobody left to report the failure to.
        if let Ok(mut writer) = self.lock() {
            let _ = writer.deref_mut().write_fmt(args);
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.is_terminal
    }

    /// Wrap text in the given ANSI colour if the stream is a terminal.
    pub fn colourize<'a>(&self, colour: u8, text: &'a str) -> Cow<'a, str> {
        if self.is_terminal {
            format!("\x1B[{colour}m{text}\x1B[0m").into()
        } else {
            text.into()
        }
    }
}

impl<E: Env> Env for &E {
    fn args_os(&self) -> impl Iterator<Item = OsString> {
        (**self).args_os()
    }

    fn stdout(&self) -> Stream<impl io::Write> {
        (**self).stdout()
    }

    fn stderr(&self) -> Stream<impl io::Write + Send + Sync + 'static> {
        (**self).stderr()
    }

    fn stdin(&self) -> impl io::Read {
        (**self).stdin()
    }

    fn in_cwd<'a>(&self, path: &'a impl AsRef<Path>) -> Cow<'a, Path> {
        (**self).in_cwd(path)
    }

    fn seconds_since_epoch(&self) -> u32 {
        (**self).seconds_since_epoch()
    }
}
