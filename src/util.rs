//! A utility module for common operations.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::env::Env;
use crate::error::Result;

/// Open a file for reading.
pub fn open_file(env: &impl Env, path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    let abs_path = env.in_cwd(&path);
    File::open(abs_path).map_err(|err| format!("cannot open '{}': {err}", path.display()).into())
}

/// Create a file, truncating it if it exists.
pub fn create_file(env: &impl Env, path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    let abs_path = env.in_cwd(&path);
    File::create(abs_path)
        .map_err(|err| format!("cannot create '{}': {err}", path.display()).into())
}

/// Open a file for reading and writing, creating it if necessary.
///
/// The file is not truncated.
pub fn open_rw_file(env: &impl Env, path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    let abs_path = env.in_cwd(&path);
    File::options()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(abs_path)
        .map_err(|err| format!("cannot open '{}': {err}", path.display()).into())
}

/// Whether a path argument refers to stdin or stdout.
pub fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Write output to the given file or to stdout.
///
/// A missing path or `-` selects stdout.
pub fn write_output(
    env: &impl Env,
    path: Option<&Path>,
    op: impl FnOnce(&mut dyn Write) -> io::Result<()>,
) -> Result<()> {
    match path {
        Some(path) if !is_stdio(path) => {
            let mut writer = BufWriter::new(create_file(env, path)?);
            op(&mut writer)
                .and_then(|_| writer.flush())
                .map_err(|err| format!("cannot write '{}': {err}", path.display()).into())
        }
        _ => {
            let stdout = env.stdout();
            let mut writer = &stdout;
            op(&mut writer).map_err(|err| format!("cannot write to stdout: {err}").into())
        }
    }
}

/// Format a DNSSEC timestamp for humans.
pub fn format_timestamp(secs: u32) -> String {
    match chrono::DateTime::from_timestamp(i64::from(secs), 0) {
        Some(time) => time.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        None => secs.to_string(),
    }
}
