//! Source stages: echo, cat, du.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::stream::{stage, LineSink, LineStream};

/// Split `text` on `\n` and emit each piece. An empty string is one empty line.
pub fn echo(text: impl Into<String>) -> LineStream {
    let text = text.into();
    stage("echo", move |out| {
        for seg in text.split('\n') {
            out.send(seg)?;
        }
        Ok(())
    })
}

/// Read the file at `path` line by line.
pub fn cat(path: impl AsRef<Path>) -> LineStream {
    let path = path.as_ref().to_path_buf();
    stage("cat", move |out| {
        let file = File::open(&path).map_err(|source| Error::Open { path: path.clone(), source })?;
        pump_lines(BufReader::new(file), out).map_err(|e| match e {
            PumpError::Closed => Error::Closed,
            PumpError::Io(source) => Error::Read { path: path.clone(), source },
        })
    })
}

/// Recursively list every non-directory entry under `dir`.
///
/// Entries are visited in name order per directory; symlinks are emitted, not
/// followed.
pub fn du(dir: impl AsRef<Path>) -> LineStream {
    let dir = dir.as_ref().to_path_buf();
    stage("du", move |out| walk(&dir, out))
}

fn walk(dir: &Path, out: &LineSink) -> Result<()> {
    let list_err = |source| Error::ListDir { path: dir.to_path_buf(), source };
    let mut entries = fs::read_dir(dir)
        .map_err(list_err)?
        .collect::<io::Result<Vec<_>>>()
        .map_err(list_err)?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let full: PathBuf = dir.join(entry.file_name());
        if entry.file_type().map_err(list_err)?.is_dir() {
            walk(&full, out)?;
        } else {
            out.send(full.to_string_lossy())?;
        }
    }
    Ok(())
}

pub(crate) enum PumpError {
    Closed,
    Io(io::Error),
}

/// Copy newline-delimited text from `reader` into `out`.
///
/// A trailing `\r` is stripped, invalid UTF-8 is replaced, a final
/// unterminated line is still emitted.
pub(crate) fn pump_lines<R: BufRead>(mut reader: R, out: &LineSink) -> Result<(), PumpError> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).map_err(PumpError::Io)?;
        if n == 0 {
            return Ok(());
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        out.send(String::from_utf8_lossy(&buf)).map_err(|_| PumpError::Closed)?;
    }
}
