//! Sink stages: consume a stream to the end and report how many lines it had.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::stream::LineStream;

/// Write every line of `input` to `path` (created or truncated), each followed
/// by `\n`. Returns the number of lines written.
pub fn to_file(mut input: LineStream, path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();
    let write_err = |source| Error::Write { path: path.to_path_buf(), source };
    let file = File::create(path).map_err(|source| Error::Create { path: path.to_path_buf(), source })?;
    let mut w = BufWriter::new(file);
    let mut n = 0;
    for line in input.by_ref() {
        writeln!(w, "{line}").map_err(write_err)?;
        n += 1;
    }
    w.flush().map_err(write_err)?;
    input.finish()?;
    Ok(n)
}

/// Drain `input` and count its lines.
pub fn wc(mut input: LineStream) -> Result<usize> {
    let n = input.by_ref().count();
    input.finish()?;
    Ok(n)
}
