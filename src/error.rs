use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure of a pipeline stage. Carried out-of-band next to a [`crate::LineStream`],
/// never inside it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("create {}: {source}", path.display())]
    Create { path: PathBuf, source: io::Error },
    #[error("write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("list directory {}: {source}", path.display())]
    ListDir { path: PathBuf, source: io::Error },
    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern { pattern: String, source: regex::Error },
    /// The consumer dropped its end of the stream.
    #[error("downstream closed")]
    Closed,
    #[error("spawn stage {name}: {source}")]
    Spawn { name: String, source: io::Error },
    #[error("stage {0} panicked")]
    Panicked(String),
    #[error("handler for {key:?}: {source}")]
    Handler { key: String, source: Box<Error> },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
