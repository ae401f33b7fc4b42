//! Unix-style pipeline stages over streams of text lines.
//!
//! Every stage runs on its own thread and hands lines to the next one through
//! a rendezvous channel, so a slow consumer throttles its whole upstream
//! chain.
//!
//! ```no_run
//! use shpipe::{cat, du, for_each, grep, head, wc};
//!
//! // How many of the first ten Rust files under src/ mention "unsafe"?
//! let files = head(grep(du("src"), r"\.rs$"), 10);
//! let hits = for_each(files, |file: &str| grep(cat(file), "unsafe"));
//! println!("{}", wc(hits).unwrap());
//! ```
//!
//! Failures (a missing file, an unreadable directory, a bad pattern) close the
//! failing stage's stream and travel out-of-band: every transform checks its
//! input with [`LineStream::finish`] once drained, so the sink at the end of
//! the chain returns the first error. A failing external process is the
//! exception: [`run`] reports it to a [`Diagnostics`] sink and its stream
//! simply ends.
//!
//! There is no cancellation. Dropping a stream stops its producer at the next
//! line; holding one without reading it stalls the producer.

pub mod error;
pub mod fanout;
pub mod run;
pub mod script;
pub mod sink;
pub mod source;
pub mod stream;
pub mod transform;

pub use error::{Error, Result};
pub use fanout::{for_each, for_each_into, for_each_stream, Handler, IntoHandler, SinkShape, StreamShape};
pub use run::{run, run_with, Diagnostics, ProcessFailure, TracingDiagnostics};
pub use sink::{to_file, wc};
pub use source::{cat, du, echo};
pub use stream::{stage, LineSink, LineStream};
pub use transform::{cut, grep, head};
