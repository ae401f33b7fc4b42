//! Line streams and the stage lifecycle. Each stage owns one thread; its
//! result travels next to the stream and is collected by [`LineStream::finish`].

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::error::{Error, Result};

/// Producing half of a line stream.
pub struct LineSink {
    tx: SyncSender<String>,
}

impl LineSink {
    /// Hand one line to the consumer, blocking until it is taken.
    ///
    /// Fails with [`Error::Closed`] once the consumer has dropped the stream.
    pub fn send(&self, line: impl Into<String>) -> Result<()> {
        self.tx.send(line.into()).map_err(|_| Error::Closed)
    }
}

enum Producer {
    Running(JoinHandle<Result<()>>),
    Failed(Error),
    Done,
}

/// Consuming half of a line stream: an ordered, single-pass sequence of lines.
pub struct LineStream {
    name: String,
    rx: Receiver<String>,
    producer: Producer,
}

impl LineStream {
    /// Block until the next line arrives. `None` once the producer has closed.
    pub fn recv(&mut self) -> Option<String> {
        self.rx.recv().ok()
    }

    /// Drain whatever is left, wait for the producer and return its outcome.
    pub fn finish(mut self) -> Result<()> {
        while self.rx.recv().is_ok() {}
        match std::mem::replace(&mut self.producer, Producer::Done) {
            Producer::Running(handle) => match handle.join() {
                Ok(res) => res,
                Err(_) => Err(Error::Panicked(self.name.clone())),
            },
            Producer::Failed(e) => Err(e),
            Producer::Done => Ok(()),
        }
    }

    /// Collect every line, then [`finish`](Self::finish).
    pub fn read_all(mut self) -> Result<Vec<String>> {
        let lines: Vec<String> = self.by_ref().collect();
        self.finish()?;
        Ok(lines)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Iterator for LineStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.recv()
    }
}

impl std::fmt::Debug for LineStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineStream").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Spawn a stage: `body` runs on its own thread and writes into the sink.
///
/// The stream closes exactly once, when `body` returns. A consumer that hangs
/// up early makes `send` fail with [`Error::Closed`]; that is a normal stop,
/// not a failure.
pub fn stage<F>(name: impl Into<String>, body: F) -> LineStream
where
    F: FnOnce(&LineSink) -> Result<()> + Send + 'static,
{
    let name = name.into();
    let (tx, rx) = sync_channel(0);
    let sink = LineSink { tx };
    let thread_name = format!("sh-{name}");
    let stage_name = name.clone();
    let spawned = thread::Builder::new().name(thread_name).spawn(move || {
        debug!(stage = %stage_name, "stage started");
        let res = body(&sink);
        drop(sink);
        match res {
            Err(Error::Closed) => {
                debug!(stage = %stage_name, "consumer hung up");
                Ok(())
            }
            Err(e) => {
                debug!(stage = %stage_name, error = %e, "stage failed");
                Err(e)
            }
            Ok(()) => {
                debug!(stage = %stage_name, "stage finished");
                Ok(())
            }
        }
    });
    let producer = match spawned {
        Ok(handle) => Producer::Running(handle),
        Err(source) => Producer::Failed(Error::Spawn { name: name.clone(), source }),
    };
    LineStream { name, rx, producer }
}
