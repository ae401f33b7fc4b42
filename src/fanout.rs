//! The `for` stage: run a handler per input line and merge what it produces.

use crate::error::{Error, Result};
use crate::stream::{stage, LineSink, LineStream};

type SinkFn = Box<dyn FnMut(&str, &LineSink) -> Result<()> + Send>;
type StreamFn = Box<dyn FnMut(&str) -> LineStream + Send>;

pub enum Handler {
    Sink(SinkFn),
    Stream(StreamFn),
}

impl Handler {
    pub fn sink<F>(f: F) -> Self
    where
        F: FnMut(&str, &LineSink) -> Result<()> + Send + 'static,
    {
        Handler::Sink(Box::new(f))
    }

    pub fn stream<F>(f: F) -> Self
    where
        F: FnMut(&str) -> LineStream + Send + 'static,
    {
        Handler::Stream(Box::new(f))
    }

    fn call(&mut self, key: &str, out: &LineSink) -> Result<()> {
        let handler_err = |source: Error| match source {
            Error::Closed => Error::Closed,
            source => Error::Handler { key: key.to_string(), source: Box::new(source) },
        };
        match self {
            Handler::Sink(f) => f(key, out).map_err(handler_err),
            Handler::Stream(f) => {
                let mut sub = f(key);
                for line in sub.by_ref() {
                    out.send(line)?;
                }
                sub.finish().map_err(handler_err)
            }
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Sink(_) => f.write_str("Handler::Sink"),
            Handler::Stream(_) => f.write_str("Handler::Stream"),
        }
    }
}

/// Marker for sink-shaped closures.
pub struct SinkShape;
/// Marker for stream-returning closures.
pub struct StreamShape;

/// Conversion of a closure into a [`Handler`], resolved by signature.
pub trait IntoHandler<Shape> {
    fn into_handler(self) -> Handler;
}

impl IntoHandler<Handler> for Handler {
    fn into_handler(self) -> Handler {
        self
    }
}

impl<F> IntoHandler<SinkShape> for F
where
    F: FnMut(&str, &LineSink) -> Result<()> + Send + 'static,
{
    fn into_handler(self) -> Handler {
        Handler::sink(self)
    }
}

impl<F> IntoHandler<StreamShape> for F
where
    F: FnMut(&str) -> LineStream + Send + 'static,
{
    fn into_handler(self) -> Handler {
        Handler::stream(self)
    }
}

/// For each line of `input`, call `handler` and merge its output.
///
/// Keys are handled one at a time, in input order. The merged stream closes
/// after the input is exhausted and the last handler has finished.
pub fn for_each<S>(mut input: LineStream, handler: impl IntoHandler<S>) -> LineStream {
    let mut handler = handler.into_handler();
    stage("for", move |out| {
        for key in input.by_ref() {
            handler.call(&key, out)?;
        }
        input.finish()
    })
}

/// [`for_each`] with a sink-shaped handler.
pub fn for_each_into<F>(input: LineStream, f: F) -> LineStream
where
    F: FnMut(&str, &LineSink) -> Result<()> + Send + 'static,
{
    for_each(input, Handler::sink(f))
}

/// [`for_each`] with a stream-returning handler.
pub fn for_each_stream<F>(input: LineStream, f: F) -> LineStream
where
    F: FnMut(&str) -> LineStream + Send + 'static,
{
    for_each(input, Handler::stream(f))
}
