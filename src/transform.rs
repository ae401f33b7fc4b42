//! Transform stages. Each one reads its input to the end whether or not a line
//! is forwarded, so the upstream producer is never left blocked.

use regex::Regex;

use crate::error::Error;
use crate::stream::{stage, LineStream};

/// Forward the first `max(n, 0)` lines, then drain and discard the rest.
pub fn head(mut input: LineStream, n: i64) -> LineStream {
    stage("head", move |out| {
        let mut left = n.max(0);
        for line in input.by_ref() {
            if left > 0 {
                out.send(line)?;
                left -= 1;
            }
        }
        input.finish()
    })
}

/// Forward lines containing at least one match of `pattern`.
pub fn grep(mut input: LineStream, pattern: impl Into<String>) -> LineStream {
    let pattern = pattern.into();
    stage("grep", move |out| {
        let re = Regex::new(&pattern).map_err(|source| Error::Pattern { pattern: pattern.clone(), source })?;
        for line in input.by_ref() {
            if re.is_match(&line) {
                out.send(line)?;
            }
        }
        input.finish()
    })
}

/// Forward the 1-based `field` of each line split by `delimiter`, or by runs
/// of whitespace when `delimiter` is empty. Lines without that field are
/// dropped.
pub fn cut(mut input: LineStream, field: usize, delimiter: impl Into<String>) -> LineStream {
    let delimiter = delimiter.into();
    stage("cut", move |out| {
        for line in input.by_ref() {
            if let Some(f) = select_field(&line, field, &delimiter) {
                out.send(f)?;
            }
        }
        input.finish()
    })
}

fn select_field<'a>(line: &'a str, field: usize, delimiter: &str) -> Option<&'a str> {
    let idx = field.checked_sub(1)?;
    if delimiter.is_empty() {
        line.split_whitespace().nth(idx)
    } else {
        line.split(delimiter).nth(idx)
    }
}
