//! Pipeline scripts: `du src | grep '\.rs$' | for cat | wc`.
//!
//! A script is split into words with shell quoting rules; a bare `|` word
//! separates stages. The first stage is a source, `wc` and `tofile`/`>` may
//! only end the pipeline, everything in between is a transform.

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::fanout::for_each_stream;
use crate::run::run;
use crate::sink::{to_file, wc};
use crate::source::{cat, du, echo};
use crate::stream::LineStream;
use crate::transform::{cut, grep, head};

pub struct HelpEntry {
    pub name: &'static str,
    pub usage: &'static str,
    pub desc: &'static str,
}

pub static HELP_ENTRIES: &[HelpEntry] = &[
    HelpEntry { name: "echo", usage: "echo WORDS...", desc: "emit the words, split on newlines" },
    HelpEntry { name: "cat", usage: "cat FILE", desc: "emit the lines of a file" },
    HelpEntry { name: "du", usage: "du DIR", desc: "emit every file below a directory" },
    HelpEntry { name: "run", usage: "run PROG [ARGS...]", desc: "emit the stdout lines of a process" },
    HelpEntry { name: "head", usage: "head N", desc: "keep the first N lines" },
    HelpEntry { name: "grep", usage: "grep PATTERN", desc: "keep lines matching a regular expression" },
    HelpEntry { name: "cut", usage: "cut FIELD [DELIM]", desc: "keep the FIELD-th field (1-based; whitespace when DELIM is omitted)" },
    HelpEntry { name: "for", usage: "for SOURCE [ARGS...]", desc: "run SOURCE once per line, the line appended as last argument" },
    HelpEntry { name: "wc", usage: "wc", desc: "count the lines (ends the pipeline)" },
    HelpEntry { name: "tofile", usage: "tofile FILE | > FILE", desc: "write the lines to FILE (ends the pipeline)" },
];

fn usage(name: &str) -> &'static str {
    HELP_ENTRIES.iter().find(|e| e.name == name).map(|e| e.usage).unwrap_or("")
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty pipeline")]
    Empty,
    #[error("unbalanced quotes")]
    Quotes,
    #[error("empty stage")]
    EmptyStage,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("{command}: not a number: {value}")]
    Number { command: String, value: String },
    #[error("pipeline must start with a source (echo, cat, du, run), got {0}")]
    NotASource(String),
    #[error("{0} can only start a pipeline")]
    SourceMidPipeline(String),
    #[error("{0} can only end a pipeline")]
    TerminalNotLast(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Echo(String),
    Cat(PathBuf),
    Du(PathBuf),
    Run { program: String, args: Vec<String> },
}

impl Source {
    pub fn open(&self) -> LineStream {
        match self {
            Source::Echo(text) => echo(text.clone()),
            Source::Cat(path) => cat(path),
            Source::Du(dir) => du(dir),
            Source::Run { program, args } => run(program, args.clone()),
        }
    }
}

/// A source with its last argument left open, filled in per key by `for`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Template {
    Echo(Vec<String>),
    Cat,
    Du,
    Run { program: String, args: Vec<String> },
}

impl Template {
    pub fn bind(&self, key: &str) -> Source {
        match self {
            Template::Echo(words) if words.is_empty() => Source::Echo(key.to_string()),
            Template::Echo(words) => Source::Echo(format!("{} {key}", words.join(" "))),
            Template::Cat => Source::Cat(key.into()),
            Template::Du => Source::Du(key.into()),
            Template::Run { program, args } => {
                let mut args = args.clone();
                args.push(key.to_string());
                Source::Run { program: program.clone(), args }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    Head(i64),
    Grep(String),
    Cut { field: usize, delimiter: String },
    For(Template),
}

impl Transform {
    fn apply(self, input: LineStream) -> LineStream {
        match self {
            Transform::Head(n) => head(input, n),
            Transform::Grep(pattern) => grep(input, pattern),
            Transform::Cut { field, delimiter } => cut(input, field, delimiter),
            Transform::For(template) => for_each_stream(input, move |key| template.bind(key).open()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Print,
    Wc,
    ToFile(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Printed { lines: usize },
    Counted { lines: usize },
    Written { lines: usize, path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub source: Source,
    pub transforms: Vec<Transform>,
    pub terminal: Terminal,
}

enum Stage {
    Source(Source),
    Transform(Transform),
    Terminal(Terminal),
}

pub fn parse(script: &str) -> Result<Pipeline, ParseError> {
    let words = shlex::split(script).ok_or(ParseError::Quotes)?;
    if words.is_empty() {
        return Err(ParseError::Empty);
    }
    let segments: Vec<&[String]> = words.split(|w| w == "|").collect();
    let last = segments.len() - 1;
    let mut source = None;
    let mut transforms = Vec::new();
    let mut terminal = Terminal::Print;
    for (i, seg) in segments.iter().enumerate() {
        let name = seg.first().ok_or(ParseError::EmptyStage)?;
        match parse_stage(seg)? {
            Stage::Source(s) if i == 0 => source = Some(s),
            Stage::Source(_) => return Err(ParseError::SourceMidPipeline(name.clone())),
            _ if i == 0 => return Err(ParseError::NotASource(name.clone())),
            Stage::Transform(t) => transforms.push(t),
            Stage::Terminal(t) if i == last => terminal = t,
            Stage::Terminal(_) => return Err(ParseError::TerminalNotLast(name.clone())),
        }
    }
    let source = source.ok_or(ParseError::Empty)?;
    Ok(Pipeline { source, transforms, terminal })
}

fn parse_stage(words: &[String]) -> Result<Stage, ParseError> {
    let (name, args) = words.split_first().ok_or(ParseError::EmptyStage)?;
    let stage = match name.as_str() {
        "echo" | "cat" | "du" | "run" => Stage::Source(parse_source(name, args)?),
        "head" => match args {
            [n] => Stage::Transform(Transform::Head(number(name, n)?)),
            _ => return Err(ParseError::Usage(usage(name))),
        },
        "grep" => match args {
            [pattern] => Stage::Transform(Transform::Grep(pattern.clone())),
            _ => return Err(ParseError::Usage(usage(name))),
        },
        "cut" => match args {
            [field] => Stage::Transform(Transform::Cut { field: number(name, field)?, delimiter: String::new() }),
            [field, delim] => Stage::Transform(Transform::Cut { field: number(name, field)?, delimiter: delim.clone() }),
            _ => return Err(ParseError::Usage(usage(name))),
        },
        "for" => Stage::Transform(Transform::For(parse_template(args)?)),
        "wc" if args.is_empty() => Stage::Terminal(Terminal::Wc),
        "wc" => return Err(ParseError::Usage(usage(name))),
        "tofile" | ">" => match args {
            [path] => Stage::Terminal(Terminal::ToFile(path.into())),
            _ => return Err(ParseError::Usage(usage("tofile"))),
        },
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(stage)
}

fn parse_source(name: &str, args: &[String]) -> Result<Source, ParseError> {
    match (name, args) {
        ("echo", words) => Ok(Source::Echo(words.join(" "))),
        ("cat", [path]) => Ok(Source::Cat(path.into())),
        ("du", [dir]) => Ok(Source::Du(dir.into())),
        ("run", [program, rest @ ..]) => Ok(Source::Run { program: program.clone(), args: rest.to_vec() }),
        _ => Err(ParseError::Usage(usage(name))),
    }
}

fn parse_template(args: &[String]) -> Result<Template, ParseError> {
    let (name, rest) = args.split_first().ok_or(ParseError::Usage(usage("for")))?;
    match (name.as_str(), rest) {
        ("echo", words) => Ok(Template::Echo(words.to_vec())),
        ("cat", []) => Ok(Template::Cat),
        ("du", []) => Ok(Template::Du),
        ("run", [program, rest @ ..]) => Ok(Template::Run { program: program.clone(), args: rest.to_vec() }),
        ("cat" | "du" | "run", _) => Err(ParseError::Usage(usage("for"))),
        (other, _) => Err(ParseError::NotASource(other.to_string())),
    }
}

fn number<T: std::str::FromStr>(command: &str, value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::Number { command: command.to_string(), value: value.to_string() })
}

impl Pipeline {
    /// Build the stage chain and drive it to the end. Printed lines go to `out`.
    pub fn execute(self, out: &mut impl Write) -> anyhow::Result<Outcome> {
        let stream = self.transforms.into_iter().fold(self.source.open(), |s, t| t.apply(s));
        let outcome = match self.terminal {
            Terminal::Print => {
                let mut stream = stream;
                let mut lines = 0;
                for line in stream.by_ref() {
                    writeln!(out, "{line}")?;
                    lines += 1;
                }
                out.flush()?;
                stream.finish()?;
                Outcome::Printed { lines }
            }
            Terminal::Wc => Outcome::Counted { lines: wc(stream)? },
            Terminal::ToFile(path) => {
                let lines = to_file(stream, &path)?;
                Outcome::Written { lines, path }
            }
        };
        Ok(outcome)
    }
}
