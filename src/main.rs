use std::env;
use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shpipe::script::{self, Outcome, HELP_ENTRIES};

fn print_help() {
    let mut stdout = io::stdout();
    let _ = writeln!(stdout, "usage: shpipe [--json] -c SCRIPT\n");
    let _ = writeln!(stdout, "Stages (separated by a bare |):");
    for e in HELP_ENTRIES {
        let _ = writeln!(stdout, "    {:<22} {}", e.usage, e.desc);
    }
    let _ = writeln!(stdout, "\nLogging: SHPIPE_LOG=<filter> (default warn)");
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("SHPIPE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    match run_cli() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("shpipe: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> Result<ExitCode> {
    let mut args = env::args().skip(1);
    let mut script: Option<String> = None;
    let mut json = false;
    while let Some(a) = args.next() {
        match a.as_str() {
            "-c" => script = Some(args.next().ok_or_else(|| anyhow!("missing script after -c"))?),
            "--json" => json = true,
            "-h" | "--help" => {
                print_help();
                return Ok(ExitCode::SUCCESS);
            }
            other => eprintln!("unknown arg: {other}"),
        }
    }
    let Some(s) = script else {
        print_help();
        return Ok(ExitCode::from(2));
    };
    let pipeline = match script::parse(&s) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("shpipe: {e}");
            return Ok(ExitCode::from(2));
        }
    };

    let mut stdout = io::stdout().lock();
    let outcome = if json {
        // Keep stdout for the summary only.
        pipeline.execute(&mut io::sink())?
    } else {
        pipeline.execute(&mut stdout)?
    };
    match (&outcome, json) {
        (_, true) => writeln!(stdout, "{}", serde_json::to_string(&outcome)?)?,
        (Outcome::Counted { lines }, false) => writeln!(stdout, "{lines}")?,
        _ => {}
    }
    stdout.flush()?;
    Ok(ExitCode::SUCCESS)
}
