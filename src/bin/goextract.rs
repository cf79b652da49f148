//! goextract: move a selection of Go code into a new function.
//!
//! ```text
//! goextract main.go -s 12:2-15:3 -f prepareRequest -o main.go
//! ```
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use goextract::{extract_source, Selection};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "goextract")]
#[command(about = "Extract a Go expression or statement run into a new function", long_about = None)]
#[command(version)]
struct Cli {
    /// Go source file
    input: PathBuf,

    /// Code to extract, as `line:col-line:col` (1-based, end exclusive)
    #[arg(short, long)]
    selection: Selection,

    /// Name of the new function
    #[arg(short = 'f', long = "function")]
    function: String,

    /// Where to write the result; stdout when absent
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Extraction or parse failure, as opposed to I/O trouble.
#[derive(Debug)]
struct Rejected(goextract::Error);

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("GOEXTRACT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(Rejected(err))) => {
            eprintln!("goextract: {err}");
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("goextract: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<Result<(), Rejected>> {
    let source = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;

    let (text, extraction) = match extract_source(&source, cli.selection, &cli.function) {
        Ok(done) => done,
        Err(err) => return Ok(Err(Rejected(err))),
    };
    for warning in &extraction.warnings {
        eprintln!("goextract: warning: {warning}");
    }
    tracing::info!(
        function = %extraction.name,
        params = extraction.params.len(),
        results = extraction.results.len(),
        "extracted"
    );

    match &cli.output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("writing {}", path.display()))?,
        None => {
            use std::io::Write;
            let mut out = std::io::stdout().lock();
            out.write_all(text.as_bytes()).context("writing to stdout")?;
            out.flush().context("writing to stdout")?;
        }
    }
    Ok(Ok(()))
}
