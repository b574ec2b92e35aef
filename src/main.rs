//! Batch driver: iterate inputs, aggregate, lint, write outputs.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use rayon::prelude::*;
use tracing::error;

use elfxref::extract::{self, ExtractOutcome};
use elfxref::schema::StructCatalog;
use elfxref::store::{NodePolicy, XrefStore};
use elfxref::{lint, output, view};

/// Extract and aggregate xref metadata from compiled ELF binaries.
#[derive(Debug, Parser)]
#[command(name = "elfxref", version, about)]
struct Args {
    /// Write aggregated JSON output
    #[arg(short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write by-file JSON output
    #[arg(long = "out-by-file", value_name = "FILE")]
    out_by_file: Option<PathBuf>,

    /// Enable a warning pass, e.g. -Wlog-format
    #[arg(short = 'W', value_name = "CHECK")]
    warnings: Vec<String>,

    /// Struct layout catalog to use instead of the built-in LP64 one
    #[arg(long, value_name = "FILE")]
    structs: Option<PathBuf>,

    /// Keep duplicate installation nodes instead of deduplicating them
    #[arg(long)]
    keep_duplicate_nodes: bool,

    /// Print a listing of all aggregated log occurrences
    #[arg(long)]
    dump: bool,

    /// Files to read (ELF binaries, libtool objects, or JSON snapshots)
    #[arg(required = true, value_name = "BINARY")]
    binaries: Vec<PathBuf>,
}

fn main() -> anyhow::Result<ExitCode> {
    elfxref::logging::init_tracing();
    let args = Args::parse();

    let catalog = match &args.structs {
        Some(path) => StructCatalog::from_path(path)
            .with_context(|| format!("loading struct layouts from {}", path.display()))?,
        None => StructCatalog::builtin().context("loading built-in struct layouts")?,
    };
    catalog
        .validate()
        .context("struct layout catalog is incomplete")?;

    let policy = if args.keep_duplicate_nodes {
        NodePolicy::Accumulate
    } else {
        NodePolicy::Dedup
    };

    // classification is read-only per input, so decoding fans out; the
    // merge into the shared store stays sequential in input order
    let results: Vec<(&PathBuf, elfxref::Result<ExtractOutcome>)> = args
        .binaries
        .par_iter()
        .map(|path| (path, extract::load_file(path, &catalog)))
        .collect();

    let mut store = XrefStore::new();
    let mut lintable = Vec::new();
    let mut failures = 0usize;
    for (path, result) in results {
        match result {
            Ok(outcome) => {
                store.merge(outcome.store, policy);
                lintable.extend(outcome.lintable);
            }
            Err(cause) => {
                failures += 1;
                error!(file = %path.display(), %cause, "extraction failed");
            }
        }
    }

    if args.warnings.iter().any(|w| w == "log-format") {
        let color = io::stderr().is_terminal();
        let mut stderr = io::stderr().lock();
        for finding in lint::run(&lintable, color) {
            writeln!(stderr, "{}", finding.message)?;
        }
    }

    let inconsistent = store.inconsistent_identities();
    if !inconsistent.is_empty() {
        let color = io::stderr().is_terminal();
        io::stderr().write_all(output::render_inconsistent(&inconsistent, color).as_bytes())?;
    }

    if args.dump {
        io::stdout().write_all(output::render_dump(&store).as_bytes())?;
    }

    if failures > 0 {
        return Ok(ExitCode::FAILURE);
    }

    if let Some(path) = &args.output {
        output::write_json_atomic(path, &store)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &args.out_by_file {
        let by_file = view::by_file(&store);
        output::write_json_atomic(path, &by_file)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    Ok(ExitCode::SUCCESS)
}
