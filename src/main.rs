//! sequery - Sequence Database Pattern Search
//!
//! Loads a database of sequences, then reads shorthand patterns from
//! standard input, one per line, and reports every occurrence of each
//! pattern with flanking context and residue numbers.
//!
//! ## Usage
//!
//! ```bash
//! sequery < search.patterns
//! sequery -q -o search.matches < search.patterns
//! sequery -s pdbseq.asc -w wilddef.dat -d sequery.defs
//! ```
//!
//! Input ends the program at end-of-file (control-D from a terminal).
//! When standard input is a terminal the shorthand files are re-read
//! before each query, so they can be edited mid-session.

// Use jemalloc for better memory management (returns memory to OS)
#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use sequery::expand::{expand, ExpandError};
use sequery::model::SequenceDatabase;
use sequery::pattern::CompiledPattern;
use sequery::report::{scan_record, MatchRecord, MatchReporter, QueryStats};
use sequery::seqdb::{self, RecordReader};
use sequery::tables::{MacroTables, ReloadPolicy};

/// sequery - search a file of sequences for occurrences of shorthand patterns
///
/// Patterns are read from standard input, one per line. Digits, lowercase
/// letters, and X are expanded through the wildcard and definition files
/// before matching; matches are reported with context and residue numbers.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Sequence database file (default: $SEQUERY_HOME/lib/pdbseq.asc)
    #[arg(short = 's', long = "sequences")]
    sequences: Option<PathBuf>,

    /// Wildcard shorthand file for digit expansions
    #[arg(short = 'w', long = "wildcards", default_value = "wilddef.dat")]
    wildcards: PathBuf,

    /// Definition shorthand file for lowercase-letter expansions
    /// (default: $SEQUERY_HOME/lib/sequery.defs)
    #[arg(short = 'd', long = "definitions")]
    definitions: Option<PathBuf>,

    /// Number of context residues shown on each side of a match
    #[arg(short = 'x', long = "context", default_value = "4")]
    context: usize,

    /// File the matches are appended to; "-" emits to stdout only
    #[arg(short = 'o', long = "output", default_value = "sequery.match")]
    output: String,

    /// Give no output except matches and error messages
    #[arg(short, long)]
    quiet: bool,

    /// Give more output, mostly for debugging
    #[arg(short, long)]
    verbose: bool,

    /// Re-read the sequence file for every query instead of holding the
    /// database in memory (bounds memory for very large databases)
    #[arg(long)]
    stream: bool,

    /// Load at most this many records
    #[arg(long = "max-records")]
    max_records: Option<usize>,
}

/// Resolves a path under the run-time library directory, honoring the
/// SEQUERY_HOME environment variable.
fn sequery_home(file: &str) -> PathBuf {
    let home = std::env::var("SEQUERY_HOME").unwrap_or_else(|_| "/usr/local/sequery".to_string());
    Path::new(&home).join(file)
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(if args.verbose { "debug" } else { "warn" }),
    )
    .init();

    let seq_path = args
        .sequences
        .clone()
        .unwrap_or_else(|| sequery_home("lib/pdbseq.asc"));
    let def_path = args
        .definitions
        .clone()
        .unwrap_or_else(|| sequery_home("lib/sequery.defs"));
    let wild_path = args.wildcards.clone();

    let interactive = io::stdin().is_terminal();
    let quiet = args.quiet;
    let max_records = args.max_records.unwrap_or(usize::MAX);

    // the database must open even in streaming mode; failing here is fatal
    let seqfile = File::open(&seq_path)
        .with_context(|| format!("can't open sequence file {}", seq_path.display()))?;
    if !quiet {
        println!("Sequence file: {}", seq_path.display());
    }

    let database: Option<SequenceDatabase> = if args.stream {
        drop(seqfile);
        None
    } else {
        let db = seqdb::load(BufReader::new(seqfile), max_records)
            .with_context(|| format!("error reading {}", seq_path.display()))?;
        log::debug!("read {} sequences from {}", db.len(), seq_path.display());
        Some(db)
    };

    // warn about missing optional shorthand files, as their expansions
    // will simply be unavailable
    if !def_path.exists() {
        if !quiet {
            eprintln!(
                "sequery: no \"{}\" definition file, so lowercase abbreviations will not work.",
                def_path.display()
            );
        }
    } else if !quiet {
        println!("Definition file: {}", def_path.display());
    }
    if !wild_path.exists() {
        if !quiet {
            eprintln!(
                "sequery: no \"{}\" wildcard file, so digit abbreviations will not work.",
                wild_path.display()
            );
        }
    } else if !quiet {
        println!("Wildcard file: {}", wild_path.display());
    }

    let policy = if interactive {
        ReloadPolicy::EveryQuery
    } else {
        ReloadPolicy::Once
    };
    let mut tables = MacroTables::new(&wild_path, &def_path, policy);
    tables.reload_if_needed();

    let mut outfile = if args.output == "-" {
        None
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&args.output)
            .with_context(|| format!("can't open output file {}", args.output))?;
        if !quiet {
            println!("Output file: {}", args.output);
        }
        Some(file)
    };

    // a "# Matrix" header in the definition file is echoed, not expanded
    if def_path.exists() {
        match tables.matrix_header.clone() {
            Some(header) => {
                if !quiet {
                    println!("{header}");
                }
                if let Some(file) = outfile.as_mut() {
                    writeln!(file, "{header}")?;
                }
            }
            None => {
                if !quiet {
                    eprintln!("No Matrix Header in {}", def_path.display());
                }
            }
        }
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();
    loop {
        if interactive && !quiet {
            print!(" > ");
            io::stdout().flush()?;
        }
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let raw = line.trim_end_matches(['\n', '\r']);
        if raw.trim().is_empty() {
            continue;
        }

        tables.reload_if_needed();

        let expansion = match expand(raw, &tables) {
            Ok(expansion) => expansion,
            Err(ExpandError::TooShort) => {
                if !quiet {
                    eprintln!(" too short for safety...");
                }
                continue;
            }
            Err(err) => {
                eprintln!("sequery: {err}");
                continue;
            }
        };
        let compiled = match CompiledPattern::compile(&expansion.pattern) {
            Ok(compiled) => compiled,
            Err(err) => {
                eprintln!("sequery: {err}");
                continue;
            }
        };
        if !quiet {
            println!(
                "{} (length {}) -> {}",
                expansion.pass1,
                expansion.pass1.len(),
                expansion.pattern
            );
        }

        let mut reporter = MatchReporter::new(args.context, args.context);
        let mut stats = QueryStats::default();
        let scan_result = match database.as_ref() {
            Some(db) => db
                .records
                .iter()
                .try_for_each(|rec| scan_record(rec, &compiled, raw, &mut reporter, &mut stats)),
            None => {
                // streaming: one record in memory at a time
                let file = File::open(&seq_path)
                    .with_context(|| format!("can't re-open {}", seq_path.display()))?;
                let mut reader = RecordReader::new(BufReader::new(file));
                let mut result = Ok(());
                let mut loaded = 0usize;
                while loaded < max_records {
                    match reader.next_record()? {
                        Some(rec) => {
                            loaded += 1;
                            if let Err(err) =
                                scan_record(&rec, &compiled, raw, &mut reporter, &mut stats)
                            {
                                result = Err(err);
                                break;
                            }
                        }
                        None => break,
                    }
                }
                result
            }
        };
        if let Err(err) = scan_result {
            eprintln!("sequery: {err}");
            continue;
        }

        let records = reporter.take_sorted();
        emit(&records, outfile.as_mut())?;
        if !quiet {
            println!("{}", stats.summary());
        }
    }

    Ok(())
}

/// Writes sorted match lines to stdout and, when configured, appends them
/// to the output file.
fn emit(records: &[MatchRecord], mut outfile: Option<&mut File>) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for record in records {
        writeln!(handle, "{}", record.line)?;
        if let Some(file) = outfile.as_mut() {
            writeln!(file, "{}", record.line)?;
        }
    }
    Ok(())
}
