use std::{
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use anyhow::{bail, Result};
use clap::Parser;
use env_logger::Env;

use crate::engine::fasta::Fasta;
use crate::engine::fastq::Fastq;
use crate::engine::OpenOptions;
use crate::utils::{built_info, BUFFERSIZE};

/// Extract a single record (or a sub-range of it) from an indexed
/// FASTA/FASTQ file and print it in the source format.
#[derive(Parser, Debug)]
#[clap(name = "extract", version = built_info::VERSION.as_str())]
pub struct Opts {
    /// The FASTA/FASTQ file to read (plain or gzip-compressed).
    #[clap(short = 'i', long, display_order = 1)]
    pub input: PathBuf,

    /// Treat `input` as FASTQ rather than inferring from its extension.
    #[clap(long, display_order = 2)]
    pub fastq: bool,

    /// Record name to extract.
    #[clap(short = 'n', long, display_order = 3)]
    pub name: Option<String>,

    /// Record ordinal (0-based, negative counts from the end) to extract;
    /// an alternative to `--name`.
    #[clap(long, display_order = 4)]
    pub ordinal: Option<i64>,

    /// First base to extract (1-based, inclusive). Requires `--end`.
    #[clap(short = 's', long, display_order = 5)]
    pub start: Option<i64>,

    /// Last base to extract (1-based, inclusive). Requires `--start`.
    #[clap(short = 'e', long, display_order = 5)]
    pub end: Option<i64>,
}

pub fn run(opts: &Opts) -> Result<()> {
    let options = OpenOptions::new();
    let range = match (opts.start, opts.end) {
        (Some(s), Some(e)) => Some((s, e)),
        (None, None) => None,
        _ => bail!("--start and --end must be given together"),
    };

    let mut writer = BufWriter::with_capacity(BUFFERSIZE, io::stdout());

    if opts.fastq || looks_like_fastq(&opts.input) {
        let fastq = Fastq::open(&opts.input, options)?;
        let read = match (&opts.name, opts.ordinal) {
            (Some(name), None) => fastq.get(name.as_bytes())?,
            (None, Some(ordinal)) => fastq.at(ordinal)?,
            (Some(_), Some(_)) => bail!("only one of --name or --ordinal may be given"),
            (None, None) => bail!("one of --name or --ordinal is required"),
        };
        let seq = match range {
            Some((s, e)) => read.fetch(s, e)?,
            None => read.seq()?,
        };
        writeln!(writer, "@{}", read.name()?)?;
        writer.write_all(&seq)?;
        writeln!(writer)?;
        writeln!(writer, "+")?;
        writer.write_all(&read.quality()?)?;
        writeln!(writer)?;
    } else {
        let fasta = Fasta::open(&opts.input, options)?;
        let sequence = match (&opts.name, opts.ordinal) {
            (Some(name), None) => fasta.get(name.as_bytes())?,
            (None, Some(ordinal)) => fasta.at(ordinal)?,
            (Some(_), Some(_)) => bail!("only one of --name or --ordinal may be given"),
            (None, None) => bail!("one of --name or --ordinal is required"),
        };
        let seq = match range {
            Some((s, e)) => sequence.fetch(s, e)?,
            None => sequence.seq()?,
        };
        writeln!(writer, ">{}", sequence.name()?)?;
        writer.write_all(&seq)?;
        writeln!(writer)?;
    }

    Ok(())
}

fn looks_like_fastq(path: &std::path::Path) -> bool {
    let name = path.to_string_lossy().to_ascii_lowercase();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    name.ends_with(".fq") || name.ends_with(".fastq")
}

/// Parse args and set up logging.
pub fn setup() -> Opts {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    Opts::parse()
}
