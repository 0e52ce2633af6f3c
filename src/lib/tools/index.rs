use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::info;

use crate::engine::fasta::Fasta;
use crate::engine::fastq::Fastq;
use crate::engine::OpenOptions;
use crate::utils::built_info;

/// Build (or refresh) a random-access index for a FASTA/FASTQ file.
#[derive(Parser, Debug)]
#[clap(name = "index", version = built_info::VERSION.as_str())]
pub struct Opts {
    /// The FASTA/FASTQ file to index (plain or gzip-compressed).
    #[clap(short = 'i', long, display_order = 1)]
    pub input: PathBuf,

    /// Treat `input` as FASTQ rather than inferring from its extension.
    #[clap(long, display_order = 2)]
    pub fastq: bool,

    /// Use the full header line (not just the first whitespace-delimited
    /// token) as each record's name.
    #[clap(long, display_order = 3)]
    pub full_name: bool,
}

pub fn run(opts: &Opts) -> Result<()> {
    let options = OpenOptions::new().full_name(opts.full_name);

    if opts.fastq || looks_like_fastq(&opts.input) {
        let fastq = Fastq::open(&opts.input, options)?;
        info!("indexed {} reads from {}", fastq.len()?, opts.input.display());
    } else {
        let fasta = Fasta::open(&opts.input, options)?;
        info!("indexed {} sequences from {}", fasta.len()?, opts.input.display());
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
