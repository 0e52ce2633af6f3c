use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use env_logger::Env;

use crate::engine::fasta::Fasta;
use crate::engine::fastq::Fastq;
use crate::engine::keyview::{KeyView, Predicate, SortKey};
use crate::engine::OpenOptions;
use crate::utils::built_info;

/// List record names, with optional length/prefix filtering and sorting.
#[derive(Parser, Debug)]
#[clap(name = "keys", version = built_info::VERSION.as_str())]
pub struct Opts {
    /// The FASTA/FASTQ file to list (plain or gzip-compressed).
    #[clap(short = 'i', long, display_order = 1)]
    pub input: PathBuf,

    /// Treat `input` as FASTQ rather than inferring from its extension.
    #[clap(long, display_order = 2)]
    pub fastq: bool,

    /// Only names starting with this prefix.
    #[clap(long, display_order = 3)]
    pub prefix: Option<String>,

    /// Only records at least this long.
    #[clap(long, display_order = 4)]
    pub min_len: Option<u64>,

    /// Only records at most this long.
    #[clap(long, display_order = 4)]
    pub max_len: Option<u64>,

    /// Sort by sequence length instead of on-disk order.
    #[clap(long, display_order = 5)]
    pub sort_by_length: bool,

    /// Reverse the chosen sort order.
    #[clap(long, display_order = 5)]
    pub reverse: bool,
}

pub fn run(opts: &Opts) -> Result<()> {
    let options = OpenOptions::new();

    if opts.fastq || looks_like_fastq(&opts.input) {
        let fastq = Fastq::open(&opts.input, options)?;
        print_keys(&fastq.keys()?, opts)
    } else {
        let fasta = Fasta::open(&opts.input, options)?;
        print_keys(&fasta.keys()?, opts)
    }
}

fn print_keys(view: &KeyView, opts: &Opts) -> Result<()> {
    let mut predicates = Vec::new();
    if let Some(prefix) = &opts.prefix {
        predicates.push(Predicate::NamePrefix(prefix.as_bytes().to_vec()));
    }
    match (opts.min_len, opts.max_len) {
        (Some(lo), Some(hi)) => predicates.push(Predicate::LenRange(lo, hi)),
        (Some(lo), None) => predicates.push(Predicate::LenRange(lo, u64::MAX)),
        (None, Some(hi)) => predicates.push(Predicate::LenRange(0, hi)),
        (None, None) => {}
    }

    let matching: std::collections::HashSet<u64> = if predicates.is_empty() {
        view.iter().map(|(ord, _)| ord).collect()
    } else {
        view.filter(&predicates).into_iter().collect()
    };

    let ordinals = if opts.sort_by_length {
        view.sort(SortKey::Length, opts.reverse)
    } else {
        let mut ordinals: Vec<u64> = view.iter().map(|(ord, _)| ord).collect();
        if opts.reverse {
            ordinals.reverse();
        }
        ordinals
    };

    for ordinal in ordinals {
        if matching.contains(&ordinal) {
            println!("{}", String::from_utf8_lossy(view.get(ordinal as i64)?));
        }
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
