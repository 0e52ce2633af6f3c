use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use env_logger::Env;

use crate::engine::fasta::Fasta;
use crate::engine::fastq::Fastq;
use crate::engine::OpenOptions;
use crate::utils::built_info;

/// Print aggregate statistics (composition, N50/L50, mean/median length)
/// for a FASTA/FASTQ file.
#[derive(Parser, Debug)]
#[clap(name = "stats", version = built_info::VERSION.as_str())]
pub struct Opts {
    /// The FASTA/FASTQ file to summarize (plain or gzip-compressed).
    #[clap(short = 'i', long, display_order = 1)]
    pub input: PathBuf,

    /// Treat `input` as FASTQ rather than inferring from its extension.
    #[clap(long, display_order = 2)]
    pub fastq: bool,

    /// The `x` in N{x}/L{x} (e.g. 50 for N50/L50).
    #[clap(long, default_value = "50", display_order = 3)]
    pub nl: u8,
}

pub fn run(opts: &Opts) -> Result<()> {
    let options = OpenOptions::new();

    if opts.fastq || looks_like_fastq(&opts.input) {
        let fastq = Fastq::open(&opts.input, options)?;
        let stats = fastq.statistics()?;
        println!("type\tDNA");
        print_common(&stats, opts.nl)?;
        if fastq.len()? > 0 {
            let detected = fastq.encoding_type(10_000)?;
            let names: Vec<&str> = detected.schemes.iter().map(|s| s.name()).collect();
            println!("phred\t{}", detected.phred);
            println!("encoding\t{}", names.join(", "));
        }
    } else {
        let fasta = Fasta::open(&opts.input, options)?;
        let stats = fasta.statistics()?;
        println!("type\t{}", fasta.seq_type()?);
        print_common(&stats, opts.nl)?;
    }
    Ok(())
}

fn print_common(stats: &crate::engine::stats::Statistics, nl: u8) -> Result<()> {
    let (n, l) = stats.nl(nl)?;
    println!("records\t{}", stats.count_records()?);
    println!("total_length\t{}", stats.size()?);
    println!("mean_length\t{:.2}", stats.mean()?);
    println!("median_length\t{:.2}", stats.median()?);
    if let Some(c) = stats.composition()? {
        println!("composition\tA={} C={} G={} T={} N={}", c.a, c.c, c.g, c.t, c.n);
    }
    println!("gc_content\t{:.4}", stats.gc_content()?);
    println!("gc_skew\t{:.4}", stats.gc_skew()?);
    println!("longest_ordinal\t{}", stats.longest()?);
    println!("shortest_ordinal\t{}", stats.shortest()?);
    println!("n{nl}\t{n}");
    println!("l{nl}\t{l}");
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
