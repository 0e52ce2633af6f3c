//! `FastaIndexer`/`FastqIndexer`: one forward pass over a source file that
//! emits an [`IndexStore`].
//!
//! Name derivation, duplicate/empty-name rejection, and per-record base
//! composition are accumulated here; byte-offset bookkeeping defers to
//! [`crate::engine::line_geometry`]. When the source is gzip-compressed, a
//! [`crate::engine::gzip_index::GzipRandomAccess`] checkpoint table is
//! built in a separate pass over the same file.

use std::{
    collections::HashSet,
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use flate2::read::MultiGzDecoder;

use crate::engine::gzip_index::{self, GzipRandomAccess, DEFAULT_CHECKPOINT_INTERVAL};
use crate::engine::index_store::{Format, IndexStore, Meta, RecordEntry, SeqType};
use crate::engine::line_geometry::{LineGeometry, Terminator};
use crate::engine::OpenOptions;
use crate::error::{FxiError, Result};

/// Indexes a FASTA source.
pub struct FastaIndexer;

/// Indexes a FASTQ source.
pub struct FastqIndexer;

impl FastaIndexer {
    pub fn index(path: &Path, options: &OpenOptions) -> Result<IndexStore> {
        let is_gzip = gzip_index::gzip_check(path)?;
        let source_size = std::fs::metadata(path).map_err(|_| FxiError::FileNotFound(path.to_path_buf()))?.len();
        let mut reader = CountingReader::new(open_transparent(path, is_gzip)?);

        let mut records = Vec::new();
        let mut names_blob = Vec::new();
        let mut seen = HashSet::new();
        let mut seq_type = SeqType::Dna;

        let mut line = Vec::new();
        let mut current: Option<InProgressFasta> = None;

        loop {
            let line_start = reader.count();
            line.clear();
            let n = reader.read_until(b'\n', &mut line)?;
            if n == 0 {
                break;
            }
            if line[0] == b'>' {
                if let Some(record) = current.take() {
                    if records.is_empty() {
                        seq_type = record.composition.classify();
                    }
                    push_fasta_record(&mut records, &mut names_blob, record)?;
                }
                let name = derive_name(&line[1..], options)?;
                check_name(&name, &mut seen, records.len() as u64)?;
                let (desc, _) = strip_terminator(&line[1..]);
                current = Some(InProgressFasta {
                    name,
                    desc_offset: line_start + 1,
                    desc_length: desc.len() as u32,
                    seq_offset: reader.count(),
                    widths: Vec::new(),
                    terminator: None,
                    composition: Composition::default(),
                });
            } else {
                let record = current
                    .as_mut()
                    .ok_or_else(|| FxiError::MalformedRecord { ord: records.len() as u64, reason: "sequence line before any header".into() })?;
                let (net, term) = strip_terminator(&line);
                if record.terminator.is_none() {
                    record.terminator = Some(term);
                }
                record.composition.accumulate(net);
                record.widths.push(net.len() as u64);
            }
        }
        if let Some(record) = current.take() {
            if records.is_empty() {
                seq_type = record.composition.classify();
            }
            push_fasta_record(&mut records, &mut names_blob, record)?;
        }

        let checkpoints = if is_gzip {
            let gra = GzipRandomAccess::build(path, DEFAULT_CHECKPOINT_INTERVAL)?;
            Some((gra.is_bgzf(), gra.checkpoints().to_vec()))
        } else {
            None
        };

        let meta = Meta {
            format: Format::Fasta,
            source_path: path.to_path_buf(),
            source_is_gzip: is_gzip,
            source_size,
            full_name: options.full_name,
            record_count: records.len() as u64,
            seq_type,
        };
        Ok(IndexStore::build(meta, records, names_blob, checkpoints))
    }
}

impl FastqIndexer {
    pub fn index(path: &Path, options: &OpenOptions) -> Result<IndexStore> {
        let is_gzip = gzip_index::gzip_check(path)?;
        let source_size = std::fs::metadata(path).map_err(|_| FxiError::FileNotFound(path.to_path_buf()))?.len();
        let mut reader = CountingReader::new(open_transparent(path, is_gzip)?);

        let mut records = Vec::new();
        let mut names_blob = Vec::new();
        let mut seen = HashSet::new();
        let mut line = Vec::new();
        let mut ordinal = 0u64;
        let mut seq_type = SeqType::Dna;

        loop {
            let line_start = reader.count();
            line.clear();
            let n = reader.read_until(b'\n', &mut line)?;
            if n == 0 {
                break;
            }
            if line[0] != b'@' {
                return Err(FxiError::MalformedRecord { ord: ordinal, reason: "expected '@' header line".into() });
            }
            let name = derive_name(&line[1..], options)?;
            check_name(&name, &mut seen, ordinal)?;
            let (desc, _) = strip_terminator(&line[1..]);
            let desc_offset = line_start + 1;
            let desc_length = desc.len() as u32;

            let seq_offset = reader.count();
            line.clear();
            reader.read_until(b'\n', &mut line).map_err(FxiError::Io)?;
            let (seq, terminator) = strip_terminator(&line);
            let seq_len = seq.len() as u64;
            let mut composition = Composition::default();
            composition.accumulate(seq);

            line.clear();
            let n = reader.read_until(b'\n', &mut line)?;
            if n == 0 || line[0] != b'+' {
                return Err(FxiError::MalformedRecord { ord: ordinal, reason: "expected '+' separator line".into() });
            }

            let qual_offset = reader.count();
            line.clear();
            reader.read_until(b'\n', &mut line)?;
            let (qual, _) = strip_terminator(&line);
            if qual.len() as u64 != seq_len {
                return Err(FxiError::MalformedRecord {
                    ord: ordinal,
                    reason: format!("quality length {} does not match sequence length {}", qual.len(), seq_len),
                });
            }

            if ordinal == 0 {
                seq_type = composition.classify();
            }

            let name_offset = names_blob.len() as u64;
            names_blob.extend_from_slice(&name);
            records.push(RecordEntry {
                desc_offset,
                desc_length,
                seq_offset,
                seq_length: seq_len,
                qual_offset,
                name_offset,
                name_len: name.len() as u32,
                line_net: seq_len as u32,
                line_len: (seq_len + terminator.len() as u64) as u32,
                terminator,
                irregular: false,
                g_count: composition.g,
                c_count: composition.c,
                a_count: composition.a,
                t_count: composition.t,
                n_count: composition.n,
                other_count: composition.other,
            });
            ordinal += 1;
        }

        let checkpoints = if is_gzip {
            let gra = GzipRandomAccess::build(path, DEFAULT_CHECKPOINT_INTERVAL)?;
            Some((gra.is_bgzf(), gra.checkpoints().to_vec()))
        } else {
            None
        };

        let meta = Meta {
            format: Format::Fastq,
            source_path: path.to_path_buf(),
            source_is_gzip: is_gzip,
            source_size,
            full_name: options.full_name,
            record_count: records.len() as u64,
            seq_type,
        };
        Ok(IndexStore::build(meta, records, names_blob, checkpoints))
    }
}

struct InProgressFasta {
    name: Vec<u8>,
    desc_offset: u64,
    desc_length: u32,
    seq_offset: u64,
    widths: Vec<u64>,
    terminator: Option<Terminator>,
    composition: Composition,
}

fn push_fasta_record(records: &mut Vec<RecordEntry>, names_blob: &mut Vec<u8>, record: InProgressFasta) -> Result<()> {
    let terminator = record.terminator.unwrap_or(Terminator::Lf);
    let geometry = LineGeometry::from_line_widths(&record.widths, terminator);
    let seq_length: u64 = record.widths.iter().sum();

    let name_offset = names_blob.len() as u64;
    names_blob.extend_from_slice(&record.name);

    records.push(RecordEntry {
        desc_offset: record.desc_offset,
        desc_length: record.desc_length,
        seq_offset: record.seq_offset,
        seq_length,
        qual_offset: u64::MAX,
        name_offset,
        name_len: record.name.len() as u32,
        line_net: geometry.line_net as u32,
        line_len: geometry.line_len as u32,
        terminator,
        irregular: geometry.irregular,
        g_count: record.composition.g,
        c_count: record.composition.c,
        a_count: record.composition.a,
        t_count: record.composition.t,
        n_count: record.composition.n,
        other_count: record.composition.other,
    });
    Ok(())
}

/// Running per-base tallies for one record, plus the `T`/`U` occurrence
/// flags [`Composition::classify`] needs to tell DNA from RNA.
#[derive(Default)]
struct Composition {
    g: u64,
    c: u64,
    a: u64,
    t: u64,
    n: u64,
    other: u64,
    saw_t: bool,
    saw_u: bool,
}

impl Composition {
    fn accumulate(&mut self, seq: &[u8]) {
        for &b in seq {
            match b.to_ascii_uppercase() {
                b'G' => self.g += 1,
                b'C' => self.c += 1,
                b'A' => self.a += 1,
                b'T' => {
                    self.t += 1;
                    self.saw_t = true;
                }
                b'U' => {
                    self.t += 1;
                    self.saw_u = true;
                }
                b'N' => self.n += 1,
                _ => self.other += 1,
            }
        }
    }

    /// Classifies the record per spec.md §3: `Protein` if any non-nucleotide
    /// byte was seen, `Rna` if only `U` (never `T`) appeared, `Dna` otherwise.
    fn classify(&self) -> SeqType {
        if self.other > 0 {
            SeqType::Protein
        } else if self.saw_u && !self.saw_t {
            SeqType::Rna
        } else {
            SeqType::Dna
        }
    }
}

/// Derives a record name from a raw header line (the `>`/`@` already
/// stripped), per `key_func` > `full_name` > default-first-token
/// precedence.
pub(crate) fn derive_name(header: &[u8], options: &OpenOptions) -> Result<Vec<u8>> {
    let (header, _) = strip_terminator(header);
    let name = if let Some(key_func) = &options.key_func {
        key_func(header)
    } else if options.full_name {
        header.to_vec()
    } else {
        header.split(|&b| b == b' ' || b == b'\t').next().unwrap_or(&[]).to_vec()
    };
    Ok(name)
}

fn check_name(name: &[u8], seen: &mut HashSet<Vec<u8>>, ord: u64) -> Result<()> {
    if name.is_empty() {
        return Err(FxiError::EmptyName(ord));
    }
    if !seen.insert(name.to_vec()) {
        return Err(FxiError::DuplicateName(String::from_utf8_lossy(name).into_owned()));
    }
    Ok(())
}

/// Strips a trailing `\n` (and, if present, the preceding `\r`) from a raw
/// line buffer, returning the stripped slice and the detected terminator.
pub(crate) fn strip_terminator(line: &[u8]) -> (&[u8], Terminator) {
    if line.ends_with(b"\n") {
        let body = &line[..line.len() - 1];
        if body.ends_with(b"\r") {
            (&body[..body.len() - 1], Terminator::CrLf)
        } else {
            (body, Terminator::Lf)
        }
    } else {
        (line, Terminator::Lf)
    }
}

pub(crate) fn open_transparent(path: &Path, is_gzip: bool) -> Result<Box<dyn Read>> {
    let file = File::open(path).map_err(|_| FxiError::FileNotFound(path.to_path_buf()))?;
    if is_gzip {
        Ok(Box::new(MultiGzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Wraps a reader, counting bytes consumed so far, so line-oriented parsing
/// can record uncompressed byte offsets without a second pass.
struct CountingReader<R> {
    inner: BufReader<R>,
    count: u64,
}

impl<R: Read> CountingReader<R> {
    fn new(inner: R) -> CountingReader<R> {
        CountingReader { inner: BufReader::new(inner), count: 0 }
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn read_until(&mut self, delim: u8, buf: &mut Vec<u8>) -> Result<usize> {
        let n = self.inner.read_until(delim, buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write as _;

    fn write_temp(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seq.fa");
        std::fs::File::create(&path).unwrap().write_all(contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_fasta_index_basic() {
        let (_dir, path) = write_temp(b">seq1 description\nACGTACGT\n>seq2\nTTTT\nGG\n");
        let store = FastaIndexer::index(&path, &OpenOptions::default()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.name(0).unwrap(), b"seq1");
        assert_eq!(store.record(0).unwrap().seq_length, 8);
        assert_eq!(store.name(1).unwrap(), b"seq2");
        assert_eq!(store.record(1).unwrap().seq_length, 6);
    }

    #[test]
    fn test_fasta_full_name() {
        let (_dir, path) = write_temp(b">seq1 description here\nACGT\n");
        let options = OpenOptions::default().full_name(true);
        let store = FastaIndexer::index(&path, &options).unwrap();
        assert_eq!(store.name(0).unwrap(), b"seq1 description here");
    }

    #[test]
    fn test_fasta_duplicate_name_rejected() {
        let (_dir, path) = write_temp(b">dup\nACGT\n>dup\nTTTT\n");
        let err = FastaIndexer::index(&path, &OpenOptions::default()).unwrap_err();
        assert!(matches!(err, FxiError::DuplicateName(name) if name == "dup"));
    }

    #[test]
    fn test_fastq_index_basic() {
        let (_dir, path) = write_temp(b"@r1\nACGT\n+\nIIII\n@r2\nTTTT\n+\nFFFF\n");
        let mut fastq_path = path.clone();
        fastq_path.set_extension("fq");
        std::fs::rename(&path, &fastq_path).unwrap();
        let store = FastqIndexer::index(&fastq_path, &OpenOptions::default()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.name(0).unwrap(), b"r1");
        assert_eq!(store.record(0).unwrap().seq_length, 4);
    }

    #[test]
    fn test_fastq_mismatched_quality_length_rejected() {
        let (_dir, path) = write_temp(b"@r1\nACGT\n+\nIII\n");
        let err = FastqIndexer::index(&path, &OpenOptions::default()).unwrap_err();
        assert!(matches!(err, FxiError::MalformedRecord { ord: 0, .. }));
    }
}
