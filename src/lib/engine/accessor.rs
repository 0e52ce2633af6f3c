//! `RecordAccessor`: byte-exact extraction of whole records and arbitrary
//! sub-ranges, plus the sequence transforms built on top of it.
//!
//! The offset arithmetic is the generalization of
//! `onecodex-needletail/src/parser/fai.rs`'s `FaiEntry::region` /
//! `FetchRegion::strip_newlines` to multi-interval fetches and to sources
//! that may be gzip-compressed (in which case reads are served by
//! [`crate::engine::gzip_index::GzipRandomAccess`] instead of a direct
//! file seek).

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::Path,
};

use memchr::memmem;

use crate::engine::gzip_index::GzipRandomAccess;
use crate::engine::index_store::{IndexStore, RecordEntry};
use crate::error::{FxiError, Result};

/// Reads and transforms record data for one indexed source.
pub struct RecordAccessor<'a> {
    store: &'a IndexStore,
    source_path: &'a Path,
    gzip: Option<&'a GzipRandomAccess>,
    uppercase: bool,
}

impl<'a> RecordAccessor<'a> {
    #[must_use]
    pub fn new(store: &'a IndexStore, source_path: &'a Path, gzip: Option<&'a GzipRandomAccess>, uppercase: bool) -> RecordAccessor<'a> {
        RecordAccessor { store, source_path, gzip, uppercase }
    }

    /// Fetches the full header line of `ordinal`, minus the sigil and
    /// trailing terminator (pyfastx's `description`/faidx's `long_name`).
    pub fn description(&self, ordinal: u64) -> Result<Vec<u8>> {
        let record = self.store.record(ordinal)?;
        self.read_bytes(record.desc_offset, record.desc_length as u64)
    }

    /// Fetches the full sequence of `ordinal`.
    pub fn sequence(&self, ordinal: u64) -> Result<Vec<u8>> {
        let record = self.store.record(ordinal)?;
        self.fetch_one(record, record.seq_offset, 1, record.seq_length as i64)
    }

    /// Fetches the full quality string of `ordinal` (FASTQ only).
    pub fn quality(&self, ordinal: u64) -> Result<Vec<u8>> {
        let record = self.store.record(ordinal)?;
        if record.qual_offset == u64::MAX {
            return Err(FxiError::WrongTypeArgument("quality requested on a FASTA record".into()));
        }
        self.fetch_one(record, record.qual_offset, 1, record.seq_length as i64)
    }

    /// Fetches `[start, end]` (1-based, inclusive) of `ordinal`'s sequence.
    pub fn fetch(&self, ordinal: u64, start: i64, end: i64) -> Result<Vec<u8>> {
        let record = self.store.record(ordinal)?;
        self.fetch_one(record, record.seq_offset, start, end)
    }

    /// Fetches several intervals and concatenates them in the order given,
    /// without merging or sorting: caller order is preserved.
    pub fn fetch_multi(&self, ordinal: u64, intervals: &[(i64, i64)]) -> Result<Vec<u8>> {
        let record = self.store.record(ordinal)?;
        let mut out = Vec::new();
        for &(start, end) in intervals {
            out.extend(self.fetch_one(record, record.seq_offset, start, end)?);
        }
        Ok(out)
    }

    fn fetch_one(&self, record: &RecordEntry, base_offset: u64, start: i64, end: i64) -> Result<Vec<u8>> {
        if start < 1 || end as u64 > record.seq_length || start > end {
            return Err(FxiError::InvalidInterval {
                start,
                end,
                reason: format!("valid range is [1, {}]", record.seq_length),
            });
        }
        let start0 = (start - 1) as u64;
        let end0 = end as u64; // exclusive

        let mut raw = if record.irregular {
            self.slow_scan(base_offset, record, start0, end0)?
        } else {
            self.fast_region(base_offset, record, start0, end0)?
        };
        if self.uppercase {
            raw.make_ascii_uppercase();
        }
        Ok(raw)
    }

    /// Regular-geometry path: compute the raw byte span covering
    /// `[start0, end0)`, read it in one shot, then strip embedded line
    /// terminators.
    fn fast_region(&self, base_offset: u64, record: &RecordEntry, start0: u64, end0: u64) -> Result<Vec<u8>> {
        let line_net = record.line_net as u64;
        let line_len = record.line_len as u64;
        let term_len = record.terminator.len() as u64;

        if line_net == 0 {
            return Ok(Vec::new());
        }
        let start_line = start0 / line_net;
        let start_col = start0 % line_net;
        let last_base = end0 - 1;
        let end_line = last_base / line_net;
        let end_col = last_base % line_net;

        let byte_start = base_offset + start_line * line_len + start_col;
        let byte_end = base_offset + end_line * line_len + end_col + 1;
        let to_read = byte_end - byte_start;

        let raw = self.read_bytes(byte_start, to_read)?;
        Ok(strip_newlines(&raw, line_net, start_col, term_len))
    }

    /// Fallback for records whose wrap width is not uniform: scans the
    /// whole record line by line, then slices the clean sequence.
    fn slow_scan(&self, base_offset: u64, record: &RecordEntry, start0: u64, end0: u64) -> Result<Vec<u8>> {
        let mut clean = Vec::with_capacity(record.seq_length as usize);
        let mut offset = base_offset;
        let chunk_cap = 4096u64;
        while (clean.len() as u64) < record.seq_length {
            let remaining = record.seq_length - clean.len() as u64;
            let to_read = chunk_cap.min(remaining + remaining / 60 + 8);
            let raw = self.read_bytes(offset, to_read)?;
            if raw.is_empty() {
                break;
            }
            let mut consumed_any = false;
            for line in raw.split_inclusive(|&b| b == b'\n') {
                if line.is_empty() {
                    continue;
                }
                let mut body = line;
                if body.ends_with(b"\n") {
                    body = &body[..body.len() - 1];
                }
                if body.ends_with(b"\r") {
                    body = &body[..body.len() - 1];
                }
                clean.extend_from_slice(body);
                offset += line.len() as u64;
                consumed_any = true;
                if clean.len() as u64 >= record.seq_length {
                    break;
                }
            }
            if !consumed_any {
                break;
            }
        }
        clean.truncate(record.seq_length as usize);
        Ok(clean[start0 as usize..end0 as usize].to_vec())
    }

    fn read_bytes(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        match self.gzip {
            Some(gra) => gra.read(offset, len),
            None => {
                let mut file = File::open(self.source_path).map_err(|_| FxiError::FileNotFound(self.source_path.to_path_buf()))?;
                file.seek(SeekFrom::Start(offset))?;
                let mut buf = vec![0u8; len as usize];
                file.read_exact(&mut buf)?;
                Ok(buf)
            }
        }
    }

    /// Position (1-based) of the first occurrence of `pattern` in
    /// `ordinal`'s sequence, or `None` if absent.
    pub fn search(&self, ordinal: u64, pattern: &[u8]) -> Result<Option<u64>> {
        let seq = self.sequence(ordinal)?;
        Ok(memmem::find(&seq, pattern).map(|pos| pos as u64 + 1))
    }
}

/// Removes embedded line terminators from a raw byte span that began
/// `start_col` bases into a wrapped line of `line_net` net bytes.
fn strip_newlines(raw: &[u8], line_net: u64, start_col: u64, term_len: u64) -> Vec<u8> {
    if term_len == 0 {
        return raw.to_vec();
    }
    let mut out = Vec::with_capacity(raw.len());
    let mut pos = 0usize;
    let mut chunk = ((line_net - start_col) as usize).min(raw.len());
    loop {
        out.extend_from_slice(&raw[pos..pos + chunk]);
        pos += chunk;
        if pos >= raw.len() {
            break;
        }
        let skip = (term_len as usize).min(raw.len() - pos);
        pos += skip;
        if pos >= raw.len() {
            break;
        }
        chunk = (line_net as usize).min(raw.len() - pos);
    }
    out
}

/// Maps each IUPAC nucleotide code to its complement, case-preserving.
/// Ambiguity codes complement to their paired ambiguity code; anything
/// else (including `U`, left to the RNA/DNA caller to normalize) passes
/// through unchanged.
#[must_use]
pub fn complement_base(b: u8) -> u8 {
    match b {
        b'A' => b'T',
        b'T' => b'A',
        b'U' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        b'R' => b'Y',
        b'Y' => b'R',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        b'S' => b'S',
        b'W' => b'W',
        b'N' => b'N',
        b'a' => b't',
        b't' => b'a',
        b'u' => b'a',
        b'g' => b'c',
        b'c' => b'g',
        b'r' => b'y',
        b'y' => b'r',
        b'k' => b'm',
        b'm' => b'k',
        b'b' => b'v',
        b'v' => b'b',
        b'd' => b'h',
        b'h' => b'd',
        b's' => b's',
        b'w' => b'w',
        b'n' => b'n',
        other => other,
    }
}

/// Base-by-base complement, preserving order.
#[must_use]
pub fn complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&b| complement_base(b)).collect()
}

/// Reverse complement ("antisense"): complement, then reverse.
#[must_use]
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    let mut out = complement(seq);
    out.reverse();
    out
}

/// Folds a DNA-table complement result (`T`/`t`) to its RNA equivalent
/// (`U`/`u`), per spec.md §4.E: "For RNA, `T` and `U` collapse per the
/// declared type." DNA/protein sequences pass through [`complement_base`]
/// unchanged.
#[must_use]
fn collapse_to_rna(b: u8) -> u8 {
    match b {
        b'T' => b'U',
        b't' => b'u',
        other => other,
    }
}

/// Base-by-base complement, folding `T` to `U` when `is_rna` is set.
#[must_use]
pub fn complement_typed(seq: &[u8], is_rna: bool) -> Vec<u8> {
    if is_rna {
        seq.iter().map(|&b| collapse_to_rna(complement_base(b))).collect()
    } else {
        complement(seq)
    }
}

/// Reverse complement, folding `T` to `U` when `is_rna` is set.
#[must_use]
pub fn reverse_complement_typed(seq: &[u8], is_rna: bool) -> Vec<u8> {
    let mut out = complement_typed(seq, is_rna);
    out.reverse();
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::index_store::{Format, Meta, SeqType};
    use crate::engine::line_geometry::Terminator;
    use std::io::Write as _;

    fn build_store(contents: &[u8], line_net: u32, seq_length: u64) -> (tempfile::TempDir, std::path::PathBuf, IndexStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seq.fa");
        std::fs::File::create(&path).unwrap().write_all(contents).unwrap();

        let record = RecordEntry {
            desc_offset: 1,
            desc_length: 4,
            seq_offset: 10, // after ">seq1\n"
            seq_length,
            qual_offset: u64::MAX,
            name_offset: 0,
            name_len: 4,
            line_net,
            line_len: line_net + 1,
            terminator: Terminator::Lf,
            irregular: false,
            g_count: 0,
            c_count: 0,
            a_count: 0,
            t_count: 0,
            n_count: 0,
            other_count: 0,
        };
        let names_blob = b"seq1".to_vec();
        let meta = Meta {
            format: Format::Fasta,
            source_path: path.clone(),
            source_is_gzip: false,
            source_size: contents.len() as u64,
            full_name: false,
            record_count: 1,
            seq_type: SeqType::Dna,
        };
        let store = IndexStore::build(meta, vec![record], names_blob, None);
        (dir, path, store)
    }

    #[test]
    fn test_fetch_full_record() {
        let (_dir, path, store) = build_store(b">seq1\nACGTACGT\n", 8, 8);
        let accessor = RecordAccessor::new(&store, &path, None, false);
        assert_eq!(accessor.sequence(0).unwrap(), b"ACGTACGT");
    }

    #[test]
    fn test_fetch_sub_range_within_one_line() {
        let (_dir, path, store) = build_store(b">seq1\nACGTACGT\n", 8, 8);
        let accessor = RecordAccessor::new(&store, &path, None, false);
        assert_eq!(accessor.fetch(0, 2, 4).unwrap(), b"CGT");
    }

    #[test]
    fn test_fetch_sub_range_across_wrapped_lines() {
        let (_dir, path, store) = build_store(b">seq1\nACGT\nACGT\n", 4, 8);
        let accessor = RecordAccessor::new(&store, &path, None, false);
        // bases 3..6 span the line break: "GT" + "AC"
        assert_eq!(accessor.fetch(0, 3, 6).unwrap(), b"GTAC");
    }

    #[test]
    fn test_fetch_out_of_range_rejected() {
        let (_dir, path, store) = build_store(b">seq1\nACGT\n", 4, 4);
        let accessor = RecordAccessor::new(&store, &path, None, false);
        assert!(matches!(accessor.fetch(0, 1, 10), Err(FxiError::InvalidInterval { .. })));
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"ACGT"), b"ACGT");
        assert_eq!(reverse_complement(b"AAGG"), b"CCTT");
    }

    #[test]
    fn test_reverse_complement_rna_collapses_t_to_u() {
        assert_eq!(reverse_complement_typed(b"ACGU", true), b"ACGU");
        assert_eq!(complement_typed(b"AAGG", true), b"UUCC");
        assert_eq!(reverse_complement_typed(b"AAGG", false), b"CCTT");
    }

    #[test]
    fn test_search_finds_position() {
        let (_dir, path, store) = build_store(b">seq1\nACGTACGT\n", 8, 8);
        let accessor = RecordAccessor::new(&store, &path, None, false);
        assert_eq!(accessor.search(0, b"GTAC").unwrap(), Some(3));
        assert_eq!(accessor.search(0, b"TTTT").unwrap(), None);
    }

    #[test]
    fn test_unknown_ordinal() {
        let (_dir, path, store) = build_store(b">seq1\nACGT\n", 4, 4);
        let accessor = RecordAccessor::new(&store, &path, None, false);
        assert!(matches!(accessor.sequence(5), Err(FxiError::OutOfRange { .. })));
    }
}
