//! `IndexStore`: the persistent, on-disk index backing random access once
//! a file has been indexed.
//!
//! The on-disk layout is four logical blocks written back to back after a
//! fixed header:
//!
//! ```text
//! [ magic (8) | version (4) ][ meta (bincode) ][ records (fixed width) ]
//! [ names (blob) ][ sorted name index ][ gzip checkpoints, if any ]
//! ```
//!
//! `records` is fixed-width so any ordinal can be located by arithmetic
//! alone. `names` is a variable-length blob referenced by
//! offset/length from each record; `sorted name index` is a permutation of
//! ordinals sorted by name bytes, enabling O(log N) name lookup and
//! prefix search without a full hash map on disk.

use std::{
    fmt,
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::engine::gzip_index::{self, Checkpoint};
use crate::engine::line_geometry::Terminator;
use crate::error::{FxiError, Result};

const MAGIC: &[u8; 8] = b"FXIIDX\0\0";
const CURRENT_VERSION: u32 = 1;

/// Which grammar an indexed source follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Format {
    Fasta,
    Fastq,
}

/// The molecule alphabet observed in the first record, per spec.md §3:
/// `DNA` (subset of `ACGTN`), `RNA` (subset of `ACGUN`), or `Protein`
/// (anything else).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeqType {
    Dna,
    Rna,
    Protein,
}

impl SeqType {
    /// Classifies a record's alphabet, scanning every byte once.
    ///
    /// An all-`N` or empty sequence is classified `Dna` (the spec's
    /// examples treat an all-`N` record as DNA; see scenario 1's `"NNN"`).
    #[must_use]
    pub fn classify(seq: &[u8]) -> SeqType {
        let mut saw_u = false;
        let mut saw_t = false;
        for &b in seq {
            match b.to_ascii_uppercase() {
                b'A' | b'C' | b'G' | b'N' => {}
                b'T' => saw_t = true,
                b'U' => saw_u = true,
                _ => return SeqType::Protein,
            }
        }
        if saw_u && !saw_t {
            SeqType::Rna
        } else {
            SeqType::Dna
        }
    }
}

impl fmt::Display for SeqType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SeqType::Dna => "DNA",
            SeqType::Rna => "RNA",
            SeqType::Protein => "protein",
        })
    }
}

/// File-level metadata, persisted with `bincode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    pub format: Format,
    pub source_path: PathBuf,
    pub source_is_gzip: bool,
    pub source_size: u64,
    pub full_name: bool,
    pub record_count: u64,
    /// Classified from the first record's alphabet, for both FASTA and
    /// FASTQ sources (a FASTQ read set is a DNA/RNA source in practice,
    /// but is classified the same way rather than hardcoded).
    pub seq_type: SeqType,
}

/// One record's geometry and per-base composition counts, fixed-width on
/// disk so ordinal `i` lives at a statically known byte offset.
#[derive(Debug, Clone, Copy)]
pub struct RecordEntry {
    /// Byte offset of the first byte of the header line's description
    /// (i.e. just past the `>`/`@` sigil).
    pub desc_offset: u64,
    /// Length, in bytes, of the description (full header line minus
    /// sigil and trailing terminator).
    pub desc_length: u32,
    /// Byte offset of the first sequence byte (compressed-file offset if
    /// the source is gzip; resolved via `GzipRandomAccess` in that case).
    pub seq_offset: u64,
    /// Number of bases.
    pub seq_length: u64,
    /// Byte offset of the first quality byte; `u64::MAX` for FASTA.
    pub qual_offset: u64,
    /// Offset into the names blob.
    pub name_offset: u64,
    /// Length, in bytes, of the name in the names blob.
    pub name_len: u32,
    /// Net (terminator-free) bytes per wrapped sequence line.
    pub line_net: u32,
    /// Full (terminator-included) bytes per wrapped sequence line.
    pub line_len: u32,
    pub terminator: Terminator,
    pub irregular: bool,
    pub g_count: u64,
    pub c_count: u64,
    pub a_count: u64,
    pub t_count: u64,
    /// Count of `N`/`n` bases, tracked separately from `other_count` per
    /// spec.md §3's `{A,C,G,T,N}` composition.
    pub n_count: u64,
    /// Count of bytes that are neither `A,C,G,T,U,N` (case-insensitive);
    /// always `0` for a record classified `Dna`/`Rna`.
    pub other_count: u64,
}

impl RecordEntry {
    fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u64::<LittleEndian>(self.desc_offset)?;
        w.write_u64::<LittleEndian>(self.seq_offset)?;
        w.write_u64::<LittleEndian>(self.seq_length)?;
        w.write_u64::<LittleEndian>(self.qual_offset)?;
        w.write_u64::<LittleEndian>(self.name_offset)?;
        w.write_u64::<LittleEndian>(self.g_count)?;
        w.write_u64::<LittleEndian>(self.c_count)?;
        w.write_u64::<LittleEndian>(self.a_count)?;
        w.write_u64::<LittleEndian>(self.t_count)?;
        w.write_u64::<LittleEndian>(self.n_count)?;
        w.write_u64::<LittleEndian>(self.other_count)?;
        w.write_u32::<LittleEndian>(self.desc_length)?;
        w.write_u32::<LittleEndian>(self.name_len)?;
        w.write_u32::<LittleEndian>(self.line_net)?;
        w.write_u32::<LittleEndian>(self.line_len)?;
        w.write_u8(matches!(self.terminator, Terminator::CrLf) as u8)?;
        w.write_u8(self.irregular as u8)?;
        Ok(())
    }

    fn read<R: Read>(r: &mut R) -> io::Result<RecordEntry> {
        let desc_offset = r.read_u64::<LittleEndian>()?;
        let seq_offset = r.read_u64::<LittleEndian>()?;
        let seq_length = r.read_u64::<LittleEndian>()?;
        let qual_offset = r.read_u64::<LittleEndian>()?;
        let name_offset = r.read_u64::<LittleEndian>()?;
        let g_count = r.read_u64::<LittleEndian>()?;
        let c_count = r.read_u64::<LittleEndian>()?;
        let a_count = r.read_u64::<LittleEndian>()?;
        let t_count = r.read_u64::<LittleEndian>()?;
        let n_count = r.read_u64::<LittleEndian>()?;
        let other_count = r.read_u64::<LittleEndian>()?;
        let desc_length = r.read_u32::<LittleEndian>()?;
        let name_len = r.read_u32::<LittleEndian>()?;
        let line_net = r.read_u32::<LittleEndian>()?;
        let line_len = r.read_u32::<LittleEndian>()?;
        let terminator = if r.read_u8()? == 1 { Terminator::CrLf } else { Terminator::Lf };
        let irregular = r.read_u8()? == 1;
        Ok(RecordEntry {
            desc_offset,
            desc_length,
            seq_offset,
            seq_length,
            qual_offset,
            name_offset,
            name_len,
            line_net,
            line_len,
            terminator,
            irregular,
            g_count,
            c_count,
            a_count,
            t_count,
            n_count,
            other_count,
        })
    }
}

/// The full in-memory representation of a loaded (or freshly built) index.
#[derive(Debug, Clone)]
pub struct IndexStore {
    pub meta: Meta,
    records: Vec<RecordEntry>,
    names_blob: Vec<u8>,
    /// Ordinals permuted into name-sorted order.
    sorted_ordinals: Vec<u64>,
    /// `(is_bgzf, checkpoints)`, present only when `meta.source_is_gzip`.
    pub checkpoints: Option<(bool, Vec<Checkpoint>)>,
}

impl IndexStore {
    /// Default sibling index path for a source file (`reads.fq.gz` ->
    /// `reads.fq.gz.fxi`).
    #[must_use]
    pub fn index_path_for(source: &Path) -> PathBuf {
        let mut name = source.as_os_str().to_owned();
        name.push(".fxi");
        PathBuf::from(name)
    }

    /// Assembles a store from freshly indexed data (called by
    /// `FastaIndexer`/`FastqIndexer`), sorting the name index.
    pub fn build(
        meta: Meta,
        records: Vec<RecordEntry>,
        names_blob: Vec<u8>,
        checkpoints: Option<(bool, Vec<Checkpoint>)>,
    ) -> IndexStore {
        let mut sorted_ordinals: Vec<u64> = (0..records.len() as u64).collect();
        sorted_ordinals.sort_by(|&a, &b| {
            let na = name_bytes(&records[a as usize], &names_blob);
            let nb = name_bytes(&records[b as usize], &names_blob);
            na.cmp(nb)
        });
        IndexStore { meta, records, names_blob, sorted_ordinals, checkpoints }
    }

    /// Writes the store atomically to `path` via a same-directory temp
    /// file and `rename`.
    pub fn write(&self, path: &Path) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut w = BufWriter::new(tmp.as_file_mut());
            w.write_all(MAGIC)?;
            w.write_u32::<LittleEndian>(CURRENT_VERSION)?;

            let meta_bytes = bincode::serialize(&self.meta)
                .map_err(|e| FxiError::CorruptStream { offset: 0, reason: e.to_string() })?;
            w.write_u64::<LittleEndian>(meta_bytes.len() as u64)?;
            w.write_all(&meta_bytes)?;

            w.write_u64::<LittleEndian>(self.records.len() as u64)?;
            for record in &self.records {
                record.write(&mut w)?;
            }

            w.write_u64::<LittleEndian>(self.names_blob.len() as u64)?;
            w.write_all(&self.names_blob)?;

            w.write_u64::<LittleEndian>(self.sorted_ordinals.len() as u64)?;
            for &ord in &self.sorted_ordinals {
                w.write_u64::<LittleEndian>(ord)?;
            }

            match &self.checkpoints {
                Some((is_bgzf, checkpoints)) => {
                    w.write_u8(1)?;
                    w.write_u8(*is_bgzf as u8)?;
                    gzip_index::write_checkpoints(&mut w, checkpoints)?;
                }
                None => {
                    w.write_u8(0)?;
                }
            }
            w.flush()?;
        }
        tmp.persist(path).map_err(|e| FxiError::Io(e.error))?;
        Ok(())
    }

    /// Reads a store previously written by [`IndexStore::write`].
    pub fn read(path: &Path) -> Result<IndexStore> {
        let file = File::open(path).map_err(|_| FxiError::FileNotFound(path.to_path_buf()))?;
        let mut r = BufReader::new(file);

        let mut magic = [0u8; 8];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(FxiError::CorruptStream { offset: 0, reason: "bad index magic".into() });
        }
        let version = r.read_u32::<LittleEndian>()?;
        if version != CURRENT_VERSION {
            return Err(FxiError::IndexVersionMismatch { found: version, expected: CURRENT_VERSION });
        }

        let meta_len = r.read_u64::<LittleEndian>()? as usize;
        let mut meta_bytes = vec![0u8; meta_len];
        r.read_exact(&mut meta_bytes)?;
        let meta: Meta = bincode::deserialize(&meta_bytes)
            .map_err(|e| FxiError::CorruptStream { offset: 0, reason: e.to_string() })?;

        let record_count = r.read_u64::<LittleEndian>()? as usize;
        let mut records = Vec::with_capacity(record_count);
        for _ in 0..record_count {
            records.push(RecordEntry::read(&mut r)?);
        }

        let names_len = r.read_u64::<LittleEndian>()? as usize;
        let mut names_blob = vec![0u8; names_len];
        r.read_exact(&mut names_blob)?;

        let sorted_len = r.read_u64::<LittleEndian>()? as usize;
        let mut sorted_ordinals = Vec::with_capacity(sorted_len);
        for _ in 0..sorted_len {
            sorted_ordinals.push(r.read_u64::<LittleEndian>()?);
        }

        let has_checkpoints = r.read_u8()? == 1;
        let checkpoints = if has_checkpoints {
            let is_bgzf = r.read_u8()? == 1;
            let checkpoints = gzip_index::read_checkpoints(&mut r)?;
            Some((is_bgzf, checkpoints))
        } else {
            None
        };

        Ok(IndexStore { meta, records, names_blob, sorted_ordinals, checkpoints })
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.records.len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, ordinal: u64) -> Result<&RecordEntry> {
        self.records
            .get(ordinal as usize)
            .ok_or(FxiError::OutOfRange { ord: ordinal as i64, len: self.len() })
    }

    pub fn name(&self, ordinal: u64) -> Result<&[u8]> {
        let record = self.record(ordinal)?;
        Ok(name_bytes(record, &self.names_blob))
    }

    /// Looks up an ordinal by exact name, via binary search over the
    /// name-sorted permutation.
    pub fn ordinal_of(&self, name: &[u8]) -> Result<u64> {
        self.sorted_ordinals
            .binary_search_by(|&ord| name_bytes(&self.records[ord as usize], &self.names_blob).cmp(name))
            .map(|pos| self.sorted_ordinals[pos])
            .map_err(|_| FxiError::UnknownName(String::from_utf8_lossy(name).into_owned()))
    }

    /// Returns every ordinal whose name starts with `prefix`, in
    /// name-sorted order.
    #[must_use]
    pub fn ordinals_with_prefix(&self, prefix: &[u8]) -> Vec<u64> {
        let lower = self
            .sorted_ordinals
            .partition_point(|&ord| name_bytes(&self.records[ord as usize], &self.names_blob) < prefix);
        let mut out = Vec::new();
        for &ord in &self.sorted_ordinals[lower..] {
            let name = name_bytes(&self.records[ord as usize], &self.names_blob);
            if !name.starts_with(prefix) {
                break;
            }
            out.push(ord);
        }
        out
    }

    #[must_use]
    pub fn ordinals_in_order(&self) -> impl Iterator<Item = u64> {
        0..self.len()
    }
}

fn name_bytes<'a>(record: &RecordEntry, blob: &'a [u8]) -> &'a [u8] {
    let start = record.name_offset as usize;
    let end = start + record.name_len as usize;
    &blob[start..end]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_seq_type_classify() {
        assert_eq!(SeqType::classify(b"ACGTACGTN"), SeqType::Dna);
        assert_eq!(SeqType::classify(b"ACGUACGUN"), SeqType::Rna);
        assert_eq!(SeqType::classify(b"NNN"), SeqType::Dna);
        assert_eq!(SeqType::classify(b"MVLSPADKTNVKAA"), SeqType::Protein);
        assert_eq!(SeqType::classify(b""), SeqType::Dna);
    }

    #[test]
    fn test_seq_type_display() {
        assert_eq!(SeqType::Dna.to_string(), "DNA");
        assert_eq!(SeqType::Rna.to_string(), "RNA");
        assert_eq!(SeqType::Protein.to_string(), "protein");
    }

    fn sample_records(names: &[&str]) -> (Vec<RecordEntry>, Vec<u8>) {
        let mut blob = Vec::new();
        let mut records = Vec::new();
        for (i, name) in names.iter().enumerate() {
            let name_offset = blob.len() as u64;
            blob.extend_from_slice(name.as_bytes());
            records.push(RecordEntry {
                desc_offset: (i as u64) * 100,
                desc_length: name.len() as u32,
                seq_offset: (i as u64) * 100,
                seq_length: 50,
                qual_offset: u64::MAX,
                name_offset,
                name_len: name.len() as u32,
                line_net: 60,
                line_len: 61,
                terminator: Terminator::Lf,
                irregular: false,
                g_count: 10,
                c_count: 10,
                a_count: 15,
                t_count: 15,
                n_count: 0,
                other_count: 0,
            });
        }
        (records, blob)
    }

    fn sample_meta(record_count: u64) -> Meta {
        Meta {
            format: Format::Fasta,
            source_path: PathBuf::from("reads.fa"),
            source_is_gzip: false,
            source_size: 1000,
            full_name: false,
            record_count,
            seq_type: SeqType::Dna,
        }
    }

    #[test]
    fn test_ordinal_of_and_name_roundtrip() {
        let (records, blob) = sample_records(&["chr2", "chr1", "chr10"]);
        let store = IndexStore::build(sample_meta(3), records, blob, None);

        assert_eq!(store.name(0).unwrap(), b"chr2");
        assert_eq!(store.ordinal_of(b"chr1").unwrap(), 1);
        assert_eq!(store.ordinal_of(b"chr10").unwrap(), 2);
        assert!(matches!(store.ordinal_of(b"chrX"), Err(FxiError::UnknownName(_))));
    }

    #[test]
    fn test_prefix_search() {
        let (records, blob) = sample_records(&["chr1", "chr10", "chr2", "scaffold1"]);
        let store = IndexStore::build(sample_meta(4), records, blob, None);
        let mut hits = store.ordinals_with_prefix(b"chr1");
        hits.sort_unstable();
        assert_eq!(hits, vec![0, 1]);
    }

    #[test]
    fn test_write_read_roundtrip() {
        let (records, blob) = sample_records(&["a", "b", "c"]);
        let store = IndexStore::build(sample_meta(3), records, blob, None);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reads.fa.fxi");
        store.write(&path).unwrap();

        let loaded = IndexStore::read(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.name(1).unwrap(), b"b");
        assert_eq!(loaded.ordinal_of(b"c").unwrap(), 2);
    }

    #[test]
    fn test_version_mismatch_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.fxi");
        let mut f = File::create(&path).unwrap();
        f.write_all(MAGIC).unwrap();
        f.write_u32::<LittleEndian>(9999).unwrap();
        drop(f);

        let err = IndexStore::read(&path).unwrap_err();
        assert!(matches!(err, FxiError::IndexVersionMismatch { found: 9999, expected: CURRENT_VERSION }));
    }

    #[test]
    fn test_out_of_range_ordinal() {
        let (records, blob) = sample_records(&["a"]);
        let store = IndexStore::build(sample_meta(1), records, blob, None);
        assert!(matches!(store.record(5), Err(FxiError::OutOfRange { ord: 5, len: 1 })));
    }
}
