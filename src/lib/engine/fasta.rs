//! `Fasta`: the public facade over a FASTA source.
//!
//! Carries pyfastx's ambient surface alongside the core random-access API:
//! `is_gzip`, `contains`, a `Display` impl matching pyfastx's `__repr__`,
//! and a `build_index = false` streaming mode.

use std::{
    fmt,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::engine::accessor::RecordAccessor;
use crate::engine::gzip_index::{self, GzipRandomAccess};
use crate::engine::index_store::{IndexStore, SeqType};
use crate::engine::indexer::{derive_name, open_transparent, strip_terminator, FastaIndexer};
use crate::engine::keyview::KeyView;
use crate::engine::stats::Statistics;
use crate::engine::OpenOptions;
use crate::error::{FxiError, Result};

/// Shared engine state behind a `Fasta` handle. Holding this behind an
/// `Arc` (rather than inline in `Fasta`) is what lets `Sequence` handles
/// keep a non-owning `Weak` reference to it.
pub struct FastaInner {
    pub(crate) store: Option<IndexStore>,
    pub(crate) source_path: PathBuf,
    pub(crate) gzip: Option<GzipRandomAccess>,
    pub(crate) options: OpenOptions,
}

impl FastaInner {
    pub(crate) fn accessor(&self) -> RecordAccessor<'_> {
        let store = self.store.as_ref().expect("indexed operation guarded by require_index");
        RecordAccessor::new(store, &self.source_path, self.gzip.as_ref(), self.options.uppercase)
    }

    fn require_index(&self) -> Result<&IndexStore> {
        self.store.as_ref().ok_or(FxiError::StreamingOnly)
    }
}

/// A FASTA source, optionally backed by a persistent random-access index.
pub struct Fasta {
    inner: Arc<FastaInner>,
}

impl Fasta {
    /// Opens `path`, building (or loading an up-to-date) index unless
    /// `options.build_index` is `false`.
    pub fn open<P: AsRef<Path>>(path: P, options: OpenOptions) -> Result<Fasta> {
        let path = path.as_ref();
        let is_gzip = gzip_index::gzip_check(path)?;

        let store = if options.build_index {
            Some(Self::load_or_build(path, &options)?)
        } else {
            None
        };
        let gzip = match &store {
            Some(store) => match &store.checkpoints {
                Some((is_bgzf, checkpoints)) => {
                    Some(GzipRandomAccess::from_checkpoints(path.to_path_buf(), *is_bgzf, checkpoints.clone()))
                }
                None => None,
            },
            None => None,
        };

        Ok(Fasta { inner: Arc::new(FastaInner { store, source_path: path.to_path_buf(), gzip, options }) })
    }

    fn load_or_build(path: &Path, options: &OpenOptions) -> Result<IndexStore> {
        let index_path = IndexStore::index_path_for(path);
        let source_size = std::fs::metadata(path).map_err(|_| FxiError::FileNotFound(path.to_path_buf()))?.len();

        if index_path.exists() {
            if let Ok(store) = IndexStore::read(&index_path) {
                if store.meta.source_size == source_size && store.meta.full_name == options.full_name {
                    return Ok(store);
                }
            }
        }
        let store = FastaIndexer::index(path, options)?;
        store.write(&index_path)?;
        Ok(store)
    }

    /// `true` if the underlying source file is gzip-compressed.
    #[must_use]
    pub fn is_gzip(&self) -> bool {
        self.inner.gzip.is_some()
    }

    /// Number of indexed records. Requires `build_index = true`.
    pub fn len(&self) -> Result<u64> {
        Ok(self.inner.require_index()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// `true` if `name` is a record in this source. Requires an index.
    pub fn contains(&self, name: &[u8]) -> Result<bool> {
        Ok(self.inner.require_index()?.ordinal_of(name).is_ok())
    }

    /// The sequence type (`DNA`/`RNA`/protein) classified from the first
    /// record's alphabet at indexing time. Requires an index.
    pub fn seq_type(&self) -> Result<SeqType> {
        Ok(self.inner.require_index()?.meta.seq_type)
    }

    /// Fetches a record by ordinal, 0-based, negative ordinals counting
    /// from the end (`-1` is the last record).
    pub fn at(&self, ordinal: i64) -> Result<crate::engine::sequence::Sequence> {
        let store = self.inner.require_index()?;
        let len = store.len() as i64;
        let ord = if ordinal < 0 { ordinal + len } else { ordinal };
        if ord < 0 || ord >= len {
            return Err(FxiError::OutOfRange { ord: ordinal, len: store.len() });
        }
        let ord = ord as u64;
        store.record(ord)?;
        Ok(crate::engine::sequence::Sequence { engine: Arc::downgrade(&self.inner), ordinal: ord })
    }

    /// Fetches a record by name.
    pub fn get(&self, name: &[u8]) -> Result<crate::engine::sequence::Sequence> {
        let ordinal = self.inner.require_index()?.ordinal_of(name)?;
        self.at(ordinal as i64)
    }

    /// A lazy view over record names (requires an index).
    pub fn keys(&self) -> Result<KeyView<'_>> {
        Ok(KeyView::new(self.inner.require_index()?))
    }

    /// Aggregate statistics over the indexed records (requires an index).
    pub fn statistics(&self) -> Result<Statistics<'_>> {
        Ok(Statistics::new(self.inner.require_index()?))
    }

    /// Streams `(name, sequence)` pairs directly from the source file,
    /// independent of whether an index was built. Mirrors pyfastx's
    /// `build_index=False` tuple iteration.
    pub fn iter_tuples(&self) -> Result<FastaRecordsIter> {
        let is_gzip = gzip_index::gzip_check(&self.inner.source_path)?;
        let reader = BufReader::new(open_transparent(&self.inner.source_path, is_gzip)?);
        Ok(FastaRecordsIter { reader, options: self.inner.options.clone(), pending_header: None, done: false })
    }

    pub fn close(self) {
        drop(self.inner);
    }
}

impl fmt::Display for Fasta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.inner.store.as_ref().map(IndexStore::len).unwrap_or(0);
        write!(f, "<Fasta> {} contains {} sequences", self.inner.source_path.display(), count)
    }
}

/// A forward-only iterator over `(name, sequence)` pairs, reading the
/// source file directly (no index lookups).
pub struct FastaRecordsIter {
    reader: BufReader<Box<dyn std::io::Read>>,
    options: OpenOptions,
    pending_header: Option<Vec<u8>>,
    done: bool,
}

impl Iterator for FastaRecordsIter {
    type Item = Result<(String, Vec<u8>)>;

    fn next(&mut self) -> Option<Result<(String, Vec<u8>)>> {
        if self.done {
            return None;
        }
        let header = match self.pending_header.take() {
            Some(h) => h,
            None => {
                let mut line = Vec::new();
                match self.reader.read_until(b'\n', &mut line) {
                    Ok(0) => {
                        self.done = true;
                        return None;
                    }
                    Ok(_) => line,
                    Err(e) => return Some(Err(FxiError::Io(e))),
                }
            }
        };
        if header.first() != Some(&b'>') {
            self.done = true;
            return Some(Err(FxiError::MalformedRecord { ord: 0, reason: "expected '>' header line".into() }));
        }
        let name = match derive_name(&header[1..], &self.options) {
            Ok(n) => n,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let mut seq = Vec::new();
        loop {
            let mut line = Vec::new();
            match self.reader.read_until(b'\n', &mut line) {
                Ok(0) => {
                    self.done = true;
                    break;
                }
                Ok(_) => {
                    if line.first() == Some(&b'>') {
                        self.pending_header = Some(line);
                        break;
                    }
                    let (body, _) = strip_terminator(&line);
                    seq.extend_from_slice(body);
                }
                Err(e) => return Some(Err(FxiError::Io(e))),
            }
        }
        if self.options.uppercase {
            seq.make_ascii_uppercase();
        }
        Some(Ok((String::from_utf8_lossy(&name).into_owned(), seq)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{fs::File, io::Write as _};

    fn write_temp(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seq.fa");
        File::create(&path).unwrap().write_all(contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_open_indexed_and_lookup() {
        let (_dir, path) = write_temp(b">s1\nACGT\n>s2\nTTTTGGGG\n");
        let fasta = Fasta::open(&path, OpenOptions::default()).unwrap();
        assert_eq!(fasta.len().unwrap(), 2);
        let sequence = fasta.get(b"s2").unwrap();
        assert_eq!(sequence.seq().unwrap(), b"TTTTGGGG");
    }

    #[test]
    fn test_display_matches_pyfastx_repr_style() {
        let (_dir, path) = write_temp(b">s1\nACGT\n");
        let fasta = Fasta::open(&path, OpenOptions::default()).unwrap();
        let rendered = format!("{fasta}");
        assert!(rendered.starts_with("<Fasta> "));
        assert!(rendered.ends_with("contains 1 sequences"));
    }

    #[test]
    fn test_streaming_mode_rejects_random_access() {
        let (_dir, path) = write_temp(b">s1\nACGT\n");
        let fasta = Fasta::open(&path, OpenOptions::default().build_index(false)).unwrap();
        assert!(matches!(fasta.len(), Err(FxiError::StreamingOnly)));
    }

    #[test]
    fn test_iter_tuples_streaming() {
        let (_dir, path) = write_temp(b">s1\nACGT\n>s2\nTTTT\n");
        let fasta = Fasta::open(&path, OpenOptions::default().build_index(false)).unwrap();
        let pairs: Vec<_> = fasta.iter_tuples().unwrap().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(pairs, vec![("s1".to_string(), b"ACGT".to_vec()), ("s2".to_string(), b"TTTT".to_vec())]);
    }

    #[test]
    fn test_basic_round_trip_composition_and_type() {
        let (_dir, path) = write_temp(b">s1\nACGT\nACGT\n>s2\nNNN\n");
        let fasta = Fasta::open(&path, OpenOptions::default()).unwrap();
        assert_eq!(fasta.len().unwrap(), 2);
        assert_eq!(fasta.get(b"s1").unwrap().seq().unwrap(), b"ACGTACGT");
        assert_eq!(fasta.get(b"s2").unwrap().seq().unwrap(), b"NNN");
        assert_eq!(fasta.seq_type().unwrap(), SeqType::Dna);

        let stats = fasta.statistics().unwrap();
        let composition = stats.composition().unwrap().unwrap();
        assert_eq!(composition.a, 2);
        assert_eq!(composition.c, 2);
        assert_eq!(composition.g, 2);
        assert_eq!(composition.t, 2);
        assert_eq!(composition.n, 3);
        assert!((stats.gc_content().unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_protein_classification_omits_composition() {
        let (_dir, path) = write_temp(b">s1\nMEEPQSDPSV\n");
        let fasta = Fasta::open(&path, OpenOptions::default()).unwrap();
        assert_eq!(fasta.seq_type().unwrap(), SeqType::Protein);
        assert!(fasta.statistics().unwrap().composition().unwrap().is_none());
    }

    #[test]
    fn test_at_negative_ordinal_counts_from_end() {
        let (_dir, path) = write_temp(b">s1\nACGT\n>s2\nTTTT\n>s3\nGGGG\n");
        let fasta = Fasta::open(&path, OpenOptions::default()).unwrap();
        assert_eq!(fasta.at(-1).unwrap().seq().unwrap(), b"GGGG");
        assert_eq!(fasta.at(-3).unwrap().seq().unwrap(), b"ACGT");
        assert!(matches!(fasta.at(-4), Err(FxiError::OutOfRange { ord: -4, len: 3 })));
        assert!(matches!(fasta.at(3), Err(FxiError::OutOfRange { ord: 3, len: 3 })));
    }

    #[test]
    fn test_sequence_survives_after_close_returns_error() {
        let (_dir, path) = write_temp(b">s1\nACGT\n");
        let fasta = Fasta::open(&path, OpenOptions::default()).unwrap();
        let sequence = fasta.at(0).unwrap();
        fasta.close();
        assert!(matches!(sequence.seq(), Err(FxiError::UseAfterClose)));
    }
}
