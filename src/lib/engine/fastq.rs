//! `Fastq`: the public facade over a FASTQ source.
//!
//! Mirrors `fasta.rs`; the differences are the four-line record grammar
//! and the presence of quality strings (surfaced via [`Statistics::encoding_type`]
//! and [`crate::engine::sequence::Read::quality`]).

use std::{
    fmt,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::engine::accessor::RecordAccessor;
use crate::engine::gzip_index::{self, GzipRandomAccess};
use crate::engine::index_store::IndexStore;
use crate::engine::indexer::{derive_name, open_transparent, strip_terminator, FastqIndexer};
use crate::engine::keyview::KeyView;
use crate::engine::stats::Statistics;
use crate::engine::OpenOptions;
use crate::error::{FxiError, Result};

pub struct FastqInner {
    pub(crate) store: Option<IndexStore>,
    pub(crate) source_path: PathBuf,
    pub(crate) gzip: Option<GzipRandomAccess>,
    pub(crate) options: OpenOptions,
}

impl FastqInner {
    pub(crate) fn accessor(&self) -> RecordAccessor<'_> {
        let store = self.store.as_ref().expect("indexed operation guarded by require_index");
        RecordAccessor::new(store, &self.source_path, self.gzip.as_ref(), self.options.uppercase)
    }

    fn require_index(&self) -> Result<&IndexStore> {
        self.store.as_ref().ok_or(FxiError::StreamingOnly)
    }
}

/// A FASTQ source, optionally backed by a persistent random-access index.
pub struct Fastq {
    inner: Arc<FastqInner>,
}

impl Fastq {
    pub fn open<P: AsRef<Path>>(path: P, options: OpenOptions) -> Result<Fastq> {
        let path = path.as_ref();

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

        Ok(Fastq { inner: Arc::new(FastqInner { store, source_path: path.to_path_buf(), gzip, options }) })
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
        let store = FastqIndexer::index(path, options)?;
        store.write(&index_path)?;
        Ok(store)
    }

    #[must_use]
    pub fn is_gzip(&self) -> bool {
        self.inner.gzip.is_some()
    }

    pub fn len(&self) -> Result<u64> {
        Ok(self.inner.require_index()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn contains(&self, name: &[u8]) -> Result<bool> {
        Ok(self.inner.require_index()?.ordinal_of(name).is_ok())
    }

    /// Fetches a record by ordinal, 0-based, negative ordinals counting
    /// from the end (`-1` is the last record).
    pub fn at(&self, ordinal: i64) -> Result<crate::engine::sequence::Read> {
        let store = self.inner.require_index()?;
        let len = store.len() as i64;
        let ord = if ordinal < 0 { ordinal + len } else { ordinal };
        if ord < 0 || ord >= len {
            return Err(FxiError::OutOfRange { ord: ordinal, len: store.len() });
        }
        let ord = ord as u64;
        store.record(ord)?;
        Ok(crate::engine::sequence::Read { engine: Arc::downgrade(&self.inner), ordinal: ord })
    }

    pub fn get(&self, name: &[u8]) -> Result<crate::engine::sequence::Read> {
        let ordinal = self.inner.require_index()?.ordinal_of(name)?;
        self.at(ordinal as i64)
    }

    pub fn keys(&self) -> Result<KeyView<'_>> {
        Ok(KeyView::new(self.inner.require_index()?))
    }

    pub fn statistics(&self) -> Result<Statistics<'_>> {
        Ok(Statistics::new(self.inner.require_index()?))
    }

    /// Detects the quality encoding scheme by sampling the first
    /// `sample_size` reads.
    pub fn encoding_type(&self, sample_size: u64) -> Result<crate::engine::stats::EncodingDetection> {
        let store = self.inner.require_index()?;
        Statistics::new(store).encoding_type(&self.inner.accessor(), sample_size)
    }

    /// Streams `(name, sequence, quality)` triples directly from the
    /// source file, independent of whether an index was built.
    pub fn iter_tuples(&self) -> Result<FastqRecordsIter> {
        let is_gzip = gzip_index::gzip_check(&self.inner.source_path)?;
        let reader = BufReader::new(open_transparent(&self.inner.source_path, is_gzip)?);
        Ok(FastqRecordsIter { reader, options: self.inner.options.clone(), ordinal: 0, done: false })
    }

    pub fn close(self) {
        drop(self.inner);
    }
}

impl fmt::Display for Fastq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.inner.store.as_ref().map(IndexStore::len).unwrap_or(0);
        write!(f, "<Fastq> {} contains {} reads", self.inner.source_path.display(), count)
    }
}

/// A forward-only iterator over `(name, sequence, quality)` triples.
pub struct FastqRecordsIter {
    reader: BufReader<Box<dyn std::io::Read>>,
    options: OpenOptions,
    ordinal: u64,
    done: bool,
}

impl Iterator for FastqRecordsIter {
    type Item = Result<(String, Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Result<(String, Vec<u8>, Vec<u8>)>> {
        if self.done {
            return None;
        }
        let read_line = |reader: &mut BufReader<Box<dyn std::io::Read>>| -> std::io::Result<Option<Vec<u8>>> {
            let mut line = Vec::new();
            let n = reader.read_until(b'\n', &mut line)?;
            if n == 0 {
                Ok(None)
            } else {
                Ok(Some(line))
            }
        };

        let header = match read_line(&mut self.reader) {
            Ok(None) => {
                self.done = true;
                return None;
            }
            Ok(Some(h)) => h,
            Err(e) => return Some(Err(FxiError::Io(e))),
        };
        if header.first() != Some(&b'@') {
            self.done = true;
            return Some(Err(FxiError::MalformedRecord { ord: self.ordinal, reason: "expected '@' header line".into() }));
        }
        let name = match derive_name(&header[1..], &self.options) {
            Ok(n) => n,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let seq_line = match read_line(&mut self.reader) {
            Ok(Some(l)) => l,
            Ok(None) => {
                self.done = true;
                return Some(Err(FxiError::MalformedRecord { ord: self.ordinal, reason: "truncated record".into() }));
            }
            Err(e) => return Some(Err(FxiError::Io(e))),
        };
        let (mut seq, _) = { let (s, t) = strip_terminator(&seq_line); (s.to_vec(), t) };

        let plus_line = match read_line(&mut self.reader) {
            Ok(Some(l)) => l,
            Ok(None) => {
                self.done = true;
                return Some(Err(FxiError::MalformedRecord { ord: self.ordinal, reason: "truncated record".into() }));
            }
            Err(e) => return Some(Err(FxiError::Io(e))),
        };
        if plus_line.first() != Some(&b'+') {
            self.done = true;
            return Some(Err(FxiError::MalformedRecord { ord: self.ordinal, reason: "expected '+' separator line".into() }));
        }

        let qual_line = match read_line(&mut self.reader) {
            Ok(Some(l)) => l,
            Ok(None) => {
                self.done = true;
                return Some(Err(FxiError::MalformedRecord { ord: self.ordinal, reason: "truncated record".into() }));
            }
            Err(e) => return Some(Err(FxiError::Io(e))),
        };
        let (qual, _) = strip_terminator(&qual_line);
        if qual.len() != seq.len() {
            self.done = true;
            return Some(Err(FxiError::MalformedRecord {
                ord: self.ordinal,
                reason: format!("quality length {} does not match sequence length {}", qual.len(), seq.len()),
            }));
        }

        if self.options.uppercase {
            seq.make_ascii_uppercase();
        }
        self.ordinal += 1;
        Some(Ok((String::from_utf8_lossy(&name).into_owned(), seq, qual.to_vec())))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{fs::File, io::Write as _};

    fn write_temp(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reads.fq");
        File::create(&path).unwrap().write_all(contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_open_indexed_and_lookup() {
        let (_dir, path) = write_temp(b"@r1\nACGT\n+\nIIII\n@r2\nTTTT\n+\nFFFF\n");
        let fastq = Fastq::open(&path, OpenOptions::default()).unwrap();
        assert_eq!(fastq.len().unwrap(), 2);
        let read = fastq.get(b"r2").unwrap();
        assert_eq!(read.seq().unwrap(), b"TTTT");
        assert_eq!(read.quality().unwrap(), b"FFFF");
    }

    #[test]
    fn test_iter_tuples_streaming() {
        let (_dir, path) = write_temp(b"@r1\nACGT\n+\nIIII\n");
        let fastq = Fastq::open(&path, OpenOptions::default().build_index(false)).unwrap();
        let triples: Vec<_> = fastq.iter_tuples().unwrap().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(triples, vec![("r1".to_string(), b"ACGT".to_vec(), b"IIII".to_vec())]);
    }

    #[test]
    fn test_at_negative_ordinal_counts_from_end() {
        let (_dir, path) = write_temp(b"@r1\nACGT\n+\nIIII\n@r2\nTTTT\n+\nFFFF\n@r3\nGGGG\n+\nHHHH\n");
        let fastq = Fastq::open(&path, OpenOptions::default()).unwrap();
        assert_eq!(fastq.at(-1).unwrap().seq().unwrap(), b"GGGG");
        assert_eq!(fastq.at(-3).unwrap().seq().unwrap(), b"ACGT");
        assert!(matches!(fastq.at(-4), Err(FxiError::OutOfRange { ord: -4, len: 3 })));
        assert!(matches!(fastq.at(3), Err(FxiError::OutOfRange { ord: 3, len: 3 })));
    }

    #[test]
    fn test_display() {
        let (_dir, path) = write_temp(b"@r1\nACGT\n+\nIIII\n");
        let fastq = Fastq::open(&path, OpenOptions::default()).unwrap();
        assert_eq!(format!("{fastq}"), format!("<Fastq> {} contains 1 reads", path.display()));
    }
}
