//! `Sequence`/`Read` view objects: handles returned by `Fasta`/`Fastq`
//! indexing/iteration that read through to the owning engine rather than
//! holding a private copy of its state.
//!
//! A handle holds a [`std::sync::Weak`] back-reference to the shared engine
//! state instead of an owning [`std::sync::Arc`]; once the owning
//! `Fasta`/`Fastq` is closed (its `Arc` dropped), every outstanding handle's
//! operations fail with [`FxiError::UseAfterClose`] instead of reading
//! stale or freed state.

use std::sync::{Arc, Weak};

use crate::engine::accessor::{complement_typed, reverse_complement_typed, RecordAccessor};
use crate::engine::fasta::FastaInner;
use crate::engine::fastq::FastqInner;
use crate::engine::index_store::SeqType;
use crate::error::{FxiError, Result};

/// A handle to one FASTA record.
#[derive(Clone)]
pub struct Sequence {
    pub(crate) engine: Weak<FastaInner>,
    pub(crate) ordinal: u64,
}

impl Sequence {
    fn engine(&self) -> Result<Arc<FastaInner>> {
        self.engine.upgrade().ok_or(FxiError::UseAfterClose)
    }

    #[must_use]
    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }

    pub fn name(&self) -> Result<String> {
        let engine = self.engine()?;
        let store = engine.store.as_ref().ok_or(FxiError::UseAfterClose)?;
        Ok(String::from_utf8_lossy(store.name(self.ordinal)?).into_owned())
    }

    pub fn len(&self) -> Result<u64> {
        let engine = self.engine()?;
        let store = engine.store.as_ref().ok_or(FxiError::UseAfterClose)?;
        Ok(store.record(self.ordinal)?.seq_length)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn seq(&self) -> Result<Vec<u8>> {
        let engine = self.engine()?;
        engine.accessor().sequence(self.ordinal)
    }

    pub fn fetch(&self, start: i64, end: i64) -> Result<Vec<u8>> {
        let engine = self.engine()?;
        engine.accessor().fetch(self.ordinal, start, end)
    }

    pub fn fetch_multi(&self, intervals: &[(i64, i64)]) -> Result<Vec<u8>> {
        let engine = self.engine()?;
        engine.accessor().fetch_multi(self.ordinal, intervals)
    }

    fn is_rna(&self) -> Result<bool> {
        let engine = self.engine()?;
        let store = engine.store.as_ref().ok_or(FxiError::UseAfterClose)?;
        Ok(store.meta.seq_type == SeqType::Rna)
    }

    pub fn complement(&self) -> Result<Vec<u8>> {
        let is_rna = self.is_rna()?;
        Ok(complement_typed(&self.seq()?, is_rna))
    }

    /// Reverse complement, i.e. the antisense strand.
    pub fn antisense(&self) -> Result<Vec<u8>> {
        let is_rna = self.is_rna()?;
        Ok(reverse_complement_typed(&self.seq()?, is_rna))
    }

    pub fn search(&self, pattern: &[u8]) -> Result<Option<u64>> {
        let engine = self.engine()?;
        engine.accessor().search(self.ordinal, pattern)
    }
}

/// A handle to one FASTQ record.
#[derive(Clone)]
pub struct Read {
    pub(crate) engine: Weak<FastqInner>,
    pub(crate) ordinal: u64,
}

impl Read {
    fn engine(&self) -> Result<Arc<FastqInner>> {
        self.engine.upgrade().ok_or(FxiError::UseAfterClose)
    }

    #[must_use]
    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }

    pub fn name(&self) -> Result<String> {
        let engine = self.engine()?;
        let store = engine.store.as_ref().ok_or(FxiError::UseAfterClose)?;
        Ok(String::from_utf8_lossy(store.name(self.ordinal)?).into_owned())
    }

    pub fn len(&self) -> Result<u64> {
        let engine = self.engine()?;
        let store = engine.store.as_ref().ok_or(FxiError::UseAfterClose)?;
        Ok(store.record(self.ordinal)?.seq_length)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn seq(&self) -> Result<Vec<u8>> {
        let engine = self.engine()?;
        engine.accessor().sequence(self.ordinal)
    }

    pub fn fetch(&self, start: i64, end: i64) -> Result<Vec<u8>> {
        let engine = self.engine()?;
        engine.accessor().fetch(self.ordinal, start, end)
    }

    pub fn quality(&self) -> Result<Vec<u8>> {
        let engine = self.engine()?;
        engine.accessor().quality(self.ordinal)
    }
}
