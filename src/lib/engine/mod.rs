//! The indexing and random-access engine.
//!
//! Everything under this module is format-agnostic plumbing; the public
//! `Fasta`/`Fastq` facades (`fasta`, `fastq`, `sequence`) are the only
//! pieces callers normally touch directly.

pub mod accessor;
pub mod fasta;
pub mod fastq;
pub mod gzip_index;
pub mod index_store;
pub mod indexer;
pub mod keyview;
pub mod line_geometry;
pub mod sequence;
pub mod stats;

/// Options controlling how a `Fasta`/`Fastq` source is opened.
#[derive(Clone)]
pub struct OpenOptions {
    /// Build (or load, if up to date) a persistent on-disk index. When
    /// `false`, only forward streaming operations are available and
    /// random-access methods return [`crate::error::FxiError::StreamingOnly`].
    pub build_index: bool,
    /// Use the full header line (minus the leading `>`/`@`) as the record
    /// name instead of stopping at the first whitespace run.
    pub full_name: bool,
    /// Upper-case sequence data on read.
    pub uppercase: bool,
    /// Overrides name derivation entirely; takes precedence over
    /// `full_name` when set.
    pub key_func: Option<std::sync::Arc<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>>,
}

impl std::fmt::Debug for OpenOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenOptions")
            .field("build_index", &self.build_index)
            .field("full_name", &self.full_name)
            .field("uppercase", &self.uppercase)
            .field("key_func", &self.key_func.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl Default for OpenOptions {
    fn default() -> OpenOptions {
        OpenOptions { build_index: true, full_name: false, uppercase: false, key_func: None }
    }
}

impl OpenOptions {
    #[must_use]
    pub fn new() -> OpenOptions {
        OpenOptions::default()
    }

    #[must_use]
    pub fn build_index(mut self, value: bool) -> OpenOptions {
        self.build_index = value;
        self
    }

    #[must_use]
    pub fn full_name(mut self, value: bool) -> OpenOptions {
        self.full_name = value;
        self
    }

    #[must_use]
    pub fn uppercase(mut self, value: bool) -> OpenOptions {
        self.uppercase = value;
        self
    }

    #[must_use]
    pub fn key_func<F>(mut self, f: F) -> OpenOptions
    where
        F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
    {
        self.key_func = Some(std::sync::Arc::new(f));
        self
    }
}
