//! The typed error surface returned by the engine.
//!
//! Application code (the `fxi` CLI) wraps these in `anyhow::Error` at the
//! boundary; library callers match on [`FxiError`] directly.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the indexing and random-access engine.
#[derive(Error, Debug)]
pub enum FxiError {
    /// The source file, or a sibling index file, could not be found.
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// The source file, or a sibling index file, could not be read due to
    /// filesystem permissions.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The gzip stream failed to decode, or was truncated mid-block.
    #[error("corrupt gzip stream at compressed offset {offset}: {reason}")]
    CorruptStream { offset: u64, reason: String },

    /// A FASTA/FASTQ grammar violation: missing `+` separator, mismatched
    /// sequence/quality lengths, an empty header, or similar.
    #[error("malformed record at ordinal {ord}: {reason}")]
    MalformedRecord { ord: u64, reason: String },

    /// Two records (or two `key_func` outputs) shared the same identifier.
    #[error("duplicate name '{0}' encountered while indexing")]
    DuplicateName(String),

    /// Identifier derivation (default, `full_name`, or `key_func`) produced
    /// an empty name.
    #[error("empty name at ordinal {0} while indexing")]
    EmptyName(u64),

    /// An ordinal or record count was out of the valid `[0, N)` range.
    #[error("ordinal {ord} out of range (0..{len})")]
    OutOfRange { ord: i64, len: u64 },

    /// A name was not present in the `names` table.
    #[error("unknown name '{0}'")]
    UnknownName(String),

    /// A requested `(start, end)` interval was invalid: non-positive start,
    /// end beyond the sequence length, start > end, or non-integer/
    /// wrong-arity endpoints.
    #[error("invalid interval ({start}, {end}): {reason}")]
    InvalidInterval { start: i64, end: i64, reason: String },

    /// `nl(x)` (or another bounded numeric argument) was outside its valid
    /// domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `fetch` was called with something that is neither a pair nor a
    /// sequence of pairs.
    #[error("wrong type argument passed to fetch: {0}")]
    WrongTypeArgument(String),

    /// An indexed operation was attempted on an engine opened with
    /// `build_index = false`.
    #[error("operation unavailable in streaming mode")]
    StreamingOnly,

    /// A `Sequence`/`Read` handle, or the engine itself, was used after the
    /// owning engine was closed.
    #[error("use after close")]
    UseAfterClose,

    /// The on-disk index's version tag did not match this build's expected
    /// version; callers with `build_index = true` should rebuild, callers
    /// with `build_index = false` see this error directly.
    #[error("index version mismatch: found {found}, expected {expected}")]
    IndexVersionMismatch { found: u32, expected: u32 },

    /// Wraps an underlying I/O failure not otherwise classified above.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the engine.
pub type Result<T> = std::result::Result<T, FxiError>;
