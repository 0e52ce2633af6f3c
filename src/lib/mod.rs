#![deny(unsafe_code)]
#![allow(
    clippy::must_use_candidate,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions
)]
pub mod engine;
pub mod error;

/// `true` if `path` begins with the gzip magic number.
pub use engine::gzip_index::gzip_check;
pub mod tools {
    pub mod extract;
    pub mod index;
    pub mod keys;
    pub mod stats;
}
pub mod utils;
