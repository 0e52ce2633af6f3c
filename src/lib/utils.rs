//! Shared constants and build-time metadata used throughout the crate.

/// Default buffer size used for all buffered file I/O.
pub const BUFFERSIZE: usize = 64 * 1024;

/// Build-time metadata, generated by the `built` crate at compile time.
pub mod built_info {
    use lazy_static::lazy_static;

    include!(concat!(env!("OUT_DIR"), "/built.rs"));

    lazy_static! {
        /// A human-readable version string, falling back to the crate version
        /// if git metadata is unavailable (e.g. when built from a source
        /// tarball rather than a git checkout).
        pub static ref VERSION: String = match GIT_VERSION {
            Some(git_version) => format!("{PKG_VERSION} ({git_version})"),
            None => PKG_VERSION.to_string(),
        };
    }
}
