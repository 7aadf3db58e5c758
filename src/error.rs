/// Crate-level error types for doclink diagnostics.
use std::path::PathBuf;

/// Fatal errors: configuration, corpus loading, and I/O.
///
/// Reference problems inside documents are never errors; they are
/// [`crate::diagnostics::Warning`]s and the build carries on. Each variant names
/// the file, pattern, or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A corpus file parsed, but describes an object the loader cannot accept.
    #[error("corpus invalid: {}: {reason}", path.display())]
    CorpusInvalid {
        /// Corpus file containing the bad object.
        path: PathBuf,
        /// Which object is bad and why.
        reason: String,
    },

    /// A configured corpus file does not exist on disk.
    #[error("corpus not found: {}", path.display())]
    CorpusNotFound {
        /// Path to the missing corpus file.
        path: PathBuf,
    },

    /// A corpus file is not valid JSON or does not match the corpus shape.
    #[error("corpus parse failed: {}: {reason}", path.display())]
    CorpusParse {
        /// Corpus file that failed to parse.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// An include/exclude or tag name produced an unusable pattern.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The offending pattern source.
        pattern: String,
        /// Why the pattern was rejected.
        reason: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// The filesystem watcher could not be set up.
    #[error("watch failed: {reason}")]
    Watch {
        /// Description of the watcher failure.
        reason: String,
    },
}
