//! Failure modes for loading and validating the configuration file.

use thiserror::Error;

/// Errors raised while reading or validating the ini-style config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be opened or read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to open.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A line was neither a comment, a section header, a `key = value`
    /// pair, nor blank.
    #[error("malformed config line {line}: {text:?}")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
        /// The offending line's text.
        text: String,
    },
    /// A required key was missing from its section.
    #[error("missing required key [{section}].{key}")]
    MissingKey {
        /// The section the key was expected in.
        section: String,
        /// The missing key's name.
        key: String,
    },
    /// A key's value could not be parsed as the type it needed to be.
    #[error("invalid value for [{section}].{key}: {value:?}")]
    InvalidValue {
        /// The section the key lives in.
        section: String,
        /// The key's name.
        key: String,
        /// The raw string value that failed to parse.
        value: String,
    },
}
