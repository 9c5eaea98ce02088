//! Error types for the fuzzy-skin engine.

use thiserror::Error;

/// Errors that can occur while transforming a G-code document.
#[derive(Error, Debug)]
pub enum FuzzyError {
    /// A motion line carried a word that does not parse as a number.
    #[error("line {line}: malformed motion word `{word}`")]
    Parse {
        /// 1-based line number in the input document.
        line: usize,
        /// The offending word, verbatim.
        word: String,
    },

    /// Invalid engine settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The displacement map could not be loaded or decoded.
    #[error("displacement map `{path}`: {source}")]
    MapLoad {
        /// Path of the image file.
        path: String,
        /// Decoder error.
        #[source]
        source: image::ImageError,
    },

    /// The paint mask could not be loaded.
    #[error("paint mask `{path}`: {message}")]
    MaskLoad {
        /// Path of the mask file.
        path: String,
        /// What went wrong reading or parsing it.
        message: String,
    },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, FuzzyError>;
