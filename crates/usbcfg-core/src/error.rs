// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::path::PathBuf;

use thiserror::Error;

use crate::options::OptionsError;

/// Errors raised while validating configuration or patching the header.
///
/// Every variant is fatal for the build step; nothing is retried.
#[derive(Debug, Error)]
pub enum PatchError {
    /// A required option is missing or blank.
    #[error("invalid config value `{option}`: {reason}")]
    Config {
        /// Option name as it appears in the project configuration.
        option: String,
        /// What was wrong with it.
        reason: String,
    },
    /// The header to patch does not exist.
    #[error("usbconfig.h not found: {}", path.display())]
    MissingFile {
        /// Path that was looked up.
        path: PathBuf,
    },
    /// A macro matched some other number of lines than one.
    #[error("expected to patch exactly 1 line for {name}, but matched {count}")]
    PatternMismatch {
        /// Macro name.
        name: String,
        /// Number of matching lines found.
        count: usize,
    },
    /// Reading or writing the header failed.
    #[error("io error on {}: {source}", path.display())]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A macro rule failed to compile.
    #[error("invalid macro pattern: {0}")]
    Pattern(#[from] regex::Error),
    /// The option source failed.
    #[error(transparent)]
    Options(#[from] OptionsError),
}

impl PatchError {
    pub(crate) fn config(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            option: option.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
