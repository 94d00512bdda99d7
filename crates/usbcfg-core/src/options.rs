// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Project option port: where the three USB strings come from.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::error::PatchError;
use crate::identity::UsbIdentity;
use crate::{PRODUCT_OPTION, SERIAL_OPTION, VENDOR_OPTION};

/// Lookup of named string options from the build configuration.
pub trait ProjectOptions {
    /// Value of `name`, or `Ok(None)` when it is not set.
    fn get_option(&self, name: &str) -> Result<Option<String>, OptionsError>;
}

/// Error type for option sources.
#[derive(Debug, Error)]
pub enum OptionsError {
    /// I/O error while reading the project file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The project file is malformed.
    #[error("parse error at line {line}: {reason}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        reason: String,
    },
    /// The requested build environment has no section.
    #[error("unknown build environment `{0}`")]
    UnknownEnv(String),
}

impl<T: ProjectOptions + ?Sized> ProjectOptions for &T {
    fn get_option(&self, name: &str) -> Result<Option<String>, OptionsError> {
        (**self).get_option(name)
    }
}

/// In-memory options, e.g. from command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapOptions {
    values: BTreeMap<String, String>,
}

impl MapOptions {
    /// Empty set of options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(name.into(), value.into())
    }

    /// Builder form of [`MapOptions::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }
}

impl ProjectOptions for MapOptions {
    fn get_option(&self, name: &str) -> Result<Option<String>, OptionsError> {
        Ok(self.values.get(name).cloned())
    }
}

/// Consult `first`, then `fallback`.
#[derive(Debug, Clone)]
pub struct Layered<A, B> {
    first: A,
    fallback: B,
}

impl<A, B> Layered<A, B> {
    /// Stack `first` over `fallback`.
    pub fn new(first: A, fallback: B) -> Self {
        Self { first, fallback }
    }
}

impl<A: ProjectOptions, B: ProjectOptions> ProjectOptions for Layered<A, B> {
    fn get_option(&self, name: &str) -> Result<Option<String>, OptionsError> {
        match self.first.get_option(name)? {
            Some(v) => Ok(Some(v)),
            None => self.fallback.get_option(name),
        }
    }
}

/// Resolve and validate the USB identity from `options`.
pub fn identity_from_options(options: &impl ProjectOptions) -> Result<UsbIdentity, PatchError> {
    let vendor = options.get_option(VENDOR_OPTION)?;
    let product = options.get_option(PRODUCT_OPTION)?;
    let serial = options.get_option(SERIAL_OPTION)?;
    UsbIdentity::from_optional(vendor.as_deref(), product.as_deref(), serial.as_deref())
}
