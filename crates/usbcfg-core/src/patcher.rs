// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Read, patch and (conditionally) write back a `usbconfig.h`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::charlist::{from_usb_charlist, is_ascii_safe};
use crate::define::read_define;
use crate::error::PatchError;
use crate::identity::PatchConfig;
use crate::plan::{Edit, PatchPlan, DEVICE_NAME, SERIAL_NUMBER, VENDOR_NAME};

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The header content changed and was written (or would be, in dry-run mode).
    Patched {
        /// Edits that were applied.
        edits: Vec<Edit>,
        /// False when `dry_run` suppressed the write.
        written: bool,
    },
    /// The header already carried these values; nothing was written.
    Unchanged,
}

impl PatchOutcome {
    /// True when the header content differs from what was on disk.
    pub fn is_patched(&self) -> bool {
        matches!(self, Self::Patched { .. })
    }
}

/// Patches one header file in place.
#[derive(Debug, Clone)]
pub struct HeaderPatcher {
    path: PathBuf,
    dry_run: bool,
}

impl HeaderPatcher {
    /// Target the header at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dry_run: false,
        }
    }

    /// Compute the result but never write it.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Header being patched.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `config` to the header.
    ///
    /// All edits happen in memory first. The file is rewritten only when every
    /// macro matched exactly once and the bytes changed.
    pub fn patch(&self, config: &PatchConfig) -> Result<PatchOutcome, PatchError> {
        if !self.path.is_file() {
            return Err(PatchError::MissingFile {
                path: self.path.clone(),
            });
        }

        let id = &config.identity;
        info!(
            vendor = id.vendor(),
            product = id.product(),
            serial = id.serial(),
            "setting custom USB config values"
        );
        for (what, value) in [
            ("vendor", id.vendor()),
            ("product", id.product()),
            ("serial", id.serial()),
        ] {
            if !is_ascii_safe(value) {
                warn!(field = what, value, "non-ASCII USB string; some hosts may not render it");
            }
        }

        let original = fs::read(&self.path).map_err(|e| PatchError::io(&self.path, e))?;
        log_current_strings(&original);
        let plan = PatchPlan::from_config(config);
        let patched = plan.apply(&original)?;

        if patched == original {
            info!(path = %self.path.display(), "no changes needed");
            return Ok(PatchOutcome::Unchanged);
        }

        if self.dry_run {
            info!(path = %self.path.display(), "dry run: header would be patched");
        } else {
            self.write(&patched)?;
            info!(path = %self.path.display(), "patched USB config");
        }
        Ok(PatchOutcome::Patched {
            edits: plan.edits().to_vec(),
            written: !self.dry_run,
        })
    }

    /// Replace the header via a sibling temp file and rename, keeping its permissions.
    ///
    /// A symlinked header is resolved first, so the link survives and its
    /// target receives the new content.
    fn write(&self, bytes: &[u8]) -> Result<(), PatchError> {
        let io = |e| PatchError::io(&self.path, e);
        let target = fs::canonicalize(&self.path).map_err(io)?;
        let dir = target.parent().unwrap_or_else(|| Path::new("."));
        let perms = fs::metadata(&target).map_err(io)?.permissions();
        let mut tmp = NamedTempFile::new_in(dir).map_err(io)?;
        tmp.write_all(bytes).map_err(io)?;
        tmp.as_file().sync_all().map_err(io)?;
        tmp.as_file().set_permissions(perms).map_err(io)?;
        tmp.persist(&target).map_err(|e| io(e.error))?;
        Ok(())
    }
}

/// Debug-log the string descriptors the header carries before patching.
fn log_current_strings(text: &[u8]) {
    for name in [VENDOR_NAME, DEVICE_NAME, SERIAL_NUMBER] {
        let Ok(Some(rhs)) = read_define(text, name) else {
            continue;
        };
        match from_usb_charlist(&String::from_utf8_lossy(rhs)) {
            Ok(current) => debug!(name, current = %current, "current value"),
            Err(e) => debug!(name, error = %e, "current value is not a char list"),
        }
    }
}
