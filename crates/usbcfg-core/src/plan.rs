// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The ordered list of macro edits derived from a [`PatchConfig`].

use tracing::debug;

use crate::charlist::{charlist_len, to_usb_charlist};
use crate::define::replace_define;
use crate::error::PatchError;
use crate::identity::PatchConfig;

/// Macro holding the manufacturer string.
pub const VENDOR_NAME: &str = "USB_CFG_VENDOR_NAME";
/// Length of [`VENDOR_NAME`].
pub const VENDOR_NAME_LEN: &str = "USB_CFG_VENDOR_NAME_LEN";
/// Macro holding the product string.
pub const DEVICE_NAME: &str = "USB_CFG_DEVICE_NAME";
/// Length of [`DEVICE_NAME`].
pub const DEVICE_NAME_LEN: &str = "USB_CFG_DEVICE_NAME_LEN";
/// Macro holding the serial number string.
pub const SERIAL_NUMBER: &str = "USB_CFG_SERIAL_NUMBER";
/// Length of [`SERIAL_NUMBER`].
pub const SERIAL_NUMBER_LEN: &str = "USB_CFG_SERIAL_NUMBER_LEN";
/// Vendor ID byte pair.
pub const VENDOR_ID: &str = "USB_CFG_VENDOR_ID";
/// Product ID byte pair.
pub const DEVICE_ID: &str = "USB_CFG_DEVICE_ID";
/// bcdDevice byte pair.
pub const DEVICE_VERSION: &str = "USB_CFG_DEVICE_VERSION";

/// How a macro's right-hand side is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Anything after the name up to end of line.
    Value,
    /// A bare decimal integer, trailing whitespace kept.
    Length,
}

/// One substitution: set `name`'s RHS to `rhs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Macro name.
    pub name: &'static str,
    /// Matching rule.
    pub rule: Rule,
    /// Replacement text.
    pub rhs: String,
}

impl Edit {
    fn value(name: &'static str, rhs: impl Into<String>) -> Self {
        Self {
            name,
            rule: Rule::Value,
            rhs: rhs.into(),
        }
    }

    fn length(name: &'static str, len: usize) -> Self {
        Self {
            name,
            rule: Rule::Length,
            rhs: len.to_string(),
        }
    }
}

/// Ordered edits; each must hit exactly one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPlan {
    edits: Vec<Edit>,
}

impl PatchPlan {
    /// Build the plan: three string/length pairs, then any configured raw IDs.
    pub fn from_config(config: &PatchConfig) -> Self {
        let id = &config.identity;
        let mut edits = Vec::with_capacity(9);
        for (name, len_name, value) in [
            (VENDOR_NAME, VENDOR_NAME_LEN, id.vendor()),
            (DEVICE_NAME, DEVICE_NAME_LEN, id.product()),
            (SERIAL_NUMBER, SERIAL_NUMBER_LEN, id.serial()),
        ] {
            edits.push(Edit::value(name, to_usb_charlist(value)));
            edits.push(Edit::length(len_name, charlist_len(value)));
        }
        for (name, lit) in [
            (VENDOR_ID, &config.ids.vendor_id),
            (DEVICE_ID, &config.ids.device_id),
            (DEVICE_VERSION, &config.ids.device_version),
        ] {
            if let Some(lit) = lit {
                edits.push(Edit::value(name, lit.as_str()));
            }
        }
        Self { edits }
    }

    /// The edits in application order.
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// Apply every edit to `text` in memory.
    ///
    /// Stops at the first macro that does not match exactly one line; the
    /// input is never modified, so a failure leaves nothing half-applied.
    pub fn apply(&self, text: &[u8]) -> Result<Vec<u8>, PatchError> {
        let mut current = text.to_vec();
        for edit in &self.edits {
            let (next, count) = replace_define(&current, edit.name, edit.rule, edit.rhs.as_bytes())?;
            if count != 1 {
                return Err(PatchError::PatternMismatch {
                    name: edit.name.to_owned(),
                    count,
                });
            }
            debug!(name = edit.name, rhs = %edit.rhs, "patched macro");
            current = next;
        }
        Ok(current)
    }
}
