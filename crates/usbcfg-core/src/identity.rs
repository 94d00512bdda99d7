// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Validated inputs for a patch run.

use std::fmt;
use std::str::FromStr;

use crate::error::PatchError;
use crate::{
    DEFAULT_DEVICE_ID, DEFAULT_DEVICE_VERSION, DEFAULT_VENDOR_ID, PRODUCT_OPTION, SERIAL_OPTION,
    VENDOR_OPTION,
};

/// The three USB string descriptors, trimmed and guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbIdentity {
    vendor: String,
    product: String,
    serial: String,
}

impl UsbIdentity {
    /// Validate and trim the three strings.
    ///
    /// Fails with [`PatchError::Config`] naming the first blank option.
    pub fn new(vendor: &str, product: &str, serial: &str) -> Result<Self, PatchError> {
        Ok(Self {
            vendor: require(VENDOR_OPTION, Some(vendor))?,
            product: require(PRODUCT_OPTION, Some(product))?,
            serial: require(SERIAL_OPTION, Some(serial))?,
        })
    }

    /// Same as [`UsbIdentity::new`] for values that may be absent altogether.
    pub fn from_optional(
        vendor: Option<&str>,
        product: Option<&str>,
        serial: Option<&str>,
    ) -> Result<Self, PatchError> {
        Ok(Self {
            vendor: require(VENDOR_OPTION, vendor)?,
            product: require(PRODUCT_OPTION, product)?,
            serial: require(SERIAL_OPTION, serial)?,
        })
    }

    /// Manufacturer string.
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Product string.
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Serial number string.
    pub fn serial(&self) -> &str {
        &self.serial
    }
}

fn require(option: &str, value: Option<&str>) -> Result<String, PatchError> {
    let Some(value) = value else {
        return Err(PatchError::config(option, "missing"));
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PatchError::config(option, "empty after trimming"));
    }
    Ok(trimmed.to_owned())
}

/// A raw `USB_CFG_*_ID` right-hand side such as `0xc0, 0x16`.
///
/// Parsed from either the literal byte pair (kept verbatim) or a single
/// 16-bit value like `0x16C0`, which is expanded low byte first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawIdLiteral(String);

impl RawIdLiteral {
    /// Literal text that goes after the macro name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap a 16-bit ID as its little-endian byte pair.
    pub fn from_u16(value: u16) -> Self {
        let [lo, hi] = value.to_le_bytes();
        Self(format!("0x{lo:02x}, 0x{hi:02x}"))
    }
}

impl fmt::Display for RawIdLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RawIdLiteral {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((lo, hi)) = s.split_once(',') {
            parse_hex_byte(lo.trim())?;
            parse_hex_byte(hi.trim())?;
            return Ok(Self(s.to_owned()));
        }
        let digits = hex_digits(s).ok_or_else(|| format!("expected 0x-prefixed hex: `{s}`"))?;
        let value = u16::from_str_radix(digits, 16)
            .map_err(|e| format!("invalid 16-bit id `{s}`: {e}"))?;
        Ok(Self::from_u16(value))
    }
}

/// Digits after a `0x`/`0X` prefix; `None` unless they are all hex digits.
fn hex_digits(s: &str) -> Option<&str> {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .filter(|d| d.bytes().all(|b| b.is_ascii_hexdigit()))
}

fn parse_hex_byte(s: &str) -> Result<u8, String> {
    let digits = hex_digits(s).ok_or_else(|| format!("expected 0x-prefixed hex byte: `{s}`"))?;
    if digits.is_empty() || digits.len() > 2 {
        return Err(format!("expected one hex byte: `{s}`"));
    }
    u8::from_str_radix(digits, 16).map_err(|e| format!("invalid hex byte `{s}`: {e}"))
}

/// Optional raw ID overrides. `None` leaves the header value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawIdOverrides {
    /// `USB_CFG_VENDOR_ID`.
    pub vendor_id: Option<RawIdLiteral>,
    /// `USB_CFG_DEVICE_ID`.
    pub device_id: Option<RawIdLiteral>,
    /// `USB_CFG_DEVICE_VERSION`.
    pub device_version: Option<RawIdLiteral>,
}

impl RawIdOverrides {
    /// Overrides shipped with the firmware: shared V-USB VID/PID, version untouched.
    pub fn builtin() -> Self {
        let lit = |v: Option<&str>| v.map(|s| RawIdLiteral(s.to_owned()));
        Self {
            vendor_id: lit(DEFAULT_VENDOR_ID),
            device_id: lit(DEFAULT_DEVICE_ID),
            device_version: lit(DEFAULT_DEVICE_VERSION),
        }
    }
}

/// Everything one patch run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchConfig {
    /// String descriptors.
    pub identity: UsbIdentity,
    /// Raw ID bytes.
    pub ids: RawIdOverrides,
}

impl PatchConfig {
    /// Bundle a validated identity with raw ID overrides.
    pub fn new(identity: UsbIdentity, ids: RawIdOverrides) -> Self {
        Self { identity, ids }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]
    use super::*;

    #[test]
    fn identity_trims_values() {
        let id = UsbIdentity::new("  Acme ", "Stick\t", " 0001").unwrap();
        assert_eq!(id.vendor(), "Acme");
        assert_eq!(id.product(), "Stick");
        assert_eq!(id.serial(), "0001");
    }

    #[test]
    fn blank_values_are_config_errors() {
        let err = UsbIdentity::new("   ", "Stick", "1").unwrap_err();
        assert!(
            matches!(err, PatchError::Config { ref option, .. } if option == VENDOR_OPTION),
            "{err}"
        );
        let err = UsbIdentity::new("Acme", "", "1").unwrap_err();
        assert!(matches!(err, PatchError::Config { ref option, .. } if option == PRODUCT_OPTION));
        let err = UsbIdentity::from_optional(Some("Acme"), Some("Stick"), None).unwrap_err();
        assert!(matches!(err, PatchError::Config { ref option, .. } if option == SERIAL_OPTION));
    }

    #[test]
    fn raw_literal_accepts_byte_pairs_verbatim() {
        let lit: RawIdLiteral = "0xC0,0x16".parse().unwrap();
        assert_eq!(lit.as_str(), "0xC0,0x16");
        let lit: RawIdLiteral = " 0x02, 0x01 ".parse().unwrap();
        assert_eq!(lit.as_str(), "0x02, 0x01");
    }

    #[test]
    fn raw_literal_expands_u16_low_byte_first() {
        let lit: RawIdLiteral = "0x16C0".parse().unwrap();
        assert_eq!(lit.as_str(), "0xc0, 0x16");
        assert_eq!(RawIdLiteral::from_u16(0x27dc).to_string(), "0xdc, 0x27");
    }

    #[test]
    fn raw_literal_rejects_garbage() {
        assert!("16C0".parse::<RawIdLiteral>().is_err());
        assert!("0x100, 0x01".parse::<RawIdLiteral>().is_err());
        assert!("0x1FFFF".parse::<RawIdLiteral>().is_err());
        assert!("0x01, 0x02\n#define X".parse::<RawIdLiteral>().is_err());
        assert!("0x+1, 0x16".parse::<RawIdLiteral>().is_err());
        assert!("0xc0, 0x-1".parse::<RawIdLiteral>().is_err());
        assert!("0x+16C".parse::<RawIdLiteral>().is_err());
    }

    #[test]
    fn builtin_overrides_match_shipped_ids() {
        let ids = RawIdOverrides::builtin();
        assert_eq!(ids.vendor_id.unwrap().as_str(), "0xc0, 0x16");
        assert_eq!(ids.device_id.unwrap().as_str(), "0xdc, 0x27");
        assert!(ids.device_version.is_none());
    }
}
