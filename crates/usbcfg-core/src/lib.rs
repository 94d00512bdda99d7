// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Build-time patcher for the USB identity macros of a V-USB `usbconfig.h`.
//!
//! The firmware build calls this once before compilation. It rewrites the
//! vendor/product/serial string descriptors (and optionally the raw VID, PID
//! and bcdDevice bytes) in place, so one firmware tree can be flashed under
//! different identities.
//!
//! # Invariants
//!
//! - Every targeted `#define` must match exactly one line, or the run fails.
//! - All edits are applied in memory; a failed run never touches the file.
//! - The file is only rewritten when its bytes actually change.

pub mod charlist;
pub mod define;
mod error;
pub mod identity;
pub mod options;
pub mod patcher;
pub mod plan;

pub use error::PatchError;
pub use identity::{PatchConfig, RawIdLiteral, RawIdOverrides, UsbIdentity};
pub use options::{identity_from_options, Layered, MapOptions, OptionsError, ProjectOptions};
pub use patcher::{HeaderPatcher, PatchOutcome};
pub use plan::{Edit, PatchPlan, Rule};

/// Header location relative to the project root used by the Digispark joystick firmware.
pub const DEFAULT_HEADER_PATH: &str = "lib/DigisparkJoystick/usbconfig.h";

/// Project option holding the manufacturer string.
pub const VENDOR_OPTION: &str = "custom_usb_vendor_str";
/// Project option holding the product string.
pub const PRODUCT_OPTION: &str = "custom_usb_product_str";
/// Project option holding the serial number string.
pub const SERIAL_OPTION: &str = "custom_usb_serial_str";

/// Default `USB_CFG_VENDOR_ID` bytes (VID 0x16C0, low byte first).
pub const DEFAULT_VENDOR_ID: Option<&str> = Some("0xc0, 0x16");
/// Default `USB_CFG_DEVICE_ID` bytes (PID 0x27DC, low byte first).
pub const DEFAULT_DEVICE_ID: Option<&str> = Some("0xdc, 0x27");
/// Default `USB_CFG_DEVICE_VERSION` bytes; `None` leaves the header value alone.
pub const DEFAULT_DEVICE_VERSION: Option<&str> = None;
