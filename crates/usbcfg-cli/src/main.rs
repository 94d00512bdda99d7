// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `usbcfg`: stamp USB identity strings into a firmware's `usbconfig.h`.
//!
//! Meant to run as a pre-build hook, once per build, before the firmware is
//! compiled. Strings come from flags or from the `custom_usb_*_str` options
//! in `platformio.ini`; the raw VID/PID/version bytes default to the values
//! the firmware ships with.
//!
//! Invariants:
//! - Configuration is validated before the header is touched.
//! - A failing run leaves the header exactly as it was.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;
use usbcfg_config_ini::{IniProjectOptions, PROJECT_FILE};
use usbcfg_core::{
    identity_from_options, HeaderPatcher, Layered, MapOptions, PatchConfig, PatchOutcome,
    RawIdLiteral, RawIdOverrides, DEFAULT_HEADER_PATH, PRODUCT_OPTION, SERIAL_OPTION,
    VENDOR_OPTION,
};

#[derive(Parser)]
#[command(
    name = "usbcfg",
    version,
    about = "Patch USB vendor/product/serial macros in usbconfig.h before a firmware build"
)]
struct Cli {
    /// Project root (the build system's $PROJECT_DIR).
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Header to patch, relative to the project root unless absolute.
    #[arg(long, default_value = DEFAULT_HEADER_PATH)]
    header: PathBuf,

    /// PlatformIO environment whose options to use.
    #[arg(long = "env", value_name = "NAME")]
    env: Option<String>,

    #[command(flatten)]
    strings: StringArgs,

    #[command(flatten)]
    ids: IdArgs,

    /// Report what would change without writing the header.
    #[arg(long)]
    dry_run: bool,

    /// Log every edit.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Args)]
struct StringArgs {
    /// Manufacturer string (overrides custom_usb_vendor_str).
    #[arg(long)]
    vendor: Option<String>,

    /// Product string (overrides custom_usb_product_str).
    #[arg(long)]
    product: Option<String>,

    /// Serial number string (overrides custom_usb_serial_str).
    #[arg(long)]
    serial: Option<String>,
}

#[derive(Args)]
struct IdArgs {
    /// USB_CFG_VENDOR_ID bytes (`0xc0, 0x16`), a 16-bit id (`0x16C0`), or `keep`.
    #[arg(long, value_name = "ID")]
    vendor_id: Option<IdArg>,

    /// USB_CFG_DEVICE_ID bytes (`0xdc, 0x27`), a 16-bit id (`0x27DC`), or `keep`.
    #[arg(long, value_name = "ID")]
    device_id: Option<IdArg>,

    /// USB_CFG_DEVICE_VERSION bytes (`0x02, 0x01`), a 16-bit bcd (`0x0102`), or `keep`.
    #[arg(long, value_name = "ID")]
    device_version: Option<IdArg>,
}

/// A raw ID flag: a literal, or `keep` to leave the header value alone.
#[derive(Debug, Clone, PartialEq, Eq)]
enum IdArg {
    Keep,
    Set(RawIdLiteral),
}

impl FromStr for IdArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("keep") {
            return Ok(Self::Keep);
        }
        s.parse().map(Self::Set)
    }
}

fn pick(flag: Option<IdArg>, default: Option<RawIdLiteral>) -> Option<RawIdLiteral> {
    match flag {
        None => default,
        Some(IdArg::Keep) => None,
        Some(IdArg::Set(lit)) => Some(lit),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;
    run(cli)
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn run(cli: Cli) -> Result<()> {
    let mut flags = MapOptions::new();
    for (option, value) in [
        (VENDOR_OPTION, cli.strings.vendor),
        (PRODUCT_OPTION, cli.strings.product),
        (SERIAL_OPTION, cli.strings.serial),
    ] {
        if let Some(value) = value {
            flags.set(option, value);
        }
    }

    let project = load_project(&cli.project_dir, cli.env.as_deref())?;
    let identity = identity_from_options(&Layered::new(flags, project))
        .context("resolving USB identity strings")?;

    let builtin = RawIdOverrides::builtin();
    let ids = RawIdOverrides {
        vendor_id: pick(cli.ids.vendor_id, builtin.vendor_id),
        device_id: pick(cli.ids.device_id, builtin.device_id),
        device_version: pick(cli.ids.device_version, builtin.device_version),
    };
    let config = PatchConfig::new(identity, ids);

    let header = if cli.header.is_absolute() {
        cli.header
    } else {
        cli.project_dir.join(&cli.header)
    };
    let patcher = HeaderPatcher::new(&header).dry_run(cli.dry_run);
    let outcome = patcher
        .patch(&config)
        .with_context(|| format!("patching {}", header.display()))?;

    if let PatchOutcome::Patched { edits, written } = &outcome {
        for edit in edits {
            debug!(name = edit.name, rhs = %edit.rhs, "edit");
        }
        info!(edits = edits.len(), written, "done");
    }
    Ok(())
}

/// Options from `platformio.ini`, or none when the project has no such file.
fn load_project(project_dir: &Path, env: Option<&str>) -> Result<IniProjectOptions> {
    let path = project_dir.join(PROJECT_FILE);
    if !path.is_file() {
        if let Some(env) = env {
            bail!("--env {env} given but {} does not exist", path.display());
        }
        debug!(path = %path.display(), "no project file; using flags only");
        return Ok(IniProjectOptions::default());
    }
    let options = IniProjectOptions::load(project_dir, env)
        .with_context(|| format!("reading {}", path.display()))?;
    if let Some(env) = options.env() {
        info!(env, "using project options");
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn id_arg_parses_keep_and_literals() {
        assert_eq!("keep".parse::<IdArg>(), Ok(IdArg::Keep));
        assert_eq!("KEEP".parse::<IdArg>(), Ok(IdArg::Keep));
        assert_eq!(
            "0x0102".parse::<IdArg>(),
            Ok(IdArg::Set(RawIdLiteral::from_u16(0x0102)))
        );
        assert!("nope".parse::<IdArg>().is_err());
    }

    #[test]
    fn pick_honours_keep_over_default() {
        let default = Some(RawIdLiteral::from_u16(0x16c0));
        assert_eq!(pick(None, default.clone()), default);
        assert_eq!(pick(Some(IdArg::Keep), default.clone()), None);
        let set = RawIdLiteral::from_u16(0x1234);
        assert_eq!(pick(Some(IdArg::Set(set.clone())), default), Some(set));
    }
}
