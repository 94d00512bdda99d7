// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]
//! Black-box tests of the `usbcfg` binary against a scratch project.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const HEADER: &str = "\
#define USB_CFG_VENDOR_ID       0xc0, 0x16
#define USB_CFG_DEVICE_ID       0xdc, 0x05
#define USB_CFG_DEVICE_VERSION  0x00, 0x01
#define USB_CFG_VENDOR_NAME     'x'
#define USB_CFG_VENDOR_NAME_LEN 1
#define USB_CFG_DEVICE_NAME     'y'
#define USB_CFG_DEVICE_NAME_LEN 1
#define USB_CFG_SERIAL_NUMBER   'z'
#define USB_CFG_SERIAL_NUMBER_LEN 1
";

const INI: &str = "\
[platformio]
default_envs = digispark

[env:digispark]
platform = atmelavr
custom_usb_vendor_str = Acme
custom_usb_product_str = Joy Pad
custom_usb_serial_str = 0042
";

fn project(ini: Option<&str>) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let header = dir.path().join("lib/DigisparkJoystick/usbconfig.h");
    fs::create_dir_all(header.parent().unwrap()).unwrap();
    fs::write(&header, HEADER).unwrap();
    if let Some(ini) = ini {
        fs::write(dir.path().join("platformio.ini"), ini).unwrap();
    }
    (dir, header)
}

fn usbcfg(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("usbcfg").unwrap();
    cmd.arg("--project-dir").arg(dir);
    cmd
}

#[test]
fn patches_header_from_platformio_options() {
    let (dir, header) = project(Some(INI));
    usbcfg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("patched USB config"));

    let text = fs::read_to_string(&header).unwrap();
    assert!(text.contains("#define USB_CFG_VENDOR_NAME     'A','c','m','e'\n"));
    assert!(text.contains("#define USB_CFG_VENDOR_NAME_LEN 4\n"));
    assert!(text.contains("#define USB_CFG_DEVICE_NAME     'J','o','y',' ','P','a','d'\n"));
    assert!(text.contains("#define USB_CFG_DEVICE_NAME_LEN 7\n"));
    assert!(text.contains("#define USB_CFG_SERIAL_NUMBER_LEN 4\n"));
    assert!(text.contains("#define USB_CFG_DEVICE_ID       0xdc, 0x27\n"));
}

#[test]
fn second_run_reports_no_changes() {
    let (dir, header) = project(Some(INI));
    usbcfg(dir.path()).assert().success();
    let first = fs::read(&header).unwrap();

    usbcfg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("no changes needed"));
    assert_eq!(fs::read(&header).unwrap(), first);
}

#[test]
fn flags_work_without_project_file() {
    let (dir, header) = project(None);
    usbcfg(dir.path())
        .args(["--vendor", "AB", "--product", "P", "--serial", "1"])
        .assert()
        .success();
    let text = fs::read_to_string(&header).unwrap();
    assert!(text.contains("#define USB_CFG_VENDOR_NAME     'A','B'\n"));
    assert!(text.contains("#define USB_CFG_VENDOR_NAME_LEN 2\n"));
}

#[test]
fn flags_override_project_options() {
    let (dir, header) = project(Some(INI));
    usbcfg(dir.path())
        .args(["--serial", "SN-9"])
        .assert()
        .success();
    let text = fs::read_to_string(&header).unwrap();
    assert!(text.contains("#define USB_CFG_SERIAL_NUMBER   'S','N','-','9'\n"));
    assert!(text.contains("'A','c','m','e'"));
}

#[test]
fn blank_vendor_fails_before_touching_header() {
    let dir = tempfile::tempdir().unwrap();
    // No header exists: the config error must win over the missing file.
    usbcfg(dir.path())
        .args(["--vendor", "   ", "--product", "P", "--serial", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("custom_usb_vendor_str"))
        .stderr(predicate::str::contains("not found").not());
}

#[test]
fn missing_option_names_the_key() {
    let (dir, header) = project(Some("[env:a]\ncustom_usb_vendor_str = Acme\n"));
    usbcfg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("custom_usb_product_str"));
    assert_eq!(fs::read_to_string(header).unwrap(), HEADER);
}

#[test]
fn missing_header_fails() {
    let (dir, header) = project(Some(INI));
    fs::remove_file(&header).unwrap();
    usbcfg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("usbconfig.h not found"));
}

#[test]
fn duplicate_macro_fails_and_leaves_header() {
    let (dir, header) = project(Some(INI));
    let doubled = format!("{HEADER}#define USB_CFG_DEVICE_NAME 'q'\n");
    fs::write(&header, &doubled).unwrap();
    usbcfg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "expected to patch exactly 1 line for USB_CFG_DEVICE_NAME, but matched 2",
        ));
    assert_eq!(fs::read_to_string(header).unwrap(), doubled);
}

#[test]
fn id_flags_override_and_keep() {
    let (dir, header) = project(Some(INI));
    usbcfg(dir.path())
        .args(["--device-id", "keep", "--device-version", "0x0102"])
        .assert()
        .success();
    let text = fs::read_to_string(&header).unwrap();
    assert!(text.contains("#define USB_CFG_DEVICE_ID       0xdc, 0x05\n"));
    assert!(text.contains("#define USB_CFG_DEVICE_VERSION  0x02, 0x01\n"));
}

#[test]
fn bad_id_flag_is_rejected_by_parser() {
    let (dir, _header) = project(Some(INI));
    usbcfg(dir.path())
        .args(["--vendor-id", "16C0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--vendor-id"));
}

#[test]
fn dry_run_does_not_write() {
    let (dir, header) = project(Some(INI));
    usbcfg(dir.path())
        .arg("--dry-run")
        .assert()
        .success()
        .stderr(predicate::str::contains("would be patched"));
    assert_eq!(fs::read_to_string(header).unwrap(), HEADER);
}

#[test]
fn unknown_env_is_reported() {
    let (dir, _header) = project(Some(INI));
    usbcfg(dir.path())
        .args(["--env", "uno"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown build environment `uno`"));
}

#[test]
fn custom_header_path_is_relative_to_project() {
    let (dir, _header) = project(Some(INI));
    let alt = dir.path().join("usbconfig.h");
    fs::write(&alt, HEADER).unwrap();
    usbcfg(dir.path())
        .args(["--header", "usbconfig.h"])
        .assert()
        .success();
    assert!(fs::read_to_string(alt).unwrap().contains("'A','c','m','e'"));
}
