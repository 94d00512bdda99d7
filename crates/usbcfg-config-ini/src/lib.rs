// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `platformio.ini`-backed [`ProjectOptions`] for usbcfg.
//!
//! Options are looked up in the selected `[env:NAME]` section first, then in
//! the shared `[env]` section, the same inheritance PlatformIO applies to
//! `custom_*` options. Without an explicit environment the first entry of
//! `[platformio] default_envs` is used, else the first `[env:*]` section.
//!
//! Supported syntax: `[section]` headers, `key = value`, full-line `;`/`#`
//! comments, inline `;`/`#` comments preceded by whitespace, and indented
//! continuation lines (joined with `\n`). Keys are case-insensitive.
//!
//! `${section.key}` interpolation is not expanded. Looking up a value that
//! contains `${` fails with a parse error naming its line, so a template is
//! never handed on as a literal string.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;
use usbcfg_core::{OptionsError, ProjectOptions};

/// Project file name inside the project directory.
pub const PROJECT_FILE: &str = "platformio.ini";

const ENV_PREFIX: &str = "env:";
const SHARED_ENV: &str = "env";
const INTERPOLATION: &str = "${";

/// An option value and the line its key sits on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Value {
    text: String,
    line: usize,
}

#[derive(Debug, Default)]
struct Section {
    name: String,
    values: BTreeMap<String, Value>,
}

/// Options of one PlatformIO build environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniProjectOptions {
    env: Option<String>,
    env_values: BTreeMap<String, Value>,
    shared: BTreeMap<String, Value>,
}

impl IniProjectOptions {
    /// Read `<project_dir>/platformio.ini` and select `env`.
    pub fn load(project_dir: &Path, env: Option<&str>) -> Result<Self, OptionsError> {
        let path = project_dir.join(PROJECT_FILE);
        let text = fs::read_to_string(&path)?;
        debug!(path = %path.display(), "loaded project options");
        Self::parse(&text, env)
    }

    /// Parse project file contents and select `env`.
    pub fn parse(text: &str, env: Option<&str>) -> Result<Self, OptionsError> {
        let mut sections = parse_sections(text)?;
        let env = match env {
            Some(name) => Some(name.to_owned()),
            None => default_env(&sections),
        };

        let mut take = |name: &str| {
            sections
                .iter_mut()
                .find(|s| s.name == name)
                .map(|s| std::mem::take(&mut s.values))
        };
        let shared = take(SHARED_ENV).unwrap_or_default();
        let env_values = match &env {
            Some(name) => take(&format!("{ENV_PREFIX}{name}"))
                .ok_or_else(|| OptionsError::UnknownEnv(name.clone()))?,
            None => BTreeMap::new(),
        };
        Ok(Self {
            env,
            env_values,
            shared,
        })
    }

    /// Selected build environment, if the project declares any.
    pub fn env(&self) -> Option<&str> {
        self.env.as_deref()
    }
}

impl ProjectOptions for IniProjectOptions {
    fn get_option(&self, name: &str) -> Result<Option<String>, OptionsError> {
        let key = name.to_ascii_lowercase();
        let Some(value) = self.env_values.get(&key).or_else(|| self.shared.get(&key)) else {
            return Ok(None);
        };
        if value.text.contains(INTERPOLATION) {
            return Err(OptionsError::Parse {
                line: value.line,
                reason: format!("`{name}` uses `${{...}}` interpolation, which is not supported"),
            });
        }
        Ok(Some(value.text.clone()))
    }
}

fn default_env(sections: &[Section]) -> Option<String> {
    let listed = sections
        .iter()
        .find(|s| s.name == "platformio")
        .and_then(|s| s.values.get("default_envs"))
        .and_then(|v| {
            v.text
                .split(|c: char| c == ',' || c.is_whitespace())
                .find(|e| !e.is_empty())
                .map(str::to_owned)
        });
    listed.or_else(|| {
        sections
            .iter()
            .find_map(|s| s.name.strip_prefix(ENV_PREFIX).map(str::to_owned))
    })
}

fn parse_sections(text: &str) -> Result<Vec<Section>, OptionsError> {
    let mut sections: Vec<Section> = Vec::new();
    let mut last_key: Option<String> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            last_key = None;
            continue;
        }
        if trimmed.starts_with(';') || trimmed.starts_with('#') {
            continue;
        }

        let indented = raw.starts_with([' ', '\t']);
        if indented {
            if let (Some(section), Some(key)) = (sections.last_mut(), last_key.as_ref()) {
                if let Some(value) = section.values.get_mut(key) {
                    let more = strip_inline_comment(trimmed);
                    if !more.is_empty() {
                        if !value.text.is_empty() {
                            value.text.push('\n');
                        }
                        value.text.push_str(more);
                    }
                    continue;
                }
            }
        }

        if let Some(name) = trimmed.strip_prefix('[') {
            let name = name.strip_suffix(']').ok_or_else(|| OptionsError::Parse {
                line: line_no,
                reason: "unterminated section header".into(),
            })?;
            sections.push(Section {
                name: name.trim().to_owned(),
                values: BTreeMap::new(),
            });
            last_key = None;
            continue;
        }

        let (key, value) = trimmed.split_once('=').ok_or_else(|| OptionsError::Parse {
            line: line_no,
            reason: format!("expected `key = value`, got `{trimmed}`"),
        })?;
        let section = sections.last_mut().ok_or_else(|| OptionsError::Parse {
            line: line_no,
            reason: "option outside of any section".into(),
        })?;
        let key = key.trim().to_ascii_lowercase();
        section.values.insert(
            key.clone(),
            Value {
                text: strip_inline_comment(value.trim()).to_owned(),
                line: line_no,
            },
        );
        last_key = Some(key);
    }
    Ok(sections)
}

/// Cut an inline `;` or `#` comment; it must follow whitespace to count.
fn strip_inline_comment(value: &str) -> &str {
    let bytes = value.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if matches!(b, b';' | b'#') && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return value[..i].trim_end();
        }
    }
    value
}
