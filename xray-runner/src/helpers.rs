// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for junit-xray.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Resolves a configured output path to a normalized absolute path.
///
/// `$VAR` and `${VAR}` references are expanded through `env` first; unset variables are left as
/// written. A leading `~` component is then expanded to `home_dir` if one is known. Relative paths
/// are joined onto `base_dir`.
pub(crate) fn resolve_output_path(
    path: &Utf8Path,
    base_dir: &Utf8Path,
    home_dir: Option<&Utf8Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Utf8PathBuf {
    let path = Utf8PathBuf::from(expand_env_vars(path.as_str(), env));
    let expanded = match (path.strip_prefix("~"), home_dir) {
        (Ok(rest), Some(home_dir)) => home_dir.join(rest),
        _ => path.clone(),
    };
    normalize_lexically(&base_dir.join(expanded))
}

/// Expands `$VAR` and `${VAR}` references in `input`.
///
/// Variable names are ASCII alphanumerics and underscores. References to unset variables, and
/// unterminated `${`, are kept verbatim.
pub(crate) fn expand_env_vars(input: &str, env: impl Fn(&str) -> Option<String>) -> String {
    let is_name_char = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(dollar) = rest.find('$') {
        out.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];
        let (name, reference_len) = match after.strip_prefix('{') {
            Some(braced) => match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            },
            None => {
                let end = after.find(|c| !is_name_char(c)).unwrap_or(after.len());
                (&after[..end], end)
            }
        };
        let value = if name.is_empty() { None } else { env(name) };
        match value {
            Some(value) => {
                out.push_str(&value);
                rest = &after[reference_len..];
            }
            None => {
                out.push('$');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Normalizes `.` and `..` components without touching the file system.
///
/// `..` at the root stays at the root.
pub(crate) fn normalize_lexically(path: &Utf8Path) -> Utf8PathBuf {
    let mut out = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::Prefix(_) | Utf8Component::RootDir | Utf8Component::Normal(_) => {
                out.push(component);
            }
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                let at_root = matches!(
                    out.components().next_back(),
                    None | Some(Utf8Component::RootDir | Utf8Component::Prefix(_))
                );
                if !at_root {
                    out.pop();
                }
            }
        }
    }
    out
}

/// Converts a path reported by the host to use forward slashes.
pub(crate) fn convert_path_to_forward_slash(path: &str) -> String {
    path.replace('\\', "/")
}

/// Serializes and deserializes durations as fractional seconds.
pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub(crate) fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|error| D::Error::custom(format!("invalid duration {secs}: {error}")))
    }
}
