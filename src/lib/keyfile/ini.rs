// SPDX-License-Identifier: Apache-2.0

use crate::{ErrorKind, NplanError};

/// Sectioned `key=value` text as used by NetworkManager profiles.
///
/// Groups and keys keep the order they were read or set in. Whitespace
/// around keys and values is dropped as GKeyFile does, escape sequences
/// are not interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[non_exhaustive]
pub struct Keyfile {
    groups: Vec<(String, Vec<(String, String)>)>,
}

impl Keyfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(content: &str) -> Result<Self, NplanError> {
        let mut ret = Self::new();
        let mut cur_group: Option<String> = None;
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim_start();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';')
            {
                continue;
            }
            if let Some(group) = line.strip_prefix('[') {
                let group = group.trim_end().strip_suffix(']').ok_or_else(|| {
                    NplanError::new(
                        ErrorKind::SyntaxError,
                        format!(
                            "Line {}: unterminated group header '{line}'",
                            line_no + 1
                        ),
                    )
                })?;
                if group.is_empty() {
                    return Err(NplanError::new(
                        ErrorKind::SyntaxError,
                        format!("Line {}: empty group name", line_no + 1),
                    ));
                }
                ret.group_mut(group);
                cur_group = Some(group.to_string());
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                NplanError::new(
                    ErrorKind::SyntaxError,
                    format!(
                        "Line {}: expecting 'key=value', got '{line}'",
                        line_no + 1
                    ),
                )
            })?;
            let group = cur_group.as_deref().ok_or_else(|| {
                NplanError::new(
                    ErrorKind::SyntaxError,
                    format!(
                        "Line {}: key '{}' appears before any group",
                        line_no + 1,
                        key.trim_end()
                    ),
                )
            })?;
            ret.set(group, key.trim_end(), value.trim());
        }
        Ok(ret)
    }

    pub fn get(&self, group: &str, key: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|(g, _)| g == group)
            .and_then(|(_, entries)| entries.iter().find(|(k, _)| k == key))
            .map(|(_, v)| v.as_str())
    }

    /// Set a value, replacing the existing one in place.
    pub fn set(&mut self, group: &str, key: &str, value: &str) {
        let entries = self.group_mut(group);
        if let Some((_, v)) = entries.iter_mut().find(|(k, _)| k == key) {
            *v = value.to_string();
        } else {
            entries.push((key.to_string(), value.to_string()));
        }
    }

    /// Remove and return a value. Groups left empty are kept, so that
    /// an empty `[group]` still round trips.
    pub fn take(&mut self, group: &str, key: &str) -> Option<String> {
        let entries = self
            .groups
            .iter_mut()
            .find(|(g, _)| g == group)
            .map(|(_, e)| e)?;
        let pos = entries.iter().position(|(k, _)| k == key)?;
        Some(entries.remove(pos).1)
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(g, _)| g.as_str())
    }

    pub fn entries<'a>(
        &'a self,
        group: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.groups
            .iter()
            .filter(move |(g, _)| g == group)
            .flat_map(|(_, e)| e.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn group_mut(&mut self, group: &str) -> &mut Vec<(String, String)> {
        let pos = match self.groups.iter().position(|(g, _)| g == group) {
            Some(p) => p,
            None => {
                self.groups.push((group.to_string(), Vec::new()));
                self.groups.len() - 1
            }
        };
        &mut self.groups[pos].1
    }

    pub(crate) fn ensure_group(&mut self, group: &str) {
        self.group_mut(group);
    }
}

impl std::fmt::Display for Keyfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (group, entries)) in self.groups.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "[{group}]")?;
            for (key, value) in entries {
                writeln!(f, "{key}={value}")?;
            }
        }
        Ok(())
    }
}
