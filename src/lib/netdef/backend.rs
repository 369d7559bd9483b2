// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[non_exhaustive]
/// Backend owning a definition at runtime.
pub enum Renderer {
    #[default]
    #[serde(rename = "networkd")]
    Networkd,
    #[serde(rename = "NetworkManager")]
    NetworkManager,
}

impl std::fmt::Display for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Networkd => "networkd",
                Self::NetworkManager => "NetworkManager",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// NetworkManager specific settings, serialized under `networkmanager`.
pub struct NmSettings {
    /// UUID of the NetworkManager connection this definition came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Human readable connection name (`connection.id` of the keyfile).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Keyfile settings without a native representation, grouped by
    /// keyfile section. Written back verbatim on export.
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "crate::deserializer::passthrough"
    )]
    pub passthrough: BTreeMap<String, BTreeMap<String, String>>,
}

impl NmSettings {
    pub fn is_empty(&self) -> bool {
        self.uuid.is_none()
            && self.name.is_none()
            && self.passthrough.is_empty()
    }

    pub fn passthrough_get(&self, group: &str, key: &str) -> Option<&str> {
        self.passthrough
            .get(group)
            .and_then(|g| g.get(key))
            .map(String::as_str)
    }

    pub(crate) fn passthrough_set(
        &mut self,
        group: &str,
        key: &str,
        value: &str,
    ) {
        self.passthrough
            .entry(group.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }
}
