// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// One wireless network a [crate::DeviceKind::Wifi] definition connects to.
/// Keyed by SSID in the `access-points` mapping.
pub struct AccessPoint {
    /// Pre-shared key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// `infrastructure`, `ap` or `adhoc`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub hidden: Option<bool>,
}

impl AccessPoint {
    pub(crate) const MODES: [&'static str; 3] =
        ["infrastructure", "ap", "adhoc"];
}
