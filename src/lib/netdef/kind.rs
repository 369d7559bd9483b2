// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[non_exhaustive]
#[serde(rename_all = "kebab-case")]
/// Device kind of a [crate::NetDef], one per top level document section.
pub enum DeviceKind {
    /// Physical ethernet device.
    /// Defined in the `ethernets` section.
    Ethernet,
    /// Wireless device.
    /// Defined in the `wifis` section.
    Wifi,
    /// Bond interface.
    /// Defined in the `bonds` section.
    Bond,
    /// Bridge interface.
    /// Defined in the `bridges` section.
    Bridge,
    /// VLAN interface.
    /// Defined in the `vlans` section.
    Vlan,
    /// IP or WireGuard tunnel.
    /// Defined in the `tunnels` section.
    Tunnel,
    /// Device only known to NetworkManager, configured through passthrough
    /// settings.
    /// Defined in the `nm-devices` section.
    NmDevice,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Ethernet => "ethernet",
                Self::Wifi => "wifi",
                Self::Bond => "bond",
                Self::Bridge => "bridge",
                Self::Vlan => "vlan",
                Self::Tunnel => "tunnel",
                Self::NmDevice => "nm-device",
            }
        )
    }
}

impl DeviceKind {
    /// Sections in the order they are emitted into documents.
    pub const ALL: [Self; 7] = [
        Self::Ethernet,
        Self::Wifi,
        Self::Bond,
        Self::Bridge,
        Self::Vlan,
        Self::Tunnel,
        Self::NmDevice,
    ];

    pub fn section(&self) -> &'static str {
        match self {
            Self::Ethernet => "ethernets",
            Self::Wifi => "wifis",
            Self::Bond => "bonds",
            Self::Bridge => "bridges",
            Self::Vlan => "vlans",
            Self::Tunnel => "tunnels",
            Self::NmDevice => "nm-devices",
        }
    }

    pub fn from_section(section: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.section() == section)
    }

    /// Whether devices of this kind exist in hardware and are found
    /// through match rules.
    pub fn is_physical(&self) -> bool {
        matches!(self, Self::Ethernet | Self::Wifi)
    }

    /// Whether other definitions could join this kind as member.
    pub fn is_controller(&self) -> bool {
        matches!(self, Self::Bond | Self::Bridge)
    }
}
