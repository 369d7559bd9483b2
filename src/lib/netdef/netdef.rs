// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    value::merge_yaml_value, AccessPoint, DeviceKind, ErrorKind,
    NameserverConfig, NmSettings, NplanError, Renderer, RouteConfig,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// Rules for finding the physical device a definition applies to.
pub struct MatchConfig {
    /// Kernel interface name, shell glob allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Permanent MAC address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macaddress: Option<String>,
    /// Kernel driver name, shell glob allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
}

impl MatchConfig {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.macaddress.is_none()
            && self.driver.is_none()
    }
}

/// Link from a definition to another one, by identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// Member of a bond.
    Bond,
    /// Member of a bridge.
    Bridge,
    /// VLAN on top of its parent.
    VlanParent,
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Bond => "bond",
                Self::Bridge => "bridge",
                Self::VlanParent => "link",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
/// One network device definition.
///
/// The identifier and device kind are not part of the serialized
/// properties: documents carry them as the mapping key and the section
/// name. Bond and bridge membership is serialized on the controller side
/// through `interfaces`.
pub struct NetDef {
    #[serde(skip)]
    pub id: String,
    #[serde(skip, default = "default_kind")]
    pub kind: DeviceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renderer: Option<Renderer>,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_conf: Option<MatchConfig>,
    /// Rename the matched device to this name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_name: Option<String>,
    /// MAC address to assign to the device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macaddress: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub mtu: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub dhcp4: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_bool_or_string"
    )]
    pub dhcp6: Option<bool>,
    /// Static addresses in CIDR notation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway6: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<RouteConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nameservers: Option<NameserverConfig>,
    /// Members declared by a bond or bridge.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,
    /// Bond or bridge parameters, kept as written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_yaml::Mapping>,
    /// VLAN ID.
    #[serde(
        rename = "id",
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u16_or_string"
    )]
    pub vlan_id: Option<u16>,
    /// Identifier of the VLAN parent definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Tunnel mode, e.g. `gre` or `wireguard`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Wireless networks keyed by SSID.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub access_points: BTreeMap<String, AccessPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub networkmanager: Option<NmSettings>,
    /// Identifier of the bond this definition is member of.
    #[serde(skip)]
    pub bond: Option<String>,
    /// Identifier of the bridge this definition is member of.
    #[serde(skip)]
    pub bridge: Option<String>,
}

impl NetDef {
    pub fn new(id: &str, kind: DeviceKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            renderer: None,
            match_conf: None,
            set_name: None,
            macaddress: None,
            mtu: None,
            dhcp4: None,
            dhcp6: None,
            addresses: Vec::new(),
            gateway4: None,
            gateway6: None,
            routes: Vec::new(),
            nameservers: None,
            interfaces: Vec::new(),
            parameters: None,
            vlan_id: None,
            link: None,
            mode: None,
            local: None,
            remote: None,
            key: None,
            access_points: BTreeMap::new(),
            networkmanager: None,
            bond: None,
            bridge: None,
        }
    }

    /// Build from the property mapping of one document entry.
    pub(crate) fn from_properties(
        id: &str,
        kind: DeviceKind,
        properties: serde_yaml::Value,
    ) -> Result<Self, NplanError> {
        let properties = if properties.is_null() {
            serde_yaml::Value::Mapping(serde_yaml::Mapping::new())
        } else {
            properties
        };
        let mut ret: Self =
            serde_yaml::from_value(properties).map_err(|e| {
                NplanError::new(
                    ErrorKind::SyntaxError,
                    format!("Invalid properties for {kind} {id}: {e}"),
                )
            })?;
        ret.id = id.to_string();
        ret.kind = kind;
        let mut seen = std::collections::HashSet::new();
        ret.interfaces.retain(|i| seen.insert(i.clone()));
        Ok(ret)
    }

    pub fn uuid(&self) -> Option<&str> {
        self.networkmanager.as_ref().and_then(|nm| nm.uuid.as_deref())
    }

    pub fn nm_name(&self) -> Option<&str> {
        self.networkmanager.as_ref().and_then(|nm| nm.name.as_deref())
    }

    pub fn nm_mut(&mut self) -> &mut NmSettings {
        self.networkmanager.get_or_insert_with(NmSettings::default)
    }

    pub fn passthrough_get(&self, group: &str, key: &str) -> Option<&str> {
        self.networkmanager
            .as_ref()
            .and_then(|nm| nm.passthrough_get(group, key))
    }

    /// Outgoing links of this definition, raw identifiers.
    pub fn links(&self) -> Vec<(LinkKind, &str)> {
        let mut ret = Vec::new();
        if let Some(bond) = self.bond.as_deref() {
            ret.push((LinkKind::Bond, bond));
        }
        if let Some(bridge) = self.bridge.as_deref() {
            ret.push((LinkKind::Bridge, bridge));
        }
        if self.kind == DeviceKind::Vlan {
            if let Some(link) = self.link.as_deref() {
                ret.push((LinkKind::VlanParent, link));
            }
        }
        ret
    }

    pub fn is_member(&self) -> bool {
        self.bond.is_some() || self.bridge.is_some()
    }

    pub fn effective_renderer(&self, global: Option<Renderer>) -> Renderer {
        self.renderer.or(global).unwrap_or_default()
    }

    /// Fold properties of `new` into self using the document merge rules:
    /// scalars replace, sequences append, mappings merge key by key.
    pub(crate) fn merge(&mut self, new: &Self) -> Result<(), NplanError> {
        if self.kind != new.kind {
            return Err(NplanError::new(
                ErrorKind::ConflictError,
                format!(
                    "{} is defined as {} but redefined as {}",
                    self.id, self.kind, new.kind
                ),
            ));
        }
        let mut value = serde_yaml::to_value(&*self)?;
        merge_yaml_value(&mut value, serde_yaml::to_value(new)?);
        let mut merged = Self::from_properties(&self.id, self.kind, value)?;
        merged.bond = new.bond.clone().or_else(|| self.bond.take());
        merged.bridge = new.bridge.clone().or_else(|| self.bridge.take());
        *self = merged;
        Ok(())
    }
}

fn default_kind() -> DeviceKind {
    DeviceKind::Ethernet
}
