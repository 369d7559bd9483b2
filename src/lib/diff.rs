// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    net::IpAddr,
};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::{
    is_ipv6_cidr, parse_cidr, DeviceKind, ErrorKind, NetDef, NplanError,
    RouteConfig, State,
};

const GLOBAL_STATE_KEY: &str = "netplan-global-state";
const LOOPBACK: &str = "lo";
const DEFAULT_ROUTE: &str = "default";

const TABLE_DEFAULT: u32 = 253;
const TABLE_MAIN: u32 = 254;
const TABLE_LOCAL: u32 = 255;

const AF_INET: u8 = 2;
const AF_INET6: u8 = 10;

/// Interfaces found on the running system, keyed by interface name.
///
/// Read from the YAML or JSON interface report of a status tool. The
/// `netplan-global-state` entry and unknown per-interface properties are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[non_exhaustive]
pub struct SystemState {
    pub interfaces: BTreeMap<String, SystemInterface>,
}

impl SystemState {
    pub fn new(content: &str) -> Result<Self, NplanError> {
        let value: Value = serde_yaml::from_str(content)?;
        let mapping = match value {
            Value::Mapping(m) => m,
            Value::Null => return Ok(Self::default()),
            _ => {
                return Err(NplanError::new(
                    ErrorKind::InvalidArgument,
                    "System state should be a mapping of interface names"
                        .to_string(),
                ));
            }
        };
        let mut interfaces = BTreeMap::new();
        for (name, iface) in mapping {
            let name = match name.as_str() {
                Some(GLOBAL_STATE_KEY) => continue,
                Some(n) => n.to_string(),
                None => {
                    return Err(NplanError::new(
                        ErrorKind::InvalidArgument,
                        format!("Invalid interface name {name:?}"),
                    ));
                }
            };
            let iface: SystemInterface =
                serde_yaml::from_value(iface).map_err(|e| {
                    NplanError::new(
                        ErrorKind::InvalidArgument,
                        format!("Invalid state of interface {name}: {e}"),
                    )
                })?;
            interfaces.insert(name, iface);
        }
        Ok(Self { interfaces })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub struct SystemInterface {
    /// Identifier of the definition the interface was configured from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    /// One single entry mapping per address, keyed by the IP address.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<BTreeMap<String, SystemAddress>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_search: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<SystemRoute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macaddress: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub struct SystemAddress {
    pub prefix: u8,
    /// Origin of the address, e.g. `dhcp`, `ra` or `link`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
}

/// Route table given by number or by one of the well known names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteTable {
    Number(u32),
    Name(String),
}

impl RouteTable {
    /// Unknown names map to 0.
    pub fn number(&self) -> u32 {
        match self {
            Self::Number(n) => *n,
            Self::Name(name) => match name.as_str() {
                "default" => TABLE_DEFAULT,
                "main" => TABLE_MAIN,
                "local" => TABLE_LOCAL,
                n => n.parse().unwrap_or_default(),
            },
        }
    }
}

/// Route as the system reports it. Configured routes are expressed the
/// same way when reported in a [StateDiff].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub struct SystemRoute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<RouteTable>,
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub route_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

impl SystemRoute {
    fn table_number(&self) -> u32 {
        self.table.as_ref().map(RouteTable::number).unwrap_or(TABLE_MAIN)
    }

    fn key(&self) -> (String, Option<String>, u32) {
        (
            normalize_destination(self.to.as_deref().unwrap_or_default()),
            self.via.as_deref().map(normalize_ip),
            self.table_number(),
        )
    }

    fn from_config(route: &RouteConfig) -> Self {
        let to = route.to.clone().unwrap_or_default();
        let ipv6 = if to == DEFAULT_ROUTE {
            route.via.as_deref().map(is_ipv6_cidr).unwrap_or_default()
        } else {
            is_ipv6_cidr(&to)
        };
        Self {
            to: Some(to),
            via: route.via.clone(),
            metric: route.metric,
            family: Some(if ipv6 { AF_INET6 } else { AF_INET }),
            table: Some(RouteTable::Number(route.table.unwrap_or(TABLE_MAIN))),
            ..Default::default()
        }
    }
}

/// Differences between the configured state and the running system.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[non_exhaustive]
pub struct StateDiff {
    /// Interfaces present on both sides which differ, keyed by interface
    /// name.
    pub interfaces: BTreeMap<String, InterfaceDiff>,
    /// Configured definitions no system interface was created from.
    /// Wireless definitions are left out as they may be disconnected.
    pub missing_interfaces_system: Vec<String>,
    /// System interfaces not created from any definition, loopback
    /// excluded.
    pub missing_interfaces_netplan: Vec<String>,
}

impl StateDiff {
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
            && self.missing_interfaces_system.is_empty()
            && self.missing_interfaces_netplan.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[non_exhaustive]
pub struct InterfaceDiff {
    /// Identifier of the definition.
    pub id: String,
    /// Configuration missing from the system.
    #[serde(skip_serializing_if = "MissingConfig::is_empty")]
    pub system_state: MissingConfig,
    /// Configuration of the system missing from the definition.
    #[serde(skip_serializing_if = "MissingConfig::is_empty")]
    pub netplan_state: MissingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[non_exhaustive]
pub struct MissingConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_addresses: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub missing_dhcp4_address: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub missing_dhcp6_address: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_nameservers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_search_domains: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_routes: Vec<SystemRoute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_macaddress: Option<String>,
}

impl MissingConfig {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl State {
    /// Compare the definitions against a snapshot of the running system.
    ///
    /// Configuration the system sets up on its own is not reported as
    /// missing from the definitions: addresses and routes learned through
    /// DHCP or router advertisement when DHCP is enabled for that family,
    /// IPv6 link-local addresses, and kernel generated routes.
    pub fn diff(&self, system: &SystemState) -> StateDiff {
        let id_to_name: HashMap<&str, &str> = system
            .interfaces
            .iter()
            .filter_map(|(name, iface)| {
                iface.id.as_deref().map(|id| (id, name.as_str()))
            })
            .collect();

        let mut ret = StateDiff::default();
        for netdef in self.iter() {
            let name = match id_to_name.get(netdef.id.as_str()) {
                Some(n) => *n,
                None => {
                    if netdef.kind != DeviceKind::Wifi {
                        ret.missing_interfaces_system.push(netdef.id.clone());
                    }
                    netdef.id.as_str()
                }
            };
            if let Some(iface) = system.interfaces.get(name) {
                let iface_diff = diff_interface(netdef, iface);
                if !iface_diff.system_state.is_empty()
                    || !iface_diff.netplan_state.is_empty()
                {
                    log::debug!("{name} differs from {}", netdef.id);
                    ret.interfaces.insert(name.to_string(), iface_diff);
                }
            }
        }

        for (name, iface) in system.interfaces.iter() {
            if name == LOOPBACK {
                continue;
            }
            let configured = iface
                .id
                .as_deref()
                .map(|id| self.get(id).is_some())
                .unwrap_or_default();
            if !configured {
                ret.missing_interfaces_netplan.push(name.clone());
            }
        }
        ret.missing_interfaces_system.sort_unstable();
        ret
    }
}

fn diff_interface(netdef: &NetDef, iface: &SystemInterface) -> InterfaceDiff {
    let dhcp4 = netdef.dhcp4 == Some(true);
    let dhcp6 = netdef.dhcp6 == Some(true);
    let mut system_state = MissingConfig::default();
    let mut netplan_state = MissingConfig::default();

    // Addresses
    let configured: BTreeSet<String> =
        netdef.addresses.iter().map(|a| normalize_cidr(a)).collect();
    let mut found = BTreeSet::new();
    let mut dhcp4_found = false;
    let mut dhcp6_found = false;
    for (ip, addr) in iface.addresses.iter().flat_map(|a| a.iter()) {
        let cidr = normalize_cidr(&format!("{ip}/{}", addr.prefix));
        let ipv6 = is_ipv6_cidr(&cidr);
        let dynamic = addr.flags.iter().any(|f| f == "dhcp")
            || (ipv6 && addr.flags.iter().any(|f| f == "ra"));
        if dynamic {
            if ipv6 {
                dhcp6_found = true;
            } else {
                dhcp4_found = true;
            }
        }
        let expected_dynamic = dynamic && if ipv6 { dhcp6 } else { dhcp4 };
        if !configured.contains(&cidr)
            && !expected_dynamic
            && !is_ipv6_link_local(ip)
        {
            netplan_state.missing_addresses.push(cidr.clone());
        }
        found.insert(cidr);
    }
    system_state.missing_addresses =
        configured.difference(&found).cloned().collect();
    system_state.missing_dhcp4_address = dhcp4 && !dhcp4_found;
    system_state.missing_dhcp6_address = dhcp6 && !dhcp6_found;

    // Name servers
    let (addresses, search) = match netdef.nameservers.as_ref() {
        Some(ns) => (ns.addresses.as_slice(), ns.search.as_slice()),
        None => (&[][..], &[][..]),
    };
    system_state.missing_nameservers =
        missing_from(addresses, &iface.dns_addresses);
    system_state.missing_search_domains =
        missing_from(search, &iface.dns_search);
    // Learned through DHCP otherwise
    if !dhcp4 && !dhcp6 {
        netplan_state.missing_nameservers =
            missing_from(&iface.dns_addresses, addresses);
        netplan_state.missing_search_domains =
            missing_from(&iface.dns_search, search);
    }

    // Routes
    let configured: Vec<SystemRoute> = configured_routes(netdef);
    let system: Vec<&SystemRoute> = iface
        .routes
        .iter()
        .filter(|r| !is_automatic_route(r, dhcp4, dhcp6))
        .collect();
    system_state.missing_routes = configured
        .iter()
        .filter(|c| !iface.routes.iter().any(|s| route_matches(c, s)))
        .cloned()
        .collect();
    netplan_state.missing_routes = system
        .into_iter()
        .filter(|s| !configured.iter().any(|c| route_matches(c, s)))
        .cloned()
        .collect();

    // MAC address
    if let Some(mac) = netdef.macaddress.as_deref() {
        let same = iface
            .macaddress
            .as_deref()
            .map(|m| m.eq_ignore_ascii_case(mac))
            .unwrap_or_default();
        if !same {
            system_state.missing_macaddress = Some(mac.to_string());
            netplan_state.missing_macaddress.clone_from(&iface.macaddress);
        }
    }

    InterfaceDiff {
        id: netdef.id.clone(),
        system_state,
        netplan_state,
    }
}

/// Entries of `wanted` not found in `present`, IP addresses compared by
/// value.
fn missing_from(wanted: &[String], present: &[String]) -> Vec<String> {
    let present: BTreeSet<String> =
        present.iter().map(|p| normalize_ip(p)).collect();
    wanted
        .iter()
        .filter(|w| !present.contains(&normalize_ip(w)))
        .cloned()
        .collect()
}

fn configured_routes(netdef: &NetDef) -> Vec<SystemRoute> {
    let mut ret: Vec<SystemRoute> =
        netdef.routes.iter().map(SystemRoute::from_config).collect();
    for gateway in [netdef.gateway4.as_deref(), netdef.gateway6.as_deref()]
        .into_iter()
        .flatten()
    {
        ret.push(SystemRoute::from_config(&RouteConfig::new(
            DEFAULT_ROUTE,
            Some(gateway),
        )));
    }
    ret
}

/// The metric only counts when configured.
fn route_matches(configured: &SystemRoute, system: &SystemRoute) -> bool {
    configured.key() == system.key()
        && (configured.metric.is_none() || configured.metric == system.metric)
}

fn is_automatic_route(route: &SystemRoute, dhcp4: bool, dhcp6: bool) -> bool {
    if route.table_number() == TABLE_LOCAL {
        return true;
    }
    if route.route_type.as_deref().is_some_and(|t| t != "unicast") {
        return true;
    }
    let to = route.to.as_deref().unwrap_or_default();
    if to.to_lowercase().starts_with("fe80:") {
        return true;
    }
    let ipv6 = match route.family {
        Some(family) => family == AF_INET6,
        None => is_ipv6_cidr(to),
    };
    match route.protocol.as_deref() {
        Some("kernel") => route.scope.as_deref() == Some("link"),
        Some("dhcp") => (dhcp4 && !ipv6) || (dhcp6 && ipv6),
        Some("ra") => dhcp6,
        _ => false,
    }
}

fn is_ipv6_link_local(ip: &str) -> bool {
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => (v6.segments()[0] & 0xffc0) == 0xfe80,
        _ => false,
    }
}

fn normalize_ip(ip: &str) -> String {
    match ip.parse::<IpAddr>() {
        Ok(addr) => addr.to_string(),
        Err(_) => ip.to_string(),
    }
}

fn normalize_cidr(cidr: &str) -> String {
    match parse_cidr(cidr) {
        Ok((addr, prefix)) => format!("{addr}/{prefix}"),
        Err(_) => cidr.to_string(),
    }
}

/// Host routes may come without prefix length, default routes spelled as
/// the all zero network.
fn normalize_destination(to: &str) -> String {
    if to == DEFAULT_ROUTE {
        return to.to_string();
    }
    match parse_cidr(to) {
        Ok((_, 0)) => DEFAULT_ROUTE.to_string(),
        Ok((addr, prefix)) => {
            let host = if addr.is_ipv4() { 32 } else { 128 };
            if prefix == host {
                addr.to_string()
            } else {
                format!("{addr}/{prefix}")
            }
        }
        Err(_) => normalize_ip(to),
    }
}
