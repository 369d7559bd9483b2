// SPDX-License-Identifier: Apache-2.0

use std::{collections::HashSet, net::IpAddr, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    is_ipv6_cidr, parse_cidr, parser::display_paths, resolver::ResolvedLinks,
    AccessPoint, DeviceKind, NetDef, ParsedDefs, Renderer,
};

const VLAN_ID_MAX: u16 = 4094;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum Severity {
    /// Blocks the definitions from becoming a [crate::State].
    Fatal,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Fatal => "fatal",
                Self::Warning => "warning",
            }
        )
    }
}

/// One finding of the validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub struct Diagnostic {
    pub severity: Severity,
    /// Identifier of the offending definition.
    pub id: String,
    /// Documents the definition was read from, empty for imported
    /// profiles.
    pub origins: Vec<PathBuf>,
    pub msg: String,
}

impl Diagnostic {
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} (defined in {}): {}",
            self.severity,
            self.id,
            display_paths(&self.origins),
            self.msg
        )
    }
}

struct Collector<'a> {
    defs: &'a ParsedDefs,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Collector<'a> {
    fn push(&mut self, severity: Severity, netdef: &NetDef, msg: String) {
        self.diagnostics.push(Diagnostic {
            severity,
            id: netdef.id.clone(),
            origins: self.defs.origins(&netdef.id).to_vec(),
            msg,
        });
    }

    fn fatal(&mut self, netdef: &NetDef, msg: String) {
        self.push(Severity::Fatal, netdef, msg)
    }

    fn warn(&mut self, netdef: &NetDef, msg: String) {
        self.push(Severity::Warning, netdef, msg)
    }
}

/// Check every definition and collect all findings instead of stopping at
/// the first one. `links` holds the resolved links of `defs` in insertion
/// order.
pub(crate) fn validate(
    defs: &ParsedDefs,
    links: &[ResolvedLinks],
    global_renderer: Option<Renderer>,
) -> Vec<Diagnostic> {
    let mut col = Collector {
        defs,
        diagnostics: Vec::new(),
    };
    for (i, netdef) in defs.iter().enumerate() {
        let resolved = links.get(i).copied().unwrap_or_default();
        check_links(&mut col, netdef, &resolved);
        check_match(&mut col, netdef);
        check_kind(&mut col, netdef, global_renderer);
        check_addressing(&mut col, netdef);
    }
    col.diagnostics
}

fn check_links(col: &mut Collector, netdef: &NetDef, resolved: &ResolvedLinks) {
    let defs = col.defs;
    for (link_kind, target) in netdef.links() {
        match resolved.get(link_kind) {
            None => col.fatal(
                netdef,
                format!("{link_kind} {target} has not been resolved"),
            ),
            Some(_) => {
                if link_kind == crate::LinkKind::VlanParent {
                    if let Some(parent) = defs.get(target) {
                        if matches!(
                            parent.kind,
                            DeviceKind::Wifi | DeviceKind::Tunnel
                        ) {
                            col.fatal(
                                netdef,
                                format!(
                                    "VLAN parent {target} is a {}, which \
                                     cannot carry VLANs",
                                    parent.kind
                                ),
                            );
                        }
                    }
                }
            }
        }
    }
    if netdef.is_member()
        && (!netdef.addresses.is_empty()
            || netdef.dhcp4 == Some(true)
            || netdef.dhcp6 == Some(true))
    {
        col.fatal(
            netdef,
            "bond or bridge member cannot have its own addresses or DHCP"
                .to_string(),
        );
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn check_match(col: &mut Collector, netdef: &NetDef) {
    if netdef.kind.is_physical() {
        if netdef.match_conf.as_ref().map(|m| m.is_empty()) == Some(true)
            && netdef.kind == DeviceKind::Ethernet
        {
            col.warn(
                netdef,
                "Empty match rule applies to every ethernet device"
                    .to_string(),
            );
        }
    } else if netdef.match_conf.is_some() && netdef.kind != DeviceKind::NmDevice
    {
        col.fatal(
            netdef,
            format!("{} definitions cannot use match rules", netdef.kind),
        );
    }

    if netdef.set_name.is_some() {
        match netdef.match_conf.as_ref() {
            None => col.fatal(
                netdef,
                "set-name requires match rules".to_string(),
            ),
            Some(m) if m.is_empty() => col.fatal(
                netdef,
                "set-name requires match rules".to_string(),
            ),
            Some(m) => {
                if m.name.as_deref().map(is_glob) == Some(true) {
                    col.fatal(
                        netdef,
                        "set-name cannot be used with a glob match name"
                            .to_string(),
                    );
                }
            }
        }
    }

    let macs = [
        netdef.match_conf.as_ref().and_then(|m| m.macaddress.as_deref()),
        netdef.macaddress.as_deref(),
    ];
    for mac in macs.into_iter().flatten() {
        if !is_valid_mac(mac) {
            col.fatal(netdef, format!("Invalid MAC address '{mac}'"));
        }
    }
}

/// Ethernet (6 bytes) or InfiniBand (20 bytes) colon separated address.
fn is_valid_mac(mac: &str) -> bool {
    let octets: Vec<&str> = mac.split(':').collect();
    (octets.len() == 6 || octets.len() == 20)
        && octets.iter().all(|o| {
            o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit())
        })
}

fn check_kind(
    col: &mut Collector,
    netdef: &NetDef,
    global_renderer: Option<Renderer>,
) {
    match netdef.kind {
        DeviceKind::Vlan => match netdef.vlan_id {
            None => col.fatal(netdef, "VLAN requires an id".to_string()),
            Some(id) if id > VLAN_ID_MAX => col.fatal(
                netdef,
                format!("VLAN id {id} is out of range 0-{VLAN_ID_MAX}"),
            ),
            Some(_) => (),
        },
        DeviceKind::Wifi => {
            if netdef.access_points.is_empty() {
                col.fatal(
                    netdef,
                    "wifi requires at least one access point".to_string(),
                );
            }
            for (ssid, ap) in netdef.access_points.iter() {
                if let Some(mode) = ap.mode.as_deref() {
                    if !AccessPoint::MODES.contains(&mode) {
                        col.fatal(
                            netdef,
                            format!(
                                "Access point {ssid} has invalid mode \
                                 '{mode}', expecting one of {}",
                                AccessPoint::MODES.join(", ")
                            ),
                        );
                    }
                }
            }
        }
        DeviceKind::Tunnel => {
            if netdef.mode.is_none() {
                col.fatal(netdef, "tunnel requires a mode".to_string());
            }
        }
        DeviceKind::NmDevice => {
            if netdef.passthrough_get("connection", "type").is_none() {
                col.fatal(
                    netdef,
                    "nm-devices require passthrough connection.type"
                        .to_string(),
                );
            }
            if netdef.effective_renderer(global_renderer)
                != Renderer::NetworkManager
            {
                col.warn(
                    netdef,
                    "nm-devices are only rendered by NetworkManager"
                        .to_string(),
                );
            }
        }
        _ => (),
    }
    if netdef.kind == DeviceKind::Vlan && netdef.link.is_none() {
        col.fatal(netdef, "VLAN requires a link".to_string());
    }
    if let Some(uuid) = netdef.uuid() {
        if let Err(e) = uuid::Uuid::parse_str(uuid) {
            col.fatal(netdef, format!("Invalid UUID '{uuid}': {e}"));
        }
    }
}

fn check_addressing(col: &mut Collector, netdef: &NetDef) {
    let mut seen: HashSet<&str> = HashSet::new();
    for addr in netdef.addresses.iter() {
        if let Err(e) = parse_cidr(addr) {
            col.fatal(netdef, e.msg().to_string());
        }
        if !seen.insert(addr.as_str()) {
            col.warn(netdef, format!("Duplicate address {addr}"));
        }
    }

    for (gw, want_v6, name) in [
        (netdef.gateway4.as_deref(), false, "gateway4"),
        (netdef.gateway6.as_deref(), true, "gateway6"),
    ] {
        if let Some(gw) = gw {
            match gw.parse::<IpAddr>() {
                Ok(ip) if ip.is_ipv6() == want_v6 => (),
                _ => col.fatal(netdef, format!("Invalid {name} '{gw}'")),
            }
        }
    }

    for route in netdef.routes.iter() {
        match route.to.as_deref() {
            None => col.fatal(netdef, "Route is missing 'to'".to_string()),
            Some("default") => {
                if let Some(via) = route.via.as_deref() {
                    if via.parse::<IpAddr>().is_err() {
                        col.fatal(
                            netdef,
                            format!(
                                "Default route has invalid gateway '{via}'"
                            ),
                        );
                    }
                }
            }
            Some(to) => {
                if let Err(e) = parse_cidr(to) {
                    col.fatal(netdef, format!("Invalid route: {}", e.msg()));
                } else if let Some(via) = route.via.as_deref() {
                    if via.parse::<IpAddr>().map(|v| v.is_ipv6()).ok()
                        != Some(is_ipv6_cidr(to))
                    {
                        col.fatal(
                            netdef,
                            format!(
                                "Route to {to} has invalid or mismatched \
                                 gateway '{via}'"
                            ),
                        );
                    }
                }
            }
        }
    }

    if let Some(ns) = netdef.nameservers.as_ref() {
        for addr in ns.addresses.iter() {
            if addr.parse::<IpAddr>().is_err() {
                col.fatal(netdef, format!("Invalid nameserver '{addr}'"));
            }
        }
    }
}
