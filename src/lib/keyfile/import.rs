// SPDX-License-Identifier: Apache-2.0

use crate::{
    deserializer::parse_bool,
    keyfile::{naming::NM_ID_PREFIX, Keyfile},
    AccessPoint, DeviceKind, ErrorKind, MatchConfig, NameserverConfig, NetDef,
    NmSettings, NplanError, Renderer, RouteConfig,
};

pub(crate) const NM_TYPE_ETHERNET: &str = "ethernet";
pub(crate) const NM_TYPE_WIFI: &str = "wifi";
pub(crate) const NM_TYPE_BOND: &str = "bond";
pub(crate) const NM_TYPE_BRIDGE: &str = "bridge";
pub(crate) const NM_TYPE_VLAN: &str = "vlan";
pub(crate) const NM_TYPE_IP_TUNNEL: &str = "ip-tunnel";
pub(crate) const NM_TYPE_WIREGUARD: &str = "wireguard";

pub(crate) const WPA_PSK: &str = "wpa-psk";

/// NetworkManager `ip-tunnel.mode` numbers.
pub(crate) const TUNNEL_MODES: [(u32, &str); 11] = [
    (1, "ipip"),
    (2, "gre"),
    (3, "sit"),
    (4, "isatap"),
    (5, "vti"),
    (6, "ip6ip6"),
    (7, "ipip6"),
    (8, "ip6gre"),
    (9, "vti6"),
    (10, "gretap"),
    (11, "ip6gretap"),
];

fn kind_from_nm_type(nm_type: &str) -> DeviceKind {
    match nm_type {
        NM_TYPE_ETHERNET | "802-3-ethernet" => DeviceKind::Ethernet,
        NM_TYPE_WIFI | "802-11-wireless" => DeviceKind::Wifi,
        NM_TYPE_BOND => DeviceKind::Bond,
        NM_TYPE_BRIDGE => DeviceKind::Bridge,
        NM_TYPE_VLAN => DeviceKind::Vlan,
        NM_TYPE_IP_TUNNEL | NM_TYPE_WIREGUARD => DeviceKind::Tunnel,
        _ => DeviceKind::NmDevice,
    }
}

/// Translate one profile into a definition.
///
/// Settings without a native field are kept in
/// [NmSettings::passthrough] so that exporting the definition gives back
/// an equivalent profile.
pub fn netdef_from_keyfile(keyfile: &Keyfile) -> Result<NetDef, NplanError> {
    let mut kf = keyfile.clone();

    let nm_type = kf.get("connection", "type").map(ToString::to_string);
    let kind = kind_from_nm_type(nm_type.as_deref().unwrap_or_default());
    if kind != DeviceKind::NmDevice {
        // Unknown types stay in passthrough, they are needed on export.
        kf.take("connection", "type");
    }

    let uuid = match kf.take("connection", "uuid") {
        Some(u) => {
            uuid::Uuid::parse_str(&u).map_err(|e| {
                NplanError::new(
                    ErrorKind::ConstraintError,
                    format!("Invalid connection.uuid '{u}': {e}"),
                )
            })?;
            Some(u)
        }
        None => None,
    };

    let iface_name = if uuid.is_none() || kind.is_physical() {
        kf.take("connection", "interface-name")
    } else {
        None
    };

    let id = match (uuid.as_deref(), iface_name.as_deref()) {
        (Some(u), _) => format!("{NM_ID_PREFIX}{u}"),
        (None, Some(n)) => n.to_string(),
        (None, None) => {
            return Err(NplanError::new(
                ErrorKind::InvalidArgument,
                "Profile has neither connection.uuid nor \
                 connection.interface-name"
                    .to_string(),
            ));
        }
    };

    let mut netdef = NetDef::new(&id, kind);
    netdef.renderer = Some(Renderer::NetworkManager);

    let name = kf.take("connection", "id");
    if kind.is_physical() {
        let mut match_conf = MatchConfig {
            name: iface_name,
            ..Default::default()
        };
        let link_group = if kind == DeviceKind::Wifi {
            NM_TYPE_WIFI
        } else {
            NM_TYPE_ETHERNET
        };
        match_conf.macaddress = kf.take(link_group, "mac-address");
        netdef.match_conf = Some(match_conf);
        netdef.macaddress = kf.take(link_group, "cloned-mac-address");
        if let Some(mtu) = kf.take(link_group, "mtu") {
            netdef.mtu = Some(parse_num(link_group, "mtu", &mtu)?);
        }
    }

    import_controller(&mut kf, &mut netdef);

    match kind {
        DeviceKind::Vlan => {
            if let Some(vlan_id) = kf.take(NM_TYPE_VLAN, "id") {
                netdef.vlan_id = Some(parse_num(NM_TYPE_VLAN, "id", &vlan_id)?);
            }
            netdef.link = kf.take(NM_TYPE_VLAN, "parent");
        }
        DeviceKind::Wifi => import_wifi(&mut kf, &mut netdef)?,
        DeviceKind::Tunnel => {
            import_tunnel(&mut kf, &mut netdef, nm_type.as_deref())
        }
        _ => (),
    }

    import_ip(&mut kf, &mut netdef, "ipv4")?;
    import_ip(&mut kf, &mut netdef, "ipv6")?;

    let mut nm = NmSettings {
        uuid,
        name,
        ..Default::default()
    };
    for group in kf.groups() {
        let mut entries = kf.entries(group).peekable();
        if entries.peek().is_none() && !keyfile_group_consumed(group) {
            // Keep empty groups like `[proxy]` alive.
            nm.passthrough.entry(group.to_string()).or_default();
        }
        for (key, value) in entries {
            nm.passthrough_set(group, key, value);
        }
    }
    netdef.networkmanager = Some(nm);
    Ok(netdef)
}

/// Groups whose content is fully translated and recreated on export.
fn keyfile_group_consumed(group: &str) -> bool {
    matches!(
        group,
        "connection"
            | NM_TYPE_ETHERNET
            | NM_TYPE_WIFI
            | "wifi-security"
            | NM_TYPE_VLAN
            | NM_TYPE_IP_TUNNEL
            | NM_TYPE_WIREGUARD
            | "ipv4"
            | "ipv6"
    )
}

fn import_controller(kf: &mut Keyfile, netdef: &mut NetDef) {
    let port_type = kf
        .get("connection", "slave-type")
        .or_else(|| kf.get("connection", "port-type"))
        .map(ToString::to_string);
    let link = match port_type.as_deref() {
        Some(NM_TYPE_BOND) => &mut netdef.bond,
        Some(NM_TYPE_BRIDGE) => &mut netdef.bridge,
        _ => return,
    };
    let controller = kf
        .take("connection", "master")
        .or_else(|| kf.take("connection", "controller"));
    if controller.is_some() {
        *link = controller;
        kf.take("connection", "slave-type");
        kf.take("connection", "port-type");
    }
}

fn import_wifi(
    kf: &mut Keyfile,
    netdef: &mut NetDef,
) -> Result<(), NplanError> {
    let ssid = match kf.take(NM_TYPE_WIFI, "ssid") {
        Some(s) => s,
        None => return Ok(()),
    };
    let mut ap = AccessPoint {
        mode: kf.take(NM_TYPE_WIFI, "mode"),
        ..Default::default()
    };
    if let Some(hidden) = kf.take(NM_TYPE_WIFI, "hidden") {
        ap.hidden = Some(parse_bool(&hidden).ok_or_else(|| {
            NplanError::new(
                ErrorKind::SyntaxError,
                format!("Invalid wifi.hidden '{hidden}'"),
            )
        })?);
    }
    if kf.get("wifi-security", "key-mgmt") == Some(WPA_PSK) {
        if let Some(psk) = kf.take("wifi-security", "psk") {
            kf.take("wifi-security", "key-mgmt");
            ap.password = Some(psk);
        }
    }
    netdef.access_points.insert(ssid, ap);
    Ok(())
}

fn import_tunnel(kf: &mut Keyfile, netdef: &mut NetDef, nm_type: Option<&str>) {
    if nm_type == Some(NM_TYPE_WIREGUARD) {
        netdef.mode = Some(NM_TYPE_WIREGUARD.to_string());
        netdef.key = kf.take(NM_TYPE_WIREGUARD, "private-key");
        return;
    }
    let mode = kf
        .get(NM_TYPE_IP_TUNNEL, "mode")
        .and_then(|m| m.parse::<u32>().ok())
        .and_then(|m| TUNNEL_MODES.iter().find(|(n, _)| *n == m))
        .map(|(_, name)| name.to_string());
    if mode.is_some() {
        kf.take(NM_TYPE_IP_TUNNEL, "mode");
        netdef.mode = mode;
    }
    netdef.local = kf.take(NM_TYPE_IP_TUNNEL, "local");
    netdef.remote = kf.take(NM_TYPE_IP_TUNNEL, "remote");
}

fn import_ip(
    kf: &mut Keyfile,
    netdef: &mut NetDef,
    group: &str,
) -> Result<(), NplanError> {
    let is_v4 = group == "ipv4";

    let addresses = take_numbered(kf, group, "address");
    let method = kf.get(group, "method").map(ToString::to_string);
    match method.as_deref() {
        Some("auto") => {
            kf.take(group, "method");
            if is_v4 {
                netdef.dhcp4 = Some(true);
            } else {
                netdef.dhcp6 = Some(true);
            }
        }
        Some("manual") if !addresses.is_empty() => {
            kf.take(group, "method");
        }
        _ => (),
    }

    for (_, value) in addresses {
        let mut parts = value.split(',');
        if let Some(addr) = parts.next() {
            netdef.addresses.push(addr.trim().to_string());
        }
        if let Some(gw) = parts.next().filter(|g| !g.is_empty()) {
            set_gateway(netdef, is_v4, gw);
        }
    }
    if let Some(gw) = kf.take(group, "gateway") {
        set_gateway(netdef, is_v4, &gw);
    }

    for (num, value) in take_numbered(kf, group, "route") {
        let parts: Vec<&str> = value.split(',').map(str::trim).collect();
        let mut route = RouteConfig::new(
            parts.first().copied().unwrap_or_default(),
            parts.get(1).copied().filter(|v| !v.is_empty()),
        );
        if let Some(metric) = parts.get(2) {
            route.metric = Some(parse_num(group, "route", metric)?);
        }
        let opt_key = format!("route{num}_options");
        let table = kf
            .get(group, &opt_key)
            .and_then(|o| o.strip_prefix("table="))
            .and_then(|t| t.parse::<u32>().ok());
        if table.is_some() {
            kf.take(group, &opt_key);
            route.table = table;
        }
        netdef.routes.push(route);
    }

    let dns = kf.take(group, "dns");
    // Search domains only have one native home, ipv6 ones stay passthrough.
    let search = if is_v4 { kf.take(group, "dns-search") } else { None };
    if dns.is_some() || search.is_some() {
        let ns = netdef
            .nameservers
            .get_or_insert_with(NameserverConfig::default);
        ns.addresses.extend(split_list(dns.as_deref()));
        ns.search.extend(split_list(search.as_deref()));
    }
    Ok(())
}

fn set_gateway(netdef: &mut NetDef, is_v4: bool, gw: &str) {
    let gw = Some(gw.trim().to_string());
    if is_v4 {
        netdef.gateway4 = gw;
    } else {
        netdef.gateway6 = gw;
    }
}

/// Remove `<prefix>N` keys (`address1`, `route2`, ...) ordered by N.
fn take_numbered(
    kf: &mut Keyfile,
    group: &str,
    prefix: &str,
) -> Vec<(u32, String)> {
    let mut keys: Vec<(u32, String)> = kf
        .entries(group)
        .filter_map(|(k, _)| {
            k.strip_prefix(prefix)
                .and_then(|n| n.parse::<u32>().ok())
                .map(|n| (n, k.to_string()))
        })
        .collect();
    keys.sort_unstable();
    keys.into_iter()
        .filter_map(|(n, k)| kf.take(group, &k).map(|v| (n, v)))
        .collect()
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_num<T: std::str::FromStr>(
    group: &str,
    key: &str,
    value: &str,
) -> Result<T, NplanError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| {
        NplanError::new(
            ErrorKind::SyntaxError,
            format!("Invalid {group}.{key} '{value}': {e}"),
        )
    })
}
