// SPDX-License-Identifier: Apache-2.0

use crate::{
    is_ipv6_cidr,
    keyfile::{
        import::{
            NM_TYPE_BOND, NM_TYPE_BRIDGE, NM_TYPE_ETHERNET, NM_TYPE_IP_TUNNEL,
            NM_TYPE_VLAN, NM_TYPE_WIFI, NM_TYPE_WIREGUARD, TUNNEL_MODES,
            WPA_PSK,
        },
        naming::profile_filename,
        Keyfile,
    },
    DeviceKind, ErrorKind, NetDef, NplanError,
};

/// Render the profiles NetworkManager needs for a definition, keyed by
/// profile file name. Wireless definitions get one profile per access
/// point.
pub fn netdef_to_keyfiles(
    netdef: &NetDef,
) -> Result<Vec<(String, Keyfile)>, NplanError> {
    if netdef.kind == DeviceKind::Wifi && !netdef.access_points.is_empty() {
        netdef
            .access_points
            .keys()
            .map(|ssid| {
                Ok((
                    profile_filename(&netdef.id, Some(ssid)),
                    netdef_to_keyfile(netdef, Some(ssid))?,
                ))
            })
            .collect()
    } else {
        Ok(vec![(
            profile_filename(&netdef.id, None),
            netdef_to_keyfile(netdef, None)?,
        )])
    }
}

/// Render one profile. `ssid` selects the access point of a wireless
/// definition.
///
/// Passthrough settings are written last and win over translated ones.
pub fn netdef_to_keyfile(
    netdef: &NetDef,
    ssid: Option<&str>,
) -> Result<Keyfile, NplanError> {
    let mut kf = Keyfile::new();

    if let Some(name) = netdef.nm_name() {
        kf.set("connection", "id", name);
    }
    if let Some(nm_type) = nm_type(netdef) {
        kf.set("connection", "type", nm_type);
    }
    if let Some(uuid) = netdef.uuid() {
        kf.set("connection", "uuid", uuid);
    }
    let match_name = netdef.match_conf.as_ref().and_then(|m| m.name.as_deref());
    if netdef.kind.is_physical() {
        if let Some(name) = match_name {
            kf.set("connection", "interface-name", name);
        }
    } else if netdef.uuid().is_none() {
        kf.set("connection", "interface-name", &netdef.id);
    }
    if let Some(bond) = netdef.bond.as_deref() {
        kf.set("connection", "master", bond);
        kf.set("connection", "slave-type", NM_TYPE_BOND);
    } else if let Some(bridge) = netdef.bridge.as_deref() {
        kf.set("connection", "master", bridge);
        kf.set("connection", "slave-type", NM_TYPE_BRIDGE);
    }

    let link_group = match netdef.kind {
        DeviceKind::Wifi => Some(NM_TYPE_WIFI),
        DeviceKind::Ethernet => Some(NM_TYPE_ETHERNET),
        _ => None,
    };
    if let Some(group) = link_group {
        kf.ensure_group(group);
        if let Some(mac) = netdef
            .match_conf
            .as_ref()
            .and_then(|m| m.macaddress.as_deref())
        {
            kf.set(group, "mac-address", mac);
        }
        if let Some(mac) = netdef.macaddress.as_deref() {
            kf.set(group, "cloned-mac-address", mac);
        }
        if let Some(mtu) = netdef.mtu {
            kf.set(group, "mtu", &mtu.to_string());
        }
    }

    match netdef.kind {
        DeviceKind::Vlan => {
            if let Some(vlan_id) = netdef.vlan_id {
                kf.set(NM_TYPE_VLAN, "id", &vlan_id.to_string());
            }
            if let Some(link) = netdef.link.as_deref() {
                kf.set(NM_TYPE_VLAN, "parent", link);
            }
        }
        DeviceKind::Wifi => export_wifi(&mut kf, netdef, ssid)?,
        DeviceKind::Tunnel => export_tunnel(&mut kf, netdef),
        _ => (),
    }

    export_ip(&mut kf, netdef, true);
    export_ip(&mut kf, netdef, false);

    if let Some(nm) = netdef.networkmanager.as_ref() {
        for (group, settings) in nm.passthrough.iter() {
            kf.ensure_group(group);
            for (key, value) in settings.iter() {
                kf.set(group, key, value);
            }
        }
    }
    Ok(kf)
}

fn nm_type(netdef: &NetDef) -> Option<&str> {
    Some(match netdef.kind {
        DeviceKind::Ethernet => NM_TYPE_ETHERNET,
        DeviceKind::Wifi => NM_TYPE_WIFI,
        DeviceKind::Bond => NM_TYPE_BOND,
        DeviceKind::Bridge => NM_TYPE_BRIDGE,
        DeviceKind::Vlan => NM_TYPE_VLAN,
        DeviceKind::Tunnel => {
            if netdef.mode.as_deref() == Some(NM_TYPE_WIREGUARD) {
                NM_TYPE_WIREGUARD
            } else {
                NM_TYPE_IP_TUNNEL
            }
        }
        // Carried by passthrough
        DeviceKind::NmDevice => return None,
    })
}

fn export_wifi(
    kf: &mut Keyfile,
    netdef: &NetDef,
    ssid: Option<&str>,
) -> Result<(), NplanError> {
    let ssid = match ssid {
        Some(s) => s,
        None => return Ok(()),
    };
    let ap = netdef.access_points.get(ssid).ok_or_else(|| {
        NplanError::new(
            ErrorKind::InvalidArgument,
            format!("{}: no access point with SSID '{ssid}'", netdef.id),
        )
    })?;
    kf.set(NM_TYPE_WIFI, "ssid", ssid);
    if let Some(mode) = ap.mode.as_deref() {
        kf.set(NM_TYPE_WIFI, "mode", mode);
    }
    if let Some(hidden) = ap.hidden {
        kf.set(NM_TYPE_WIFI, "hidden", &hidden.to_string());
    }
    if let Some(psk) = ap.password.as_deref() {
        kf.set("wifi-security", "key-mgmt", WPA_PSK);
        kf.set("wifi-security", "psk", psk);
    }
    Ok(())
}

fn export_tunnel(kf: &mut Keyfile, netdef: &NetDef) {
    if netdef.mode.as_deref() == Some(NM_TYPE_WIREGUARD) {
        kf.ensure_group(NM_TYPE_WIREGUARD);
        if let Some(key) = netdef.key.as_deref() {
            kf.set(NM_TYPE_WIREGUARD, "private-key", key);
        }
        return;
    }
    let mode = netdef.mode.as_deref().and_then(|mode| {
        TUNNEL_MODES.iter().find(|(_, name)| *name == mode)
    });
    match (mode, netdef.mode.as_deref()) {
        (Some((num, _)), _) => {
            kf.set(NM_TYPE_IP_TUNNEL, "mode", &num.to_string())
        }
        (None, Some(mode)) => {
            log::warn!(
                "{}: tunnel mode {mode} has no NetworkManager equivalent",
                netdef.id
            );
        }
        (None, None) => (),
    }
    if let Some(local) = netdef.local.as_deref() {
        kf.set(NM_TYPE_IP_TUNNEL, "local", local);
    }
    if let Some(remote) = netdef.remote.as_deref() {
        kf.set(NM_TYPE_IP_TUNNEL, "remote", remote);
    }
}

fn export_ip(kf: &mut Keyfile, netdef: &NetDef, is_v4: bool) {
    let group = if is_v4 { "ipv4" } else { "ipv6" };
    let dhcp = if is_v4 { netdef.dhcp4 } else { netdef.dhcp6 };
    let addresses: Vec<&str> = netdef
        .addresses
        .iter()
        .map(String::as_str)
        .filter(|a| is_ipv6_cidr(a) != is_v4)
        .collect();

    if dhcp == Some(true) {
        kf.set(group, "method", "auto");
    } else if !addresses.is_empty() {
        kf.set(group, "method", "manual");
    }
    for (i, addr) in addresses.iter().enumerate() {
        kf.set(group, &format!("address{}", i + 1), addr);
    }
    let gateway = if is_v4 {
        netdef.gateway4.as_deref()
    } else {
        netdef.gateway6.as_deref()
    };
    if let Some(gw) = gateway {
        kf.set(group, "gateway", gw);
    }

    let routes = netdef.routes.iter().filter(|r| {
        let is_v6 = match (r.to.as_deref(), r.via.as_deref()) {
            (Some("default"), Some(via)) => via.contains(':'),
            (Some(to), _) => is_ipv6_cidr(to),
            (None, Some(via)) => via.contains(':'),
            (None, None) => false,
        };
        is_v6 != is_v4
    });
    for (i, route) in routes.enumerate() {
        let mut value = match route.to.as_deref() {
            Some("default") | None => {
                let any = if is_v4 { "0.0.0.0/0" } else { "::/0" };
                any.to_string()
            }
            Some(to) => to.to_string(),
        };
        if route.via.is_some() || route.metric.is_some() {
            value.push(',');
            value.push_str(route.via.as_deref().unwrap_or_default());
        }
        if let Some(metric) = route.metric {
            value.push_str(&format!(",{metric}"));
        }
        kf.set(group, &format!("route{}", i + 1), &value);
        if let Some(table) = route.table {
            kf.set(
                group,
                &format!("route{}_options", i + 1),
                &format!("table={table}"),
            );
        }
    }

    if let Some(ns) = netdef.nameservers.as_ref() {
        let dns: Vec<&str> = ns
            .addresses
            .iter()
            .map(String::as_str)
            .filter(|a| a.contains(':') != is_v4)
            .collect();
        if !dns.is_empty() {
            kf.set(group, "dns", &format!("{};", dns.join(";")));
        }
        if is_v4 && !ns.search.is_empty() {
            kf.set(group, "dns-search", &format!("{};", ns.search.join(";")));
        }
    }
}
