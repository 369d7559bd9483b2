// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use crate::NetDef;

pub(crate) const NM_ID_PREFIX: &str = "NM-";
const NM_YAML_PREFIX: &str = "90-NM-";
const NETPLAN_YAML_PREFIX: &str = "10-netplan-";
const YAML_SUFFIX: &str = ".yaml";
const PROFILE_PREFIX: &str = "netplan-";
const PROFILE_SUFFIX: &str = ".nmconnection";

/// Document file name a definition is written back to.
///
/// Definitions carrying a NetworkManager UUID go to `90-NM-<uuid>.yaml`,
/// everything else to `10-netplan-<id>.yaml`. The prefix decides where the
/// document lands in the merge order.
pub fn yaml_filename(netdef: &NetDef) -> String {
    match netdef.uuid() {
        Some(uuid) => format!("{NM_YAML_PREFIX}{uuid}{YAML_SUFFIX}"),
        None => format!("{NETPLAN_YAML_PREFIX}{}{YAML_SUFFIX}", netdef.id),
    }
}

/// Same as [yaml_filename()] when only the identifier is known.
/// Identifiers of imported profiles are `NM-<uuid>`.
pub fn yaml_filename_for_id(id: &str) -> String {
    match id.strip_prefix(NM_ID_PREFIX) {
        Some(uuid) if uuid::Uuid::parse_str(uuid).is_ok() => {
            format!("{NM_YAML_PREFIX}{uuid}{YAML_SUFFIX}")
        }
        _ => format!("{NETPLAN_YAML_PREFIX}{id}{YAML_SUFFIX}"),
    }
}

/// Percent-encode everything but RFC 3986 unreserved characters.
pub fn escape_ssid(ssid: &str) -> String {
    urlencoding::encode(ssid).into_owned()
}

/// File name of the NetworkManager profile generated for a definition,
/// `netplan-<id>.nmconnection` or `netplan-<id>-<escaped ssid>.nmconnection`
/// for one access point of a wireless definition.
pub fn profile_filename(id: &str, ssid: Option<&str>) -> String {
    let mut ret = String::from(PROFILE_PREFIX);
    ret.push_str(id);
    if let Some(ssid) = ssid {
        ret.push('-');
        ret.push_str(&escape_ssid(ssid));
    }
    ret.push_str(PROFILE_SUFFIX);
    ret
}

/// Recover the identifier [profile_filename()] was called with.
///
/// Return None when the file name was not produced by it, e.g. a profile
/// created by NetworkManager itself.
pub fn id_from_profile_path(path: &Path, ssid: Option<&str>) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let stem = file_name
        .strip_prefix(PROFILE_PREFIX)?
        .strip_suffix(PROFILE_SUFFIX)?;
    let id = match ssid {
        Some(ssid) => stem
            .strip_suffix(escape_ssid(ssid).as_str())?
            .strip_suffix('-')?,
        None => stem,
    };
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
