// SPDX-License-Identifier: Apache-2.0

mod backend;
mod ip;
mod kind;
#[allow(clippy::module_inception)]
mod netdef;
mod parsed_defs;
mod wifi;

pub(crate) use self::ip::{is_ipv6_cidr, parse_cidr};
pub use self::{
    backend::{NmSettings, Renderer},
    ip::{NameserverConfig, RouteConfig},
    kind::DeviceKind,
    netdef::{LinkKind, MatchConfig, NetDef},
    parsed_defs::ParsedDefs,
    wifi::AccessPoint,
};
