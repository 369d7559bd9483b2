// SPDX-License-Identifier: Apache-2.0

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::{ErrorKind, NplanError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct RouteConfig {
    /// Destination in CIDR notation or `default`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Gateway address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub metric: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "crate::deserializer::option_u32_or_string"
    )]
    pub table: Option<u32>,
}

impl RouteConfig {
    pub fn new(to: &str, via: Option<&str>) -> Self {
        Self {
            to: Some(to.to_string()),
            via: via.map(ToString::to_string),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct NameserverConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search: Vec<String>,
}

impl NameserverConfig {
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty() && self.search.is_empty()
    }
}

/// Parse `<address>/<prefix>` and check the prefix length against the
/// address family.
pub(crate) fn parse_cidr(cidr: &str) -> Result<(IpAddr, u8), NplanError> {
    let (addr, prefix) = cidr.split_once('/').ok_or_else(|| {
        NplanError::new(
            ErrorKind::InvalidArgument,
            format!("Address '{cidr}' is missing the prefix length"),
        )
    })?;
    let addr: IpAddr = addr.parse().map_err(|e| {
        NplanError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid IP address in '{cidr}': {e}"),
        )
    })?;
    let prefix: u8 = prefix.parse().map_err(|e| {
        NplanError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid prefix length in '{cidr}': {e}"),
        )
    })?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    if prefix > max {
        return Err(NplanError::new(
            ErrorKind::InvalidArgument,
            format!("Prefix length of '{cidr}' exceeds {max}"),
        ));
    }
    Ok((addr, prefix))
}

pub(crate) fn is_ipv6_cidr(cidr: &str) -> bool {
    cidr.split('/').next().map(|a| a.contains(':')).unwrap_or_default()
}
