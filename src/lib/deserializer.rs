// SPDX-License-Identifier: Apache-2.0

use std::{collections::BTreeMap, marker::PhantomData, str::FromStr};

use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer,
};

pub(crate) fn option_bool_or_string<'de, D>(
    deserializer: D,
) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    struct BoolOrString(PhantomData<fn() -> Option<bool>>);

    impl Visitor<'_> for BoolOrString {
        type Value = Option<bool>;

        fn expecting(
            &self,
            formatter: &mut std::fmt::Formatter,
        ) -> std::fmt::Result {
            formatter.write_str(
                "Need to be boolean: 1|0|true|false|yes|no|on|off|y|n",
            )
        }

        fn visit_bool<E>(self, value: bool) -> Result<Option<bool>, E>
        where
            E: de::Error,
        {
            Ok(Some(value))
        }

        fn visit_str<E>(self, value: &str) -> Result<Option<bool>, E>
        where
            E: de::Error,
        {
            parse_bool(value).map(Some).ok_or_else(|| {
                de::Error::custom(
                    "Need to be boolean: 1|0|true|false|yes|no|on|off|y|n",
                )
            })
        }

        fn visit_u64<E>(self, value: u64) -> Result<Option<bool>, E>
        where
            E: de::Error,
        {
            match value {
                1 => Ok(Some(true)),
                0 => Ok(Some(false)),
                _ => Err(de::Error::custom(
                    "Need to be boolean: 1|0|true|false|yes|no|on|off|y|n",
                )),
            }
        }

        fn visit_unit<E>(self) -> Result<Option<bool>, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(BoolOrString(PhantomData))
}

/// Boolean spelling shared by documents and keyfiles.
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "y" => Some(true),
        "0" | "false" | "no" | "off" | "n" => Some(false),
        _ => None,
    }
}

pub(crate) fn option_u16_or_string<'de, D>(
    deserializer: D,
) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    option_u64_or_string(deserializer).and_then(|i| {
        if let Some(i) = i {
            u16::try_from(i).map(Some).map_err(de::Error::custom)
        } else {
            Ok(None)
        }
    })
}

pub(crate) fn option_u32_or_string<'de, D>(
    deserializer: D,
) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    option_u64_or_string(deserializer).and_then(|i| {
        if let Some(i) = i {
            u32::try_from(i).map(Some).map_err(de::Error::custom)
        } else {
            Ok(None)
        }
    })
}

// This function is inspired by https://serde.rs/string-or-struct.html
pub(crate) fn option_u64_or_string<'de, D>(
    deserializer: D,
) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct IntegerOrString(PhantomData<fn() -> Option<u64>>);

    impl Visitor<'_> for IntegerOrString {
        type Value = Option<u64>;

        fn expecting(
            &self,
            formatter: &mut std::fmt::Formatter,
        ) -> std::fmt::Result {
            formatter.write_str("unsigned integer or string")
        }

        fn visit_str<E>(self, value: &str) -> Result<Option<u64>, E>
        where
            E: de::Error,
        {
            let value = value.trim();
            if let Some(hex) = value.strip_prefix("0x") {
                u64::from_str_radix(hex, 16)
                    .map_err(de::Error::custom)
                    .map(Some)
            } else {
                FromStr::from_str(value)
                    .map_err(de::Error::custom)
                    .map(Some)
            }
        }

        fn visit_u64<E>(self, value: u64) -> Result<Option<u64>, E>
        where
            E: de::Error,
        {
            Ok(Some(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Option<u64>, E>
        where
            E: de::Error,
        {
            u64::try_from(value).map_err(de::Error::custom).map(Some)
        }

        fn visit_unit<E>(self) -> Result<Option<u64>, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(IntegerOrString(PhantomData))
}

/// Accept passthrough settings in both the nested form
/// (`connection: {type: dummy}`) and the dotted form
/// (`connection.type: dummy`). Dotted keys split at the last dot, so
/// `wireguard-peer.abc.endpoint` lands in group `wireguard-peer.abc`.
pub(crate) fn passthrough<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, BTreeMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut ret: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    let value = serde_yaml::Value::deserialize(deserializer)?;
    let map = match value {
        serde_yaml::Value::Null => return Ok(ret),
        serde_yaml::Value::Mapping(m) => m,
        _ => {
            return Err(de::Error::custom(
                "passthrough should be a mapping of settings",
            ))
        }
    };
    for (key, value) in map {
        let key = scalar_to_string(&key).ok_or_else(|| {
            de::Error::custom("passthrough key should be a string")
        })?;
        match value {
            serde_yaml::Value::Mapping(group_map) => {
                let group = ret.entry(key.clone()).or_default();
                for (sub_key, sub_value) in group_map {
                    let sub_key =
                        scalar_to_string(&sub_key).ok_or_else(|| {
                            de::Error::custom(format!(
                                "passthrough key under {key} should be a \
                                 string"
                            ))
                        })?;
                    let sub_value =
                        scalar_to_string(&sub_value).ok_or_else(|| {
                            de::Error::custom(format!(
                                "passthrough value of {key}.{sub_key} \
                                 should be a scalar"
                            ))
                        })?;
                    group.insert(sub_key, sub_value);
                }
            }
            other => {
                let (group, setting) =
                    key.rsplit_once('.').ok_or_else(|| {
                        de::Error::custom(format!(
                            "passthrough key {key} should be in the form \
                             of <group>.<key>"
                        ))
                    })?;
                let value = scalar_to_string(&other).ok_or_else(|| {
                    de::Error::custom(format!(
                        "passthrough value of {key} should be a scalar"
                    ))
                })?;
                ret.entry(group.to_string())
                    .or_default()
                    .insert(setting.to_string(), value);
            }
        }
    }
    Ok(ret)
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Null => Some(String::new()),
        _ => None,
    }
}
