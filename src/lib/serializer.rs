// SPDX-License-Identifier: Apache-2.0

use serde_yaml::{Mapping, Value};

use crate::{
    loader::NETWORK_KEY, parser::SUPPORTED_VERSION, DeviceKind, NetDef,
    NplanError, Renderer,
};

const INTERFACES_KEY: &str = "interfaces";

/// Properties of one definition in document syntax. `members` are
/// appended to `interfaces` unless already listed there.
pub(crate) fn netdef_to_value(
    netdef: &NetDef,
    members: &[&str],
) -> Result<Value, NplanError> {
    let mut value = serde_yaml::to_value(netdef)?;
    if !members.is_empty() {
        if let Value::Mapping(map) = &mut value {
            add_interfaces(map, members);
        }
    }
    Ok(value)
}

/// Controller entry only carrying the membership of `members`, for
/// controllers defined in another document.
pub(crate) fn membership_stub(members: &[&str]) -> Value {
    let mut map = Mapping::new();
    add_interfaces(&mut map, members);
    Value::Mapping(map)
}

fn add_interfaces(map: &mut Mapping, members: &[&str]) {
    let key = Value::String(INTERFACES_KEY.to_string());
    let entry = map
        .entry(key)
        .or_insert_with(|| Value::Sequence(Vec::new()));
    if let Value::Sequence(seq) = entry {
        for member in members {
            let member = Value::String(member.to_string());
            if !seq.contains(&member) {
                seq.push(member);
            }
        }
    }
}

/// Wrap definition entries into a full document:
/// `network: {version: 2, renderer: ..., <section>: {<id>: ...}}`.
/// Sections are emitted in a fixed order, entries keep the given order.
pub(crate) fn build_document(
    entries: Vec<(DeviceKind, String, Value)>,
    renderer: Option<Renderer>,
) -> Result<Value, NplanError> {
    let mut network = Mapping::new();
    network.insert(
        Value::String("version".to_string()),
        Value::Number(SUPPORTED_VERSION.into()),
    );
    if let Some(renderer) = renderer {
        network.insert(
            Value::String("renderer".to_string()),
            serde_yaml::to_value(renderer)?,
        );
    }
    for kind in DeviceKind::ALL {
        let mut section = Mapping::new();
        for (_, id, value) in entries.iter().filter(|(k, _, _)| *k == kind) {
            section.insert(Value::String(id.clone()), value.clone());
        }
        if !section.is_empty() {
            network.insert(
                Value::String(kind.section().to_string()),
                Value::Mapping(section),
            );
        }
    }
    let mut doc = Mapping::new();
    doc.insert(
        Value::String(NETWORK_KEY.to_string()),
        Value::Mapping(network),
    );
    Ok(Value::Mapping(doc))
}
