// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use crate::{
    parser::display_paths, DeviceKind, ErrorKind, LinkKind, NplanError,
    ParsedDefs,
};

/// Handle of a definition inside the [crate::State] it was resolved for.
/// Only meaningful together with that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetDefHandle(pub(crate) usize);

/// Resolved outgoing links of one definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub struct ResolvedLinks {
    pub bond: Option<NetDefHandle>,
    pub bridge: Option<NetDefHandle>,
    pub vlan_parent: Option<NetDefHandle>,
}

impl ResolvedLinks {
    pub fn get(&self, link_kind: LinkKind) -> Option<NetDefHandle> {
        match link_kind {
            LinkKind::Bond => self.bond,
            LinkKind::Bridge => self.bridge,
            LinkKind::VlanParent => self.vlan_parent,
        }
    }

    fn set(&mut self, link_kind: LinkKind, handle: NetDefHandle) {
        match link_kind {
            LinkKind::Bond => self.bond = Some(handle),
            LinkKind::Bridge => self.bridge = Some(handle),
            LinkKind::VlanParent => self.vlan_parent = Some(handle),
        }
    }

    fn iter(&self) -> impl Iterator<Item = NetDefHandle> {
        [self.bond, self.bridge, self.vlan_parent].into_iter().flatten()
    }
}

/// Turn every raw identifier link into a [NetDefHandle].
///
/// Membership declared by controllers through `interfaces` is copied onto
/// the members first. The returned links are indexed by insertion order of
/// `defs`.
pub(crate) fn resolve(
    defs: &mut ParsedDefs,
) -> Result<Vec<ResolvedLinks>, NplanError> {
    apply_declared_membership(defs)?;

    let index: HashMap<&str, usize> =
        defs.ids().enumerate().map(|(i, id)| (id, i)).collect();
    let mut links = vec![ResolvedLinks::default(); index.len()];

    for (i, netdef) in defs.iter().enumerate() {
        for (link_kind, target) in netdef.links() {
            let target_index = match index.get(target) {
                Some(t) => *t,
                None => {
                    return Err(NplanError::new(
                        ErrorKind::ReferenceError,
                        format!(
                            "{}: {link_kind} {target} is not defined \
                             (defined in {})",
                            netdef.id,
                            display_paths(defs.origins(&netdef.id))
                        ),
                    ));
                }
            };
            if let Some(target_def) = defs.get(target) {
                check_link_target(
                    &netdef.id,
                    link_kind,
                    target,
                    target_def.kind,
                )?;
            }
            links[i].set(link_kind, NetDefHandle(target_index));
            log::debug!("Resolved {} {link_kind} {target}", netdef.id);
        }
    }

    let ids: Vec<&str> = defs.ids().collect();
    check_cycles(&ids, &links)?;
    Ok(links)
}

/// Controllers list their members in `interfaces`, members carry the
/// reverse link. A member may only belong to one bond and one bridge.
fn apply_declared_membership(defs: &mut ParsedDefs) -> Result<(), NplanError> {
    let mut pending: Vec<(String, LinkKind, String)> = Vec::new();
    for controller in defs.iter().filter(|n| n.kind.is_controller()) {
        let link_kind = if controller.kind == DeviceKind::Bond {
            LinkKind::Bond
        } else {
            LinkKind::Bridge
        };
        for member in controller.interfaces.iter() {
            pending.push((member.clone(), link_kind, controller.id.clone()));
        }
    }

    for (member_id, link_kind, controller_id) in pending {
        let origins = display_paths(defs.origins(&controller_id));
        let member = match defs.get_mut(&member_id) {
            Some(m) => m,
            None => {
                return Err(NplanError::new(
                    ErrorKind::ReferenceError,
                    format!(
                        "{controller_id}: interface {member_id} is not \
                         defined (defined in {origins})"
                    ),
                ));
            }
        };
        let slot = match link_kind {
            LinkKind::Bond => &mut member.bond,
            _ => &mut member.bridge,
        };
        match slot.as_deref() {
            Some(cur) if cur != controller_id => {
                return Err(NplanError::new(
                    ErrorKind::ReferenceError,
                    format!(
                        "{member_id}: already member of {link_kind} {cur}, \
                         cannot join {controller_id} (defined in {origins})"
                    ),
                ));
            }
            Some(_) => (),
            None => *slot = Some(controller_id),
        }
    }
    Ok(())
}

fn check_link_target(
    id: &str,
    link_kind: LinkKind,
    target: &str,
    target_kind: DeviceKind,
) -> Result<(), NplanError> {
    let expected = match link_kind {
        LinkKind::Bond => DeviceKind::Bond,
        LinkKind::Bridge => DeviceKind::Bridge,
        LinkKind::VlanParent => return Ok(()),
    };
    if target_kind == expected {
        Ok(())
    } else {
        Err(NplanError::new(
            ErrorKind::ReferenceError,
            format!(
                "{id}: {link_kind} {target} is a {target_kind}, not a \
                 {expected}"
            ),
        ))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Depth first search over the link graph with an explicit stack, so the
/// chain length is bounded by memory rather than by the call stack.
fn check_cycles(
    ids: &[&str],
    links: &[ResolvedLinks],
) -> Result<(), NplanError> {
    let mut marks = vec![Mark::Unvisited; links.len()];

    for start in 0..links.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        // (node, outgoing links not yet followed)
        let mut stack: Vec<(usize, Vec<NetDefHandle>)> =
            vec![(start, links[start].iter().collect())];
        marks[start] = Mark::InProgress;

        while let Some((node, pending)) = stack.last_mut() {
            let node = *node;
            match pending.pop() {
                Some(NetDefHandle(next)) => match marks[next] {
                    Mark::Unvisited => {
                        marks[next] = Mark::InProgress;
                        stack.push((next, links[next].iter().collect()));
                    }
                    Mark::InProgress => {
                        let mut chain: Vec<&str> = stack
                            .iter()
                            .map(|(i, _)| ids[*i])
                            .skip_while(|id| *id != ids[next])
                            .collect();
                        chain.push(ids[next]);
                        return Err(NplanError::new(
                            ErrorKind::ReferenceError,
                            format!(
                                "Circular link found: {}",
                                chain.join(" -> ")
                            ),
                        ));
                    }
                    Mark::Done => (),
                },
                None => {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
            }
        }
    }
    Ok(())
}
