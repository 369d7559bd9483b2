// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::NetDef;

/// Definitions keyed by identifier.
///
/// Iteration follows insertion order: the last inserted definition is the
/// newest one, e.g. the definition just imported from a keyfile.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct ParsedDefs {
    pub(crate) defs: HashMap<String, NetDef>,
    pub(crate) insert_order: Vec<String>,
    /// Documents each definition was read from, in merge order.
    pub(crate) origins: HashMap<String, Vec<PathBuf>>,
}

impl ParsedDefs {
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.defs.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&NetDef> {
        self.defs.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut NetDef> {
        self.defs.get_mut(id)
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &NetDef> {
        self.insert_order.iter().filter_map(|id| self.defs.get(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.insert_order.iter().map(String::as_str)
    }

    /// The most recently inserted definition.
    pub fn last(&self) -> Option<&NetDef> {
        self.insert_order.last().and_then(|id| self.defs.get(id))
    }

    pub fn origins(&self, id: &str) -> &[PathBuf] {
        self.origins.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub(crate) fn add_origin(&mut self, id: &str, path: &Path) {
        let origins = self.origins.entry(id.to_string()).or_default();
        if !origins.iter().any(|p| p == path) {
            origins.push(path.to_path_buf());
        }
    }

    pub(crate) fn remove_origin(&mut self, id: &str, path: &Path) {
        if let Some(origins) = self.origins.get_mut(id) {
            origins.retain(|p| p != path);
        }
    }

    /// Append a new definition or extend the existing one with the same
    /// identifier.
    pub(crate) fn merge_netdef(
        &mut self,
        netdef: NetDef,
    ) -> Result<(), crate::NplanError> {
        if let Some(cur) = self.defs.get_mut(&netdef.id) {
            log::debug!("Extending definition {}", netdef.id);
            cur.merge(&netdef)
        } else {
            self.push(netdef);
            Ok(())
        }
    }

    /// Insert the definition as the newest one, dropping any existing
    /// definition and origin of the same identifier.
    /// Return true if an existing definition was replaced.
    pub(crate) fn replace(&mut self, netdef: NetDef) -> bool {
        let replaced = self.remove(&netdef.id).is_some();
        self.push(netdef);
        replaced
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<NetDef> {
        let ret = self.defs.remove(id)?;
        self.insert_order.retain(|i| i != id);
        self.origins.remove(id);
        Some(ret)
    }

    fn push(&mut self, netdef: NetDef) {
        self.insert_order.push(netdef.id.clone());
        self.defs.insert(netdef.id.clone(), netdef);
    }
}
