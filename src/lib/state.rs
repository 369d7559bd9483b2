// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::{
    resolver::{resolve, NetDefHandle, ResolvedLinks},
    serializer::{build_document, membership_stub, netdef_to_value},
    validation::{validate, Diagnostic},
    write_back::{writable_path, write_document},
    ErrorKind, LinkKind, NetDef, NplanConf, NplanError, ParsedDefs, Parser,
    Renderer,
};

/// Resolved and validated definitions, read only once built.
///
/// Iteration follows the order definitions were first seen while merging,
/// with imported profiles last.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct State {
    defs: ParsedDefs,
    links: Vec<ResolvedLinks>,
    global_renderer: Option<Renderer>,
    diagnostics: Vec<Diagnostic>,
}

impl State {
    /// Resolve and validate everything the parser built.
    ///
    /// Fails with [ErrorKind::ReferenceError] on a dangling or circular
    /// link, or with [ErrorKind::ConstraintError] listing every fatal
    /// diagnostic. Warnings are logged and kept in
    /// [State::diagnostics()].
    pub fn new(parser: Parser) -> Result<Self, NplanError> {
        let Parser {
            mut defs,
            global_renderer,
            ..
        } = parser;
        let links = resolve(&mut defs)?;
        let diagnostics = validate(&defs, &links, global_renderer);

        let fatals: Vec<String> = diagnostics
            .iter()
            .filter(|d| d.is_fatal())
            .map(ToString::to_string)
            .collect();
        if !fatals.is_empty() {
            return Err(NplanError::new(
                ErrorKind::ConstraintError,
                format!(
                    "{} fatal problem(s) found:\n{}",
                    fatals.len(),
                    fatals.join("\n")
                ),
            ));
        }
        for diagnostic in diagnostics.iter() {
            log::warn!("{diagnostic}");
        }
        Ok(Self {
            defs,
            links,
            global_renderer,
            diagnostics,
        })
    }

    /// Resolve and validate without building a state, returning every
    /// diagnostic, fatal ones included.
    pub fn check(parser: &Parser) -> Result<Vec<Diagnostic>, NplanError> {
        let mut defs = parser.defs.clone();
        let links = resolve(&mut defs)?;
        Ok(validate(&defs, &links, parser.global_renderer))
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetDef> {
        self.defs.iter()
    }

    pub fn get(&self, id: &str) -> Option<&NetDef> {
        self.defs.get(id)
    }

    pub fn handle(&self, id: &str) -> Option<NetDefHandle> {
        self.defs.ids().position(|i| i == id).map(NetDefHandle)
    }

    pub fn netdef(&self, handle: NetDefHandle) -> Option<&NetDef> {
        self.defs
            .insert_order
            .get(handle.0)
            .and_then(|id| self.defs.get(id))
    }

    pub fn links(&self, id: &str) -> Option<ResolvedLinks> {
        self.handle(id).and_then(|h| self.links.get(h.0).copied())
    }

    /// Definition `id` links to through `link_kind`.
    pub fn link_target(
        &self,
        id: &str,
        link_kind: LinkKind,
    ) -> Option<&NetDef> {
        self.links(id)
            .and_then(|l| l.get(link_kind))
            .and_then(|h| self.netdef(h))
    }

    /// Bond or bridge members of `id`, in state order.
    pub fn members(&self, id: &str) -> Vec<&NetDef> {
        self.iter()
            .filter(|n| {
                n.bond.as_deref() == Some(id) || n.bridge.as_deref() == Some(id)
            })
            .collect()
    }

    pub fn origins(&self, id: &str) -> &[PathBuf] {
        self.defs.origins(id)
    }

    pub fn global_renderer(&self) -> Option<Renderer> {
        self.global_renderer
    }

    /// Warnings found while validating.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.as_slice()
    }

    /// The whole state in document syntax.
    pub fn to_value(&self) -> Result<Value, NplanError> {
        let mut entries = Vec::new();
        for netdef in self.iter() {
            let members = self.member_ids(&netdef.id, |_| true);
            entries.push((
                netdef.kind,
                netdef.id.clone(),
                netdef_to_value(netdef, &members)?,
            ));
        }
        build_document(entries, self.global_renderer)
    }

    /// One definition in document syntax, wrapped in a full document.
    pub fn netdef_to_value(&self, id: &str) -> Result<Value, NplanError> {
        let netdef = self.get(id).ok_or_else(|| {
            NplanError::new(
                ErrorKind::InvalidArgument,
                format!("Definition {id} not found"),
            )
        })?;
        let members = self.member_ids(id, |_| true);
        build_document(
            vec![(
                netdef.kind,
                netdef.id.clone(),
                netdef_to_value(netdef, &members)?,
            )],
            None,
        )
    }

    /// Write the definitions belonging to `filename` into the writable
    /// tier, leaving every other document untouched.
    ///
    /// A definition belongs to `filename` when it has not been read from
    /// any document yet, e.g. just imported from a profile, or was only
    /// read from that very file. Controllers defined elsewhere get an entry
    /// listing their members written to `filename`.
    pub fn persist(
        &self,
        conf: &NplanConf,
        filename: &str,
    ) -> Result<PathBuf, NplanError> {
        let target = writable_path(conf, filename)?;
        let owned: Vec<&str> = self
            .iter()
            .filter(|n| self.is_owned_by(&n.id, &target))
            .map(|n| n.id.as_str())
            .collect();
        if owned.is_empty() {
            return Err(NplanError::new(
                ErrorKind::InvalidArgument,
                format!("No definition belongs to {filename}"),
            ));
        }

        let mut entries = Vec::new();
        for netdef in self.iter() {
            let members =
                self.member_ids(&netdef.id, |m| owned.contains(&m));
            if owned.contains(&netdef.id.as_str()) {
                entries.push((
                    netdef.kind,
                    netdef.id.clone(),
                    netdef_to_value(netdef, &members)?,
                ));
            } else if !members.is_empty() {
                log::debug!(
                    "Writing membership of {} into {filename}",
                    netdef.id
                );
                entries.push((
                    netdef.kind,
                    netdef.id.clone(),
                    membership_stub(&members),
                ));
            } else if self.origins(&netdef.id).contains(&target) {
                return Err(NplanError::new(
                    ErrorKind::ConflictError,
                    format!(
                        "{} is defined in {} and other documents, \
                         rewriting it would drop part of the definition",
                        netdef.id,
                        target.display()
                    ),
                ));
            }
        }
        write_document(conf, filename, &build_document(entries, None)?)
    }

    fn is_owned_by(&self, id: &str, target: &Path) -> bool {
        match self.origins(id) {
            [] => true,
            [origin] => origin == target,
            _ => false,
        }
    }

    fn member_ids<F>(&self, id: &str, filter: F) -> Vec<&str>
    where
        F: Fn(&str) -> bool,
    {
        self.members(id)
            .into_iter()
            .map(|n| n.id.as_str())
            .filter(|m| filter(m))
            .collect()
    }
}
