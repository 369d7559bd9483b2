// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::{
    keyfile::{load_keyfile_file, profile_filename},
    loader::{
        load_hierarchy, read_definition_entry, MergedDocument, NETWORK_KEY,
    },
    DeviceKind, ErrorKind, LinkKind, NetDef, NplanConf, NplanError,
    ParsedDefs, Renderer,
};

pub(crate) const SUPPORTED_VERSION: u64 = 2;
const INTERFACES_KEY: &str = "interfaces";

/// Builds [NetDef]s from documents and keyfiles.
///
/// Links between definitions are kept as raw identifiers here; they are
/// checked once the whole identifier space is known, see
/// [crate::State::new()].
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct Parser {
    pub(crate) conf: NplanConf,
    pub(crate) defs: ParsedDefs,
    pub(crate) global_renderer: Option<Renderer>,
}

/// Outcome of importing one keyfile.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct KeyfileImport {
    /// Identifier of the imported definition.
    pub id: String,
    /// SSID of the profile when it is a wireless one.
    pub ssid: Option<String>,
    /// Whether a definition with the same identifier was replaced.
    pub replaced: bool,
}

impl KeyfileImport {
    /// Document file name the imported definition should be written to.
    pub fn filename(&self, parser: &Parser) -> Option<String> {
        parser.defs.get(&self.id).map(crate::keyfile::yaml_filename)
    }

    /// File name NetworkManager profiles generated for this definition
    /// use.
    pub fn profile_filename(&self) -> String {
        profile_filename(&self.id, self.ssid.as_deref())
    }
}

impl Parser {
    pub fn new(conf: &NplanConf) -> Self {
        Self {
            conf: conf.clone(),
            ..Default::default()
        }
    }

    pub fn defs(&self) -> &ParsedDefs {
        &self.defs
    }

    pub fn global_renderer(&self) -> Option<Renderer> {
        self.global_renderer
    }

    /// Load every document of the hierarchy and build definitions from
    /// the merged result.
    pub fn load_hierarchy(&mut self) -> Result<(), NplanError> {
        let merged = load_hierarchy(&self.conf)?;
        self.load_merged_document(&merged)
    }

    /// Create or extend definitions from a merged document.
    pub fn load_merged_document(
        &mut self,
        doc: &MergedDocument,
    ) -> Result<(), NplanError> {
        let network = match doc.value().get(NETWORK_KEY) {
            None | Some(Value::Null) => {
                log::debug!("No '{NETWORK_KEY}' key in merged document");
                return Ok(());
            }
            Some(Value::Mapping(m)) => m,
            Some(_) => {
                return Err(NplanError::new(
                    ErrorKind::SyntaxError,
                    format!(
                        "The '{NETWORK_KEY}' key should hold a mapping, \
                         merged from {}",
                        display_paths(doc.sources())
                    ),
                ));
            }
        };

        for (key, value) in network.iter() {
            let key = match key.as_str() {
                Some(k) => k,
                None => {
                    return Err(NplanError::new(
                        ErrorKind::SyntaxError,
                        format!(
                            "Keys under '{NETWORK_KEY}' should be strings, \
                             got {key:?}"
                        ),
                    ));
                }
            };
            match key {
                "version" => check_version(value, doc)?,
                "renderer" => {
                    self.global_renderer =
                        Some(serde_yaml::from_value(value.clone()).map_err(
                            |e| {
                                NplanError::new(
                                    ErrorKind::SyntaxError,
                                    format!(
                                        "Invalid global renderer, merged \
                                         from {}: {e}",
                                        display_paths(doc.sources())
                                    ),
                                )
                            },
                        )?);
                }
                _ => {
                    if let Some(kind) = DeviceKind::from_section(key) {
                        self.load_section(doc, kind, value)?;
                    } else {
                        log::warn!("Ignoring unknown section '{key}'");
                    }
                }
            }
        }
        Ok(())
    }

    fn load_section(
        &mut self,
        doc: &MergedDocument,
        kind: DeviceKind,
        section: &Value,
    ) -> Result<(), NplanError> {
        let entries = match section {
            Value::Null => return Ok(()),
            Value::Mapping(m) => m,
            _ => {
                return Err(NplanError::new(
                    ErrorKind::SyntaxError,
                    format!(
                        "Section '{}' should hold a mapping of definitions",
                        kind.section()
                    ),
                ));
            }
        };
        for (id, properties) in entries.iter() {
            let id = id.as_str().ok_or_else(|| {
                NplanError::new(
                    ErrorKind::SyntaxError,
                    format!(
                        "Identifiers in section '{}' should be strings, \
                         got {id:?}",
                        kind.section()
                    ),
                )
            })?;
            let origins = doc.origins(id);
            let netdef =
                NetDef::from_properties(id, kind, properties.clone())
                    .map_err(|e| with_origins(e, origins))?;
            log::debug!("Built {kind} definition {id}");
            self.defs
                .merge_netdef(netdef)
                .map_err(|e| with_origins(e, origins))?;
            for origin in origins {
                self.defs.add_origin(id, origin);
            }
        }
        Ok(())
    }

    /// Import one NetworkManager keyfile as a single definition.
    ///
    /// The imported definition becomes the newest one, replacing any
    /// definition with the same identifier. Bond and bridge membership of
    /// the replaced definition is dropped unless a document other than the
    /// ones it came from declares it. When the profile is member of a bond
    /// or bridge, the link is checked against the definitions already
    /// loaded.
    pub fn load_keyfile(
        &mut self,
        path: &Path,
    ) -> Result<KeyfileImport, NplanError> {
        let netdef = load_keyfile_file(path)?;
        let id = netdef.id.clone();
        let ssid = netdef.access_points.keys().next().cloned();
        let count_before = self.defs.len();
        let old_origins = self.defs.origins(&id).to_vec();

        let replaced = self.defs.replace(netdef);
        if replaced {
            log::info!("Keyfile {} replaces definition {id}", path.display());
        }

        let expected_count =
            if replaced { count_before } else { count_before + 1 };
        if self.defs.len() != expected_count
            || self.defs.last().map(|n| n.id.as_str()) != Some(id.as_str())
        {
            return Err(NplanError::new(
                ErrorKind::Bug,
                format!(
                    "Importing {} did not yield exactly one new \
                     definition {id}",
                    path.display()
                ),
            ));
        }

        if !old_origins.is_empty() {
            self.drop_stale_membership(&id, &old_origins)?;
        }
        self.backfill_links(&id);
        Ok(KeyfileImport { id, ssid, replaced })
    }

    /// Remove `id` from the `interfaces` of every controller unless a
    /// document outside `old_origins` lists it. Controller entries in
    /// `old_origins` only carrying `interfaces` stop counting as origins
    /// of that controller.
    fn drop_stale_membership(
        &mut self,
        id: &str,
        old_origins: &[PathBuf],
    ) -> Result<(), NplanError> {
        let controllers: Vec<(String, DeviceKind)> = self
            .defs
            .iter()
            .filter(|n| n.kind.is_controller())
            .filter(|n| {
                n.interfaces.iter().any(|i| i == id)
                    || self
                        .defs
                        .origins(&n.id)
                        .iter()
                        .any(|p| old_origins.contains(p))
            })
            .map(|n| (n.id.clone(), n.kind))
            .collect();

        for (controller, kind) in controllers {
            let origins = self.defs.origins(&controller).to_vec();
            let mut stub_origins = Vec::new();
            let mut listed_elsewhere = false;
            for origin in origins.iter() {
                let entry =
                    match read_definition_entry(origin, kind, &controller)? {
                        Some(e) => e,
                        None => continue,
                    };
                if old_origins.contains(origin) {
                    if is_membership_stub(&entry) {
                        stub_origins.push(origin);
                    }
                } else if lists_member(&entry, id) {
                    listed_elsewhere = true;
                }
            }
            if stub_origins.len() < origins.len() {
                for origin in stub_origins {
                    log::debug!(
                        "Ignoring membership entry of {controller} in {}",
                        origin.display()
                    );
                    self.defs.remove_origin(&controller, origin);
                }
            }
            if listed_elsewhere {
                continue;
            }
            if let Some(netdef) = self.defs.get_mut(&controller) {
                if netdef.interfaces.iter().any(|i| i == id) {
                    log::info!("{id} is no longer member of {controller}");
                    netdef.interfaces.retain(|i| i != id);
                }
            }
        }
        Ok(())
    }

    /// Connect the bond and bridge links of a freshly imported definition
    /// to the loaded ones. A link to an unknown or unsuitable controller is
    /// moved into passthrough so it survives write-back without breaking
    /// the graph.
    fn backfill_links(&mut self, id: &str) {
        let (bond, bridge) = match self.defs.get(id) {
            Some(n) => (n.bond.clone(), n.bridge.clone()),
            None => return,
        };
        for (link_kind, controller, expected) in [
            (LinkKind::Bond, bond, DeviceKind::Bond),
            (LinkKind::Bridge, bridge, DeviceKind::Bridge),
        ] {
            let controller = match controller {
                Some(c) => c,
                None => continue,
            };
            let found = self.defs.get(&controller).map(|c| c.kind);
            if found == Some(expected) {
                log::debug!("Linked {id} to {link_kind} {controller}");
                continue;
            }
            log::warn!(
                "{id}: {link_kind} {controller} is not defined, keeping \
                 the link as passthrough setting"
            );
            if let Some(netdef) = self.defs.get_mut(id) {
                match link_kind {
                    LinkKind::Bond => netdef.bond = None,
                    _ => netdef.bridge = None,
                }
                let nm = netdef.nm_mut();
                nm.passthrough_set("connection", "master", &controller);
                nm.passthrough_set(
                    "connection",
                    "slave-type",
                    &link_kind.to_string(),
                );
            }
        }
    }
}

fn is_membership_stub(entry: &Value) -> bool {
    entry.as_mapping().map(|m| m.len()) == Some(1)
        && entry.get(INTERFACES_KEY).is_some()
}

fn lists_member(entry: &Value, id: &str) -> bool {
    entry
        .get(INTERFACES_KEY)
        .and_then(Value::as_sequence)
        .map(|members| members.iter().any(|m| m.as_str() == Some(id)))
        .unwrap_or_default()
}

fn check_version(
    value: &Value,
    doc: &MergedDocument,
) -> Result<(), NplanError> {
    if value.as_u64() == Some(SUPPORTED_VERSION) {
        Ok(())
    } else {
        Err(NplanError::new(
            ErrorKind::SyntaxError,
            format!(
                "Only version {SUPPORTED_VERSION} is supported, got {value:?} \
                 merged from {}",
                display_paths(doc.sources())
            ),
        ))
    }
}

fn with_origins(e: NplanError, origins: &[PathBuf]) -> NplanError {
    NplanError::new(
        e.kind(),
        format!("{} (defined in {})", e.msg(), display_paths(origins)),
    )
}

pub(crate) fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        "<memory>".to_string()
    } else {
        paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
