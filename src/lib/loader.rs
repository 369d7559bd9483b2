// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use serde_yaml::{Mapping, Value};

use crate::{
    value::merge_yaml_value, DeviceKind, ErrorKind, NplanConf, NplanError,
};

pub(crate) const NETWORK_KEY: &str = "network";
const DOC_SUFFIX: &str = ".yaml";

/// All documents of the hierarchy folded into one.
#[derive(Debug, Clone, PartialEq, Default)]
#[non_exhaustive]
pub struct MergedDocument {
    pub(crate) value: Value,
    /// Documents folded in, in merge order.
    pub(crate) sources: Vec<PathBuf>,
    /// Documents contributing to each identifier, in merge order.
    pub(crate) origins: HashMap<String, Vec<PathBuf>>,
    /// Device kind of each identifier and the document first defining it.
    kinds: HashMap<String, (DeviceKind, PathBuf)>,
}

impl MergedDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn sources(&self) -> &[PathBuf] {
        self.sources.as_slice()
    }

    pub fn origins(&self, id: &str) -> &[PathBuf] {
        self.origins.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Fold one parsed document on top of what was merged so far.
    /// Nothing is changed when the document is rejected.
    pub fn merge_document(
        &mut self,
        path: &Path,
        doc: Value,
    ) -> Result<(), NplanError> {
        let doc = match doc {
            Value::Null => {
                log::debug!("Document {} is empty", path.display());
                self.sources.push(path.to_path_buf());
                return Ok(());
            }
            Value::Mapping(m) => m,
            _ => {
                return Err(NplanError::new(
                    ErrorKind::SyntaxError,
                    format!(
                        "Document {} should be a mapping at top level",
                        path.display()
                    ),
                ));
            }
        };

        let defined = collect_definitions(path, &doc)?;
        let mut new_kinds: HashMap<&str, DeviceKind> = HashMap::new();
        for (id, kind) in defined.iter() {
            let prior = new_kinds
                .get(id.as_str())
                .map(|k| (*k, path))
                .or_else(|| {
                    self.kinds.get(id).map(|(k, p)| (*k, p.as_path()))
                });
            if let Some((prior_kind, prior_path)) = prior {
                if prior_kind != *kind {
                    return Err(NplanError::new(
                        ErrorKind::ConflictError,
                        format!(
                            "{id} is defined as {prior_kind} in {} but \
                             redefined as {kind} in {}",
                            prior_path.display(),
                            path.display()
                        ),
                    ));
                }
            }
            new_kinds.insert(id.as_str(), *kind);
        }

        for (id, kind) in defined {
            self.kinds
                .entry(id.clone())
                .or_insert_with(|| (kind, path.to_path_buf()));
            let origins = self.origins.entry(id).or_default();
            if !origins.iter().any(|p| p == path) {
                origins.push(path.to_path_buf());
            }
        }

        if self.value.is_null() {
            self.value = Value::Mapping(Mapping::new());
        }
        merge_yaml_value(&mut self.value, Value::Mapping(doc));
        self.sources.push(path.to_path_buf());
        Ok(())
    }
}

/// Identifiers defined by a document with their device kind. Entries
/// with `null` properties delete a definition and are not counted.
fn collect_definitions(
    path: &Path,
    doc: &Mapping,
) -> Result<Vec<(String, DeviceKind)>, NplanError> {
    let mut ret = Vec::new();
    let network = match doc.get(NETWORK_KEY) {
        None | Some(Value::Null) => return Ok(ret),
        Some(Value::Mapping(m)) => m,
        Some(_) => {
            return Err(NplanError::new(
                ErrorKind::SyntaxError,
                format!(
                    "The '{NETWORK_KEY}' key of {} should hold a mapping",
                    path.display()
                ),
            ));
        }
    };
    for (section, entries) in network.iter() {
        let kind = match section.as_str().and_then(DeviceKind::from_section) {
            Some(k) => k,
            None => continue,
        };
        let entries = match entries {
            Value::Null => continue,
            Value::Mapping(m) => m,
            _ => {
                return Err(NplanError::new(
                    ErrorKind::SyntaxError,
                    format!(
                        "Section '{}' of {} should hold a mapping of \
                         definitions",
                        kind.section(),
                        path.display()
                    ),
                ));
            }
        };
        for (id, properties) in entries.iter() {
            let id = id.as_str().ok_or_else(|| {
                NplanError::new(
                    ErrorKind::SyntaxError,
                    format!(
                        "Identifiers in section '{}' of {} should be \
                         strings, got {id:?}",
                        kind.section(),
                        path.display()
                    ),
                )
            })?;
            if !properties.is_null() {
                ret.push((id.to_string(), kind));
            }
        }
    }
    Ok(ret)
}

/// Read and parse one document.
pub fn load_document_file(path: &Path) -> Result<Value, NplanError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        NplanError::new(
            ErrorKind::IoError,
            format!("Failed to read {}: {e}", path.display()),
        )
    })?;
    serde_yaml::from_str(&content).map_err(|e| {
        NplanError::new(
            ErrorKind::SyntaxError,
            format!("Failed to parse {}: {e}", path.display()),
        )
    })
}

/// Properties of definition `id` as written in the document at `path`,
/// before any merging.
pub(crate) fn read_definition_entry(
    path: &Path,
    kind: DeviceKind,
    id: &str,
) -> Result<Option<Value>, NplanError> {
    let doc = load_document_file(path)?;
    Ok(doc
        .get(NETWORK_KEY)
        .and_then(|n| n.get(kind.section()))
        .and_then(|s| s.get(id))
        .cloned())
}

/// Find the documents of all tiers. A document shadows every document
/// with the same file name in lower tiers. The result is sorted by file
/// name regardless of the tier it came from.
pub fn find_documents(conf: &NplanConf) -> Result<Vec<PathBuf>, NplanError> {
    let mut docs: BTreeMap<String, PathBuf> = BTreeMap::new();
    for dir in conf.tier_dirs() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("Tier {} does not exist", dir.display());
                continue;
            }
            Err(e) => {
                return Err(NplanError::new(
                    ErrorKind::IoError,
                    format!("Failed to list {}: {e}", dir.display()),
                ));
            }
        };
        for entry in entries {
            let path = entry?.path();
            let file_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(n) if n.ends_with(DOC_SUFFIX) => n.to_string(),
                _ => continue,
            };
            if !path.is_file() {
                continue;
            }
            if let Some(shadowed) = docs.insert(file_name, path.clone()) {
                log::debug!(
                    "Document {} shadows {}",
                    path.display(),
                    shadowed.display()
                );
            }
        }
    }
    Ok(docs.into_values().collect())
}

/// Load and fold every document of the hierarchy under
/// [NplanConf::root_dir].
///
/// When [NplanConf::ignore_errors] is set, unparsable documents are skipped
/// with a warning instead of failing the whole load.
pub fn load_hierarchy(conf: &NplanConf) -> Result<MergedDocument, NplanError> {
    let mut merged = MergedDocument::new();
    for path in find_documents(conf)? {
        log::debug!("Loading document {}", path.display());
        let result = load_document_file(&path)
            .and_then(|doc| merged.merge_document(&path, doc));
        match result {
            Ok(()) => (),
            Err(e)
                if conf.ignore_errors && e.kind() == ErrorKind::SyntaxError =>
            {
                log::warn!("Skipping {}: {e}", path.display());
            }
            Err(e) => return Err(e),
        }
    }
    Ok(merged)
}
