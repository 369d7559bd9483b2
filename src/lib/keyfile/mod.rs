// SPDX-License-Identifier: Apache-2.0

mod export;
mod import;
mod ini;
mod naming;

use std::path::Path;

use crate::{
    write_back::remove_document, ErrorKind, NetDef, NplanConf, NplanError,
    Parser,
};

pub use self::{
    export::{netdef_to_keyfile, netdef_to_keyfiles},
    import::netdef_from_keyfile,
    ini::Keyfile,
    naming::{
        escape_ssid, id_from_profile_path, profile_filename, yaml_filename,
        yaml_filename_for_id,
    },
};

/// Read and translate one profile file.
pub fn load_keyfile_file(path: &Path) -> Result<NetDef, NplanError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        NplanError::new(
            ErrorKind::IoError,
            format!("Failed to read keyfile {}: {e}", path.display()),
        )
    })?;
    let keyfile = Keyfile::parse(&content).map_err(|e| {
        NplanError::new(e.kind(), format!("{}: {}", path.display(), e.msg()))
    })?;
    netdef_from_keyfile(&keyfile).map_err(|e| {
        NplanError::new(e.kind(), format!("{}: {}", path.display(), e.msg()))
    })
}

/// Remove the document generated for the profile at `path` from the
/// writable tier.
///
/// The document name is taken from the loaded definition the profile
/// belongs to, so a definition carrying a UUID maps to its
/// `90-NM-<uuid>.yaml` document whatever its identifier.
/// Return `Ok(None)` when no identifier can be derived from `path`, or
/// `Ok(Some(false))` when the derived document does not exist.
pub fn delete_connection(
    conf: &NplanConf,
    path: &Path,
    ssid: Option<&str>,
) -> Result<Option<bool>, NplanError> {
    let id = match id_from_profile_path(path, ssid) {
        Some(i) => i,
        None => {
            log::warn!(
                "Cannot derive a definition identifier from {}",
                path.display()
            );
            return Ok(None);
        }
    };
    log::debug!("Profile {} belongs to definition {id}", path.display());
    remove_document(conf, &document_of(conf, &id)).map(Some)
}

fn document_of(conf: &NplanConf, id: &str) -> String {
    let mut parser = Parser::new(conf);
    if let Err(e) = parser.load_hierarchy() {
        log::warn!("Cannot look up definition {id}: {e}");
        return yaml_filename_for_id(id);
    }
    match parser.defs().get(id) {
        Some(netdef) => yaml_filename(netdef),
        None => yaml_filename_for_id(id),
    }
}
