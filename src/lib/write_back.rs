// SPDX-License-Identifier: Apache-2.0

use std::{io::Write, path::PathBuf};

use serde_yaml::Value;

use crate::{ErrorKind, NplanConf, NplanError};

/// Only plain `.yaml` file names are accepted, never paths.
pub(crate) fn writable_path(
    conf: &NplanConf,
    filename: &str,
) -> Result<PathBuf, NplanError> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.starts_with('.')
        || !filename.ends_with(".yaml")
    {
        return Err(NplanError::new(
            ErrorKind::InvalidArgument,
            format!("Invalid document file name '{filename}'"),
        ));
    }
    Ok(conf.writable_dir().join(filename))
}

/// Write `doc` to `filename` in the writable tier.
///
/// The content goes to a temporary file in the same directory first and is
/// renamed over the target, so the target is either fully replaced or left
/// as it was.
pub(crate) fn write_document(
    conf: &NplanConf,
    filename: &str,
    doc: &Value,
) -> Result<PathBuf, NplanError> {
    let path = writable_path(conf, filename)?;
    let dir = conf.writable_dir();
    std::fs::create_dir_all(&dir).map_err(|e| {
        NplanError::new(
            ErrorKind::IoError,
            format!("Failed to create {}: {e}", dir.display()),
        )
    })?;
    let content = serde_yaml::to_string(doc)?;

    // Created with mode 0600, documents may hold secrets.
    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| {
        NplanError::new(
            ErrorKind::IoError,
            format!(
                "Failed to create temporary file in {}: {e}",
                dir.display()
            ),
        )
    })?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(&path)?;
    log::info!("Wrote {}", path.display());
    Ok(path)
}

/// Remove `filename` from the writable tier. Return false if it does not
/// exist.
pub fn remove_document(
    conf: &NplanConf,
    filename: &str,
) -> Result<bool, NplanError> {
    let path = writable_path(conf, filename)?;
    match std::fs::remove_file(&path) {
        Ok(()) => {
            log::info!("Removed {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("{} does not exist", path.display());
            Ok(false)
        }
        Err(e) => Err(NplanError::new(
            ErrorKind::IoError,
            format!("Failed to remove {}: {e}", path.display()),
        )),
    }
}
