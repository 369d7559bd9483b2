// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Directories searched for documents, from lowest to highest priority.
pub const TIER_DIRS: [&str; 3] = ["lib/netplan", "etc/netplan", "run/netplan"];

/// The tier receiving written back documents.
pub const WRITABLE_TIER_DIR: &str = "etc/netplan";

/// Process scoped configuration handed to the loader, the keyfile
/// translator and the write-back functions.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[non_exhaustive]
pub struct NplanConf {
    /// Prefix prepended to every tier directory. Default is `/`.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
    /// Skip unparsable documents instead of failing the whole load.
    /// Only meant for generating configuration during early boot.
    #[serde(default)]
    pub ignore_errors: bool,
}

impl Default for NplanConf {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            ignore_errors: false,
        }
    }
}

impl NplanConf {
    pub fn new(root_dir: Option<&Path>) -> Self {
        Self {
            root_dir: root_dir
                .map(Path::to_path_buf)
                .unwrap_or_else(default_root_dir),
            ..Default::default()
        }
    }

    pub fn ignore_errors(mut self, value: bool) -> Self {
        self.ignore_errors = value;
        self
    }

    /// Tier directories ordered from lowest to highest priority.
    pub fn tier_dirs(&self) -> Vec<PathBuf> {
        TIER_DIRS.iter().map(|d| self.root_dir.join(d)).collect()
    }

    pub fn writable_dir(&self) -> PathBuf {
        self.root_dir.join(WRITABLE_TIER_DIR)
    }
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("/")
}
