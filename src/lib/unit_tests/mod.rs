// SPDX-License-Identifier: Apache-2.0

mod diff;
mod keyfile;

use std::path::{Path, PathBuf};

use crate::{NplanConf, Parser, State};

pub(crate) fn write_file(path: &Path, content: &str) -> PathBuf {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
    path.to_path_buf()
}

/// Write a document into `<root>/<tier>/<name>`, tier being e.g.
/// `etc/netplan`.
pub(crate) fn write_doc(
    root: &Path,
    tier: &str,
    name: &str,
    content: &str,
) -> PathBuf {
    write_file(&root.join(tier).join(name), content)
}

pub(crate) fn load_state(root: &Path) -> State {
    let mut parser = Parser::new(&NplanConf::new(Some(root)));
    parser.load_hierarchy().unwrap();
    State::new(parser).unwrap()
}
