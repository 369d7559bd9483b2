// SPDX-License-Identifier: Apache-2.0

mod config;
mod deserializer;
mod diff;
mod error;
pub mod keyfile;
mod loader;
mod netdef;
mod parser;
mod resolver;
mod serializer;
mod state;
mod validation;
mod value;
mod write_back;

pub use self::config::{NplanConf, TIER_DIRS, WRITABLE_TIER_DIR};
pub use self::diff::{
    InterfaceDiff, MissingConfig, RouteTable, StateDiff, SystemAddress,
    SystemInterface, SystemRoute, SystemState,
};
pub use self::error::{ErrorKind, NplanError};
pub use self::loader::{
    find_documents, load_document_file, load_hierarchy, MergedDocument,
};
pub(crate) use self::netdef::{is_ipv6_cidr, parse_cidr};
pub use self::netdef::{
    AccessPoint, DeviceKind, LinkKind, MatchConfig, NameserverConfig, NetDef,
    NmSettings, ParsedDefs, Renderer, RouteConfig,
};
pub use self::parser::{KeyfileImport, Parser};
pub use self::resolver::{NetDefHandle, ResolvedLinks};
pub use self::state::State;
pub use self::validation::{Diagnostic, Severity};
pub use self::write_back::remove_document;

#[cfg(test)]
mod unit_tests;
