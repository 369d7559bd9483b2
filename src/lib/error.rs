// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum ErrorKind {
    /// Please report this as bug to upstream
    Bug,
    /// Malformed document or keyfile
    SyntaxError,
    /// Identifier redefined under an incompatible device kind
    ConflictError,
    /// Dangling or cyclic link between definitions
    ReferenceError,
    /// Semantic violation found by validation
    ConstraintError,
    /// Filesystem access or write failure
    IoError,
    /// Invalid argument
    InvalidArgument,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Bug => "bug",
                Self::SyntaxError => "syntax-error",
                Self::ConflictError => "conflict-error",
                Self::ReferenceError => "reference-error",
                Self::ConstraintError => "constraint-error",
                Self::IoError => "io-error",
                Self::InvalidArgument => "invalid-argument",
            }
        )
    }
}

// Try not implement From for NplanError here unless you are sure this
// error should always convert to certain type of ErrorKind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct NplanError {
    pub kind: ErrorKind,
    pub msg: String,
}

impl std::fmt::Display for NplanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.msg)
    }
}

impl NplanError {
    pub fn new(kind: ErrorKind, msg: String) -> Self {
        Self { kind, msg }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn msg(&self) -> &str {
        self.msg.as_str()
    }
}

impl std::error::Error for NplanError {}

impl From<std::io::Error> for NplanError {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorKind::IoError, format!("std::io::Error: {e}"))
    }
}

impl From<serde_yaml::Error> for NplanError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::new(ErrorKind::SyntaxError, format!("serde_yaml::Error: {e}"))
    }
}

impl From<serde_json::Error> for NplanError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorKind::Bug, format!("serde_json::Error: {e}"))
    }
}

impl From<tempfile::PersistError> for NplanError {
    fn from(e: tempfile::PersistError) -> Self {
        Self::new(
            ErrorKind::IoError,
            format!(
                "Failed to move temporary file into place: {}",
                e.error
            ),
        )
    }
}
