// SPDX-License-Identifier: Apache-2.0

use nplan::NplanError;

#[derive(Clone, Debug)]
pub(crate) struct CliError {
    msg: String,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::error::Error for CliError {}

impl From<serde_yaml::Error> for CliError {
    fn from(e: serde_yaml::Error) -> Self {
        Self {
            msg: format!("serde_yaml::Error: {e}"),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self {
            msg: format!("serde_json::Error: {e}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self {
            msg: format!("std::io::Error: {e}"),
        }
    }
}

impl From<nix::Error> for CliError {
    fn from(e: nix::Error) -> Self {
        Self {
            msg: format!("nix::Error: {e}"),
        }
    }
}

impl From<seccompiler::Error> for CliError {
    fn from(e: seccompiler::Error) -> Self {
        Self {
            msg: format!("seccompiler::Error: {e}"),
        }
    }
}

impl From<seccompiler::BackendError> for CliError {
    fn from(e: seccompiler::BackendError) -> Self {
        Self {
            msg: format!("seccompiler::BackendError: {e}"),
        }
    }
}

impl From<NplanError> for CliError {
    fn from(e: NplanError) -> Self {
        Self { msg: e.to_string() }
    }
}

impl From<&str> for CliError {
    fn from(msg: &str) -> Self {
        Self {
            msg: msg.to_string(),
        }
    }
}

impl From<String> for CliError {
    fn from(msg: String) -> Self {
        Self { msg }
    }
}
