//! Deterministic endpoint naming.
//!
//! Every host output index gets its own endpoint. The name is a fixed prefix
//! followed by a letter derived from the index: `0 -> A`, `1 -> B`, ...

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Result, TransportError};

/// Default endpoint name prefix.
pub const DEFAULT_PREFIX: &str = "vvsp-output-";

/// Environment variable overriding the endpoint directory.
pub const ENDPOINT_DIR_ENV: &str = "VVSP_ENDPOINT_DIR";

/// Highest output index that maps to a letter.
pub const MAX_OUTPUT_INDEX: u32 = 25;

const ENDPOINT_EXTENSION: &str = "sock";

/// Letter for an output index.
pub fn endpoint_letter(index: u32) -> Result<char> {
    if index > MAX_OUTPUT_INDEX {
        return Err(TransportError::InvalidOutputIndex(index));
    }
    Ok(char::from(b'A' + index as u8))
}

/// Endpoint name (without directory or extension) for an output index.
pub fn endpoint_name(prefix: &str, index: u32) -> Result<String> {
    Ok(format!("{prefix}{}", endpoint_letter(index)?))
}

/// Where endpoints live and how they are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Directory holding the endpoint sockets.
    pub dir: PathBuf,
    /// Name prefix shared by every output.
    pub prefix: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl EndpointConfig {
    /// Resolve the directory from `VVSP_ENDPOINT_DIR`, then `XDG_RUNTIME_DIR`,
    /// then the system temp dir.
    pub fn from_env() -> Self {
        Self {
            dir: resolve_dir(|key| std::env::var_os(key)),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    /// Use an explicit directory with the default prefix.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    /// Override the name prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Full endpoint path for an output index.
    pub fn path_for(&self, index: u32) -> Result<PathBuf> {
        let name = endpoint_name(&self.prefix, index)?;
        Ok(self.dir.join(format!("{name}.{ENDPOINT_EXTENSION}")))
    }
}

fn resolve_dir(lookup: impl Fn(&str) -> Option<OsString>) -> PathBuf {
    [ENDPOINT_DIR_ENV, "XDG_RUNTIME_DIR"]
        .iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}
