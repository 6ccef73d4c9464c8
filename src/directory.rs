//! Application directory
//!
//! Source of the cluster address set: the contracts that together make up
//! one organization's application suite. The pipeline consumes it through
//! the `Directory` trait; `FileDirectory` reads the set from a file with
//! one address per line.

use alloy_primitives::Address;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

/// Source of the cluster's application addresses.
#[async_trait]
pub trait Directory: Send + Sync {
    /// List every application address in the cluster.
    ///
    /// May contain duplicates or mixed casing; the pipeline canonicalizes
    /// and dedups.
    async fn application_addresses(&self) -> Result<Vec<Address>>;
}

/// Directory backed by a local file.
///
/// Each line holds one address in hex (with or without 0x prefix).
/// Empty lines and lines starting with '#' are ignored. An empty address
/// set is valid here: a cluster with no applications simply has no
/// activity.
pub struct FileDirectory {
    path: PathBuf,
}

impl FileDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Directory for FileDirectory {
    async fn application_addresses(&self) -> Result<Vec<Address>> {
        load_address_file(&self.path)
    }
}

/// Load an address list from a file.
///
/// Address files are small; reading synchronously inside the async trait
/// method keeps the loader simple.
fn load_address_file(path: &Path) -> Result<Vec<Address>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read address file: {:?}", path))?;

    let mut addresses = Vec::new();
    for (line_num, line) in contents.lines().enumerate() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let addr = parse_address(line)
            .with_context(|| format!("Invalid address on line {}: {}", line_num + 1, line))?;
        addresses.push(addr);
    }

    Ok(addresses)
}

/// Parse an address from a hex string.
///
/// Accepts addresses with or without 0x prefix.
fn parse_address(s: &str) -> Result<Address> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).with_context(|| format!("Invalid hex address: {}", s))?;

    if bytes.len() != 20 {
        anyhow::bail!(
            "Address must be 20 bytes (40 hex chars), got {} bytes",
            bytes.len()
        );
    }

    Ok(Address::from_slice(&bytes))
}
