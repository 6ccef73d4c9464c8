//! Transaction and script description
//!
//! The feed treats description resolution as an external, side-effect-free
//! service: calldata in, human-readable text out. `Describer` is the seam;
//! `CallScriptDescriber` is the built-in implementation, which decodes the
//! EVM CallScript container format and summarizes raw calldata.

use alloy_primitives::{Address, U256};
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One token of an annotated description. Lets a renderer link addresses
/// or format amounts without re-parsing free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Annotation {
    /// Plain text fragment
    Text(String),
    /// An address worth linking
    Address(Address),
    /// A token amount with its display symbol
    Amount { value: U256, symbol: String },
    /// Raw bytes (e.g. an unrecognized selector)
    Bytes(Vec<u8>),
}

/// A resolved human-readable description of a contract call.
#[derive(Debug, Clone, Serialize)]
pub struct Description {
    /// Free-text description
    pub text: String,
    /// Tokenized form, when the resolver can produce one
    pub annotated: Option<Vec<Annotation>>,
}

/// One decoded action inside a forwarded call's embedded script.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptStep {
    /// Contract the step targets
    pub to: Address,
    /// Free-text description of the step
    pub description: String,
    /// Tokenized form, when available
    pub annotated: Option<Vec<Annotation>>,
}

/// Resolves calldata and scripts into human descriptions.
///
/// Implementations may perform their own ledger reads; the feed treats
/// every call as opaque and makes exactly one `describe_transaction` call
/// per retained transaction.
#[async_trait]
pub trait Describer: Send + Sync {
    /// Describe a direct call: destination contract plus calldata.
    async fn describe_transaction(&self, to: Address, data: &[u8]) -> Result<Description>;

    /// Decode a forwarded script into its ordered steps.
    ///
    /// Must never return an empty sequence for a valid script; zero steps
    /// is a decode failure.
    async fn describe_script(&self, script: &[u8]) -> Result<Vec<ScriptStep>>;
}

/// CallScript container spec ID (version 1).
const CALLSCRIPT_SPEC_ID: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// Built-in describer.
///
/// Scripts are decoded from the CallScript v1 container: a 4-byte spec ID,
/// then for each step a 20-byte target address, a 4-byte big-endian
/// calldata length, and the calldata itself. Transaction descriptions are
/// selector summaries; a richer resolver can replace this implementation
/// behind the same trait.
pub struct CallScriptDescriber;

impl CallScriptDescriber {
    pub fn new() -> Self {
        Self
    }

    /// Summarize calldata without knowledge of the target ABI.
    fn summarize(to: Address, data: &[u8]) -> Description {
        if data.is_empty() {
            return Description {
                text: format!("Plain transfer to {}", to),
                annotated: Some(vec![
                    Annotation::Text("Plain transfer to ".to_string()),
                    Annotation::Address(to),
                ]),
            };
        }
        if data.len() < 4 {
            return Description {
                text: format!("Call with {}-byte payload on {}", data.len(), to),
                annotated: Some(vec![
                    Annotation::Text(format!("Call with {}-byte payload on ", data.len())),
                    Annotation::Address(to),
                ]),
            };
        }
        let selector = &data[..4];
        Description {
            text: format!(
                "Call 0x{} on {} ({} argument bytes)",
                hex::encode(selector),
                to,
                data.len() - 4
            ),
            annotated: Some(vec![
                Annotation::Text("Call ".to_string()),
                Annotation::Bytes(selector.to_vec()),
                Annotation::Text(" on ".to_string()),
                Annotation::Address(to),
                Annotation::Text(format!(" ({} argument bytes)", data.len() - 4)),
            ]),
        }
    }

    /// Decode a CallScript v1 container into its steps.
    fn decode_callscript(script: &[u8]) -> Result<Vec<(Address, Vec<u8>)>> {
        if script.len() < 4 {
            bail!("script too short for spec ID ({} bytes)", script.len());
        }
        if script[..4] != CALLSCRIPT_SPEC_ID {
            bail!("unsupported script spec ID 0x{}", hex::encode(&script[..4]));
        }

        let mut steps = Vec::new();
        let mut cursor = 4;
        while cursor < script.len() {
            if script.len() - cursor < 24 {
                bail!("truncated step header at byte {}", cursor);
            }
            let to = Address::from_slice(&script[cursor..cursor + 20]);
            cursor += 20;
            let mut len_buf = [0u8; 4];
            len_buf.copy_from_slice(&script[cursor..cursor + 4]);
            let calldata_len = u32::from_be_bytes(len_buf) as usize;
            cursor += 4;
            if script.len() - cursor < calldata_len {
                bail!(
                    "step calldata length {} exceeds remaining {} bytes",
                    calldata_len,
                    script.len() - cursor
                );
            }
            let calldata = script[cursor..cursor + calldata_len].to_vec();
            cursor += calldata_len;
            steps.push((to, calldata));
        }

        if steps.is_empty() {
            bail!("script decoded to zero steps");
        }
        Ok(steps)
    }
}

impl Default for CallScriptDescriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Describer for CallScriptDescriber {
    async fn describe_transaction(&self, to: Address, data: &[u8]) -> Result<Description> {
        Ok(Self::summarize(to, data))
    }

    async fn describe_script(&self, script: &[u8]) -> Result<Vec<ScriptStep>> {
        let steps = Self::decode_callscript(script)?;
        Ok(steps
            .into_iter()
            .map(|(to, calldata)| {
                let description = Self::summarize(to, &calldata);
                ScriptStep {
                    to,
                    description: description.text,
                    annotated: description.annotated,
                }
            })
            .collect())
    }
}
