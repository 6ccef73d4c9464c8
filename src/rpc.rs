//! JSON-RPC ledger client
//!
//! Typed interface to the Ethereum JSON-RPC reads the feed needs: a
//! batched log query, transaction lookup, and block headers. Transport
//! failures are retried a bounded number of times; JSON-RPC error
//! responses and null results are deterministic answers and are not.

use crate::types::{Block, LogEntry, Transaction};
use alloy_primitives::{Address, B256};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Retry budget for transport-level failures.
const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(250);

/// Ledger reads consumed by the activity pipeline.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Fetch all logs emitted by any of the given addresses, from
    /// `from_block` to the current head, in one batched call.
    async fn logs(&self, from_block: u64, addresses: &[Address]) -> Result<Vec<LogEntry>>;

    /// Fetch a transaction by hash. `None` means the ledger does not
    /// know the hash.
    async fn transaction(&self, hash: B256) -> Result<Option<Transaction>>;

    /// Fetch a block header by number.
    async fn block(&self, number: u64) -> Result<Block>;
}

/// Outcome of a single JSON-RPC attempt, split so the retry loop can
/// tell transient transport faults from definitive responses.
enum CallAttempt {
    Ok(Value),
    /// Network/HTTP-level failure, worth retrying.
    Transport(anyhow::Error),
    /// The node answered with a JSON-RPC error object. Not retried.
    Rpc(anyhow::Error),
}

/// JSON-RPC client over HTTP.
pub struct LedgerClient {
    client: reqwest::Client,
    url: String,
}

impl LedgerClient {
    /// Create a new client for the given endpoint.
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// Make one JSON-RPC attempt.
    async fn attempt(&self, method: &str, params: &Value) -> CallAttempt {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let response = match self.client.post(&self.url).json(&request).send().await {
            Ok(r) => r,
            Err(e) => {
                return CallAttempt::Transport(
                    anyhow!(e).context("Failed to send RPC request"),
                )
            }
        };

        let body: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                return CallAttempt::Transport(
                    anyhow!(e).context("Failed to parse RPC response"),
                )
            }
        };

        if let Some(error) = body.get("error") {
            return CallAttempt::Rpc(anyhow!("RPC error: {}", error));
        }

        match body.get("result") {
            Some(result) => CallAttempt::Ok(result.clone()),
            None => CallAttempt::Rpc(anyhow!("RPC response missing 'result' field")),
        }
    }

    /// Make a JSON-RPC call, retrying transport failures with doubling
    /// backoff.
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let mut backoff = INITIAL_BACKOFF;
        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.attempt(method, &params).await {
                CallAttempt::Ok(result) => return Ok(result),
                CallAttempt::Rpc(e) => return Err(e),
                CallAttempt::Transport(e) => {
                    tracing::warn!(
                        "RPC {} transport failure (attempt {}/{}): {:#}",
                        method,
                        attempt,
                        MAX_ATTEMPTS,
                        e
                    );
                    last_err = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| anyhow!("RPC call failed"))
            .context(format!("RPC {} failed after {} attempts", method, MAX_ATTEMPTS)))
    }
}

#[async_trait]
impl Ledger for LedgerClient {
    async fn logs(&self, from_block: u64, addresses: &[Address]) -> Result<Vec<LogEntry>> {
        // One batched call carrying the whole address set
        let addrs: Vec<String> = addresses.iter().map(|a| format!("0x{:x}", a)).collect();
        let params = json!([{
            "fromBlock": format!("0x{:x}", from_block),
            "toBlock": "latest",
            "address": addrs,
        }]);
        let result = self.call("eth_getLogs", params).await?;
        serde_json::from_value(result).context("Failed to deserialize logs")
    }

    async fn transaction(&self, hash: B256) -> Result<Option<Transaction>> {
        let hash_str = format!("0x{:x}", hash);
        let params = json!([hash_str]);
        let result = self.call("eth_getTransactionByHash", params).await?;
        if result.is_null() {
            return Ok(None);
        }
        serde_json::from_value(result)
            .map(Some)
            .context("Failed to deserialize transaction")
    }

    async fn block(&self, number: u64) -> Result<Block> {
        let block_str = format!("0x{:x}", number);
        // false: header only, no transaction bodies
        let params = json!([block_str, false]);
        let result = self.call("eth_getBlockByNumber", params).await?;
        if result.is_null() {
            anyhow::bail!("Block {} not found", number);
        }
        serde_json::from_value(result).context("Failed to deserialize block")
    }
}
