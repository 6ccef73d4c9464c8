//! Activity feed pipeline
//!
//! Reconstructs a chronological activity feed for one organization's
//! application cluster purely from ledger data. A run is staged:
//! resolve the cluster address set, fetch logs in one batched call,
//! dedup transaction hashes, fan out transaction fetches, then resolve
//! description, forwarded script, and timestamp per transaction and
//! join the results.
//!
//! Stage 1 and 2 failures abort the run (no addresses or logs means no
//! meaningful partial result). Per-transaction failures in later stages
//! are logged and that transaction skipped, so one bad transaction does
//! not blank the whole feed. An empty result therefore always means
//! "no activity", never "failed".

use crate::describe::{Annotation, Describer, ScriptStep};
use crate::directory::Directory;
use crate::error::FeedError;
use crate::forward;
use crate::rpc::Ledger;
use crate::types::{LogEntry, Transaction};
use alloy_primitives::{Address, B256};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Default bound on concurrent remote calls per stage.
const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Why a resync was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// The chain sync layer reported completion
    SyncCompleted,
    /// A periodic scheduler fired
    Timer,
    /// Explicit user/operator request
    Manual,
}

/// One reconstructed feed entry, backed 1:1 by a retained transaction.
#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    /// Transaction sender
    pub from: Address,
    /// Human-readable description of what happened
    pub description: String,
    /// Tokenized description, when the resolver produced one
    pub annotated: Option<Vec<Annotation>>,
    /// The contract that forwarded the call, or None for direct calls
    pub forwarder: Option<Address>,
    /// The application the action ultimately targeted
    pub app: Address,
    /// Block timestamp in milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

/// The feed pipeline. Owns its collaborators; constructed once per
/// process and shared by reference across resync triggers.
pub struct ActivityFeed<D, L, R> {
    directory: D,
    ledger: L,
    describer: R,
    from_block: u64,
    max_concurrency: usize,
    /// Run generation counter; stale runs discard their results.
    generation: AtomicU64,
}

impl<D, L, R> ActivityFeed<D, L, R>
where
    D: Directory,
    L: Ledger,
    R: Describer,
{
    /// Create a feed scanning from genesis with the default concurrency
    /// bound.
    pub fn new(directory: D, ledger: L, describer: R) -> Self {
        Self {
            directory,
            ledger,
            describer,
            from_block: 0,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            generation: AtomicU64::new(0),
        }
    }

    /// Start the log scan at the given block instead of genesis.
    pub fn with_from_block(mut self, from_block: u64) -> Self {
        self.from_block = from_block;
        self
    }

    /// Bound the concurrent remote calls per stage.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Run the pipeline once and return the reconstructed activities.
    ///
    /// Order follows the deduplicated transaction order (first log
    /// occurrence), not chronological order; sorting for display is the
    /// presentation layer's concern.
    pub async fn get_activities(&self) -> Result<Vec<Activity>, FeedError> {
        // Stage 1: cluster address set
        let raw = self
            .directory
            .application_addresses()
            .await
            .map_err(FeedError::DirectoryUnavailable)?;
        let (cluster, ordered) = canonical_address_set(raw);
        info!("Resolved {} cluster addresses", ordered.len());
        if ordered.is_empty() {
            return Ok(Vec::new());
        }

        // Stage 2: one batched log query over the whole set
        let logs = self
            .ledger
            .logs(self.from_block, &ordered)
            .await
            .map_err(FeedError::LedgerQueryFailed)?;

        // Stage 3: dedup to distinct transaction hashes
        let hashes = dedup_transaction_hashes(&logs);
        info!(
            "Fetched {} logs referencing {} distinct transactions",
            logs.len(),
            hashes.len()
        );

        // Stage 4: bounded, order-preserving transaction fan-out
        let fetched: Vec<Option<Transaction>> = stream::iter(hashes)
            .map(|hash| self.fetch_transaction(hash))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        // Keep only transactions addressed to a cluster contract.
        // Contract creations (to = None) can never be cluster members.
        let retained: Vec<(Transaction, Address)> = fetched
            .into_iter()
            .flatten()
            .filter_map(|tx| match tx.to {
                Some(to) if cluster.contains(&to) => Some((tx, to)),
                _ => {
                    debug!("Dropping transaction {} with foreign destination", tx.hash);
                    None
                }
            })
            .collect();
        info!("{} transactions addressed to the cluster", retained.len());

        // Stage 5: per-transaction description, forward unwrap, timestamp
        let resolved: Vec<Option<Activity>> = stream::iter(retained)
            .map(|(tx, to)| async move { self.resolve_activity(&tx, to).await })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        // Stage 6: join, preserving retained order
        Ok(resolved.into_iter().flatten().collect())
    }

    /// Explicit resync entry point.
    ///
    /// Stamps the run with a fresh generation; if a newer resync starts
    /// before this one finishes, the stale result is discarded and
    /// `FeedError::Superseded` returned instead.
    pub async fn resync(&self, trigger: SyncTrigger) -> Result<Vec<Activity>, FeedError> {
        let run = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Resync {} triggered by {:?}", run, trigger);

        let result = self.get_activities().await;

        if self.generation.load(Ordering::SeqCst) != run {
            info!("Resync {} superseded, discarding result", run);
            return Err(FeedError::Superseded);
        }
        result
    }

    /// Fetch one transaction, isolating failures to this hash.
    async fn fetch_transaction(&self, hash: B256) -> Option<Transaction> {
        match self.ledger.transaction(hash).await {
            Ok(Some(tx)) => Some(tx),
            Ok(None) => {
                warn!("Skipping: {}", FeedError::TransactionNotFound(hash));
                None
            }
            Err(e) => {
                warn!("Skipping transaction {}: fetch failed: {:#}", hash, e);
                None
            }
        }
    }

    /// Resolve one retained transaction into an activity, isolating
    /// failures to this transaction.
    async fn resolve_activity(&self, tx: &Transaction, to: Address) -> Option<Activity> {
        match self.resolve_activity_inner(tx, to).await {
            Ok(activity) => Some(activity),
            Err(e) => {
                warn!("Skipping transaction {}: {:#}", tx.hash, anyhow::Error::new(e));
                None
            }
        }
    }

    /// The three per-transaction resolutions are mutually independent
    /// and run concurrently.
    async fn resolve_activity_inner(
        &self,
        tx: &Transaction,
        to: Address,
    ) -> Result<Activity, FeedError> {
        let describe_fut = async {
            self.describer
                .describe_transaction(to, &tx.input)
                .await
                .map_err(|source| FeedError::DescriptionResolutionFailed { tx: tx.hash, source })
        };
        let block_fut = async {
            self.ledger
                .block(tx.block_number)
                .await
                .map_err(FeedError::LedgerQueryFailed)
        };
        let forward_fut = self.unwrap_forward(tx);

        let (description, block, final_step) =
            tokio::try_join!(describe_fut, block_fut, forward_fut)?;

        Ok(match final_step {
            // Forwarded: the last script step carries the effective
            // description and target; tx.to is the forwarder.
            Some(step) => Activity {
                from: tx.from,
                description: step.description,
                annotated: step.annotated,
                forwarder: Some(to),
                app: step.to,
                timestamp_ms: block.timestamp_ms(),
            },
            None => Activity {
                from: tx.from,
                description: description.text,
                annotated: description.annotated,
                forwarder: None,
                app: to,
                timestamp_ms: block.timestamp_ms(),
            },
        })
    }

    /// If the transaction is a forwarded call, decode its script and
    /// return the final effective step. Non-forwarded transactions never
    /// reach the script describer.
    async fn unwrap_forward(&self, tx: &Transaction) -> Result<Option<ScriptStep>, FeedError> {
        if !forward::is_forward_call(&tx.input) {
            return Ok(None);
        }

        let payload = forward::extract_script(&tx.input).map_err(|e| {
            FeedError::ScriptDecodeFailed {
                tx: tx.hash,
                reason: e.to_string(),
            }
        })?;

        let mut steps = self.describer.describe_script(&payload).await.map_err(|e| {
            FeedError::ScriptDecodeFailed {
                tx: tx.hash,
                reason: format!("{:#}", e),
            }
        })?;

        match steps.pop() {
            Some(last) => Ok(Some(last)),
            None => Err(FeedError::ScriptDecodeFailed {
                tx: tx.hash,
                reason: "script decoded to an empty step sequence".to_string(),
            }),
        }
    }
}

/// Canonicalize and dedup the raw directory listing.
///
/// Returns the membership set plus the addresses in first-occurrence
/// order (used for the batched log query).
fn canonical_address_set(raw: Vec<Address>) -> (HashSet<Address>, Vec<Address>) {
    let mut set = HashSet::with_capacity(raw.len());
    let mut ordered = Vec::with_capacity(raw.len());
    for addr in raw {
        if set.insert(addr) {
            ordered.push(addr);
        }
    }
    (set, ordered)
}

/// Collapse log entries to distinct transaction hashes, preserving
/// first-occurrence order.
fn dedup_transaction_hashes(logs: &[LogEntry]) -> Vec<B256> {
    let mut seen = HashSet::with_capacity(logs.len());
    let mut hashes = Vec::new();
    for log in logs {
        if seen.insert(log.transaction_hash) {
            hashes.push(log.transaction_hash);
        }
    }
    hashes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::describe::{CallScriptDescriber, Description};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tokio::sync::Semaphore;

    const APP_A: Address = Address::repeat_byte(0xa1);
    const APP_B: Address = Address::repeat_byte(0xa2);
    const OUTSIDER: Address = Address::repeat_byte(0xee);
    const SENDER: Address = Address::repeat_byte(0x51);

    struct StaticDirectory(Vec<Address>);

    #[async_trait]
    impl Directory for StaticDirectory {
        async fn application_addresses(&self) -> Result<Vec<Address>> {
            Ok(self.0.clone())
        }
    }

    struct DownDirectory;

    #[async_trait]
    impl Directory for DownDirectory {
        async fn application_addresses(&self) -> Result<Vec<Address>> {
            anyhow::bail!("directory unreachable")
        }
    }

    /// In-memory ledger with call counters and an optional gate that
    /// blocks the first log query until released.
    struct MockLedger {
        logs: Vec<LogEntry>,
        txs: HashMap<B256, Transaction>,
        blocks: HashMap<u64, crate::types::Block>,
        log_calls: AtomicUsize,
        tx_calls: AtomicUsize,
        gate: Option<Gate>,
    }

    struct Gate {
        /// Released by the test once the gated call has been observed
        hold: Arc<Semaphore>,
        /// Signals the test that the gated call started
        started: Arc<Semaphore>,
    }

    impl MockLedger {
        fn new(
            logs: Vec<LogEntry>,
            txs: Vec<Transaction>,
            blocks: Vec<crate::types::Block>,
        ) -> Self {
            Self {
                logs,
                txs: txs.into_iter().map(|tx| (tx.hash, tx)).collect(),
                blocks: blocks.into_iter().map(|b| (b.number, b)).collect(),
                log_calls: AtomicUsize::new(0),
                tx_calls: AtomicUsize::new(0),
                gate: None,
            }
        }
    }

    #[async_trait]
    impl Ledger for MockLedger {
        async fn logs(&self, _from_block: u64, _addresses: &[Address]) -> Result<Vec<LogEntry>> {
            let call = self.log_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if let (0, Some(gate)) = (call, &self.gate) {
                gate.started.add_permits(1);
                let _permit = gate.hold.acquire().await?;
            }
            Ok(self.logs.clone())
        }

        async fn transaction(&self, hash: B256) -> Result<Option<Transaction>> {
            self.tx_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(self.txs.get(&hash).cloned())
        }

        async fn block(&self, number: u64) -> Result<crate::types::Block> {
            self.blocks
                .get(&number)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no block {}", number))
        }
    }

    /// Describer returning fixed text for direct calls and decoding
    /// CallScript containers for forwarded ones.
    struct TestDescriber {
        inner: CallScriptDescriber,
    }

    impl TestDescriber {
        fn new() -> Self {
            Self {
                inner: CallScriptDescriber::new(),
            }
        }
    }

    #[async_trait]
    impl Describer for TestDescriber {
        async fn describe_transaction(&self, to: Address, data: &[u8]) -> Result<Description> {
            self.inner.describe_transaction(to, data).await
        }

        async fn describe_script(&self, script: &[u8]) -> Result<Vec<ScriptStep>> {
            self.inner.describe_script(script).await
        }
    }

    fn log(hash: B256, address: Address, block_number: u64) -> LogEntry {
        LogEntry {
            address,
            transaction_hash: hash,
            block_number,
        }
    }

    fn tx(hash: B256, to: Address, input: Vec<u8>, block_number: u64) -> Transaction {
        Transaction {
            hash,
            from: SENDER,
            to: Some(to),
            input,
            block_number,
        }
    }

    fn block(number: u64, timestamp: u64) -> crate::types::Block {
        crate::types::Block { number, timestamp }
    }

    /// Canonical forward(bytes) calldata wrapping a CallScript container.
    fn forward_calldata(steps: &[(Address, &[u8])]) -> Vec<u8> {
        let mut script: Vec<u8> = vec![0x00, 0x00, 0x00, 0x01];
        for (to, calldata) in steps {
            script.extend_from_slice(to.as_slice());
            script.extend_from_slice(&(calldata.len() as u32).to_be_bytes());
            script.extend_from_slice(calldata);
        }

        let mut input = forward::FORWARD_SELECTOR.to_vec();
        let mut offset = [0u8; 32];
        offset[24..].copy_from_slice(&32u64.to_be_bytes());
        input.extend_from_slice(&offset);
        let mut len = [0u8; 32];
        len[24..].copy_from_slice(&(script.len() as u64).to_be_bytes());
        input.extend_from_slice(&len);
        input.extend_from_slice(&script);
        let pad = (32 - script.len() % 32) % 32;
        input.extend(std::iter::repeat(0u8).take(pad));
        input
    }

    fn feed(
        directory: StaticDirectory,
        ledger: MockLedger,
    ) -> ActivityFeed<StaticDirectory, MockLedger, TestDescriber> {
        ActivityFeed::new(directory, ledger, TestDescriber::new())
    }

    #[tokio::test]
    async fn test_empty_address_set_short_circuits() {
        let ledger = MockLedger::new(vec![], vec![], vec![]);
        let feed = feed(StaticDirectory(vec![]), ledger);

        let activities = feed.get_activities().await.unwrap();
        assert!(activities.is_empty());
        // No ledger traffic at all without a cluster
        assert_eq!(
            feed.ledger.log_calls.load(std::sync::atomic::Ordering::SeqCst),
            0
        );
        assert_eq!(
            feed.ledger.tx_calls.load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }

    #[tokio::test]
    async fn test_directory_failure_is_fatal() {
        let ledger = MockLedger::new(vec![], vec![], vec![]);
        let feed = ActivityFeed::new(DownDirectory, ledger, TestDescriber::new());

        let err = feed.get_activities().await.unwrap_err();
        assert!(matches!(err, FeedError::DirectoryUnavailable(_)));
    }

    #[tokio::test]
    async fn test_single_direct_transaction() {
        let h = B256::repeat_byte(0x01);
        let ledger = MockLedger::new(
            vec![log(h, APP_A, 7)],
            vec![tx(h, APP_A, vec![0xa9, 0x05, 0x9c, 0xbb, 0x00], 7)],
            vec![block(7, 1_600_000_000)],
        );
        let feed = feed(StaticDirectory(vec![APP_A]), ledger);

        let activities = feed.get_activities().await.unwrap();
        assert_eq!(activities.len(), 1);
        let activity = &activities[0];
        assert_eq!(activity.forwarder, None);
        assert_eq!(activity.app, APP_A);
        assert_eq!(activity.from, SENDER);
        assert_eq!(activity.timestamp_ms, 1_600_000_000_000);
        assert!(activity.description.contains("0xa9059cbb"));
    }

    #[tokio::test]
    async fn test_duplicate_log_hashes_fetch_once() {
        let h = B256::repeat_byte(0x02);
        let ledger = MockLedger::new(
            vec![log(h, APP_A, 3), log(h, APP_B, 3)],
            vec![tx(h, APP_A, vec![], 3)],
            vec![block(3, 100)],
        );
        let feed = feed(StaticDirectory(vec![APP_A, APP_B]), ledger);

        let activities = feed.get_activities().await.unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(
            feed.ledger.tx_calls.load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn test_fetch_count_equals_distinct_hashes() {
        let h1 = B256::repeat_byte(0x03);
        let h2 = B256::repeat_byte(0x04);
        let ledger = MockLedger::new(
            vec![
                log(h1, APP_A, 1),
                log(h2, APP_A, 2),
                log(h1, APP_B, 1),
                log(h1, APP_A, 1),
            ],
            vec![tx(h1, APP_A, vec![], 1), tx(h2, APP_B, vec![], 2)],
            vec![block(1, 10), block(2, 20)],
        );
        let feed = feed(StaticDirectory(vec![APP_A, APP_B]), ledger);

        let activities = feed.get_activities().await.unwrap();
        assert_eq!(activities.len(), 2);
        assert_eq!(
            feed.ledger.tx_calls.load(std::sync::atomic::Ordering::SeqCst),
            2
        );
        // Order follows first log occurrence, not block order
        assert_eq!(activities[0].app, APP_A);
        assert_eq!(activities[1].app, APP_B);
    }

    #[tokio::test]
    async fn test_forwarded_transaction_uses_last_step() {
        let h = B256::repeat_byte(0x05);
        let input = forward_calldata(&[
            (OUTSIDER, &[0x11, 0x22, 0x33, 0x44]),
            (APP_B, &[0xde, 0xad, 0xbe, 0xef]),
        ]);
        let ledger = MockLedger::new(
            vec![log(h, APP_A, 9)],
            vec![tx(h, APP_A, input, 9)],
            vec![block(9, 42)],
        );
        let feed = feed(StaticDirectory(vec![APP_A, APP_B]), ledger);

        let activities = feed.get_activities().await.unwrap();
        assert_eq!(activities.len(), 1);
        let activity = &activities[0];
        // Effective fields come from the final step, never an
        // intermediate one
        assert_eq!(activity.forwarder, Some(APP_A));
        assert_eq!(activity.app, APP_B);
        assert!(activity.description.contains("0xdeadbeef"));
        assert_eq!(activity.timestamp_ms, 42_000);
    }

    #[tokio::test]
    async fn test_foreign_destination_excluded() {
        let h = B256::repeat_byte(0x06);
        let ledger = MockLedger::new(
            vec![log(h, APP_A, 5)],
            vec![tx(h, OUTSIDER, vec![], 5)],
            vec![block(5, 50)],
        );
        let feed = feed(StaticDirectory(vec![APP_A]), ledger);

        let activities = feed.get_activities().await.unwrap();
        assert!(activities.is_empty());
    }

    #[tokio::test]
    async fn test_contract_creation_excluded() {
        let h = B256::repeat_byte(0x07);
        let mut creation = tx(h, APP_A, vec![0x60, 0x80], 5);
        creation.to = None;
        let ledger = MockLedger::new(vec![log(h, APP_A, 5)], vec![creation], vec![block(5, 50)]);
        let feed = feed(StaticDirectory(vec![APP_A]), ledger);

        let activities = feed.get_activities().await.unwrap();
        assert!(activities.is_empty());
    }

    #[tokio::test]
    async fn test_missing_transaction_is_isolated() {
        let h1 = B256::repeat_byte(0x08);
        let h2 = B256::repeat_byte(0x09);
        // h2 is in the logs but unknown to the ledger
        let ledger = MockLedger::new(
            vec![log(h1, APP_A, 1), log(h2, APP_A, 2)],
            vec![tx(h1, APP_A, vec![], 1)],
            vec![block(1, 10)],
        );
        let feed = feed(StaticDirectory(vec![APP_A]), ledger);

        let activities = feed.get_activities().await.unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].app, APP_A);
    }

    #[tokio::test]
    async fn test_missing_block_is_isolated() {
        let h1 = B256::repeat_byte(0x10);
        let h2 = B256::repeat_byte(0x11);
        // h1's block is unknown to the ledger; only h2 can be timestamped
        let ledger = MockLedger::new(
            vec![log(h1, APP_A, 1), log(h2, APP_A, 2)],
            vec![tx(h1, APP_A, vec![], 1), tx(h2, APP_A, vec![], 2)],
            vec![block(2, 20)],
        );
        let feed = feed(StaticDirectory(vec![APP_A]), ledger);

        let activities = feed.get_activities().await.unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].timestamp_ms, 20_000);
    }

    #[tokio::test]
    async fn test_empty_script_is_isolated() {
        let h1 = B256::repeat_byte(0x0a);
        let h2 = B256::repeat_byte(0x0b);
        // h1's script container carries a valid spec ID but zero steps
        let bad_input = forward_calldata(&[]);
        let ledger = MockLedger::new(
            vec![log(h1, APP_A, 1), log(h2, APP_A, 2)],
            vec![tx(h1, APP_A, bad_input, 1), tx(h2, APP_A, vec![], 2)],
            vec![block(1, 10), block(2, 20)],
        );
        let feed = feed(StaticDirectory(vec![APP_A]), ledger);

        let activities = feed.get_activities().await.unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].forwarder, None);
    }

    #[tokio::test]
    async fn test_duplicate_directory_entries_collapse() {
        let h = B256::repeat_byte(0x0c);
        let ledger = MockLedger::new(
            vec![log(h, APP_A, 1)],
            vec![tx(h, APP_A, vec![], 1)],
            vec![block(1, 10)],
        );
        let feed = feed(StaticDirectory(vec![APP_A, APP_A, APP_A]), ledger);

        let activities = feed.get_activities().await.unwrap();
        assert_eq!(activities.len(), 1);
    }

    #[tokio::test]
    async fn test_determinism_across_runs() {
        let h1 = B256::repeat_byte(0x0d);
        let h2 = B256::repeat_byte(0x0e);
        let input = forward_calldata(&[(APP_B, &[0x01, 0x02, 0x03, 0x04])]);
        let ledger = MockLedger::new(
            vec![log(h1, APP_A, 1), log(h2, APP_B, 2)],
            vec![tx(h1, APP_A, input, 1), tx(h2, APP_B, vec![], 2)],
            vec![block(1, 10), block(2, 20)],
        );
        let feed = feed(StaticDirectory(vec![APP_A, APP_B]), ledger);

        let first = feed.get_activities().await.unwrap();
        let second = feed.get_activities().await.unwrap();
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_stale_resync_is_superseded() {
        let h = B256::repeat_byte(0x0f);
        let hold = Arc::new(Semaphore::new(0));
        let started = Arc::new(Semaphore::new(0));
        let mut ledger = MockLedger::new(
            vec![log(h, APP_A, 1)],
            vec![tx(h, APP_A, vec![], 1)],
            vec![block(1, 10)],
        );
        ledger.gate = Some(Gate {
            hold: hold.clone(),
            started: started.clone(),
        });
        let feed = Arc::new(feed(StaticDirectory(vec![APP_A]), ledger));

        // First resync blocks inside the log query
        let stale = {
            let feed = feed.clone();
            tokio::spawn(async move { feed.resync(SyncTrigger::SyncCompleted).await })
        };
        let permit = started.acquire().await.unwrap();
        permit.forget();

        // Second resync starts and finishes while the first is stuck
        let fresh = feed.resync(SyncTrigger::Manual).await.unwrap();
        assert_eq!(fresh.len(), 1);

        // Let the first run finish; its result must be discarded
        hold.add_permits(1);
        let result = stale.await.unwrap();
        assert!(matches!(result, Err(FeedError::Superseded)));
    }
}
