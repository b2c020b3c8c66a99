//! Remote authoritative block source.

use std::error::Error;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

use cairn_geom::{BlockPos, ChunkId};
use hashbrown::HashMap;
use serde::Deserialize;

use crate::ChunkVersion;

/// Blocks the remote holds for one chunk, stamped with its current version.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkDelta {
    pub version: ChunkVersion,
    pub overrides: Vec<(BlockPos, String)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteError {
    Unavailable(String),
    Timeout,
    Rejected(String),
}

impl RemoteError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::Unavailable(_) | RemoteError::Timeout)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Unavailable(msg) => write!(f, "remote unavailable: {msg}"),
            RemoteError::Timeout => write!(f, "remote timed out"),
            RemoteError::Rejected(msg) => write!(f, "remote rejected request: {msg}"),
        }
    }
}

impl Error for RemoteError {}

pub trait RemoteSync: Send + Sync {
    /// `Ok(None)` when `known` is already current.
    fn fetch_chunk(
        &self,
        chunk: ChunkId,
        known: Option<ChunkVersion>,
    ) -> Result<Option<ChunkDelta>, RemoteError>;

    /// Returns the chunk version that includes this edit.
    fn push_block_update(
        &self,
        chunk: ChunkId,
        pos: BlockPos,
        block: &str,
    ) -> Result<ChunkVersion, RemoteError>;
}

#[derive(Clone, Debug, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    25
}
fn default_max_delay_ms() -> u64 {
    400
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Exponential backoff for `attempt` (0-based) with up to 50% random jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(1u64 << attempt.min(16))
            .min(self.max_delay_ms);
        let jitter = if exp > 1 { fastrand::u64(0..=exp / 2) } else { 0 };
        Duration::from_millis(exp / 2 + jitter)
    }
}

/// Retries retryable failures of the wrapped remote with backoff.
pub struct Retry<R> {
    inner: R,
    cfg: RetryConfig,
}

impl<R: RemoteSync> Retry<R> {
    pub fn new(inner: R, cfg: RetryConfig) -> Self {
        Self { inner, cfg }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn run<T>(
        &self,
        what: &str,
        mut call: impl FnMut() -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        let attempts = self.cfg.attempts.max(1);
        let mut attempt = 0;
        loop {
            match call() {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    let wait = self.cfg.delay(attempt);
                    log::warn!(
                        target: "sync",
                        "{what} failed ({e}); retry {}/{} in {:?}",
                        attempt + 1,
                        attempts - 1,
                        wait
                    );
                    thread::sleep(wait);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: RemoteSync> RemoteSync for Retry<R> {
    fn fetch_chunk(
        &self,
        chunk: ChunkId,
        known: Option<ChunkVersion>,
    ) -> Result<Option<ChunkDelta>, RemoteError> {
        self.run("fetch", || self.inner.fetch_chunk(chunk, known))
    }

    fn push_block_update(
        &self,
        chunk: ChunkId,
        pos: BlockPos,
        block: &str,
    ) -> Result<ChunkVersion, RemoteError> {
        self.run("push", || self.inner.push_block_update(chunk, pos, block))
    }
}

#[derive(Default)]
struct ServerChunk {
    version: ChunkVersion,
    blocks: HashMap<BlockPos, String>,
}

/// Authoritative block source living in this process: a loopback peer for
/// single-player sessions and a controllable remote for tests.
#[derive(Default)]
pub struct InProcessRemote {
    chunks: Mutex<HashMap<ChunkId, ServerChunk>>,
    fail_next: AtomicU32,
    fetches: AtomicU32,
}

impl InProcessRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` calls fail with a retryable error.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Applies an edit made by some other peer and bumps the chunk version.
    pub fn apply_foreign_edit(
        &self,
        pos: BlockPos,
        block: &str,
    ) -> Result<ChunkVersion, RemoteError> {
        let mut chunks = self.chunks.lock().map_err(|_| poisoned())?;
        let entry = chunks.entry(pos.chunk()).or_default();
        entry.blocks.insert(pos, block.to_string());
        entry.version = ChunkVersion(entry.version.0 + 1);
        Ok(entry.version)
    }

    fn take_failure(&self) -> Result<(), RemoteError> {
        let left = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match left {
            Ok(_) => Err(RemoteError::Unavailable("injected failure".into())),
            Err(_) => Ok(()),
        }
    }
}

fn poisoned() -> RemoteError {
    RemoteError::Unavailable("remote state poisoned".into())
}

impl RemoteSync for InProcessRemote {
    fn fetch_chunk(
        &self,
        chunk: ChunkId,
        known: Option<ChunkVersion>,
    ) -> Result<Option<ChunkDelta>, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        let chunks = self.chunks.lock().map_err(|_| poisoned())?;
        let Some(c) = chunks.get(&chunk) else {
            return Ok(None);
        };
        if known == Some(c.version) {
            return Ok(None);
        }
        Ok(Some(ChunkDelta {
            version: c.version,
            overrides: c.blocks.iter().map(|(p, b)| (*p, b.clone())).collect(),
        }))
    }

    fn push_block_update(
        &self,
        chunk: ChunkId,
        pos: BlockPos,
        block: &str,
    ) -> Result<ChunkVersion, RemoteError> {
        self.take_failure()?;
        if pos.chunk() != chunk {
            return Err(RemoteError::Rejected(format!("{pos} is not in chunk {chunk}")));
        }
        let mut chunks = self.chunks.lock().map_err(|_| poisoned())?;
        let entry = chunks.entry(chunk).or_default();
        entry.blocks.insert(pos, block.to_string());
        entry.version = ChunkVersion(entry.version.0 + 1);
        Ok(entry.version)
    }
}
