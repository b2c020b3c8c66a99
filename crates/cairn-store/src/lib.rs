//! Persistence and remote-sync contracts for block edits, with in-process implementations.
#![forbid(unsafe_code)]

mod journal;
mod memory;
pub mod remote;

pub use journal::JournalStore;
pub use memory::MemoryStore;
pub use remote::{ChunkDelta, InProcessRemote, RemoteError, RemoteSync, Retry, RetryConfig};

use std::error::Error;
use std::fmt;
use std::io;

use cairn_geom::{BlockPos, ChunkId};
use serde::{Deserialize, Serialize};

/// Monotonic per-chunk revision issued by the authoritative source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkVersion(pub u64);

impl fmt::Display for ChunkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Last known viewer pose.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rx: f32,
    pub ry: f32,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 16.0,
            z: 0.0,
            rx: 0.0,
            ry: 0.0,
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Corrupt(String),
    Encode(String),
    Poisoned,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "store i/o: {e}"),
            StoreError::Corrupt(msg) => write!(f, "store journal is corrupt: {msg}"),
            StoreError::Encode(msg) => write!(f, "store encode: {msg}"),
            StoreError::Poisoned => write!(f, "store lock poisoned"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

/// Durable per-block overrides keyed by chunk, plus chunk versions and player state.
///
/// Blocks are stored by name; an `"air"` entry records a deletion and must be kept.
/// Every write is durable when the call returns, so callers never flush on eviction.
pub trait BlockStore: Send + Sync {
    fn put_block(&self, chunk: ChunkId, pos: BlockPos, block: &str) -> Result<(), StoreError>;

    fn range_blocks(
        &self,
        chunk: ChunkId,
        visit: &mut dyn FnMut(BlockPos, &str),
    ) -> Result<(), StoreError>;

    fn chunk_version(&self, chunk: ChunkId) -> Result<Option<ChunkVersion>, StoreError>;

    fn put_chunk_version(&self, chunk: ChunkId, version: ChunkVersion) -> Result<(), StoreError>;

    /// Stored pose, or the default spawn pose when none was saved.
    fn player_state(&self) -> Result<PlayerState, StoreError>;

    fn put_player_state(&self, state: &PlayerState) -> Result<(), StoreError>;

    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
