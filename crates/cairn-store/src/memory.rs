use std::sync::Mutex;

use cairn_geom::{BlockPos, ChunkId};
use hashbrown::HashMap;

use crate::{BlockStore, ChunkVersion, PlayerState, StoreError};

/// Plain maps behind the store implementations.
#[derive(Default, Debug)]
pub(crate) struct StoreState {
    pub(crate) blocks: HashMap<ChunkId, HashMap<BlockPos, String>>,
    pub(crate) versions: HashMap<ChunkId, ChunkVersion>,
    pub(crate) player: Option<PlayerState>,
}

impl StoreState {
    pub(crate) fn put_block(&mut self, chunk: ChunkId, pos: BlockPos, block: &str) {
        self.blocks
            .entry(chunk)
            .or_default()
            .insert(pos, block.to_string());
    }

    pub(crate) fn range_blocks(&self, chunk: ChunkId, visit: &mut dyn FnMut(BlockPos, &str)) {
        if let Some(m) = self.blocks.get(&chunk) {
            for (pos, name) in m.iter() {
                visit(*pos, name);
            }
        }
    }

    pub(crate) fn block_count(&self) -> usize {
        self.blocks.values().map(|m| m.len()).sum()
    }
}

/// Non-durable store for tests and throwaway sessions.
#[derive(Default, Debug)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_count(&self) -> usize {
        self.state.lock().map(|s| s.block_count()).unwrap_or(0)
    }
}

impl BlockStore for MemoryStore {
    fn put_block(&self, chunk: ChunkId, pos: BlockPos, block: &str) -> Result<(), StoreError> {
        let mut s = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        s.put_block(chunk, pos, block);
        Ok(())
    }

    fn range_blocks(
        &self,
        chunk: ChunkId,
        visit: &mut dyn FnMut(BlockPos, &str),
    ) -> Result<(), StoreError> {
        let s = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        s.range_blocks(chunk, visit);
        Ok(())
    }

    fn chunk_version(&self, chunk: ChunkId) -> Result<Option<ChunkVersion>, StoreError> {
        let s = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(s.versions.get(&chunk).copied())
    }

    fn put_chunk_version(&self, chunk: ChunkId, version: ChunkVersion) -> Result<(), StoreError> {
        let mut s = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        s.versions.insert(chunk, version);
        Ok(())
    }

    fn player_state(&self) -> Result<PlayerState, StoreError> {
        let s = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(s.player.unwrap_or_default())
    }

    fn put_player_state(&self, state: &PlayerState) -> Result<(), StoreError> {
        let mut s = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        s.player = Some(*state);
        Ok(())
    }
}
