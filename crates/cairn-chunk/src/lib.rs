//! Sparse block storage for one chunk column.
#![forbid(unsafe_code)]

use std::error::Error;
use std::fmt;

use cairn_blocks::BlockId;
use cairn_geom::{BlockPos, ChunkId, chunk_of};
use dashmap::DashMap;
use hashbrown::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkError {
    /// The position belongs to another chunk.
    Foreign {
        chunk: ChunkId,
        pos: BlockPos,
        owner: ChunkId,
    },
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkError::Foreign { chunk, pos, owner } => {
                write!(f, "block {pos} belongs to chunk {owner}, not {chunk}")
            }
        }
    }
}

impl Error for ChunkError {}

type Segment = HashMap<BlockPos, BlockId>;

/// Full-height column of non-air blocks, split into 8-high segments so writers
/// to different heights lock different shards.
pub struct Chunk {
    id: ChunkId,
    segments: DashMap<i32, Segment>,
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("id", &self.id)
            .field("segments", &self.segments.len())
            .finish()
    }
}

impl Chunk {
    pub fn new(id: ChunkId) -> Self {
        Self {
            id,
            segments: DashMap::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> ChunkId {
        self.id
    }

    #[inline]
    fn check(&self, pos: BlockPos) -> Result<(), ChunkError> {
        let owner = chunk_of(pos);
        if owner == self.id {
            Ok(())
        } else {
            Err(ChunkError::Foreign {
                chunk: self.id,
                pos,
                owner,
            })
        }
    }

    pub fn get(&self, pos: BlockPos) -> Result<BlockId, ChunkError> {
        self.check(pos)?;
        Ok(self
            .segments
            .get(&pos.segment())
            .and_then(|seg| seg.get(&pos).copied())
            .unwrap_or(BlockId::AIR))
    }

    /// Writing air deletes.
    pub fn set(&self, pos: BlockPos, block: BlockId) -> Result<(), ChunkError> {
        if block.is_air() {
            return self.delete(pos);
        }
        self.check(pos)?;
        self.segments
            .entry(pos.segment())
            .or_default()
            .insert(pos, block);
        Ok(())
    }

    pub fn delete(&self, pos: BlockPos) -> Result<(), ChunkError> {
        self.check(pos)?;
        let seg = pos.segment();
        let now_empty = match self.segments.get_mut(&seg) {
            Some(mut s) => {
                s.remove(&pos);
                s.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.segments.remove_if(&seg, |_, s| s.is_empty());
        }
        Ok(())
    }

    /// Visits every stored block. `visit` must not write to this chunk.
    pub fn for_each(&self, mut visit: impl FnMut(BlockPos, BlockId)) {
        for seg in self.segments.iter() {
            for (pos, id) in seg.value() {
                visit(*pos, *id);
            }
        }
    }

    pub fn for_each_in_segment(&self, segment: i32, mut visit: impl FnMut(BlockPos, BlockId)) {
        if let Some(seg) = self.segments.get(&segment) {
            for (pos, id) in seg.iter() {
                visit(*pos, *id);
            }
        }
    }

    /// Copy of every stored block, safe to iterate while other threads write.
    pub fn blocks(&self) -> Vec<(BlockPos, BlockId)> {
        let mut out = Vec::with_capacity(self.len());
        self.for_each(|p, b| out.push((p, b)));
        out
    }

    pub fn segment_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.segments.iter().map(|s| *s.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Highest stored block in column (x, z), scanning segments top-down.
    pub fn top_block(&self, x: i32, z: i32) -> Option<(i32, BlockId)> {
        for seg in self.segment_ids().into_iter().rev() {
            let mut best: Option<(i32, BlockId)> = None;
            self.for_each_in_segment(seg, |p, b| {
                if p.x == x && p.z == z && best.is_none_or(|(y, _)| p.y > y) {
                    best = Some((p.y, b));
                }
            });
            if best.is_some() {
                return best;
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.segments.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_positions_are_rejected() {
        let c = Chunk::new(ChunkId::new(0, 0));
        let p = BlockPos::new(32, 0, 0);
        assert!(matches!(c.get(p), Err(ChunkError::Foreign { .. })));
        assert!(c.set(p, BlockId(1)).is_err());
        assert!(c.delete(p).is_err());
        assert!(c.is_empty());
    }

    #[test]
    fn empty_segments_are_dropped() {
        let c = Chunk::new(ChunkId::new(0, 0));
        let p = BlockPos::new(1, 20, 1);
        c.set(p, BlockId(3)).unwrap();
        assert_eq!(c.segment_ids(), vec![2]);
        c.set(p, BlockId::AIR).unwrap();
        assert!(c.segment_ids().is_empty());
    }

    #[test]
    fn top_block_scans_down() {
        let c = Chunk::new(ChunkId::new(-1, 0));
        c.set(BlockPos::new(-5, 3, 4), BlockId(1)).unwrap();
        c.set(BlockPos::new(-5, 17, 4), BlockId(2)).unwrap();
        c.set(BlockPos::new(-6, 40, 4), BlockId(2)).unwrap();
        assert_eq!(c.top_block(-5, 4), Some((17, BlockId(2))));
        assert_eq!(c.top_block(-7, 4), None);
    }
}
