use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cairn_geom::{BlockPos, ChunkId};
use serde::{Deserialize, Serialize};

use crate::memory::StoreState;
use crate::{BlockStore, ChunkVersion, PlayerState, StoreError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RecordKind {
    Block,
    Version,
    Player,
}

/// One journal line group. Fields irrelevant to `kind` are omitted.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct Record {
    kind: RecordKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cx: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cz: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pos: Option<[i32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    player: Option<[f32; 5]>,
}

impl Record {
    fn empty(kind: RecordKind) -> Self {
        Record {
            kind,
            cx: None,
            cz: None,
            pos: None,
            block: None,
            version: None,
            player: None,
        }
    }

    fn chunk(&self) -> Option<ChunkId> {
        Some(ChunkId::new(self.cx?, self.cz?))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Journal {
    #[serde(default)]
    op: Vec<Record>,
}

struct Inner {
    state: StoreState,
    file: File,
}

/// Append-only TOML journal replayed into memory on open.
///
/// Each write appends one `[[op]]` table and is handed to the OS before returning.
pub struct JournalStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl JournalStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut state = StoreState::default();
        if path.exists() {
            let text = fs::read_to_string(&path)?;
            let journal: Journal =
                toml::from_str(&text).map_err(|e| StoreError::Corrupt(e.to_string()))?;
            let n = journal.op.len();
            for rec in journal.op {
                replay(&mut state, rec)?;
            }
            log::info!(
                target: "store",
                "replayed {} journal records ({} block overrides) from {}",
                n,
                state.block_count(),
                path.display()
            );
        } else {
            log::info!(target: "store", "creating journal {}", path.display());
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            inner: Mutex::new(Inner { state, file }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(inner: &mut Inner, rec: Record) -> Result<(), StoreError> {
        let text = toml::to_string(&Journal { op: vec![rec] })
            .map_err(|e| StoreError::Encode(e.to_string()))?;
        inner.file.write_all(text.as_bytes())?;
        Ok(())
    }
}

fn replay(state: &mut StoreState, rec: Record) -> Result<(), StoreError> {
    let missing = |what: &str| StoreError::Corrupt(format!("{:?} record without {what}", rec.kind));
    match rec.kind {
        RecordKind::Block => {
            let chunk = rec.chunk().ok_or_else(|| missing("chunk"))?;
            let [x, y, z] = rec.pos.ok_or_else(|| missing("pos"))?;
            let block = rec.block.as_deref().ok_or_else(|| missing("block"))?;
            state.put_block(chunk, BlockPos::new(x, y, z), block);
        }
        RecordKind::Version => {
            let chunk = rec.chunk().ok_or_else(|| missing("chunk"))?;
            let v = rec.version.ok_or_else(|| missing("version"))?;
            state.versions.insert(chunk, ChunkVersion(v));
        }
        RecordKind::Player => {
            let [x, y, z, rx, ry] = rec.player.ok_or_else(|| missing("player"))?;
            state.player = Some(PlayerState { x, y, z, rx, ry });
        }
    }
    Ok(())
}

impl BlockStore for JournalStore {
    fn put_block(&self, chunk: ChunkId, pos: BlockPos, block: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        let mut rec = Record::empty(RecordKind::Block);
        rec.cx = Some(chunk.x);
        rec.cz = Some(chunk.z);
        rec.pos = Some([pos.x, pos.y, pos.z]);
        rec.block = Some(block.to_string());
        Self::append(&mut inner, rec)?;
        inner.state.put_block(chunk, pos, block);
        Ok(())
    }

    fn range_blocks(
        &self,
        chunk: ChunkId,
        visit: &mut dyn FnMut(BlockPos, &str),
    ) -> Result<(), StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        inner.state.range_blocks(chunk, visit);
        Ok(())
    }

    fn chunk_version(&self, chunk: ChunkId) -> Result<Option<ChunkVersion>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.state.versions.get(&chunk).copied())
    }

    fn put_chunk_version(&self, chunk: ChunkId, version: ChunkVersion) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        let mut rec = Record::empty(RecordKind::Version);
        rec.cx = Some(chunk.x);
        rec.cz = Some(chunk.z);
        rec.version = Some(version.0);
        Self::append(&mut inner, rec)?;
        inner.state.versions.insert(chunk, version);
        Ok(())
    }

    fn player_state(&self) -> Result<PlayerState, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.state.player.unwrap_or_default())
    }

    fn put_player_state(&self, state: &PlayerState) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        let mut rec = Record::empty(RecordKind::Player);
        rec.player = Some([state.x, state.y, state.z, state.rx, state.ry]);
        Self::append(&mut inner, rec)?;
        inner.state.player = Some(*state);
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        inner.file.sync_data()?;
        Ok(())
    }
}
