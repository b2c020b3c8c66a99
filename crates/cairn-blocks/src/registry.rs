use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::config::{BlockDef, BlocksConfig, default_defs};
use crate::types::{BlockId, BlockType};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    EmptyName,
    Duplicate(String),
    Full,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::EmptyName => write!(f, "block name must not be empty"),
            RegistryError::Duplicate(name) => write!(f, "block '{name}' is already registered"),
            RegistryError::Full => write!(f, "block id space exhausted"),
        }
    }
}

impl Error for RegistryError {}

/// Name-to-descriptor table. Populated once at startup, then shared behind `Arc`.
#[derive(Clone, Debug)]
pub struct BlockRegistry {
    blocks: Vec<BlockType>,
    by_name: HashMap<String, BlockId>,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockRegistry {
    /// Registry holding only air.
    pub fn new() -> Self {
        let air = BlockType::air();
        let mut by_name = HashMap::new();
        by_name.insert(air.name.clone(), BlockId::AIR);
        Self {
            blocks: vec![air],
            by_name,
        }
    }

    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        for def in default_defs() {
            // Built-in names are unique and non-empty.
            let _ = reg.register(def);
        }
        reg
    }

    pub fn from_config(cfg: BlocksConfig) -> Result<Self, RegistryError> {
        let mut reg = Self::new();
        for def in cfg.blocks {
            reg.register(def)?;
        }
        Ok(reg)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: BlocksConfig = toml::from_str(s)?;
        Ok(Self::from_config(cfg)?)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn register(&mut self, def: BlockDef) -> Result<BlockId, RegistryError> {
        if def.name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.by_name.contains_key(&def.name) {
            return Err(RegistryError::Duplicate(def.name));
        }
        let id = u16::try_from(self.blocks.len())
            .map(BlockId)
            .map_err(|_| RegistryError::Full)?;
        let flags = def.flags();
        self.by_name.insert(def.name.clone(), id);
        self.blocks.push(BlockType {
            id,
            name: def.name,
            flags,
            material: def.material,
            durability: def.durability,
            hardness: def.hardness,
            strength: def.strength,
            step_sound: def.step_sound,
        });
        Ok(id)
    }

    #[inline]
    pub fn air(&self) -> BlockId {
        BlockId::AIR
    }

    /// Descriptor for `id`, or air for ids this registry never issued.
    #[inline]
    pub fn get(&self, id: BlockId) -> &BlockType {
        self.blocks.get(id.index()).unwrap_or(&self.blocks[0])
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    /// Descriptor by name; unknown names resolve to air.
    pub fn lookup(&self, name: &str) -> &BlockType {
        self.get(self.id_by_name(name).unwrap_or(BlockId::AIR))
    }

    #[inline]
    pub fn name(&self, id: BlockId) -> &str {
        &self.get(id).name
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.len() <= 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockType> {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn air_is_reserved_zero() {
        let reg = BlockRegistry::new();
        assert_eq!(reg.id_by_name("air"), Some(BlockId::AIR));
        assert!(reg.get(BlockId::AIR).is_air());
        assert!(reg.is_empty());
    }

    #[test]
    fn defaults_have_expected_flags() {
        let reg = BlockRegistry::with_defaults();
        assert!(reg.lookup("leaves").is_transparent());
        assert!(reg.lookup("leaves").is_obstacle());
        assert!(reg.lookup("dandelion").is_plant());
        assert!(!reg.lookup("dandelion").is_obstacle());
        assert!(!reg.lookup("cloud").is_obstacle());
        assert!(reg.lookup("cloud").is_visible());
        assert_eq!(reg.lookup("stone").hardness, 1.5);
    }
}
