use serde::Deserialize;

use crate::types::BlockFlags;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct BlocksConfig {
    #[serde(default)]
    pub blocks: Vec<BlockDef>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BlockDef {
    pub name: String,
    #[serde(default = "default_true")]
    pub breakable: bool,
    #[serde(default = "default_true")]
    pub obstacle: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub transparent: bool,
    #[serde(default)]
    pub plant: bool,
    #[serde(default)]
    pub liquid: bool,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub durability: f32,
    #[serde(default)]
    pub hardness: f32,
    #[serde(default)]
    pub strength: f32,
    #[serde(default)]
    pub step_sound: Option<String>,
}

fn default_true() -> bool {
    true
}

impl BlockDef {
    /// Solid, breakable, opaque cube with the given name and no cosmetics.
    pub fn solid(name: impl Into<String>) -> Self {
        BlockDef {
            name: name.into(),
            breakable: true,
            obstacle: true,
            visible: true,
            transparent: false,
            plant: false,
            liquid: false,
            material: None,
            durability: 0.0,
            hardness: 0.0,
            strength: 0.0,
            step_sound: None,
        }
    }

    /// Walk-through, transparent cross billboard.
    pub fn plant(name: impl Into<String>) -> Self {
        BlockDef {
            obstacle: false,
            transparent: true,
            plant: true,
            ..BlockDef::solid(name)
        }
    }

    pub fn flags(&self) -> BlockFlags {
        BlockFlags {
            breakable: self.breakable,
            obstacle: self.obstacle,
            visible: self.visible,
            transparent: self.transparent,
            plant: self.plant,
            liquid: self.liquid,
        }
    }

    fn cosmetic(mut self, material: &str, toughness: f32, sound: Option<&str>) -> Self {
        self.material = Some(material.to_string());
        self.durability = toughness;
        self.hardness = toughness;
        self.strength = toughness;
        self.step_sound = sound.map(str::to_string);
        self
    }
}

/// The built-in block set used when no `blocks.toml` is supplied.
pub fn default_defs() -> Vec<BlockDef> {
    let mut leaves = BlockDef::solid("leaves").cosmetic("leaves", 0.5, Some("leaves"));
    leaves.transparent = true;
    let mut cloud = BlockDef::solid("cloud").cosmetic("cloud", 0.0, None);
    cloud.breakable = false;
    cloud.obstacle = false;
    vec![
        BlockDef::solid("grass_block").cosmetic("grass", 0.5, Some("grass")),
        BlockDef::solid("dirt").cosmetic("dirt", 0.5, Some("dirt")),
        BlockDef::solid("stone").cosmetic("stone", 1.5, Some("stone")),
        BlockDef::solid("sand").cosmetic("sand", 0.5, Some("sand")),
        leaves,
        BlockDef::solid("wood").cosmetic("wood", 0.5, Some("wood")),
        BlockDef::plant("grass").cosmetic("grass", 0.1, None),
        BlockDef::plant("dandelion").cosmetic("dandelion", 0.1, None),
        cloud,
    ]
}
