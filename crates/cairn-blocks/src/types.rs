use std::fmt;

pub const AIR_NAME: &str = "air";

/// Interned handle for a registered block type. Id 0 is always air.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u16);

impl BlockId {
    pub const AIR: BlockId = BlockId(0);

    #[inline]
    pub fn is_air(self) -> bool {
        self == BlockId::AIR
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockFlags {
    pub breakable: bool,
    /// Blocks movement.
    pub obstacle: bool,
    /// Produces geometry.
    pub visible: bool,
    /// Neighbor faces stay exposed.
    pub transparent: bool,
    /// Meshed as a crossed billboard instead of a cube.
    pub plant: bool,
    pub liquid: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockType {
    pub id: BlockId,
    pub name: String,
    pub flags: BlockFlags,
    pub material: Option<String>,
    pub durability: f32,
    pub hardness: f32,
    pub strength: f32,
    pub step_sound: Option<String>,
}

impl BlockType {
    pub fn air() -> Self {
        BlockType {
            id: BlockId::AIR,
            name: AIR_NAME.to_string(),
            flags: BlockFlags {
                transparent: true,
                ..BlockFlags::default()
            },
            material: None,
            durability: 0.0,
            hardness: 0.0,
            strength: 0.0,
            step_sound: None,
        }
    }

    #[inline]
    pub fn is_air(&self) -> bool {
        self.id.is_air()
    }

    #[inline]
    pub fn is_obstacle(&self) -> bool {
        self.flags.obstacle
    }

    #[inline]
    pub fn is_transparent(&self) -> bool {
        self.flags.transparent
    }

    #[inline]
    pub fn is_plant(&self) -> bool {
        self.flags.plant
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.flags.visible
    }
}
