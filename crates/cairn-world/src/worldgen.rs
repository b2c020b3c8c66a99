use serde::Deserialize;

/// Fractal noise layer: `octaves` samples, each `lacunarity` times finer and
/// `persistence` times weaker than the last.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct NoiseLayer {
    pub frequency: f32,
    #[serde(default = "default_octaves")]
    pub octaves: u32,
    #[serde(default = "default_persistence")]
    pub persistence: f32,
    #[serde(default = "default_lacunarity")]
    pub lacunarity: f32,
}

fn default_octaves() -> u32 {
    4
}
fn default_persistence() -> f32 {
    0.5
}
fn default_lacunarity() -> f32 {
    2.0
}

impl NoiseLayer {
    pub const fn new(frequency: f32, octaves: u32, persistence: f32) -> Self {
        Self {
            frequency,
            octaves,
            persistence,
            lacunarity: 2.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct WorldGenConfig {
    #[serde(default)]
    pub height: Height,
    #[serde(default)]
    pub plants: Plants,
    #[serde(default)]
    pub trees: Trees,
    #[serde(default)]
    pub clouds: Clouds,
    #[serde(default)]
    pub blocks: BlockNames,
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            height: Height::default(),
            plants: Plants::default(),
            trees: Trees::default(),
            clouds: Clouds::default(),
            blocks: BlockNames::default(),
        }
    }
}

/// Column height is `floor(shape * (relief * relief_scale + relief_base))`.
#[derive(Clone, Debug, Deserialize)]
pub struct Height {
    #[serde(default = "default_shape")]
    pub shape: NoiseLayer,
    #[serde(default = "default_relief")]
    pub relief: NoiseLayer,
    #[serde(default = "default_relief_scale")]
    pub relief_scale: f32,
    #[serde(default = "default_relief_base")]
    pub relief_base: f32,
    /// Columns at or below this height become sand filled up to it.
    #[serde(default = "default_water_level")]
    pub water_level: i32,
}
fn default_shape() -> NoiseLayer {
    NoiseLayer::new(0.01, 4, 0.5)
}
fn default_relief() -> NoiseLayer {
    NoiseLayer::new(0.01, 2, 0.9)
}
fn default_relief_scale() -> f32 {
    32.0
}
fn default_relief_base() -> f32 {
    16.0
}
fn default_water_level() -> i32 {
    12
}
impl Default for Height {
    fn default() -> Self {
        Self {
            shape: default_shape(),
            relief: default_relief(),
            relief_scale: default_relief_scale(),
            relief_base: default_relief_base(),
            water_level: default_water_level(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Plants {
    #[serde(default = "default_grass_noise")]
    pub grass: NoiseLayer,
    #[serde(default = "default_grass_threshold")]
    pub grass_threshold: f32,
    #[serde(default = "default_flower_noise")]
    pub flower: NoiseLayer,
    #[serde(default = "default_flower_threshold")]
    pub flower_threshold: f32,
}
fn default_grass_noise() -> NoiseLayer {
    NoiseLayer::new(0.1, 4, 0.8)
}
fn default_grass_threshold() -> f32 {
    0.6
}
fn default_flower_noise() -> NoiseLayer {
    NoiseLayer::new(0.05, 4, 0.8)
}
fn default_flower_threshold() -> f32 {
    0.7
}
impl Default for Plants {
    fn default() -> Self {
        Self {
            grass: default_grass_noise(),
            grass_threshold: default_grass_threshold(),
            flower: default_flower_noise(),
            flower_threshold: default_flower_threshold(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Trees {
    #[serde(default = "default_tree_noise")]
    pub noise: NoiseLayer,
    #[serde(default = "default_tree_threshold")]
    pub threshold: f32,
    /// Trees are not planted closer than this to a chunk edge.
    #[serde(default = "default_edge_margin")]
    pub edge_margin: i32,
    #[serde(default = "default_trunk_height")]
    pub trunk_height: i32,
    #[serde(default = "default_canopy_radius")]
    pub canopy_radius: i32,
    #[serde(default = "default_canopy_radius_sq")]
    pub canopy_radius_sq: i32,
}
fn default_tree_noise() -> NoiseLayer {
    NoiseLayer::new(1.0, 6, 0.5)
}
fn default_tree_threshold() -> f32 {
    0.79
}
fn default_edge_margin() -> i32 {
    4
}
fn default_trunk_height() -> i32 {
    7
}
fn default_canopy_radius() -> i32 {
    3
}
fn default_canopy_radius_sq() -> i32 {
    11
}
impl Default for Trees {
    fn default() -> Self {
        Self {
            noise: default_tree_noise(),
            threshold: default_tree_threshold(),
            edge_margin: default_edge_margin(),
            trunk_height: default_trunk_height(),
            canopy_radius: default_canopy_radius(),
            canopy_radius_sq: default_canopy_radius_sq(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Clouds {
    #[serde(default = "default_cloud_min_y")]
    pub min_y: i32,
    #[serde(default = "default_cloud_max_y")]
    pub max_y: i32,
    #[serde(default = "default_cloud_freq_xz")]
    pub frequency_xz: f32,
    #[serde(default = "default_cloud_freq_y")]
    pub frequency_y: f32,
    #[serde(default = "default_cloud_octaves")]
    pub octaves: u32,
    #[serde(default = "default_persistence")]
    pub persistence: f32,
    #[serde(default = "default_cloud_threshold")]
    pub threshold: f32,
}
fn default_cloud_min_y() -> i32 {
    64
}
fn default_cloud_max_y() -> i32 {
    72
}
fn default_cloud_freq_xz() -> f32 {
    0.01
}
fn default_cloud_freq_y() -> f32 {
    0.1
}
fn default_cloud_octaves() -> u32 {
    8
}
fn default_cloud_threshold() -> f32 {
    0.69
}
impl Default for Clouds {
    fn default() -> Self {
        Self {
            min_y: default_cloud_min_y(),
            max_y: default_cloud_max_y(),
            frequency_xz: default_cloud_freq_xz(),
            frequency_y: default_cloud_freq_y(),
            octaves: default_cloud_octaves(),
            persistence: default_persistence(),
            threshold: default_cloud_threshold(),
        }
    }
}

/// Registry names the generator places.
#[derive(Clone, Debug, Deserialize)]
pub struct BlockNames {
    #[serde(default = "default_top")]
    pub top: String,
    #[serde(default = "default_soil")]
    pub soil: String,
    #[serde(default = "default_shore")]
    pub shore: String,
    #[serde(default = "default_trunk")]
    pub trunk: String,
    #[serde(default = "default_leaves")]
    pub leaves: String,
    #[serde(default = "default_grass")]
    pub grass: String,
    #[serde(default = "default_flower")]
    pub flower: String,
    #[serde(default = "default_cloud")]
    pub cloud: String,
}
fn default_top() -> String {
    "grass_block".into()
}
fn default_soil() -> String {
    "dirt".into()
}
fn default_shore() -> String {
    "sand".into()
}
fn default_trunk() -> String {
    "wood".into()
}
fn default_leaves() -> String {
    "leaves".into()
}
fn default_grass() -> String {
    "grass".into()
}
fn default_flower() -> String {
    "dandelion".into()
}
fn default_cloud() -> String {
    "cloud".into()
}
impl Default for BlockNames {
    fn default() -> Self {
        Self {
            top: default_top(),
            soil: default_soil(),
            shore: default_shore(),
            trunk: default_trunk(),
            leaves: default_leaves(),
            grass: default_grass(),
            flower: default_flower(),
            cloud: default_cloud(),
        }
    }
}
