//! Deterministic base terrain for a chunk column.

use cairn_blocks::{BlockId, BlockRegistry};
use cairn_geom::{BlockPos, CHUNK_WIDTH, ChunkId};
use fastnoise_lite::{FastNoiseLite, NoiseType};
use hashbrown::HashMap;

use crate::worldgen::{NoiseLayer, WorldGenConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Surface {
    /// Low column raised to water level with sand.
    Shore,
    /// Dirt column capped with a grass block.
    Soil,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    /// Blocks fill `0..height`; surface decorations sit at `height`.
    pub height: i32,
    pub surface: Surface,
}

#[derive(Clone, Copy, Debug)]
struct Palette {
    top: BlockId,
    soil: BlockId,
    shore: BlockId,
    trunk: BlockId,
    leaves: BlockId,
    grass: BlockId,
    flower: BlockId,
    cloud: BlockId,
}

impl Palette {
    fn resolve(cfg: &WorldGenConfig, reg: &BlockRegistry) -> Self {
        let pick = |name: &str| match reg.id_by_name(name) {
            Some(id) => id,
            None => {
                log::warn!(
                    target: "world",
                    "worldgen block '{name}' is not registered; skipping it"
                );
                BlockId::AIR
            }
        };
        let n = &cfg.blocks;
        Palette {
            top: pick(&n.top),
            soil: pick(&n.soil),
            shore: pick(&n.shore),
            trunk: pick(&n.trunk),
            leaves: pick(&n.leaves),
            grass: pick(&n.grass),
            flower: pick(&n.flower),
            cloud: pick(&n.cloud),
        }
    }
}

/// Pure function of (seed, config, registry, chunk id): same inputs, same blocks.
pub struct Terrain {
    noise: FastNoiseLite,
    cfg: WorldGenConfig,
    palette: Palette,
}

impl Terrain {
    pub fn new(seed: i32, cfg: WorldGenConfig, reg: &BlockRegistry) -> Self {
        let mut noise = FastNoiseLite::with_seed(seed);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(1.0));
        let palette = Palette::resolve(&cfg, reg);
        Self {
            noise,
            cfg,
            palette,
        }
    }

    pub fn config(&self) -> &WorldGenConfig {
        &self.cfg
    }

    /// Layered 2D noise mapped to [0, 1].
    fn fbm2(&self, layer: &NoiseLayer, x: f32, z: f32) -> f32 {
        let mut amp = 1.0f32;
        let mut freq = layer.frequency;
        let mut sum = 0.0f32;
        let mut norm = 0.0f32;
        for _ in 0..layer.octaves.max(1) {
            sum += self.noise.get_noise_2d(x * freq, z * freq) * amp;
            norm += amp;
            amp *= layer.persistence;
            freq *= layer.lacunarity;
        }
        (sum / norm * 0.5 + 0.5).clamp(0.0, 1.0)
    }

    fn fbm3(&self, octaves: u32, persistence: f32, x: f32, y: f32, z: f32) -> f32 {
        let mut amp = 1.0f32;
        let mut freq = 1.0f32;
        let mut sum = 0.0f32;
        let mut norm = 0.0f32;
        for _ in 0..octaves.max(1) {
            sum += self.noise.get_noise_3d(x * freq, y * freq, z * freq) * amp;
            norm += amp;
            amp *= persistence;
            freq *= 2.0;
        }
        (sum / norm * 0.5 + 0.5).clamp(0.0, 1.0)
    }

    pub fn column(&self, x: i32, z: i32) -> Column {
        let h = &self.cfg.height;
        let (fx, fz) = (x as f32, z as f32);
        let shape = self.fbm2(&h.shape, fx, fz);
        let relief = self.fbm2(&h.relief, -fx, -fz);
        let max_h = (relief * h.relief_scale + h.relief_base) as i32;
        let height = (shape * max_h as f32) as i32;
        if height <= h.water_level {
            Column {
                height: h.water_level,
                surface: Surface::Shore,
            }
        } else {
            Column {
                height,
                surface: Surface::Soil,
            }
        }
    }

    fn tree_at(&self, dx: i32, dz: i32, x: i32, z: i32) -> bool {
        let t = &self.cfg.trees;
        let m = t.edge_margin;
        if dx - m < 0 || dz - m < 0 || dx + m > CHUNK_WIDTH || dz + m > CHUNK_WIDTH {
            return false;
        }
        self.fbm2(&t.noise, x as f32, z as f32) > t.threshold
    }

    pub fn generate(&self, id: ChunkId) -> HashMap<BlockPos, BlockId> {
        let mut out: HashMap<BlockPos, BlockId> = HashMap::new();
        let mut put = |x: i32, y: i32, z: i32, b: BlockId| {
            if !b.is_air() {
                out.insert(BlockPos::new(x, y, z), b);
            }
        };
        let p = self.palette;
        let plants = &self.cfg.plants;
        let trees = &self.cfg.trees;
        let clouds = &self.cfg.clouds;
        let o = id.origin();
        for dx in 0..CHUNK_WIDTH {
            for dz in 0..CHUNK_WIDTH {
                let (x, z) = (o.x + dx, o.z + dz);
                let col = self.column(x, z);
                let h = col.height;
                let fill = match col.surface {
                    Surface::Shore => p.shore,
                    Surface::Soil => p.soil,
                };
                for y in 0..h {
                    let b = if col.surface == Surface::Soil && y == h - 1 {
                        p.top
                    } else {
                        fill
                    };
                    put(x, y, z, b);
                }
                if col.surface == Surface::Soil {
                    let (fx, fz) = (x as f32, z as f32);
                    if self.fbm2(&plants.grass, -fx, fz) > plants.grass_threshold {
                        put(x, h, z, p.grass);
                    }
                    if self.fbm2(&plants.flower, fx, -fz) > plants.flower_threshold {
                        put(x, h, z, p.flower);
                    }
                    if self.tree_at(dx, dz, x, z) {
                        let r = trees.canopy_radius;
                        for y in h + 3..h + 8 {
                            for ox in -r..=r {
                                for oz in -r..=r {
                                    let dy = y - h - 4;
                                    if ox * ox + oz * oz + dy * dy < trees.canopy_radius_sq {
                                        put(x + ox, y, z + oz, p.leaves);
                                    }
                                }
                            }
                        }
                        for y in h..h + trees.trunk_height {
                            put(x, y, z, p.trunk);
                        }
                    }
                }
                for y in clouds.min_y..clouds.max_y {
                    let n = self.fbm3(
                        clouds.octaves,
                        clouds.persistence,
                        x as f32 * clouds.frequency_xz,
                        y as f32 * clouds.frequency_y,
                        z as f32 * clouds.frequency_xz,
                    );
                    if n > clouds.threshold {
                        put(x, y, z, p.cloud);
                    }
                }
            }
        }
        out
    }
}
