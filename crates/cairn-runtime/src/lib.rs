//! Render-side runtime: mesh cache, rebuild scheduler, remote push queue and the engine facade.
#![forbid(unsafe_code)]

mod config;
mod engine;
mod gpu;
mod mesh_cache;
mod scheduler;
mod sync;

pub use config::EngineConfig;
pub use engine::{Engine, FrameReport, RuntimeError};
pub use gpu::{GeometryHandle, GpuBackend, HeadlessBackend};
pub use mesh_cache::{CycleReport, DrawItem, Geometry, GpuCommand, MeshCache, MeshStats, needed_set};
pub use scheduler::MeshScheduler;
pub use sync::PushQueue;
