use cairn_mesh_cpu::ChunkMeshCPU;
use hashbrown::HashSet;

/// Opaque id of geometry living on the GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryHandle(pub u64);

/// The only code allowed to create or destroy GPU geometry. Called on the main thread.
pub trait GpuBackend {
    fn create_geometry(&mut self, mesh: &ChunkMeshCPU) -> GeometryHandle;
    fn destroy_geometry(&mut self, handle: GeometryHandle);
}

/// Backend without a device: hands out ids and tracks what is alive.
#[derive(Default, Debug)]
pub struct HeadlessBackend {
    next: u64,
    live: HashSet<GeometryHandle>,
    pub created: usize,
    pub destroyed: usize,
    pub uploaded_faces: usize,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, handle: GeometryHandle) -> bool {
        self.live.contains(&handle)
    }
}

impl GpuBackend for HeadlessBackend {
    fn create_geometry(&mut self, mesh: &ChunkMeshCPU) -> GeometryHandle {
        self.next += 1;
        let handle = GeometryHandle(self.next);
        self.live.insert(handle);
        self.created += 1;
        self.uploaded_faces += mesh.face_count();
        handle
    }

    fn destroy_geometry(&mut self, handle: GeometryHandle) {
        if self.live.remove(&handle) {
            self.destroyed += 1;
        } else {
            log::warn!(target: "mesh", "destroy of unknown geometry {handle:?}");
        }
    }
}
