//! The seam between the frame loop and whatever executes the draws.
//!
//! [`WgpuBackend`](crate::gpu::WgpuBackend) drives a real surface;
//! [`HeadlessBackend`](crate::headless::HeadlessBackend) records frames
//! without a GPU.

use crate::{
    error::{BackendError, FrameError},
    model::{MeshData, MeshHandle},
    node::NodeId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    Solid,
    Wireframe,
}

/// One draw invocation for one visible node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub node: NodeId,
    pub mesh: MeshHandle,
    /// Byte offset of this node's constants inside the frame's ring slot
    pub constant_offset: u32,
    pub fill_mode: FillMode,
}

/// Identifies one submitted frame until its completion is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompletionToken(pub u64);

/// Runs once when the GPU has finished the associated frame. May be invoked
/// on any thread.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

pub trait GraphicsBackend {
    /// Creates a buffer able to hold `size` bytes of per-instance constants.
    fn create_buffer(&mut self, size: usize) -> Result<BufferHandle, BackendError>;

    /// CPU-writable view of a buffer. Contents become visible to the GPU on
    /// the next [`submit`](GraphicsBackend::submit) targeting it.
    fn map_buffer(&mut self, buffer: BufferHandle) -> Result<&mut [u8], BackendError>;

    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<MeshHandle, BackendError>;

    /// Encodes and submits `draws`, reading constants from `target_slot`.
    ///
    /// On error nothing was submitted.
    fn submit(
        &mut self,
        draws: &[DrawCall],
        target_slot: BufferHandle,
    ) -> Result<CompletionToken, FrameError>;

    /// Registers `callback` to run once the frame behind `token` completes.
    fn on_complete(&mut self, token: CompletionToken, callback: CompletionCallback);

    /// Gives the backend a chance to deliver pending completions. Called while
    /// the producer waits for a free frame slot.
    fn poll(&mut self) {}
}
