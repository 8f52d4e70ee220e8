//! A [`GraphicsBackend`] without a GPU.
//!
//! Frames are recorded instead of drawn. Completions are queued and delivered
//! either on [`poll`](GraphicsBackend::poll) (auto mode) or explicitly through a
//! [`CompletionQueue`] handle, which may live on another thread.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    backend::{BufferHandle, CompletionCallback, CompletionToken, DrawCall, GraphicsBackend},
    error::{BackendError, FrameError},
    model::{MeshData, MeshHandle},
};

/// What one submission looked like.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    pub token: CompletionToken,
    pub target_slot: BufferHandle,
    pub draws: Vec<DrawCall>,
}

#[derive(Default)]
struct Pending {
    // Tokens that were submitted but have no callback yet, or callbacks waiting to run
    entries: VecDeque<(CompletionToken, Option<CompletionCallback>)>,
}

/// Cloneable handle for delivering completion signals in submission order.
#[derive(Clone, Default)]
pub struct CompletionQueue {
    inner: Arc<Mutex<Pending>>,
}

impl CompletionQueue {
    fn lock(&self) -> MutexGuard<'_, Pending> {
        // A panic in another holder does not invalidate the queue itself
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Submitted frames whose completion has not been delivered.
    pub fn pending(&self) -> usize {
        self.lock().entries.len()
    }

    /// Completes the oldest frame. Returns `false` when nothing is pending.
    pub fn complete_next(&self) -> bool {
        let entry = self.lock().entries.pop_front();
        match entry {
            Some((token, callback)) => {
                log::trace!("headless frame {:?} complete", token);
                if let Some(callback) = callback {
                    callback();
                }
                true
            }
            None => false,
        }
    }

    pub fn complete_all(&self) -> usize {
        let mut completed = 0;
        while self.complete_next() {
            completed += 1;
        }
        completed
    }

    fn push(&self, token: CompletionToken) {
        self.lock().entries.push_back((token, None));
    }

    fn attach(&self, token: CompletionToken, callback: CompletionCallback) {
        let mut pending = self.lock();
        match pending.entries.iter_mut().find(|(queued, _)| *queued == token) {
            Some((_, slot)) => *slot = Some(callback),
            None => {
                // Already completed
                drop(pending);
                callback();
            }
        }
    }
}

pub struct HeadlessBackend {
    buffers: Vec<Vec<u8>>,
    meshes: Vec<MeshData>,
    frames: Vec<RecordedFrame>,
    completions: CompletionQueue,
    next_token: u64,
    auto_complete: bool,
    fail_next_submit: bool,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    /// Completions are only delivered through [`HeadlessBackend::completions`].
    pub fn new() -> Self {
        Self {
            buffers: Vec::new(),
            meshes: Vec::new(),
            frames: Vec::new(),
            completions: CompletionQueue::default(),
            next_token: 0,
            auto_complete: false,
            fail_next_submit: false,
        }
    }

    /// Every pending frame completes whenever the backend is polled.
    pub fn auto_completing() -> Self {
        Self {
            auto_complete: true,
            ..Self::new()
        }
    }

    pub fn completions(&self) -> CompletionQueue {
        self.completions.clone()
    }

    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    pub fn mesh(&self, handle: MeshHandle) -> Option<&MeshData> {
        self.meshes.get(handle.0)
    }

    /// Makes the next submission fail as if no drawable were available.
    pub fn fail_next_submit(&mut self) {
        self.fail_next_submit = true;
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn create_buffer(&mut self, size: usize) -> Result<BufferHandle, BackendError> {
        if size == 0 {
            return Err(BackendError::ZeroSizedBuffer);
        }
        self.buffers.push(vec![0; size]);
        Ok(BufferHandle(self.buffers.len() - 1))
    }

    fn map_buffer(&mut self, buffer: BufferHandle) -> Result<&mut [u8], BackendError> {
        self.buffers
            .get_mut(buffer.0)
            .map(Vec::as_mut_slice)
            .ok_or(BackendError::UnknownBuffer(buffer.0))
    }

    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<MeshHandle, BackendError> {
        if mesh.is_empty() {
            return Err(BackendError::EmptyMesh(mesh.name.clone()));
        }
        self.meshes.push(mesh.clone());
        Ok(MeshHandle(self.meshes.len() - 1))
    }

    fn submit(
        &mut self,
        draws: &[DrawCall],
        target_slot: BufferHandle,
    ) -> Result<CompletionToken, FrameError> {
        if std::mem::take(&mut self.fail_next_submit) {
            return Err(FrameError::Surface(wgpu::SurfaceError::Outdated));
        }
        if target_slot.0 >= self.buffers.len() {
            return Err(BackendError::UnknownBuffer(target_slot.0).into());
        }
        if let Some(draw) = draws.iter().find(|draw| draw.mesh.0 >= self.meshes.len()) {
            return Err(BackendError::UnknownMesh(draw.mesh.0).into());
        }

        let token = CompletionToken(self.next_token);
        self.next_token += 1;
        self.frames.push(RecordedFrame {
            token,
            target_slot,
            draws: draws.to_vec(),
        });
        self.completions.push(token);
        Ok(token)
    }

    fn on_complete(&mut self, token: CompletionToken, callback: CompletionCallback) {
        self.completions.attach(token, callback);
    }

    fn poll(&mut self) {
        if self.auto_complete {
            self.completions.complete_all();
        }
    }
}
