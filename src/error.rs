//! Error types shared across the renderer, scene and asset layers.

use std::path::PathBuf;

use thiserror::Error;

use crate::node::NodeId;

/// Unrecoverable startup failures. These abort the application.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to request GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported texture format for this adapter")]
    NoSurfaceFormat,
    #[error("constant alignment {alignment} is not a multiple of the device uniform offset alignment {required}")]
    Alignment { alignment: usize, required: u32 },
}

/// Failures reported by a [`GraphicsBackend`](crate::backend::GraphicsBackend)
/// outside of frame submission.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("unknown buffer handle {0}")]
    UnknownBuffer(usize),
    #[error("unknown mesh handle {0}")]
    UnknownMesh(usize),
    #[error("mesh `{0}` has no vertices or indices")]
    EmptyMesh(String),
    #[error("buffer size must be greater than zero")]
    ZeroSizedBuffer,
    #[error("invalid constant ring layout: {0}")]
    RingLayout(#[from] RingError),
}

/// Constant ring layout and allocation failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    #[error("the ring needs at least one slot")]
    NoSlots,
    #[error("stride {stride} is smaller than the {record} byte constants record")]
    StrideTooSmall { stride: usize, record: usize },
    #[error("slot capacity {capacity} cannot hold a single record of stride {stride}")]
    CapacityTooSmall { capacity: usize, stride: usize },
    #[error("slot capacity {capacity} exceeds the {max} bytes a dynamic offset can address")]
    CapacityTooLarge { capacity: usize, max: usize },
    #[error("constant buffer capacity exceeded: record at offset {offset} with stride {stride} does not fit in {capacity} bytes")]
    CapacityExceeded {
        offset: usize,
        stride: usize,
        capacity: usize,
    },
}

/// Per-frame failures. None of these leave a ring slot marked in flight.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("surface unavailable: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("scene has no point of view with a camera")]
    NoCamera,
    #[error("viewport has zero area")]
    EmptyViewport,
    #[error(transparent)]
    Capacity(#[from] RingError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("timed out after {0:?} waiting for a free frame slot")]
    Timeout(std::time::Duration),
}

/// High-level response after a frame error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface must be reconfigured; rendering may resume next frame.
    Reconfigure,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

impl FrameError {
    pub fn action(&self) -> SurfaceErrorAction {
        match self {
            FrameError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                SurfaceErrorAction::Reconfigure
            }
            FrameError::Surface(wgpu::SurfaceError::OutOfMemory) => SurfaceErrorAction::Fatal,
            FrameError::Surface(wgpu::SurfaceError::Timeout)
            | FrameError::NoCamera
            | FrameError::EmptyViewport
            | FrameError::Timeout(_) => SurfaceErrorAction::SkipFrame,
            FrameError::Capacity(_) | FrameError::Backend(_) => SurfaceErrorAction::Fatal,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("node {0:?} does not exist in this scene")]
    UnknownNode(NodeId),
    #[error("node {0:?} has no camera component")]
    NotACamera(NodeId),
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read asset {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse OBJ data: {0}")]
    Obj(#[from] tobj::LoadError),
    #[error("mesh `{0}` contains no geometry")]
    Empty(String),
    #[error("sphere needs at least 3 sectors and 2 stacks, got {sectors}x{stacks}")]
    SphereResolution { sectors: u32, stacks: u32 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn lost_surfaces_are_reconfigured() {
        for err in [wgpu::SurfaceError::Lost, wgpu::SurfaceError::Outdated] {
            assert_eq!(FrameError::from(err).action(), SurfaceErrorAction::Reconfigure);
        }
    }

    #[test]
    fn transient_failures_skip_the_frame() {
        let errors = [
            FrameError::Surface(wgpu::SurfaceError::Timeout),
            FrameError::NoCamera,
            FrameError::EmptyViewport,
            FrameError::Timeout(Duration::from_millis(5)),
        ];
        for err in errors {
            assert_eq!(err.action(), SurfaceErrorAction::SkipFrame, "{}", err);
        }
    }

    #[test]
    fn exhaustion_is_fatal() {
        let overflow = RingError::CapacityExceeded {
            offset: 65536,
            stride: 256,
            capacity: 65536,
        };
        assert_eq!(
            FrameError::from(wgpu::SurfaceError::OutOfMemory).action(),
            SurfaceErrorAction::Fatal
        );
        assert_eq!(FrameError::from(overflow).action(), SurfaceErrorAction::Fatal);
        assert_eq!(
            FrameError::from(BackendError::UnknownBuffer(7)).action(),
            SurfaceErrorAction::Fatal
        );
    }
}
