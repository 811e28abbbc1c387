//! Error taxonomy for the orchestration core
//!
//! Configuration errors surface at construction time; everything else is fatal
//! for the session and halts the frame loop. Nothing here retries — re-requesting
//! a device belongs to the bootstrap layer above this crate.

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Failed to initialize graphics: {0}")]
    InitializationFailed(String),
    #[error("Failed to create surface: {0}")]
    SurfaceCreationFailed(String),
    #[error("Failed to create device: {0}")]
    DeviceCreationFailed(String),
    #[error("Failed to acquire presentable frame: {0}")]
    AcquireFrameFailed(String),
    #[error("Surface lost")]
    SurfaceLost,
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
    #[error("Frame loop is torn down")]
    TornDown,
}

pub type CoreResult<T> = Result<T, CoreError>;
