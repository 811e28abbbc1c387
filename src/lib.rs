//! render-core - shared render/compute orchestration for real-time demos
//!
//! Every demo built on this crate (textured quads, instanced cubes, shadow
//! mapping, GPU-driven instance simulation, post-processing) shares the same
//! small set of hard problems, and this crate owns exactly those:
//!
//! - a multisampled, depth-buffered render target kept in lockstep with the
//!   presentable surface across resizes ([`RenderTarget`])
//! - camera view/projection state packed into a uniform buffer with fixed,
//!   independently-updated byte slices ([`Camera`])
//! - a device-resident instanced-transform buffer advanced every frame by a
//!   compute dispatch and never read back ([`InstancedTransformCompute`])
//! - the frame loop sequencing compute, depth prepass, and color pass into one
//!   command buffer per frame ([`FrameLoop`])
//!
//! Asset decoding, shader authoring, pipeline wiring, and UI chrome stay on
//! the demo side, behind the [`FrameScript`] seam.

pub mod camera;
pub mod clock;
pub mod compute;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod target;
pub mod window;

pub use camera::{Camera, Projection};
pub use clock::{Clock, TimeSample};
pub use compute::{InstancedTransformCompute, BLOCK_SIZE};
pub use error::{CoreError, CoreResult};
pub use frame::{FrameContext, FrameLoop, FrameScript, LoopState};
pub use gpu::{Frame, GpuContext};
pub use target::{RenderTarget, DEPTH_FORMAT, SAMPLE_COUNT};
pub use window::{run, Window};

/// Configuration for bootstrapping a demo's session and window.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Window title.
    pub title: String,
    /// Initial window width in pixels.
    pub width: u32,
    /// Initial window height in pixels.
    pub height: u32,
    /// Enable vsync.
    pub vsync: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            title: "Render Core".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

/// Initialize logging for demo binaries. Call once at startup, before the
/// session is created, so adapter selection is visible.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
