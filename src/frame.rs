//! Frame loop: per-frame sequencing and resize handling
//!
//! Single-threaded, driven by the host's redraw callback. Each frame records
//! compute dispatch, optional depth prepass, and the main color pass in strict
//! order into one command buffer, so compute writes are visible to the same
//! frame's color pass through the device's pass-ordering guarantee alone.
//! Resize is delivered through a single-slot pending flag and applied only
//! between frames, never mid-frame.

use crate::camera::Camera;
use crate::clock::{Clock, TimeSample};
use crate::compute::InstancedTransformCompute;
use crate::error::{CoreError, CoreResult};
use crate::gpu::GpuContext;
use crate::target::RenderTarget;

/// Frame loop lifecycle. `Resizing` is transient within one `frame` call;
/// `TornDown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    Ready,
    Running,
    Resizing,
    TornDown,
}

impl LoopState {
    /// Whether a frame may be rendered from this state.
    pub fn can_render(self) -> bool {
        matches!(self, LoopState::Ready | LoopState::Running)
    }

    pub fn is_terminal(self) -> bool {
        self == LoopState::TornDown
    }
}

/// Read-only per-frame data handed to demo scripts. The core exposes time and
/// the instance count; everything else the demo already owns.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    pub time: TimeSample,
    pub instance_count: u32,
}

/// Demo-side recording seam. The loop owns pass ordering; the script records
/// draws into the passes it is handed.
pub trait FrameScript {
    /// Optional shadow/depth prepass, recorded after the compute dispatch and
    /// before the main color pass. Default: no prepass.
    fn depth_prepass(&mut self, _encoder: &mut wgpu::CommandEncoder, _ctx: &FrameContext) {}

    /// Record draws into the main color pass. The camera bind group is already
    /// bound at slot 0.
    fn color_pass<'a>(&'a mut self, pass: &mut wgpu::RenderPass<'a>, ctx: &FrameContext);
}

/// Drives Clock, RenderTarget, Camera, and the optional compute simulation
/// once per presentable frame.
pub struct FrameLoop {
    gpu: GpuContext,
    target: RenderTarget,
    camera: Camera,
    compute: Option<InstancedTransformCompute>,
    clock: Clock,
    state: LoopState,
    pending_resize: Option<(u32, u32)>,
}

impl FrameLoop {
    /// Build the loop around an initialized session. Async device/asset setup
    /// has completed by the time this returns, so the loop starts `Ready`.
    pub fn new(gpu: GpuContext, camera: Camera) -> Self {
        let (width, height) = gpu.surface_size();
        let target = RenderTarget::new(gpu.device(), width, height, gpu.surface_format());
        Self {
            gpu,
            target,
            camera,
            compute: None,
            clock: Clock::new(),
            state: LoopState::Ready,
            pending_resize: None,
        }
    }

    /// Attach the instanced-transform simulation, dispatched once per frame
    /// before any render pass.
    pub fn with_compute(mut self, requested: u32) -> CoreResult<Self> {
        self.compute = Some(InstancedTransformCompute::new(self.gpu.device(), requested)?);
        Ok(self)
    }

    /// Note a window resize. Overwrites any earlier pending size; the latest
    /// one wins when it is applied between frames.
    pub fn request_resize(&mut self, width: u32, height: u32) {
        if self.state.is_terminal() {
            return;
        }
        self.pending_resize = Some((width, height));
    }

    /// Render one frame. Applies a pending resize first (no frame is rendered
    /// while resizing). Any error is fatal: the loop transitions to
    /// `TornDown` and must not be scheduled again.
    pub fn frame<S: FrameScript>(&mut self, script: &mut S) -> CoreResult<()> {
        if !self.state.can_render() {
            return Err(CoreError::TornDown);
        }

        if let Some((width, height)) = self.pending_resize.take() {
            self.apply_resize(width, height);
        }
        self.state = LoopState::Running;

        let time = self.clock.update();
        let result = self.render_frame(script, time);
        if let Err(ref err) = result {
            log::error!("Frame failed, halting loop: {err}");
            self.state = LoopState::TornDown;
        }
        result
    }

    fn apply_resize(&mut self, width: u32, height: u32) {
        self.state = LoopState::Resizing;
        self.gpu.resize(width, height);

        // The surface may have clamped the request; attachments and camera
        // follow the surface's actual dimensions, not the window's.
        let (width, height) = self.gpu.surface_size();
        self.target.resize(self.gpu.device(), width, height);
        self.camera
            .update_aspect(self.gpu.queue(), width as f32 / height as f32);
        log::debug!("Resized render target to {width}x{height}");
    }

    fn render_frame<S: FrameScript>(&mut self, script: &mut S, time: TimeSample) -> CoreResult<()> {
        let frame = self.gpu.acquire_frame()?;
        let mut encoder =
            self.gpu
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Frame Encoder"),
                });

        let ctx = FrameContext {
            time,
            instance_count: self.compute.as_ref().map_or(0, |c| c.instance_count()),
        };

        if let Some(compute) = &mut self.compute {
            compute.dispatch(self.gpu.queue(), &mut encoder, time.delta);
        }

        script.depth_prepass(&mut encoder, &ctx);

        {
            let mut pass = self.target.begin_pass(&mut encoder, &frame.view);
            pass.set_bind_group(0, self.camera.bind_group(), &[]);
            script.color_pass(&mut pass, &ctx);
        }

        self.gpu.queue().submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    /// Explicit teardown. Terminal: every subsequent `frame` call fails.
    pub fn tear_down(&mut self) {
        self.state = LoopState::TornDown;
        self.pending_resize = None;
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut RenderTarget {
        &mut self.target
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn compute(&self) -> Option<&InstancedTransformCompute> {
        self.compute.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_and_running_can_render() {
        assert!(LoopState::Ready.can_render());
        assert!(LoopState::Running.can_render());
    }

    #[test]
    fn transient_and_terminal_states_cannot_render() {
        assert!(!LoopState::Uninitialized.can_render());
        assert!(!LoopState::Resizing.can_render());
        assert!(!LoopState::TornDown.can_render());
    }

    #[test]
    fn only_torn_down_is_terminal() {
        assert!(LoopState::TornDown.is_terminal());
        assert!(!LoopState::Ready.is_terminal());
        assert!(!LoopState::Running.is_terminal());
        assert!(!LoopState::Resizing.is_terminal());
    }
}
