//! Camera and its packed GPU uniform
//!
//! A single uniform buffer holds, in fixed byte order: projection matrix (64
//! bytes), view matrix (64 bytes), world position padded to a vec4 (16 bytes).
//! The projection and view slices are written independently at their fixed
//! offsets, so changing the aspect ratio never rewrites the view slice and
//! vice versa.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use std::num::NonZeroU64;

pub const PROJECTION_OFFSET: u64 = 0;
pub const VIEW_OFFSET: u64 = 64;
pub const POSITION_OFFSET: u64 = 128;
pub const UNIFORM_SIZE: u64 = 144;

/// Camera projection variant. Closed set: exactly perspective or orthographic,
/// differing only in projection-matrix derivation.
#[derive(Debug, Clone, Copy)]
pub enum Projection {
    Perspective {
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Projection::Perspective {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Projection::Orthographic {
            left,
            right,
            bottom,
            top,
            near,
            far,
        }
    }

    /// Derive the projection matrix. Degenerate frustum parameters are not
    /// validated here and yield a non-invertible matrix; demo setup owns that.
    pub fn matrix(&self) -> Mat4 {
        match self {
            Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(*fov_y, *aspect, *near, *far),
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Mat4::orthographic_rh(*left, *right, *bottom, *top, *near, *far),
        }
    }

    /// Mutate the stored aspect ratio. No effect on orthographic cameras.
    pub fn set_aspect(&mut self, aspect: f32) {
        if let Projection::Perspective { aspect: a, .. } = self {
            *a = aspect;
        }
    }
}

/// Host-side shadow of the camera uniform buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub proj: Mat4,
    pub view: Mat4,
    pub position: Vec4,
}

/// Camera owning its view state, uniform buffer, and the bind group exposing
/// that buffer. The bind group/layout pair is created once at construction and
/// reused for the camera's lifetime; the buffer handle never changes, only its
/// contents.
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    projection: Projection,
    uniform: CameraUniform,
    buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl Camera {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, projection: Projection) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Uniform"),
            size: UNIFORM_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Camera Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(UNIFORM_SIZE),
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        let mut camera = Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            projection,
            uniform: CameraUniform::zeroed(),
            buffer,
            bind_group_layout,
            bind_group,
        };
        camera.update_view_matrix(queue);
        camera.update_projection_matrix(queue);
        camera
    }

    /// Recompute the view matrix from position/target/up and write the view
    /// and position slices of the uniform buffer. Projection bytes untouched.
    pub fn update_view_matrix(&mut self, queue: &wgpu::Queue) {
        self.uniform.view = Mat4::look_at_rh(self.position, self.target, self.up);
        self.uniform.position = self.position.extend(1.0);
        queue.write_buffer(
            &self.buffer,
            VIEW_OFFSET,
            bytemuck::bytes_of(&self.uniform.view),
        );
        queue.write_buffer(
            &self.buffer,
            POSITION_OFFSET,
            bytemuck::bytes_of(&self.uniform.position),
        );
    }

    /// Recompute the projection matrix and write the projection slice only.
    /// View and position bytes untouched.
    pub fn update_projection_matrix(&mut self, queue: &wgpu::Queue) {
        self.uniform.proj = self.projection.matrix();
        queue.write_buffer(
            &self.buffer,
            PROJECTION_OFFSET,
            bytemuck::bytes_of(&self.uniform.proj),
        );
    }

    /// Convenience for the resize path: store the new aspect ratio and refresh
    /// the projection slice. No-op for orthographic cameras.
    pub fn update_aspect(&mut self, queue: &wgpu::Queue, aspect: f32) {
        self.projection.set_aspect(aspect);
        self.update_projection_matrix(queue);
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.uniform.view
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.uniform.proj
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_is_144_bytes_at_fixed_offsets() {
        assert_eq!(std::mem::size_of::<CameraUniform>() as u64, UNIFORM_SIZE);
        assert_eq!(std::mem::offset_of!(CameraUniform, proj) as u64, PROJECTION_OFFSET);
        assert_eq!(std::mem::offset_of!(CameraUniform, view) as u64, VIEW_OFFSET);
        assert_eq!(
            std::mem::offset_of!(CameraUniform, position) as u64,
            POSITION_OFFSET
        );
    }

    #[test]
    fn projection_write_leaves_view_and_position_bytes() {
        let mut uniform = CameraUniform::zeroed();
        uniform.view = Mat4::look_at_rh(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y);
        uniform.position = Vec4::new(1.0, 2.0, 3.0, 1.0);
        let before: Vec<u8> = bytemuck::bytes_of(&uniform)[64..144].to_vec();

        uniform.proj = Projection::perspective(45.0, 1.5, 0.1, 100.0).matrix();
        let after = &bytemuck::bytes_of(&uniform)[64..144];
        assert_eq!(before.as_slice(), after);
    }

    #[test]
    fn view_write_leaves_projection_bytes() {
        let mut uniform = CameraUniform::zeroed();
        uniform.proj = Projection::perspective(45.0, 1.5, 0.1, 100.0).matrix();
        let before: Vec<u8> = bytemuck::bytes_of(&uniform)[0..64].to_vec();

        uniform.view = Mat4::look_at_rh(Vec3::new(0.0, 3.0, 8.0), Vec3::ZERO, Vec3::Y);
        uniform.position = Vec4::new(0.0, 3.0, 8.0, 1.0);
        let after = &bytemuck::bytes_of(&uniform)[0..64];
        assert_eq!(before.as_slice(), after);
    }

    #[test]
    fn look_at_identity_camera_is_pure_translation() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let expected = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
        let diff = (view - expected).to_cols_array();
        for entry in diff {
            assert!(entry.abs() < 1e-6, "view deviates from translation: {entry}");
        }
    }

    #[test]
    fn perspective_90_degrees_unit_aspect_has_unit_focal_terms() {
        let proj = Projection::perspective(90.0, 1.0, 1.0, 2.0).matrix();
        assert!((proj.col(0).x - 1.0).abs() < 1e-6);
        assert!((proj.col(1).y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn set_aspect_only_affects_perspective() {
        let mut p = Projection::perspective(45.0, 1.0, 0.1, 100.0);
        p.set_aspect(2.0);
        match p {
            Projection::Perspective { aspect, .. } => assert_eq!(aspect, 2.0),
            _ => unreachable!(),
        }

        let mut o = Projection::orthographic(-1.0, 1.0, -1.0, 1.0, 0.1, 100.0);
        let before = o.matrix();
        o.set_aspect(2.0);
        assert_eq!(o.matrix(), before);
    }

    #[test]
    fn orthographic_matrix_is_independent_of_view_state() {
        let o = Projection::orthographic(-2.0, 2.0, -1.0, 1.0, 0.1, 10.0).matrix();
        // Scale terms on the diagonal follow the frustum bounds directly.
        assert!((o.col(0).x - 0.5).abs() < 1e-6);
        assert!((o.col(1).y - 1.0).abs() < 1e-6);
    }
}
