//! The rendering surface a backdrop draws into.
//!
//! [`Surface`] is the seam between the scenes and the GPU. `WgpuSurface` is
//! the real implementation; anything else that can hold point clouds and draw
//! them (a recording double in tests, for instance) can stand in for it.

use anyhow::Result;
use glam::Vec3;

use crate::{
    entity::{Camera, Transform},
    point_cloud::PointCloud,
    window::Size,
};

mod render_target;
mod upscale;
mod wgpu_surface;

pub use wgpu_surface::WgpuSurface;

/// Handle to a point cloud uploaded to a [`Surface`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct CloudId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceDescriptor {
    /// Container size in logical pixels.
    pub size: Size,
    pub pixel_ratio: f32,
    pub antialias: bool,
    /// Clear to transparent so whatever is behind the surface shows through.
    pub transparent: bool,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct Capabilities {
    /// Per-point wave displacement can run in the vertex stage.
    pub vertex_displacement: bool,
}

/// How a point's on-screen size falls off with distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeAttenuation {
    /// `size * pixel_ratio * reference / depth` pixels.
    Reference(f32),
    /// `size * (viewport_height / 2) / depth` pixels.
    Viewport,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointMaterial {
    pub opacity: f32,
    pub attenuation: SizeAttenuation,
    /// Round sprites with a soft falloff instead of square ones.
    pub soft_edge: bool,
    /// Displace points with the ambient wave in the vertex stage.
    pub wave: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Draw {
    pub cloud: CloudId,
    pub transform: Transform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameView {
    pub camera: Camera,
    pub time: f32,
    pub draws: Vec<Draw>,
}

pub trait Surface {
    fn capabilities(&self) -> Capabilities;

    fn upload(&mut self, cloud: &PointCloud, material: PointMaterial) -> Result<CloudId>;

    fn write_positions(&mut self, cloud: CloudId, positions: &[Vec3]) -> Result<()>;

    fn write_colors(&mut self, cloud: CloudId, colors: &[Vec3]) -> Result<()>;

    /// Frees the cloud's buffers. Unknown ids are ignored.
    fn release(&mut self, cloud: CloudId);

    fn resize(&mut self, size: Size, pixel_ratio: f32);

    fn render(&mut self, view: &FrameView) -> Result<()>;

    fn is_attached(&self) -> bool;

    /// Releases the surface itself. Nothing can be drawn afterwards.
    fn detach(&mut self);
}
