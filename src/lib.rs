//! Animated particle backdrops: an ambient star field and an interactive
//! spiral galaxy, each drawing into its own surface and driven by its host's
//! frame callback.

pub mod config;
pub mod entity;
pub mod generate;
pub mod host;
pub mod interaction;
pub mod motion;
pub mod point_cloud;
pub mod renderer;
pub mod scene;
pub mod window;

pub use host::{Host, SceneEvent, WindowHost};
pub use scene::{Backdrop, FrameStatus, GalaxySurface, ParticleField};
