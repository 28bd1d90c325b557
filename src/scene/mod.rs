//! Scene lifecycle shared by both backdrops: mounting, resizing, frame
//! scheduling and disposal.

use std::time::Instant;

use anyhow::{bail, Context, Result};
use log::{debug, error, warn};

use crate::{
    entity::Camera,
    host::{EventKind, FrameId, Host, ListenerId, ListenerTarget, SceneEvent},
    point_cloud::PointCloud,
    renderer::{CloudId, Draw, FrameView, PointMaterial, Surface, SurfaceDescriptor},
    window::Viewport,
};

mod galaxy;
mod particle_field;

pub use galaxy::GalaxySurface;
pub use particle_field::{Displacement, ParticleField};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FrameStatus {
    /// The frame was drawn and the next one is scheduled.
    Continue,
    /// The scene is disposed; no more frames will be requested.
    Stopped,
}

/// A mounted backdrop, as seen by the code that mounts it.
pub trait Backdrop {
    type Host: Host;

    fn host(&self) -> &Self::Host;

    fn handle_event(&mut self, event: SceneEvent);

    fn frame(&mut self) -> FrameStatus;

    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;
}

struct Clock {
    start: Instant,
}

impl Clock {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    fn elapsed(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }
}

/// Resources every scene owns: the host, its surface, the clouds uploaded to
/// it, the listeners it registered and the pending frame request.
struct SceneCore<H: Host> {
    host: H,
    surface: Option<H::Surface>,
    camera: Camera,
    viewport: Viewport,
    clouds: Vec<CloudId>,
    listeners: Vec<(ListenerId, EventKind)>,
    pending_frame: Option<FrameId>,
    clock: Clock,
    elapsed: f32,
    disposed: bool,
}

impl<H: Host> SceneCore<H> {
    /// Creates the surface. Fails without allocating anything if the
    /// container has no area or the surface can't be created.
    fn mount(
        mut host: H,
        camera: impl FnOnce(&Viewport) -> Camera,
        surface_desc: impl FnOnce(&Viewport) -> SurfaceDescriptor,
    ) -> Result<Self> {
        let viewport = host.viewport();
        if viewport.size.is_empty() {
            bail!(
                "Container has no area ({}x{})",
                viewport.size.width,
                viewport.size.height
            );
        }

        let surface = host
            .create_surface(&surface_desc(&viewport))
            .context("Failed to create rendering surface")?;

        Ok(Self {
            camera: camera(&viewport),
            host,
            surface: Some(surface),
            viewport,
            clouds: Vec::new(),
            listeners: Vec::new(),
            pending_frame: None,
            clock: Clock::new(),
            elapsed: 0.,
            disposed: false,
        })
    }

    fn surface(&mut self) -> Result<&mut H::Surface> {
        self.surface.as_mut().context("Scene has been disposed")
    }

    fn upload(&mut self, cloud: &PointCloud, material: PointMaterial) -> Result<CloudId> {
        let id = self.surface()?.upload(cloud, material)?;
        self.clouds.push(id);
        Ok(id)
    }

    fn listen(&mut self, target: ListenerTarget, kind: EventKind) {
        let id = self.host.add_listener(target, kind);
        self.listeners.push((id, kind));
    }

    fn listens(&self, kind: EventKind) -> bool {
        self.listeners.iter().any(|&(_, k)| k == kind)
    }

    fn schedule(&mut self) {
        if !self.disposed && self.pending_frame.is_none() {
            self.pending_frame = Some(self.host.request_frame());
        }
    }

    /// Re-reads the container size and returns the new viewport. The camera
    /// and surface pick it up immediately.
    fn refresh_viewport(&mut self, pixel_ratio: impl FnOnce(&Viewport) -> f32) -> Viewport {
        let viewport = self.host.viewport();
        if viewport.size.is_empty() {
            debug!("Ignoring resize to an empty container");
            return self.viewport;
        }

        self.viewport = viewport;
        self.camera.aspect_ratio = viewport.aspect_ratio();
        let pixel_ratio = pixel_ratio(&viewport);
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(viewport.size, pixel_ratio);
        }
        debug!(
            "Resized to {}x{} (aspect {}, pixel ratio {})",
            viewport.size.width,
            viewport.size.height,
            self.camera.aspect_ratio,
            pixel_ratio
        );
        viewport
    }

    /// Consumes the pending frame request. Returns `false` when nothing
    /// should be drawn.
    fn begin_frame(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.pending_frame = None;

        if !self.surface.as_ref().map_or(false, |s| s.is_attached()) {
            warn!("Rendering surface is no longer attached, stopping");
            self.dispose();
            return false;
        }

        self.elapsed = self.clock.elapsed().max(self.elapsed);
        true
    }

    fn render(&mut self, draws: Vec<Draw>) -> Result<()> {
        let view = FrameView {
            camera: self.camera,
            time: self.elapsed,
            draws,
        };
        self.surface()?.render(&view)
    }

    /// Ends a frame started with [`begin_frame`](Self::begin_frame). A failed
    /// frame is fatal to the scene.
    fn end_frame(&mut self, result: Result<()>) -> FrameStatus {
        match result {
            Ok(()) => {
                self.schedule();
                FrameStatus::Continue
            }
            Err(e) => {
                error!("Frame failed, disposing scene: {:#}", e);
                self.dispose();
                FrameStatus::Stopped
            }
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        for (id, _) in self.listeners.drain(..) {
            self.host.remove_listener(id);
        }
        if let Some(frame) = self.pending_frame.take() {
            self.host.cancel_frame(frame);
        }
        if let Some(mut surface) = self.surface.take() {
            for cloud in self.clouds.drain(..) {
                surface.release(cloud);
            }
            surface.detach();
        }
        debug!("Scene disposed");
    }
}

impl<H: Host> Drop for SceneCore<H> {
    fn drop(&mut self) {
        self.dispose();
    }
}
