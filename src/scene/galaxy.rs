use anyhow::{Context, Result};
use glam::Vec3;
use log::info;
use rand::Rng;

use super::{Backdrop, FrameStatus, SceneCore};
use crate::{
    config::*,
    entity::{Camera, Transform},
    generate::{self, GalaxyParams},
    host::{EventKind, Host, ListenerTarget, SceneEvent},
    interaction::{Interaction, Steering},
    point_cloud::PointCloud,
    renderer::{CloudId, Draw, PointMaterial, SizeAttenuation, SurfaceDescriptor},
    window::{Viewport, ViewportClass},
};

const POINTER_LISTENERS: [(ListenerTarget, EventKind); 6] = [
    (ListenerTarget::Container, EventKind::PointerEnter),
    (ListenerTarget::Container, EventKind::PointerLeave),
    (ListenerTarget::Container, EventKind::PointerMove),
    (ListenerTarget::Container, EventKind::TouchStart),
    (ListenerTarget::Container, EventKind::TouchMove),
    (ListenerTarget::Container, EventKind::TouchEnd),
];

fn pixel_ratio(class: ViewportClass, viewport: &Viewport) -> f32 {
    match class {
        ViewportClass::Narrow => 1.,
        ViewportClass::Wide => viewport.pixel_ratio(),
    }
}

pub fn particle_count(class: ViewportClass) -> usize {
    match class {
        ViewportClass::Narrow => GALAXY_PARTICLE_COUNT_MOBILE,
        ViewportClass::Wide => GALAXY_PARTICLE_COUNT_DESKTOP,
    }
}

/// The interactive spiral galaxy.
///
/// The viewport class is fixed when the galaxy is mounted; crossing the
/// breakpoint later requires mounting a new one.
pub struct GalaxySurface<H: Host> {
    core: SceneCore<H>,
    class: ViewportClass,
    antialias: bool,
    cloud: PointCloud,
    cloud_id: CloudId,
    steering: Steering,
}

impl<H: Host> GalaxySurface<H> {
    pub fn new(host: H) -> Result<Self> {
        Self::with_rng(host, &mut generate::seeded_rng())
    }

    pub fn with_rng(host: H, rng: &mut impl Rng) -> Result<Self> {
        Self::build(host, rng).context("Failed to initialize galaxy")
    }

    fn build(host: H, rng: &mut impl Rng) -> Result<Self> {
        let class = host.viewport().class();
        let antialias = !class.is_narrow();

        let mut core = SceneCore::mount(
            host,
            |viewport| {
                Camera::looking_at_origin(GALAXY_CAMERA_POSITION.into(), viewport.aspect_ratio())
            },
            |viewport| SurfaceDescriptor {
                size: viewport.size,
                pixel_ratio: pixel_ratio(class, viewport),
                antialias,
                transparent: true,
            },
        )?;

        let cloud = generate::spiral_galaxy(
            rng,
            particle_count(class),
            &GalaxyParams::default(),
            GALAXY_POINT_SIZE,
        )?;
        let cloud_id = core.upload(
            &cloud,
            PointMaterial {
                opacity: GALAXY_OPACITY,
                attenuation: SizeAttenuation::Viewport,
                soft_edge: false,
                wave: false,
            },
        )?;

        for (target, kind) in POINTER_LISTENERS {
            core.listen(target, kind);
        }
        core.listen(ListenerTarget::Window, EventKind::Resize);
        core.schedule();

        info!(
            "Galaxy mounted: {} points, {:?} viewport, antialias {}",
            cloud.len(),
            class,
            antialias
        );

        Ok(Self {
            core,
            class,
            antialias,
            cloud,
            cloud_id,
            steering: Steering::default(),
        })
    }

    pub fn class(&self) -> ViewportClass {
        self.class
    }

    pub fn antialias(&self) -> bool {
        self.antialias
    }

    pub fn cloud(&self) -> &PointCloud {
        &self.cloud
    }

    pub fn steering(&self) -> &Steering {
        &self.steering
    }

    pub fn camera(&self) -> &Camera {
        &self.core.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.core.viewport
    }

    fn point(&mut self, x: f32, y: f32) {
        let pointer = self.core.viewport.normalize(x, y);
        self.steering.point(pointer);
    }

    fn step(&mut self) -> Result<()> {
        self.steering.step(self.class.is_narrow());

        self.core.render(vec![Draw {
            cloud: self.cloud_id,
            transform: Transform {
                position: Vec3::ZERO,
                rotation: self.steering.orientation(),
                scale: Vec3::ONE,
            },
        }])
    }
}

impl<H: Host> Backdrop for GalaxySurface<H> {
    type Host = H;

    fn host(&self) -> &H {
        &self.core.host
    }

    fn handle_event(&mut self, event: SceneEvent) {
        if self.core.disposed || !self.core.listens(event.kind()) {
            return;
        }

        match event {
            SceneEvent::Resize => {
                let class = self.class;
                self.core
                    .refresh_viewport(|viewport| pixel_ratio(class, viewport));
            }
            SceneEvent::PointerEnter | SceneEvent::TouchStart { .. } => self.steering.enter(),
            SceneEvent::PointerLeave | SceneEvent::TouchEnd => self.steering.leave(),
            SceneEvent::PointerMove { x, y } | SceneEvent::TouchMove { x, y } => {
                if self.steering.interaction() == Interaction::Hovering {
                    self.point(x, y);
                }
            }
        }
    }

    fn frame(&mut self) -> FrameStatus {
        if !self.core.begin_frame() {
            return FrameStatus::Stopped;
        }
        let result = self.step();
        self.core.end_frame(result)
    }

    fn dispose(&mut self) {
        self.core.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.core.disposed
    }
}
