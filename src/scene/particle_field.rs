use anyhow::{Context, Result};
use glam::{vec3, Quat, Vec3};
use log::{info, warn};
use rand::Rng;

use super::{Backdrop, FrameStatus, SceneCore};
use crate::{
    config::*,
    entity::{Camera, Transform},
    generate,
    host::{EventKind, Host, ListenerTarget, SceneEvent},
    motion::{indicator_point, wave_displace_all},
    point_cloud::PointCloud,
    renderer::{CloudId, Draw, PointMaterial, SizeAttenuation, Surface, SurfaceDescriptor},
    window::Viewport,
};

/// Where the star wave is evaluated.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Displacement {
    Shader,
    Cpu,
}

/// The ambient star field with its pulsing scroll indicator.
///
/// Not interactive: the only event it listens to is window resize.
pub struct ParticleField<H: Host> {
    core: SceneCore<H>,
    stars: PointCloud,
    star_cloud: CloudId,
    star_yaw: f32,
    indicator: PointCloud,
    indicator_cloud: CloudId,
    displacement: Displacement,
    displaced: Vec<Vec3>,
}

impl<H: Host> ParticleField<H> {
    pub fn new(host: H) -> Result<Self> {
        Self::with_rng(host, &mut generate::seeded_rng())
    }

    pub fn with_rng(host: H, rng: &mut impl Rng) -> Result<Self> {
        Self::build(host, rng).context("Failed to initialize particle field")
    }

    fn build(host: H, rng: &mut impl Rng) -> Result<Self> {
        // Anything allocated before a failure is released when `core` drops.
        let mut core = SceneCore::mount(
            host,
            |viewport| {
                Camera::looking_at_origin(
                    vec3(0., 0., AMBIENT_CAMERA_DISTANCE),
                    viewport.aspect_ratio(),
                )
            },
            |viewport| SurfaceDescriptor {
                size: viewport.size,
                pixel_ratio: viewport.pixel_ratio(),
                antialias: true,
                transparent: true,
            },
        )?;

        let displacement = if core.surface()?.capabilities().vertex_displacement {
            Displacement::Shader
        } else {
            warn!("Surface can't displace points in the vertex stage, animating stars on the CPU");
            Displacement::Cpu
        };

        let stars = generate::sphere_shell(
            rng,
            AMBIENT_PARTICLE_COUNT,
            AMBIENT_INNER_RADIUS,
            AMBIENT_OUTER_RADIUS,
        )?;
        let star_cloud = core.upload(
            &stars,
            PointMaterial {
                opacity: AMBIENT_OPACITY,
                attenuation: SizeAttenuation::Reference(AMBIENT_SIZE_REFERENCE),
                soft_edge: true,
                wave: displacement == Displacement::Shader,
            },
        )?;

        let indicator = generate::scroll_indicator(INDICATOR_POINT_COUNT)?;
        let indicator_cloud = core.upload(
            &indicator,
            PointMaterial {
                opacity: INDICATOR_OPACITY,
                attenuation: SizeAttenuation::Viewport,
                soft_edge: false,
                wave: false,
            },
        )?;

        core.listen(ListenerTarget::Window, EventKind::Resize);
        core.schedule();

        info!(
            "Particle field mounted: {} stars, {} indicator points, {:?} displacement",
            stars.len(),
            indicator.len(),
            displacement
        );

        Ok(Self {
            core,
            displaced: Vec::with_capacity(stars.len()),
            stars,
            star_cloud,
            star_yaw: 0.,
            indicator,
            indicator_cloud,
            displacement,
        })
    }

    pub fn stars(&self) -> &PointCloud {
        &self.stars
    }

    pub fn indicator(&self) -> &PointCloud {
        &self.indicator
    }

    pub fn displacement(&self) -> Displacement {
        self.displacement
    }

    pub fn camera(&self) -> &Camera {
        &self.core.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.core.viewport
    }

    pub fn star_yaw(&self) -> f32 {
        self.star_yaw
    }

    fn step(&mut self) -> Result<()> {
        let time = self.core.elapsed;
        self.star_yaw += AMBIENT_ROTATION_SPEED;

        if self.displacement == Displacement::Cpu {
            wave_displace_all(self.stars.positions(), time, &mut self.displaced);
            self.core
                .surface()?
                .write_positions(self.star_cloud, &self.displaced)?;
        }

        for i in 0..self.indicator.len() {
            let (position, brightness) = indicator_point(i, time);
            self.indicator.positions_mut()[i] = position;
            self.indicator.colors_mut()[i] = Vec3::splat(brightness);
        }
        let surface = self.core.surface()?;
        surface.write_positions(self.indicator_cloud, self.indicator.positions())?;
        surface.write_colors(self.indicator_cloud, self.indicator.colors())?;

        self.core.render(vec![
            Draw {
                cloud: self.star_cloud,
                transform: Transform {
                    rotation: Quat::from_rotation_y(self.star_yaw),
                    ..Default::default()
                },
            },
            Draw {
                cloud: self.indicator_cloud,
                transform: Transform::default(),
            },
        ])
    }
}

impl<H: Host> Backdrop for ParticleField<H> {
    type Host = H;

    fn host(&self) -> &H {
        &self.core.host
    }

    fn handle_event(&mut self, event: SceneEvent) {
        if self.core.disposed || !self.core.listens(event.kind()) {
            return;
        }
        if event == SceneEvent::Resize {
            self.core.refresh_viewport(Viewport::pixel_ratio);
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
