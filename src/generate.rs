//! Procedural point-cloud generators.

use std::{f32::consts::TAU, time::SystemTime};

use anyhow::Result;
use glam::{vec3, Vec3};
use log::info;
use rand::prelude::*;
use rand_pcg::Pcg64Mcg;

use crate::{
    config::*,
    point_cloud::{PointCloud, PointSize},
};

/// An RNG seeded from the wall clock. The seed is logged so a run can be
/// reproduced.
pub fn seeded_rng() -> Pcg64Mcg {
    let rand_seed = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default();
    info!("Seeded RNG with {}", rand_seed);
    Pcg64Mcg::seed_from_u64(rand_seed)
}

/// Converts a `0xRRGGBB` literal to an RGB vector in `[0, 1]`.
pub fn rgb(hex: u32) -> Vec3 {
    vec3(
        ((hex >> 16) & 0xff) as f32,
        ((hex >> 8) & 0xff) as f32,
        (hex & 0xff) as f32,
    ) / 255.
}

/// Stars spread uniformly over a spherical shell, in soft near-white.
pub fn sphere_shell(
    rng: &mut impl Rng,
    count: usize,
    inner_radius: f32,
    outer_radius: f32,
) -> Result<PointCloud> {
    let mut positions = Vec::with_capacity(count);
    let mut colors = Vec::with_capacity(count);
    let mut sizes = Vec::with_capacity(count);

    for _ in 0..count {
        let radius = rng.gen_range(inner_radius..outer_radius);
        let theta = rng.gen_range(0.0..TAU);
        let phi = (2. * rng.gen::<f32>() - 1.).acos();
        positions.push(
            vec3(
                phi.sin() * theta.cos(),
                phi.sin() * theta.sin(),
                phi.cos(),
            ) * radius,
        );

        let base = 0.5 + rng.gen::<f32>() * 0.2;
        colors.push(vec3(base, base, base + rng.gen::<f32>() * 0.1));

        let (min_size, max_size) = AMBIENT_POINT_SIZE_RANGE;
        sizes.push(rng.gen_range(min_size..max_size));
    }

    PointCloud::new(positions, colors, PointSize::PerPoint(sizes))
}

/// A short vertical line of points fading from bright to dim.
pub fn scroll_indicator(count: usize) -> Result<PointCloud> {
    let positions = (0..count)
        .map(|i| vec3(0., INDICATOR_BASE_Y + i as f32 * INDICATOR_SPACING, 0.))
        .collect();
    let colors = (0..count)
        .map(|i| Vec3::splat(1. - i as f32 / count as f32))
        .collect();

    PointCloud::new(positions, colors, PointSize::Uniform(INDICATOR_POINT_SIZE))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GalaxyParams {
    pub arms: u32,
    pub winding: f32,
    pub disk_radius: f32,
    pub radial_scatter: f32,
    pub vertical_scatter: f32,
    pub core_color: Vec3,
    pub outer_color: Vec3,
}

impl Default for GalaxyParams {
    fn default() -> Self {
        Self {
            arms: SPIRAL_ARMS,
            winding: SPIRAL_WINDING,
            disk_radius: DISK_RADIUS,
            radial_scatter: RADIAL_SCATTER,
            vertical_scatter: VERTICAL_SCATTER,
            core_color: rgb(CORE_COLOR),
            outer_color: rgb(OUTER_COLOR),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GalaxyPoint {
    pub position: Vec3,
    pub color: Vec3,
    /// Distance along the arm before scatter is applied.
    pub radius: f32,
    /// Where the color sits between core (0) and outer (1).
    pub mix: f32,
}

/// Samples one point on a spiral arm.
///
/// Scatter uses a cubed uniform sample so most points sit close to the arm
/// and the disk thins out towards its edge.
pub fn spiral_point(rng: &mut impl Rng, params: &GalaxyParams) -> GalaxyPoint {
    let radius = rng.gen::<f32>() * params.disk_radius;
    let spin_angle = radius * params.winding;
    let arm = rng.gen_range(0..params.arms.max(1));
    let branch_angle = arm as f32 / params.arms.max(1) as f32 * TAU;

    let mut scatter = || {
        let sign = if rng.gen_bool(0.5) { 1. } else { -1. };
        rng.gen::<f32>().powi(3) * sign
    };
    let offset = vec3(
        scatter() * params.radial_scatter * radius,
        scatter() * params.vertical_scatter,
        scatter() * params.radial_scatter * radius,
    );

    let angle = branch_angle + spin_angle;
    let position = vec3(angle.cos() * radius, 0., angle.sin() * radius) + offset;

    let mix = (radius / params.disk_radius).clamp(0., 1.);
    let color = params.core_color.lerp(params.outer_color, mix);

    GalaxyPoint {
        position,
        color,
        radius,
        mix,
    }
}

pub fn spiral_galaxy(
    rng: &mut impl Rng,
    count: usize,
    params: &GalaxyParams,
    point_size: f32,
) -> Result<PointCloud> {
    let (positions, colors) = (0..count)
        .map(|_| {
            let point = spiral_point(rng, params);
            (point.position, point.color)
        })
        .unzip();

    PointCloud::new(positions, colors, PointSize::Uniform(point_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> Pcg64Mcg {
        Pcg64Mcg::seed_from_u64(7)
    }

    #[test]
    fn shell_points_stay_between_radii() {
        let cloud = sphere_shell(&mut rng(), 500, 50., 80.).unwrap();
        assert_eq!(cloud.len(), 500);
        assert_eq!(cloud.colors().len(), cloud.positions().len());
        for p in cloud.positions() {
            let r = p.length();
            assert!((49.99..80.01).contains(&r), "radius {} out of shell", r);
        }
    }

    #[test]
    fn shell_colors_are_near_white() {
        let cloud = sphere_shell(&mut rng(), 200, 50., 80.).unwrap();
        for c in cloud.colors() {
            assert!(c.x >= 0.5 && c.x < 0.7);
            assert_eq!(c.x, c.y);
            assert!(c.z >= c.x && c.z < c.x + 0.1);
        }
        for i in 0..cloud.len() {
            let size = cloud.sizes().get(i);
            assert!((1.0..2.0).contains(&size));
        }
    }

    #[test]
    fn indicator_fades_along_the_line() {
        let cloud = scroll_indicator(5).unwrap();
        assert_eq!(cloud.len(), 5);
        assert_eq!(cloud.positions()[0].y, INDICATOR_BASE_Y);
        assert_eq!(cloud.positions()[4].y, INDICATOR_BASE_Y + 2.);
        assert_eq!(cloud.colors()[0], Vec3::ONE);
        assert!(cloud.colors()[4].x < cloud.colors()[3].x);
    }

    #[test]
    fn spiral_radius_and_mix_are_bounded() {
        let params = GalaxyParams::default();
        let mut rng = rng();
        for _ in 0..10_000 {
            let point = spiral_point(&mut rng, &params);
            assert!(point.radius <= params.disk_radius);
            assert!((0.0..=1.0).contains(&point.mix));
            assert!(point.position.y.abs() <= params.vertical_scatter);
        }
    }

    #[test]
    fn spiral_colors_fade_from_core() {
        let params = GalaxyParams::default();
        let mut rng = rng();
        let (inner, outer): (Vec<_>, Vec<_>) = (0..2000)
            .map(|_| spiral_point(&mut rng, &params))
            .partition(|p| p.mix < 0.5);
        let brightness = |points: &[GalaxyPoint]| {
            points.iter().map(|p| p.color.z).sum::<f32>() / points.len() as f32
        };
        assert!(brightness(&inner) > brightness(&outer));
    }

    #[test]
    fn rgb_parses_hex() {
        assert_eq!(rgb(0xff0000), vec3(1., 0., 0.));
        assert_eq!(rgb(0x000033), vec3(0., 0., 0.2));
    }
}
