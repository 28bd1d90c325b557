//! Per-frame motion laws shared by the scenes.
//!
//! `wave_displace` must stay in sync with `vs_main` in `points.wgsl`; the
//! shader runs it on the GPU and the scenes fall back to this version when the
//! surface can't.

use glam::{vec3, Vec3};

use crate::config::*;

/// Moves `current` a fixed fraction of the remaining distance to `target`.
pub fn approach(current: f32, target: f32, factor: f32) -> f32 {
    current + (target - current) * factor
}

pub fn wave_displace(origin: Vec3, time: f32) -> Vec3 {
    let phase = time * WAVE_FREQUENCY;
    vec3(
        origin.x + (phase + origin.y * WAVE_SPATIAL_FREQUENCY).cos() * WAVE_AMPLITUDE,
        origin.y + (phase + origin.x * WAVE_SPATIAL_FREQUENCY).sin() * WAVE_AMPLITUDE,
        origin.z,
    )
}

pub fn wave_displace_all(origins: &[Vec3], time: f32, out: &mut Vec<Vec3>) {
    out.clear();
    out.extend(origins.iter().map(|&origin| wave_displace(origin, time)));
}

/// Position and brightness of scroll-indicator point `index` at `time`.
pub fn indicator_point(index: usize, time: f32) -> (Vec3, f32) {
    let phase = (time * INDICATOR_FREQUENCY + index as f32 * INDICATOR_PHASE_STEP).sin();
    let y = INDICATOR_BASE_Y + index as f32 * INDICATOR_SPACING + phase * INDICATOR_DRIFT;
    (vec3(0., y, 0.), (phase + 1.) * 0.5)
}
