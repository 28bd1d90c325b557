//! Tuning constants for both backdrops.
//!
//! None of these are read at runtime from anywhere else; change them here and
//! rebuild.

use std::f32::consts::PI;

/// Upper bound on physical pixels per logical pixel.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

pub const CAMERA_FOV: f32 = 60.;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 1000.;

// Ambient star field

pub const AMBIENT_PARTICLE_COUNT: usize = 2000;
pub const AMBIENT_INNER_RADIUS: f32 = 50.;
pub const AMBIENT_OUTER_RADIUS: f32 = 80.;
pub const AMBIENT_CAMERA_DISTANCE: f32 = 100.;
/// Yaw added to the star field every frame, in radians.
pub const AMBIENT_ROTATION_SPEED: f32 = 0.0005;
pub const AMBIENT_POINT_SIZE_RANGE: (f32, f32) = (1., 2.);
/// Distance at which a star is drawn at its nominal pixel size.
pub const AMBIENT_SIZE_REFERENCE: f32 = 100.;
pub const AMBIENT_OPACITY: f32 = 0.5;

pub const WAVE_FREQUENCY: f32 = 0.3;
pub const WAVE_SPATIAL_FREQUENCY: f32 = 0.1;
pub const WAVE_AMPLITUDE: f32 = 0.5;

pub const INDICATOR_POINT_COUNT: usize = 5;
pub const INDICATOR_BASE_Y: f32 = -15.;
pub const INDICATOR_SPACING: f32 = 0.5;
pub const INDICATOR_DRIFT: f32 = 0.2;
pub const INDICATOR_FREQUENCY: f32 = 2.;
/// Phase offset between neighbouring indicator points.
pub const INDICATOR_PHASE_STEP: f32 = 3.;
pub const INDICATOR_POINT_SIZE: f32 = 0.5;
pub const INDICATOR_OPACITY: f32 = 0.6;

// Galaxy

/// Containers at most this wide (logical pixels) count as narrow.
pub const MOBILE_BREAKPOINT: u32 = 640;
pub const GALAXY_PARTICLE_COUNT_MOBILE: usize = 15_000;
pub const GALAXY_PARTICLE_COUNT_DESKTOP: usize = 50_000;
pub const GALAXY_CAMERA_POSITION: [f32; 3] = [25., 10., 25.];

pub const BASE_ROTATION_SPEED: f32 = 0.0003;
pub const MAX_ROTATION_SPEED: f32 = 0.005;
pub const BASE_PITCH: f32 = PI * 0.2;
pub const POINTER_YAW_GAIN: f32 = 0.02;
pub const POINTER_PITCH_GAIN: f32 = 0.01;

pub const SPEED_EASING: f32 = 0.02;
pub const ROTATION_EASING_HOVER: f32 = 0.001;
pub const ROTATION_EASING_IDLE: f32 = 0.0003;

pub const SPIRAL_ARMS: u32 = 3;
pub const SPIRAL_WINDING: f32 = 1.2;
pub const DISK_RADIUS: f32 = 12.;
/// Radial scatter as a fraction of the point's radius.
pub const RADIAL_SCATTER: f32 = 0.3;
pub const VERTICAL_SCATTER: f32 = 0.5;

pub const CORE_COLOR: u32 = 0x4F9CF9;
pub const OUTER_COLOR: u32 = 0x000033;

pub const GALAXY_POINT_SIZE: f32 = 0.1;
pub const GALAXY_OPACITY: f32 = 0.8;
