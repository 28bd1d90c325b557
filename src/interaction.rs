use glam::{vec2, Quat, Vec2};

use crate::{config::*, motion::approach};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Interaction {
    Idle,
    Hovering,
}

/// Pointer-driven orientation of the galaxy.
///
/// `rotation` is `(pitch, yaw)`. The galaxy never stops spinning: `spin`
/// accumulates `speed` every frame and is added on top of the eased yaw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steering {
    interaction: Interaction,
    rotation: Vec2,
    target_rotation: Vec2,
    speed: f32,
    target_speed: f32,
    spin: f32,
}

impl Default for Steering {
    fn default() -> Self {
        Self {
            interaction: Interaction::Idle,
            rotation: vec2(BASE_PITCH, 0.),
            target_rotation: vec2(BASE_PITCH, 0.),
            speed: BASE_ROTATION_SPEED,
            target_speed: BASE_ROTATION_SPEED,
            spin: 0.,
        }
    }
}

impl Steering {
    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    pub fn rotation(&self) -> Vec2 {
        self.rotation
    }

    pub fn target_rotation(&self) -> Vec2 {
        self.target_rotation
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn target_speed(&self) -> f32 {
        self.target_speed
    }

    pub fn spin(&self) -> f32 {
        self.spin
    }

    pub fn enter(&mut self) {
        self.interaction = Interaction::Hovering;
        self.target_speed = MAX_ROTATION_SPEED;
    }

    pub fn leave(&mut self) {
        self.interaction = Interaction::Idle;
        self.target_speed = BASE_ROTATION_SPEED;
        self.target_rotation = vec2(BASE_PITCH, 0.);
    }

    /// Retargets the tilt from a pointer position normalized to `[-1, 1]`.
    /// Ignored unless hovering.
    pub fn point(&mut self, pointer: Vec2) {
        if self.interaction != Interaction::Hovering {
            return;
        }
        self.target_rotation = vec2(
            BASE_PITCH + pointer.y * POINTER_PITCH_GAIN,
            pointer.x * POINTER_YAW_GAIN,
        );
    }

    /// Advances one frame. Narrow viewports skip easing while idle and spin
    /// at the base rate; speed left over from a hover is dropped.
    pub fn step(&mut self, narrow: bool) {
        let hovering = self.interaction == Interaction::Hovering;

        if narrow && !hovering {
            self.speed = self.target_speed;
            self.spin += BASE_ROTATION_SPEED;
            return;
        }

        self.speed = approach(self.speed, self.target_speed, SPEED_EASING);
        let factor = if hovering {
            ROTATION_EASING_HOVER
        } else {
            ROTATION_EASING_IDLE
        };
        self.rotation = self.rotation.lerp(self.target_rotation, factor);
        self.spin += self.speed;
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_rotation_x(self.rotation.x) * Quat::from_rotation_y(self.rotation.y + self.spin)
    }
}
