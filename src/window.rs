use glam::{vec2, Vec2};

use crate::config::{MAX_PIXEL_RATIO, MOBILE_BREAKPOINT};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn scaled(&self, ratio: f32) -> Size {
        Size {
            width: (self.width as f32 * ratio).round() as u32,
            height: (self.height as f32 * ratio).round() as u32,
        }
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for Size {
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Self {
            width: size.width,
            height: size.height,
        }
    }
}

impl From<winit::dpi::LogicalSize<u32>> for Size {
    fn from(size: winit::dpi::LogicalSize<u32>) -> Self {
        Self {
            width: size.width,
            height: size.height,
        }
    }
}

/// The container a backdrop is mounted into: its logical size and the
/// display's device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub size: Size,
    pub scale_factor: f64,
}

impl Viewport {
    pub fn new(width: u32, height: u32, scale_factor: f64) -> Self {
        Self {
            size: Size::new(width, height),
            scale_factor,
        }
    }

    pub fn from_window(window: &winit::window::Window) -> Self {
        let scale_factor = window.scale_factor();
        Self {
            size: window.inner_size().to_logical::<u32>(scale_factor).into(),
            scale_factor,
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.size.width as f32 / self.size.height as f32
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.scale_factor.min(MAX_PIXEL_RATIO) as f32
    }

    pub fn class(&self) -> ViewportClass {
        if self.size.width <= MOBILE_BREAKPOINT {
            ViewportClass::Narrow
        } else {
            ViewportClass::Wide
        }
    }

    /// Maps a position in container pixels to `[-1, 1]` on both axes, y up.
    pub fn normalize(&self, x: f32, y: f32) -> Vec2 {
        vec2(
            x / self.size.width as f32 * 2. - 1.,
            -(y / self.size.height as f32) * 2. + 1.,
        )
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ViewportClass {
    Narrow,
    Wide,
}

impl ViewportClass {
    pub fn is_narrow(self) -> bool {
        self == ViewportClass::Narrow
    }
}
