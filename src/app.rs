use std::rc::Rc;

use anyhow::{Context, Result};
use log::{info, warn};
use winit::{
    dpi::LogicalSize,
    event::{Touch, TouchPhase, WindowEvent},
    event_loop::EventLoop,
    window::{Window, WindowBuilder, WindowId},
};

use backdrop::{
    window::{Viewport, ViewportClass},
    Backdrop, FrameStatus, GalaxySurface, ParticleField, SceneEvent, WindowHost,
};

type Build<B> = fn(WindowHost) -> Result<B>;

/// One window and the backdrop mounted in it.
///
/// A failed mount leaves the window empty; drawing a static gradient there
/// instead is up to whoever embeds the backdrop.
struct Mount<B> {
    window: Rc<Window>,
    build: Build<B>,
    scene: Option<B>,
    class: ViewportClass,
    remount_on_breakpoint: bool,
}

impl<B> Mount<B>
where
    B: Backdrop<Host = WindowHost>,
{
    fn new(window: Window, build: Build<B>, remount_on_breakpoint: bool) -> Self {
        let window = Rc::new(window);
        let class = Viewport::from_window(&window).class();
        let mut mount = Self {
            window,
            build,
            scene: None,
            class,
            remount_on_breakpoint,
        };
        mount.mount();
        mount
    }

    fn window_id(&self) -> WindowId {
        self.window.id()
    }

    fn mount(&mut self) {
        self.class = Viewport::from_window(&self.window).class();
        match (self.build)(WindowHost::new(self.window.clone())) {
            Ok(scene) => self.scene = Some(scene),
            Err(e) => {
                warn!("{:#}; falling back to a static background", e);
                self.scene = None;
            }
        }
    }

    fn unmount(&mut self) {
        if let Some(mut scene) = self.scene.take() {
            scene.dispose();
        }
    }

    fn on_window_event(&mut self, event: &WindowEvent) {
        let scene_event = match to_scene_event(event, &self.window) {
            Some(scene_event) => scene_event,
            None => return,
        };

        if scene_event == SceneEvent::Resize && self.remount_on_breakpoint {
            let class = Viewport::from_window(&self.window).class();
            if class != self.class {
                info!("Viewport crossed the breakpoint ({:?} -> {:?}), remounting", self.class, class);
                self.unmount();
                self.mount();
                return;
            }
        }

        if let Some(scene) = self.scene.as_mut() {
            if scene.host().is_listening(scene_event.kind()) {
                scene.handle_event(scene_event);
            }
        }
    }

    fn on_redraw(&mut self) {
        let scene = match self.scene.as_mut() {
            Some(scene) => scene,
            None => return,
        };
        if scene.host().take_frame().is_none() {
            return;
        }
        if scene.frame() == FrameStatus::Stopped {
            info!("Backdrop in window {:?} stopped", self.window.id());
            self.scene = None;
        }
    }
}

fn to_scene_event(event: &WindowEvent, window: &Window) -> Option<SceneEvent> {
    let scale_factor = window.scale_factor();
    let scene_event = match event {
        WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => SceneEvent::Resize,
        WindowEvent::CursorEntered { .. } => SceneEvent::PointerEnter,
        WindowEvent::CursorLeft { .. } => SceneEvent::PointerLeave,
        WindowEvent::CursorMoved { position, .. } => {
            let position = position.to_logical::<f32>(scale_factor);
            SceneEvent::PointerMove {
                x: position.x,
                y: position.y,
            }
        }
        WindowEvent::Touch(Touch {
            phase, location, ..
        }) => {
            let location = location.to_logical::<f32>(scale_factor);
            let (x, y) = (location.x, location.y);
            match phase {
                TouchPhase::Started => SceneEvent::TouchStart { x, y },
                TouchPhase::Moved => SceneEvent::TouchMove { x, y },
                TouchPhase::Ended | TouchPhase::Cancelled => SceneEvent::TouchEnd,
            }
        }
        _ => return None,
    };
    Some(scene_event)
}

fn build_window(event_loop: &EventLoop<()>, title: &str) -> Result<Window> {
    WindowBuilder::new()
        .with_title(title)
        .with_inner_size(LogicalSize::<u32> {
            width: 800,
            height: 600,
        })
        .with_transparent(true)
        .build(event_loop)
        .context("Failed to build window")
}

/// Both backdrops side by side, each in its own window.
pub struct App {
    ambient: Option<Mount<ParticleField<WindowHost>>>,
    galaxy: Option<Mount<GalaxySurface<WindowHost>>>,
}

impl App {
    pub fn new(event_loop: &EventLoop<()>) -> Result<Self> {
        let ambient = Mount::new(
            build_window(event_loop, "Ambient")?,
            ParticleField::new,
            false,
        );
        let galaxy = Mount::new(
            build_window(event_loop, "Galaxy")?,
            GalaxySurface::new,
            true,
        );

        Ok(Self {
            ambient: Some(ambient),
            galaxy: Some(galaxy),
        })
    }

    pub fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) {
        match &mut self.ambient {
            Some(mount) if mount.window_id() == window_id => mount.on_window_event(event),
            _ => (),
        }
        match &mut self.galaxy {
            Some(mount) if mount.window_id() == window_id => mount.on_window_event(event),
            _ => (),
        }
    }

    pub fn on_redraw(&mut self, window_id: WindowId) {
        match &mut self.ambient {
            Some(mount) if mount.window_id() == window_id => mount.on_redraw(),
            _ => (),
        }
        match &mut self.galaxy {
            Some(mount) if mount.window_id() == window_id => mount.on_redraw(),
            _ => (),
        }
    }

    /// Unmounts and closes the window. Returns `true` once no window is left.
    pub fn close(&mut self, window_id: WindowId) -> bool {
        if matches!(&self.ambient, Some(mount) if mount.window_id() == window_id) {
            if let Some(mut mount) = self.ambient.take() {
                mount.unmount();
            }
        }
        if matches!(&self.galaxy, Some(mount) if mount.window_id() == window_id) {
            if let Some(mut mount) = self.galaxy.take() {
                mount.unmount();
            }
        }
        self.ambient.is_none() && self.galaxy.is_none()
    }
}
