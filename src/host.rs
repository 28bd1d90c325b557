//! The environment a backdrop is mounted into.
//!
//! A [`Host`] owns the container (its size), hands out the rendering surface,
//! keeps track of which events a scene listens to and schedules frames. The
//! scenes talk to it only through ids, so a scene can always remove exactly
//! the listeners and frame request it created.

use std::{cell::Cell, collections::HashMap, rc::Rc};

use anyhow::Result;
use log::debug;
use winit::window::Window;

use crate::{
    renderer::{Surface, SurfaceDescriptor, WgpuSurface},
    window::Viewport,
};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct FrameId(pub u64);

/// Where a listener is attached: the whole window or just the container.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ListenerTarget {
    Window,
    Container,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EventKind {
    Resize,
    PointerEnter,
    PointerLeave,
    PointerMove,
    TouchStart,
    TouchMove,
    TouchEnd,
}

/// An input event delivered to a scene. Positions are logical pixels relative
/// to the container's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneEvent {
    Resize,
    PointerEnter,
    PointerLeave,
    PointerMove { x: f32, y: f32 },
    TouchStart { x: f32, y: f32 },
    TouchMove { x: f32, y: f32 },
    TouchEnd,
}

impl SceneEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SceneEvent::Resize => EventKind::Resize,
            SceneEvent::PointerEnter => EventKind::PointerEnter,
            SceneEvent::PointerLeave => EventKind::PointerLeave,
            SceneEvent::PointerMove { .. } => EventKind::PointerMove,
            SceneEvent::TouchStart { .. } => EventKind::TouchStart,
            SceneEvent::TouchMove { .. } => EventKind::TouchMove,
            SceneEvent::TouchEnd => EventKind::TouchEnd,
        }
    }
}

pub trait Host {
    type Surface: Surface;

    fn viewport(&self) -> Viewport;

    fn create_surface(&mut self, desc: &SurfaceDescriptor) -> Result<Self::Surface>;

    fn add_listener(&mut self, target: ListenerTarget, kind: EventKind) -> ListenerId;

    fn remove_listener(&mut self, id: ListenerId);

    fn request_frame(&mut self) -> FrameId;

    fn cancel_frame(&mut self, id: FrameId);
}

/// A winit window acting as the container.
pub struct WindowHost {
    window: Rc<Window>,
    listeners: HashMap<ListenerId, (ListenerTarget, EventKind)>,
    next_listener: u64,
    next_frame: u64,
    pending_frame: Cell<Option<FrameId>>,
}

impl WindowHost {
    pub fn new(window: Rc<Window>) -> Self {
        Self {
            window,
            listeners: HashMap::new(),
            next_listener: 0,
            next_frame: 0,
            pending_frame: Cell::new(None),
        }
    }

    pub fn is_listening(&self, kind: EventKind) -> bool {
        self.listeners.values().any(|&(_, k)| k == kind)
    }

    /// Consumes the pending frame request, if any. Called when the window is
    /// about to redraw.
    pub fn take_frame(&self) -> Option<FrameId> {
        self.pending_frame.take()
    }
}

impl Host for WindowHost {
    type Surface = WgpuSurface;

    fn viewport(&self) -> Viewport {
        Viewport::from_window(&self.window)
    }

    fn create_surface(&mut self, desc: &SurfaceDescriptor) -> Result<WgpuSurface> {
        WgpuSurface::new(self.window.clone(), desc)
    }

    fn add_listener(&mut self, target: ListenerTarget, kind: EventKind) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.insert(id, (target, kind));
        debug!("Added {:?} listener {:?} on {:?}", kind, id, target);
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        if let Some((target, kind)) = self.listeners.remove(&id) {
            debug!("Removed {:?} listener {:?} from {:?}", kind, id, target);
        }
    }

    fn request_frame(&mut self) -> FrameId {
        let id = FrameId(self.next_frame);
        self.next_frame += 1;
        self.pending_frame.set(Some(id));
        self.window.request_redraw();
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        if self.pending_frame.get() == Some(id) {
            self.pending_frame.set(None);
        }
    }
}
