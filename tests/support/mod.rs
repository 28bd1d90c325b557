//! A recording host and surface. Everything the scenes do to them lands in a
//! shared [`Journal`] that the tests inspect.

#![allow(dead_code)]

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use anyhow::{bail, Context, Result};
use backdrop::{
    host::{EventKind, FrameId, Host, ListenerId, ListenerTarget},
    point_cloud::PointCloud,
    renderer::{Capabilities, CloudId, FrameView, PointMaterial, Surface, SurfaceDescriptor},
    window::{Size, Viewport},
};
use glam::Vec3;

#[derive(Debug)]
pub struct Journal {
    pub viewport: Viewport,
    pub vertex_displacement: bool,

    pub fail_surface: bool,
    /// Fail the n-th upload (zero-based).
    pub fail_upload_at: Option<usize>,
    pub fail_render: bool,
    /// Cleared to simulate the surface being pulled out of the container.
    pub attached: bool,

    pub descriptor: Option<SurfaceDescriptor>,
    pub active_listeners: HashMap<ListenerId, (ListenerTarget, EventKind)>,
    pub listeners_added: usize,
    pub listeners_removed: Vec<ListenerId>,
    pub frame_requests: usize,
    pub frame_cancels: usize,
    pub live_handles: usize,
    pub uploads: Vec<(usize, usize, PointMaterial)>,
    pub position_writes: Vec<(CloudId, usize)>,
    pub color_writes: Vec<(CloudId, usize)>,
    pub resizes: Vec<(Size, f32)>,
    pub frames_rendered: usize,
    pub last_view: Option<FrameView>,
}

impl Journal {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            vertex_displacement: false,
            fail_surface: false,
            fail_upload_at: None,
            fail_render: false,
            attached: true,
            descriptor: None,
            active_listeners: HashMap::new(),
            listeners_added: 0,
            listeners_removed: Vec::new(),
            frame_requests: 0,
            frame_cancels: 0,
            live_handles: 0,
            uploads: Vec::new(),
            position_writes: Vec::new(),
            color_writes: Vec::new(),
            resizes: Vec::new(),
            frames_rendered: 0,
            last_view: None,
        }
    }

    pub fn listens_to(&self, kind: EventKind) -> bool {
        self.active_listeners.values().any(|&(_, k)| k == kind)
    }

    pub fn last_aspect(&self) -> Option<f32> {
        self.last_view.as_ref().map(|view| view.camera.aspect_ratio)
    }
}

pub type SharedJournal = Rc<RefCell<Journal>>;

pub fn journal(width: u32, height: u32, scale_factor: f64) -> SharedJournal {
    Rc::new(RefCell::new(Journal::new(Viewport::new(
        width,
        height,
        scale_factor,
    ))))
}

pub struct TestHost {
    journal: SharedJournal,
    next_listener: u64,
    next_frame: u64,
}

impl TestHost {
    pub fn new(journal: &SharedJournal) -> Self {
        Self {
            journal: journal.clone(),
            next_listener: 0,
            next_frame: 0,
        }
    }
}

impl Host for TestHost {
    type Surface = TestSurface;

    fn viewport(&self) -> Viewport {
        self.journal.borrow().viewport
    }

    fn create_surface(&mut self, desc: &SurfaceDescriptor) -> Result<TestSurface> {
        let mut journal = self.journal.borrow_mut();
        if journal.fail_surface {
            bail!("No adapter available");
        }
        journal.descriptor = Some(*desc);
        journal.live_handles += 1;
        Ok(TestSurface {
            journal: self.journal.clone(),
            clouds: HashMap::new(),
            uploads: 0,
            detached: false,
        })
    }

    fn add_listener(&mut self, target: ListenerTarget, kind: EventKind) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        let mut journal = self.journal.borrow_mut();
        journal.active_listeners.insert(id, (target, kind));
        journal.listeners_added += 1;
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        let mut journal = self.journal.borrow_mut();
        journal.active_listeners.remove(&id);
        journal.listeners_removed.push(id);
    }

    fn request_frame(&mut self) -> FrameId {
        let id = FrameId(self.next_frame);
        self.next_frame += 1;
        self.journal.borrow_mut().frame_requests += 1;
        id
    }

    fn cancel_frame(&mut self, _id: FrameId) {
        self.journal.borrow_mut().frame_cancels += 1;
    }
}

pub struct TestSurface {
    journal: SharedJournal,
    /// Point count per live cloud.
    clouds: HashMap<CloudId, usize>,
    uploads: usize,
    detached: bool,
}

impl TestSurface {
    fn check(&self, cloud: CloudId, len: usize) -> Result<()> {
        let expected = *self.clouds.get(&cloud).context("Unknown cloud")?;
        if expected != len {
            bail!("Wrote {} points to a cloud of {}", len, expected);
        }
        Ok(())
    }
}

impl Surface for TestSurface {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            vertex_displacement: self.journal.borrow().vertex_displacement,
        }
    }

    fn upload(&mut self, cloud: &PointCloud, material: PointMaterial) -> Result<CloudId> {
        let index = self.uploads;
        self.uploads += 1;

        let mut journal = self.journal.borrow_mut();
        if journal.fail_upload_at == Some(index) {
            bail!("Out of memory uploading cloud {}", index);
        }

        let id = CloudId(index);
        self.clouds.insert(id, cloud.len());
        journal
            .uploads
            .push((cloud.positions().len(), cloud.colors().len(), material));
        journal.live_handles += 1;
        Ok(id)
    }

    fn write_positions(&mut self, cloud: CloudId, positions: &[Vec3]) -> Result<()> {
        self.check(cloud, positions.len())?;
        self.journal
            .borrow_mut()
            .position_writes
            .push((cloud, positions.len()));
        Ok(())
    }

    fn write_colors(&mut self, cloud: CloudId, colors: &[Vec3]) -> Result<()> {
        self.check(cloud, colors.len())?;
        self.journal
            .borrow_mut()
            .color_writes
            .push((cloud, colors.len()));
        Ok(())
    }

    fn release(&mut self, cloud: CloudId) {
        if self.clouds.remove(&cloud).is_some() {
            self.journal.borrow_mut().live_handles -= 1;
        }
    }

    fn resize(&mut self, size: Size, pixel_ratio: f32) {
        self.journal.borrow_mut().resizes.push((size, pixel_ratio));
    }

    fn render(&mut self, view: &FrameView) -> Result<()> {
        let mut journal = self.journal.borrow_mut();
        if journal.fail_render {
            bail!("Device lost");
        }
        for draw in &view.draws {
            if !self.clouds.contains_key(&draw.cloud) {
                bail!("Drawing unknown cloud {:?}", draw.cloud);
            }
        }
        journal.frames_rendered += 1;
        journal.last_view = Some(view.clone());
        Ok(())
    }

    fn is_attached(&self) -> bool {
        !self.detached && self.journal.borrow().attached
    }

    fn detach(&mut self) {
        if !self.detached {
            self.detached = true;
            self.journal.borrow_mut().live_handles -= 1;
        }
    }
}
