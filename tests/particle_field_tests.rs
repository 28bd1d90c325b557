mod support;

use backdrop::{
    config::{AMBIENT_PARTICLE_COUNT, INDICATOR_POINT_COUNT},
    host::EventKind,
    renderer::{CloudId, SizeAttenuation},
    scene::Displacement,
    Backdrop, FrameStatus, ParticleField, SceneEvent,
};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use support::{journal, SharedJournal, TestHost};

fn mount(journal: &SharedJournal) -> anyhow::Result<ParticleField<TestHost>> {
    ParticleField::with_rng(TestHost::new(journal), &mut Pcg64Mcg::seed_from_u64(11))
}

#[cfg(test)]
mod mount_tests {
    use super::*;

    #[test]
    fn test_uploads_stars_and_indicator() {
        let journal = journal(800, 600, 1.);
        let field = mount(&journal).unwrap();

        assert_eq!(field.stars().len(), AMBIENT_PARTICLE_COUNT);
        assert_eq!(field.indicator().len(), INDICATOR_POINT_COUNT);

        let journal = journal.borrow();
        assert_eq!(journal.uploads.len(), 2);
        for (positions, colors, _) in &journal.uploads {
            assert_eq!(positions, colors, "Every cloud needs one color per point");
        }
        assert_eq!(journal.uploads[0].0, AMBIENT_PARTICLE_COUNT);
        assert_eq!(journal.uploads[1].0, INDICATOR_POINT_COUNT);
        assert_eq!(journal.live_handles, 3, "Surface plus two clouds");
    }

    #[test]
    fn test_star_material() {
        let journal = journal(800, 600, 1.);
        let _field = mount(&journal).unwrap();

        let journal = journal.borrow();
        let (_, _, stars) = journal.uploads[0];
        assert!(stars.soft_edge);
        assert_eq!(stars.attenuation, SizeAttenuation::Reference(100.));
        assert_eq!(stars.opacity, 0.5);
        let (_, _, indicator) = journal.uploads[1];
        assert!(!indicator.soft_edge);
        assert!(!indicator.wave);
    }

    #[test]
    fn test_surface_descriptor() {
        let journal = journal(800, 600, 3.);
        let _field = mount(&journal).unwrap();

        let desc = journal.borrow().descriptor.unwrap();
        assert!(desc.antialias);
        assert!(desc.transparent);
        assert_eq!(desc.pixel_ratio, 2., "Pixel ratio is capped at 2");
    }

    #[test]
    fn test_only_listens_for_resize() {
        let journal = journal(800, 600, 1.);
        let _field = mount(&journal).unwrap();

        let journal = journal.borrow();
        assert_eq!(journal.active_listeners.len(), 1);
        assert!(journal.listens_to(EventKind::Resize));
        assert_eq!(journal.frame_requests, 1, "First frame is scheduled on mount");
    }

    #[test]
    fn test_camera_looks_from_z() {
        let journal = journal(800, 600, 1.);
        let field = mount(&journal).unwrap();

        assert_eq!(field.camera().position.z, 100.);
        assert_eq!(field.camera().aspect_ratio, 800. / 600.);
    }

    #[test]
    fn test_displacement_follows_capabilities() {
        let cpu = journal(800, 600, 1.);
        assert_eq!(mount(&cpu).unwrap().displacement(), Displacement::Cpu);
        assert!(!cpu.borrow().uploads[0].2.wave);

        let shader = journal(800, 600, 1.);
        shader.borrow_mut().vertex_displacement = true;
        assert_eq!(mount(&shader).unwrap().displacement(), Displacement::Shader);
        assert!(shader.borrow().uploads[0].2.wave);
    }
}

#[cfg(test)]
mod failure_tests {
    use super::*;

    #[test]
    fn test_surface_creation_failure() {
        let journal = journal(800, 600, 1.);
        journal.borrow_mut().fail_surface = true;

        let result = mount(&journal);
        assert!(result.is_err());

        let journal = journal.borrow();
        assert_eq!(journal.live_handles, 0);
        assert!(journal.active_listeners.is_empty());
        assert_eq!(journal.frame_requests, 0);
    }

    #[test]
    fn test_failed_upload_rolls_back() {
        let journal = journal(800, 600, 1.);
        journal.borrow_mut().fail_upload_at = Some(1);

        let result = mount(&journal);
        assert!(result.is_err());
        assert_eq!(journal.borrow().live_handles, 0, "Star cloud and surface are released");
    }

    #[test]
    fn test_empty_container() {
        let journal = journal(0, 600, 1.);
        let error = mount(&journal).err().unwrap();

        assert!(format!("{:#}", error).contains("no area"));
        assert!(journal.borrow().descriptor.is_none());
    }

    #[test]
    fn test_render_failure_stops() {
        let journal = journal(800, 600, 1.);
        let mut field = mount(&journal).unwrap();
        journal.borrow_mut().fail_render = true;

        assert_eq!(field.frame(), FrameStatus::Stopped);
        assert!(field.is_disposed());

        let journal = journal.borrow();
        assert_eq!(journal.live_handles, 0);
        assert!(journal.active_listeners.is_empty());
        assert_eq!(journal.frame_requests, 1, "Nothing is scheduled after a failed frame");
    }

    #[test]
    fn test_detached_surface_stops() {
        let journal = journal(800, 600, 1.);
        let mut field = mount(&journal).unwrap();
        assert_eq!(field.frame(), FrameStatus::Continue);

        journal.borrow_mut().attached = false;
        assert_eq!(field.frame(), FrameStatus::Stopped);
        assert!(field.is_disposed());
        assert_eq!(journal.borrow().live_handles, 0);
        assert_eq!(journal.borrow().frames_rendered, 1);
    }
}

#[cfg(test)]
mod frame_tests {
    use super::*;

    #[test]
    fn test_frame_reschedules() {
        let journal = journal(800, 600, 1.);
        let mut field = mount(&journal).unwrap();

        for _ in 0..3 {
            assert_eq!(field.frame(), FrameStatus::Continue);
        }
        assert_eq!(journal.borrow().frame_requests, 4);
        assert_eq!(journal.borrow().frames_rendered, 3);
    }

    #[test]
    fn test_stars_rotate_every_frame() {
        let journal = journal(800, 600, 1.);
        let mut field = mount(&journal).unwrap();

        field.frame();
        let first = field.star_yaw();
        field.frame();
        assert!(field.star_yaw() > first);
        assert!((field.star_yaw() - 2. * 0.0005).abs() < 1e-7);
    }

    #[test]
    fn test_cpu_path_rewrites_star_positions() {
        let journal = journal(800, 600, 1.);
        let mut field = mount(&journal).unwrap();
        field.frame();

        let journal = journal.borrow();
        assert!(journal
            .position_writes
            .contains(&(CloudId(0), AMBIENT_PARTICLE_COUNT)));
        assert!(journal
            .position_writes
            .contains(&(CloudId(1), INDICATOR_POINT_COUNT)));
        assert!(journal
            .color_writes
            .contains(&(CloudId(1), INDICATOR_POINT_COUNT)));
    }

    #[test]
    fn test_shader_path_leaves_stars_alone() {
        let journal = journal(800, 600, 1.);
        journal.borrow_mut().vertex_displacement = true;
        let mut field = mount(&journal).unwrap();
        field.frame();

        let journal = journal.borrow();
        assert!(journal.position_writes.iter().all(|&(id, _)| id == CloudId(1)));
    }

    #[test]
    fn test_draws_both_clouds() {
        let journal = journal(800, 600, 1.);
        let mut field = mount(&journal).unwrap();
        field.frame();

        let journal = journal.borrow();
        let view = journal.last_view.as_ref().unwrap();
        assert_eq!(view.draws.len(), 2);
        assert_eq!(view.camera.position.z, 100.);
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_resize_updates_aspect() {
        let journal = journal(800, 600, 1.);
        let mut field = mount(&journal).unwrap();

        journal.borrow_mut().viewport.size = backdrop::window::Size::new(400, 300);
        field.handle_event(SceneEvent::Resize);
        field.frame();

        assert_eq!(journal.borrow().last_aspect(), Some(400. / 300.));
        assert_eq!(field.viewport().size.width, 400);
    }

    #[test]
    fn test_resize_refreshes_pixel_ratio() {
        let journal = journal(800, 600, 1.);
        let mut field = mount(&journal).unwrap();

        journal.borrow_mut().viewport.scale_factor = 2.;
        field.handle_event(SceneEvent::Resize);

        let journal = journal.borrow();
        let &(size, pixel_ratio) = journal.resizes.last().unwrap();
        assert_eq!(size.width, 800);
        assert_eq!(pixel_ratio, 2.);
    }

    #[test]
    fn test_resize_to_nothing_is_ignored() {
        let journal = journal(800, 600, 1.);
        let mut field = mount(&journal).unwrap();

        journal.borrow_mut().viewport.size = backdrop::window::Size::new(800, 0);
        field.handle_event(SceneEvent::Resize);

        assert!(journal.borrow().resizes.is_empty());
        assert_eq!(field.camera().aspect_ratio, 800. / 600.);
    }

    #[test]
    fn test_double_dispose() {
        let journal = journal(800, 600, 1.);
        let mut field = mount(&journal).unwrap();

        field.dispose();
        field.dispose();

        let journal = journal.borrow();
        assert_eq!(journal.listeners_removed.len(), journal.listeners_added);
        assert_eq!(journal.frame_cancels, 1);
        assert_eq!(journal.live_handles, 0);
    }

    #[test]
    fn test_no_frames_after_dispose() {
        let journal = journal(800, 600, 1.);
        let mut field = mount(&journal).unwrap();
        field.frame();
        field.dispose();

        let requests = journal.borrow().frame_requests;
        assert_eq!(field.frame(), FrameStatus::Stopped);
        field.handle_event(SceneEvent::Resize);
        assert_eq!(journal.borrow().frame_requests, requests);
        assert!(journal.borrow().resizes.is_empty());
    }

    #[test]
    fn test_drop_releases_everything() {
        let journal = journal(800, 600, 1.);
        {
            let _field = mount(&journal).unwrap();
            assert_eq!(journal.borrow().live_handles, 3);
        }
        assert_eq!(journal.borrow().live_handles, 0);
        assert!(journal.borrow().active_listeners.is_empty());
    }
}
