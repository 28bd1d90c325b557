use anyhow::Result;
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
};

mod app;

use app::App;

fn main() -> Result<()> {
    env_logger::init();

    let event_loop = EventLoop::new();

    let mut app = App::new(&event_loop)?;

    event_loop.run(move |e, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match e {
            Event::WindowEvent { window_id, event } => match event {
                WindowEvent::CloseRequested => {
                    if app.close(window_id) {
                        *control_flow = ControlFlow::Exit;
                    }
                }
                event => app.on_window_event(window_id, &event),
            },
            Event::RedrawRequested(window_id) => app.on_redraw(window_id),
            _ => (),
        }
    });
}
