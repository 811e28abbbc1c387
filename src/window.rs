//! Host windowing: winit wrapper and event-loop driver
//!
//! The window records resize and close signals; the host callback consumes the
//! resize between frames and forwards it to the frame loop, which keeps the
//! resize out of the middle of a frame.

use std::sync::Arc;
use winit::{
    dpi::PhysicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    window::{Window as WinitWindow, WindowBuilder},
};

/// Wrapper around a winit window with resize/close bookkeeping.
pub struct Window {
    window: Arc<WinitWindow>,
    width: u32,
    height: u32,
    resized: bool,
    close_requested: bool,
}

impl Window {
    pub fn new(event_loop: &EventLoop<()>, title: &str, width: u32, height: u32) -> Self {
        let window = Arc::new(
            WindowBuilder::new()
                .with_title(title)
                .with_inner_size(PhysicalSize::new(width, height))
                .build(event_loop)
                .expect("Failed to create window"),
        );

        Self {
            window,
            width,
            height,
            resized: false,
            close_requested: false,
        }
    }

    /// Arc handle for surface creation.
    pub fn window_arc(&self) -> Arc<WinitWindow> {
        Arc::clone(&self.window)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Consume the pending resize, if any. Returns the newest size; earlier
    /// unconsumed resizes are coalesced away.
    pub fn take_resize(&mut self) -> Option<(u32, u32)> {
        if self.resized {
            self.resized = false;
            Some((self.width, self.height))
        } else {
            None
        }
    }

    pub fn should_close(&self) -> bool {
        self.close_requested
    }

    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::Resized(size) => {
                self.width = size.width;
                self.height = size.height;
                self.resized = true;
            }
            WindowEvent::CloseRequested => {
                self.close_requested = true;
            }
            _ => {}
        }
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

/// Run the event loop, invoking `callback` once per presentable frame. The
/// callback returns `false` to stop scheduling (fatal frame error or demo
/// exit); window close always exits.
pub fn run<F>(config: &crate::CoreConfig, mut callback: F)
where
    F: FnMut(&mut Window) -> bool + 'static,
{
    let event_loop = EventLoop::new().expect("Failed to create event loop");
    let mut window = Window::new(&event_loop, &config.title, config.width, config.height);

    event_loop
        .run(move |event, elwt: &EventLoopWindowTarget<()>| {
            elwt.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { event, .. } => {
                    window.handle_event(&event);

                    if let WindowEvent::CloseRequested = event {
                        elwt.exit();
                    }
                }
                Event::AboutToWait => {
                    if !callback(&mut window) {
                        elwt.exit();
                        return;
                    }
                    window.request_redraw();
                }
                _ => {}
            }
        })
        .expect("Event loop failed");
}
