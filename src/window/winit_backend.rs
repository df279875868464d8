//! Native windows through winit
//!
//! The event loop is created on, and pumped from, the window thread. winit
//! normally insists on the main thread; on Linux and Windows that check is
//! lifted with `with_any_thread`. macOS cannot host an event loop off the
//! main thread at all, so construction fails there.

use std::collections::HashMap;
use std::time::Duration;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent as WinitEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::platform::pump_events::EventLoopExtPumpEvents;
use winit::window::{Window, WindowAttributes, WindowId as WinitWindowId};

use super::backend::{WindowBackend, WindowEvent, WindowId};
use crate::core::error::Error;

pub struct WinitBackend {
    event_loop: EventLoop<()>,
    windows: HashMap<WindowId, Window>,
    ids: HashMap<WinitWindowId, WindowId>,
    next_id: u64,
}

impl WinitBackend {
    /// Create the platform event loop on the calling thread
    pub fn new() -> Result<Self, Error> {
        if cfg!(target_os = "macos") {
            return Err(Error::Window("winit event loop must run on the main thread on macOS".into()));
        }

        #[allow(unused_mut)]
        let mut builder = EventLoop::builder();
        #[cfg(target_os = "linux")]
        {
            use winit::platform::x11::EventLoopBuilderExtX11;
            builder.with_any_thread(true);
        }
        #[cfg(target_os = "windows")]
        {
            use winit::platform::windows::EventLoopBuilderExtWindows;
            builder.with_any_thread(true);
        }

        let event_loop = builder
            .build()
            .map_err(|e| Error::Window(format!("Failed to create event loop: {}", e)))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        Ok(Self {
            event_loop,
            windows: HashMap::new(),
            ids: HashMap::new(),
            next_id: 1,
        })
    }
}

impl WindowBackend for WinitBackend {
    fn create(&mut self, title: &str, width: u32, height: u32) -> Result<WindowId, Error> {
        let attributes = WindowAttributes::default()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height));

        // Windows are created between pumps, outside any ActiveEventLoop
        #[allow(deprecated)]
        let window = self
            .event_loop
            .create_window(attributes)
            .map_err(|e| Error::Window(format!("Failed to create window: {}", e)))?;

        let id = WindowId(self.next_id);
        self.next_id += 1;
        self.ids.insert(window.id(), id);
        self.windows.insert(id, window);
        Ok(id)
    }

    fn destroy(&mut self, window: WindowId) {
        if let Some(native) = self.windows.remove(&window) {
            self.ids.remove(&native.id());
        }
    }

    fn poll_events(&mut self) -> Vec<WindowEvent> {
        let mut pump = Pump {
            ids: &self.ids,
            events: Vec::new(),
        };
        let _ = self.event_loop.pump_app_events(Some(Duration::ZERO), &mut pump);
        pump.events
    }
}

/// Translates winit callbacks for one pump
struct Pump<'a> {
    ids: &'a HashMap<WinitWindowId, WindowId>,
    events: Vec<WindowEvent>,
}

impl ApplicationHandler for Pump<'_> {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: WinitWindowId, event: WinitEvent) {
        let Some(&window) = self.ids.get(&window_id) else {
            return;
        };
        match event {
            WinitEvent::CloseRequested => {
                self.events.push(WindowEvent::CloseRequested { window });
            }
            WinitEvent::Resized(size) => {
                self.events.push(WindowEvent::Resized {
                    window,
                    width: size.width,
                    height: size.height,
                });
            }
            _ => {}
        }
    }
}
