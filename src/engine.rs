//! Composition root owning every worker thread
//!
//! One [`Engine`] per process. It is built from a [`RuntimeConfig`], drives
//! the per-tick protocol from the control thread and tears the workers down
//! in dependency order.

use std::sync::Arc;
use std::thread;

use crate::core::config::RuntimeConfig;
use crate::core::error::Error;
use crate::core::time::TickTimer;
use crate::physics::{PhysicsSystem, PhysicsWorker};
use crate::render::{RenderResources, RenderWorker, Renderer};
use crate::scene::GlobalSceneTable;
use crate::streaming::{CpuDrawCommands, DrawCommandGenerator, StreamingManager};
use crate::window::{WindowBackend, WindowHandle, WindowWorker};

pub struct Engine<G: DrawCommandGenerator = CpuDrawCommands> {
    config: RuntimeConfig,
    window_worker: WindowWorker,
    window: WindowHandle,
    render: RenderWorker,
    physics: PhysicsWorker,
    streaming: StreamingManager<G>,
    last_size: (u32, u32),
    timer: TickTimer,
    shut_down: bool,
}

impl<G: DrawCommandGenerator> Engine<G> {
    /// Start every worker and open the main window.
    ///
    /// Fails if the configuration is invalid, the main window cannot be
    /// created, or the physics system refuses to initialize. Workers that
    /// were already running are stopped again on failure.
    pub fn start<B, F>(
        config: RuntimeConfig,
        make_window_backend: F,
        renderer: Box<dyn Renderer>,
        physics: Option<Arc<dyn PhysicsSystem>>,
        draw_commands: G,
    ) -> Result<Self, Error>
    where
        B: WindowBackend + 'static,
        F: FnOnce() -> Result<B, Error> + Send + 'static,
    {
        config.validate()?;

        let window_worker = WindowWorker::spawn(
            make_window_backend,
            config.window_queue_capacity,
            config.window_poll_interval(),
        )?;
        let window = window_worker.create_window(
            &config.window.title,
            config.window.width,
            config.window.height,
        )?;

        let render = RenderWorker::spawn(renderer, config.render_queue_capacity)?;

        if let Some(system) = &physics {
            system.initialize()?;
        }
        let physics = PhysicsWorker::spawn(physics, config.physics_hz)?;

        let streaming = StreamingManager::new(Arc::new(GlobalSceneTable::new()), draw_commands)?;

        log::info!(
            "Engine started: window {:?} {}x{}, physics {} Hz",
            window.id(),
            config.window.width,
            config.window.height,
            config.physics_hz
        );

        Ok(Self {
            last_size: window.size(),
            config,
            window_worker,
            window,
            render,
            physics,
            streaming,
            timer: TickTimer::new(),
            shut_down: false,
        })
    }

    /// Run one control-loop tick.
    ///
    /// Returns `Ok(false)` once the main window asked to close. Otherwise
    /// forwards a size change to the renderer, publishes finished streaming
    /// work while the render thread is parked, and queues a frame.
    pub fn tick(&mut self) -> Result<bool, Error> {
        if self.shut_down {
            return Err(Error::NotRunning("engine"));
        }
        if self.window.should_close() {
            return Ok(false);
        }

        let size = self.window.size();
        if size != self.last_size {
            self.last_size = size;
            if size.0 > 0 && size.1 > 0 {
                log::debug!("Main window resized to {}x{}", size.0, size.1);
                self.render.resize(size.0, size.1)?;
            }
        }

        let streaming = &mut self.streaming;
        let retired = self.render.with_sync(|| streaming.flush())?;
        if retired > 0 {
            log::debug!("Tick {}: published {} streaming results", self.timer.tick_count(), retired);
        }

        self.render.draw()?;

        if self.timer.tick() {
            log::debug!("Control loop: {:.1} ticks/s", self.timer.rate());
        }
        Ok(true)
    }

    /// Tick until the main window closes, then shut down
    pub fn run(&mut self) -> Result<(), Error> {
        let interval = self.config.tick_interval();
        while self.tick()? {
            thread::sleep(interval);
        }
        self.shutdown();
        Ok(())
    }

    /// Tear everything down. Safe to call more than once.
    ///
    /// Order: render thread (after its queued work), physics, streaming,
    /// windows, then the window thread. Windows must go before the window
    /// thread stops, since stopping the thread does not close them.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        log::info!("Engine shutting down after {} ticks", self.timer.tick_count());

        self.render.shutdown();

        self.physics.stop();
        if let Some(system) = self.physics.system() {
            system.shutdown();
        }

        self.streaming.shutdown();

        if let Err(e) = self.window_worker.destroy_window(&self.window) {
            log::warn!("Failed to destroy main window: {}", e);
        }
        self.window_worker.stop();
    }

    /// Queue a job on the render thread
    pub fn submit_render_job<F>(&mut self, job: F) -> Result<(), Error>
    where
        F: FnOnce(&mut RenderResources) + Send + 'static,
    {
        self.render.submit(job)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn window(&self) -> &WindowHandle {
        &self.window
    }

    pub fn window_worker(&self) -> &WindowWorker {
        &self.window_worker
    }

    pub fn render(&self) -> &RenderWorker {
        &self.render
    }

    pub fn physics(&self) -> &PhysicsWorker {
        &self.physics
    }

    pub fn streaming(&self) -> &StreamingManager<G> {
        &self.streaming
    }

    pub fn scene(&self) -> &Arc<GlobalSceneTable> {
        self.streaming.scene()
    }
}

impl<G: DrawCommandGenerator> Drop for Engine<G> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
