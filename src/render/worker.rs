//! RHI thread: the single owner of the GPU submission timeline
//!
//! The control thread feeds commands through a bounded SPSC ring. The
//! render thread pops and executes them one at a time, in arrival order:
//!
//! ```text
//! Idle -> Draw | Resize | SyncPoint | Execute -> Idle
//! Idle -> Shutdown -> (thread exits)
//! ```
//!
//! The only temporal guarantee between the two threads is the sync point
//! rendezvous: [`RenderWorker::request_sync`] returns once the render
//! thread has drained everything queued before it, waited for the device
//! and parked; [`RenderWorker::resume_sync`] releases it. A `request_sync`
//! without a matching `resume_sync` stalls rendering for good, so prefer
//! [`RenderWorker::with_sync`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use super::command::{RenderCommand, RenderResources};
use super::renderer::Renderer;
use crate::core::error::Error;
use crate::sync::{bounded_queue, Consumer, ManagedThread, Producer, RunFlag};

/// Rendezvous flags shared by both sides of the sync point
#[derive(Default)]
struct SyncState {
    requested: AtomicBool,
    at_sync_point: AtomicBool,
}

/// Counters published by the render thread
#[derive(Debug, Default)]
pub struct RenderStats {
    frames: AtomicU64,
    failed_frames: AtomicU64,
    resizes: AtomicU64,
    sync_points: AtomicU64,
    jobs: AtomicU64,
}

impl RenderStats {
    /// Frames whose `render_frame` succeeded
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Frames whose `render_frame` returned an error
    pub fn failed_frames(&self) -> u64 {
        self.failed_frames.load(Ordering::Relaxed)
    }

    pub fn resizes(&self) -> u64 {
        self.resizes.load(Ordering::Relaxed)
    }

    pub fn sync_points(&self) -> u64 {
        self.sync_points.load(Ordering::Relaxed)
    }

    pub fn jobs(&self) -> u64 {
        self.jobs.load(Ordering::Relaxed)
    }
}

/// Handle to the render thread, held by the control thread.
///
/// Every producing method takes `&mut self`: the command ring has exactly
/// one producer, and that producer is whoever owns this handle.
pub struct RenderWorker {
    thread: ManagedThread,
    commands: Producer<RenderCommand>,
    sync: Arc<SyncState>,
    stats: Arc<RenderStats>,
}

impl RenderWorker {
    /// Spawn the render thread with a command ring of `queue_capacity` slots
    pub fn spawn(renderer: Box<dyn Renderer>, queue_capacity: usize) -> Result<Self, Error> {
        if queue_capacity == 0 {
            return Err(Error::Config("render queue capacity must be at least 1".into()));
        }

        let (commands, consumer) = bounded_queue(queue_capacity);
        let sync = Arc::new(SyncState::default());
        let stats = Arc::new(RenderStats::default());

        let mut render_thread = ManagedThread::new("render");
        let mut render_loop = RenderLoop {
            commands: consumer,
            resources: RenderResources::new(renderer),
            sync: Arc::clone(&sync),
            stats: Arc::clone(&stats),
        };
        render_thread.start(move |flag| render_loop.run(flag))?;

        Ok(Self {
            thread: render_thread,
            commands,
            sync,
            stats,
        })
    }

    /// Queue a command, yielding while the ring is full.
    ///
    /// Back-pressure is absorbed by the caller spinning; the ring never
    /// grows. Fails only if the render thread is gone.
    pub fn push_command(&mut self, command: RenderCommand) -> Result<(), Error> {
        let mut command = command;
        loop {
            if !self.thread.is_running() {
                return Err(Error::NotRunning("render"));
            }
            match self.commands.push(command) {
                Ok(()) => return Ok(()),
                Err(rejected) => {
                    command = rejected;
                    thread::yield_now();
                }
            }
        }
    }

    /// Queue a frame
    pub fn draw(&mut self) -> Result<(), Error> {
        self.push_command(RenderCommand::Draw)
    }

    /// Queue a resize
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        self.push_command(RenderCommand::Resize { width, height })
    }

    /// Queue a job against the render-owned resources
    pub fn submit<F>(&mut self, job: F) -> Result<(), Error>
    where
        F: FnOnce(&mut RenderResources) + Send + 'static,
    {
        self.push_command(RenderCommand::Execute(Box::new(job)))
    }

    /// Park the render thread at a sync point.
    ///
    /// Returns once every command queued before this call has executed,
    /// the renderer's idle wait has returned, and the render thread is
    /// spinning at the rendezvous. Must be paired with [`Self::resume_sync`].
    pub fn request_sync(&mut self) -> Result<(), Error> {
        self.sync.requested.store(true, Ordering::Release);
        if let Err(e) = self.push_command(RenderCommand::SyncPoint) {
            self.sync.requested.store(false, Ordering::Release);
            return Err(e);
        }

        while !self.sync.at_sync_point.load(Ordering::Acquire) {
            if !self.thread.is_running() {
                self.sync.requested.store(false, Ordering::Release);
                return Err(Error::NotRunning("render"));
            }
            thread::yield_now();
        }
        Ok(())
    }

    /// Release a parked render thread and wait until it has left the sync point
    pub fn resume_sync(&mut self) -> Result<(), Error> {
        self.sync.requested.store(false, Ordering::Release);
        while self.sync.at_sync_point.load(Ordering::Acquire) {
            if !self.thread.is_running() {
                return Err(Error::NotRunning("render"));
            }
            thread::yield_now();
        }
        Ok(())
    }

    /// Run `f` on the calling thread while the render thread is parked
    pub fn with_sync<T>(&mut self, f: impl FnOnce() -> T) -> Result<T, Error> {
        self.request_sync()?;
        let value = f();
        self.resume_sync()?;
        Ok(value)
    }

    /// Whether the render thread is currently parked
    pub fn is_at_sync_point(&self) -> bool {
        self.sync.at_sync_point.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_running()
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Queue `Shutdown` behind the pending commands and join the thread.
    ///
    /// The renderer's `shutdown` runs on the render thread after every
    /// earlier command. A thread parked at a sync point is released first.
    /// A no-op if the thread already exited.
    pub fn shutdown(&mut self) {
        self.sync.requested.store(false, Ordering::Release);
        if self.push_command(RenderCommand::Shutdown).is_ok() {
            self.thread.join();
        }
        self.thread.stop();
    }

    /// Stop the thread without draining the queue.
    ///
    /// Commands still queued are dropped; a thread parked at a sync point
    /// is released. The renderer is dropped without `shutdown`.
    pub fn stop(&mut self) {
        self.thread.stop();
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State moved onto the render thread
struct RenderLoop {
    commands: Consumer<RenderCommand>,
    resources: RenderResources,
    sync: Arc<SyncState>,
    stats: Arc<RenderStats>,
}

impl RenderLoop {
    fn run(&mut self, flag: RunFlag) {
        log::info!("Render thread started");

        while flag.is_running() {
            let Some(command) = self.commands.pop() else {
                thread::yield_now();
                continue;
            };

            log::trace!("Render thread executing {:?}", command);
            if self.execute(command, &flag) {
                break;
            }
        }

        log::info!(
            "Render thread exiting ({} frames, {} failed)",
            self.stats.frames(),
            self.stats.failed_frames()
        );
    }

    /// Execute one command. Returns `true` when the loop must exit.
    fn execute(&mut self, command: RenderCommand, flag: &RunFlag) -> bool {
        match command {
            RenderCommand::Draw => {
                // A failed frame must not take the pump down with it
                match self.resources.renderer.render_frame() {
                    Ok(()) => {
                        self.stats.frames.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        self.stats.failed_frames.fetch_add(1, Ordering::Relaxed);
                        log::warn!("Frame failed: {}", e);
                    }
                }
            }
            RenderCommand::Resize { width, height } => {
                if let Err(e) = self.resources.renderer.on_resize(width, height) {
                    log::warn!("Resize to {}x{} failed: {}", width, height, e);
                }
                self.stats.resizes.fetch_add(1, Ordering::Relaxed);
            }
            RenderCommand::SyncPoint => {
                self.resources.renderer.wait_idle();
                self.stats.sync_points.fetch_add(1, Ordering::Relaxed);

                self.sync.at_sync_point.store(true, Ordering::Release);
                while self.sync.requested.load(Ordering::Acquire) && flag.is_running() {
                    thread::yield_now();
                }
                self.sync.at_sync_point.store(false, Ordering::Release);
            }
            RenderCommand::Execute(job) => {
                job(&mut self.resources);
                self.stats.jobs.fetch_add(1, Ordering::Relaxed);
            }
            RenderCommand::Shutdown => {
                self.resources.renderer.shutdown();
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};
    use tokio::sync::oneshot;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Frame,
        Resize(u32, u32),
        WaitIdle,
        Shutdown,
    }

    /// Renderer that records every call, optionally slowly
    struct Recorder {
        calls: Arc<Mutex<Vec<Call>>>,
        frame_delay: Duration,
        fail_frames: bool,
    }

    impl Recorder {
        fn new() -> (Self, Arc<Mutex<Vec<Call>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    calls: Arc::clone(&calls),
                    frame_delay: Duration::ZERO,
                    fail_frames: false,
                },
                calls,
            )
        }
    }

    impl Renderer for Recorder {
        fn render_frame(&mut self) -> Result<(), Error> {
            if !self.frame_delay.is_zero() {
                thread::sleep(self.frame_delay);
            }
            self.calls.lock().unwrap().push(Call::Frame);
            if self.fail_frames {
                Err(Error::Gpu("swapchain out of date".into()))
            } else {
                Ok(())
            }
        }

        fn on_resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
            self.calls.lock().unwrap().push(Call::Resize(width, height));
            Ok(())
        }

        fn wait_idle(&mut self) {
            self.calls.lock().unwrap().push(Call::WaitIdle);
        }

        fn shutdown(&mut self) {
            self.calls.lock().unwrap().push(Call::Shutdown);
        }
    }

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        condition()
    }

    #[test]
    fn test_commands_execute_in_order() {
        let (renderer, calls) = Recorder::new();
        let mut worker = RenderWorker::spawn(Box::new(renderer), 16).unwrap();

        worker.draw().unwrap();
        worker.resize(800, 600).unwrap();
        worker.draw().unwrap();
        worker.shutdown();

        assert_eq!(
            *calls.lock().unwrap(),
            vec![Call::Frame, Call::Resize(800, 600), Call::Frame, Call::Shutdown]
        );
        assert!(!worker.is_running());
        assert_eq!(worker.stats().frames(), 2);
        assert_eq!(worker.stats().resizes(), 1);
    }

    #[test]
    fn test_request_sync_waits_for_prior_commands() {
        let (mut renderer, calls) = Recorder::new();
        renderer.frame_delay = Duration::from_millis(2);
        // A small ring also exercises the push retry path
        let mut worker = RenderWorker::spawn(Box::new(renderer), 4).unwrap();

        for _ in 0..10 {
            worker.draw().unwrap();
        }
        worker.request_sync().unwrap();

        {
            let calls = calls.lock().unwrap();
            assert_eq!(calls.len(), 11);
            assert!(calls[..10].iter().all(|c| *c == Call::Frame));
            assert_eq!(calls[10], Call::WaitIdle);
        }
        assert!(worker.is_at_sync_point());

        // Parked: nothing queued after the sync point runs
        worker.draw().unwrap();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.lock().unwrap().len(), 11);

        worker.resume_sync().unwrap();
        assert!(!worker.is_at_sync_point());
        assert!(wait_until(Duration::from_secs(5), || calls.lock().unwrap().len() == 12));

        worker.shutdown();
    }

    #[test]
    fn test_repeated_sync_rounds() {
        let (renderer, _calls) = Recorder::new();
        let mut worker = RenderWorker::spawn(Box::new(renderer), 8).unwrap();

        for _ in 0..50 {
            worker.draw().unwrap();
            worker.request_sync().unwrap();
            worker.resume_sync().unwrap();
        }
        assert_eq!(worker.stats().sync_points(), 50);

        let value = worker.with_sync(|| 7).unwrap();
        assert_eq!(value, 7);
        assert_eq!(worker.stats().sync_points(), 51);
        worker.shutdown();
    }

    #[test]
    fn test_failed_frames_do_not_stop_the_pump() {
        let (mut renderer, calls) = Recorder::new();
        renderer.fail_frames = true;
        let mut worker = RenderWorker::spawn(Box::new(renderer), 8).unwrap();

        worker.draw().unwrap();
        worker.draw().unwrap();
        worker.request_sync().unwrap();
        worker.resume_sync().unwrap();

        assert_eq!(worker.stats().failed_frames(), 2);
        assert_eq!(worker.stats().frames(), 0);
        assert!(worker.is_running());
        worker.shutdown();
        assert_eq!(calls.lock().unwrap().last(), Some(&Call::Shutdown));
    }

    #[test]
    fn test_execute_job_owns_bindless_table() {
        let (renderer, _calls) = Recorder::new();
        let mut worker = RenderWorker::spawn(Box::new(renderer), 8).unwrap();

        let (tx, rx) = oneshot::channel();
        worker
            .submit(move |resources| {
                let first = resources.bindless.register_texture();
                let second = resources.bindless.register_texture();
                let _ = tx.send((first.map(|i| i.get()).ok(), second.map(|i| i.get()).ok()));
            })
            .unwrap();

        assert_eq!(rx.blocking_recv().unwrap(), (Some(0), Some(1)));
        assert_eq!(worker.stats().jobs(), 1);
        worker.shutdown();
    }

    #[test]
    fn test_calls_after_shutdown_report_not_running() {
        let (renderer, _calls) = Recorder::new();
        let mut worker = RenderWorker::spawn(Box::new(renderer), 8).unwrap();
        worker.shutdown();

        assert!(matches!(worker.draw(), Err(Error::NotRunning(_))));
        assert!(matches!(worker.request_sync(), Err(Error::NotRunning(_))));
        worker.shutdown();
        worker.stop();
    }

    #[test]
    fn test_stop_while_idle_mid_command_and_twice() {
        // Idle
        let (renderer, _calls) = Recorder::new();
        let mut worker = RenderWorker::spawn(Box::new(renderer), 8).unwrap();
        worker.stop();
        worker.stop();
        assert!(!worker.is_running());

        // Mid-command: a slow frame is in flight
        let (mut renderer, calls) = Recorder::new();
        renderer.frame_delay = Duration::from_millis(50);
        let mut worker = RenderWorker::spawn(Box::new(renderer), 8).unwrap();
        worker.draw().unwrap();
        worker.draw().unwrap();
        thread::sleep(Duration::from_millis(10));
        worker.stop();
        assert!(!worker.is_running());
        // The in-flight frame completed; the queued one was dropped
        assert_eq!(*calls.lock().unwrap(), vec![Call::Frame]);
    }

    #[test]
    fn test_stop_releases_parked_thread() {
        let (renderer, _calls) = Recorder::new();
        let mut worker = RenderWorker::spawn(Box::new(renderer), 8).unwrap();
        worker.request_sync().unwrap();
        assert!(worker.is_at_sync_point());

        worker.stop();
        assert!(!worker.is_running());
        assert!(!worker.is_at_sync_point());
    }

    #[test]
    fn test_shutdown_releases_parked_thread() {
        let (renderer, calls) = Recorder::new();
        let mut worker = RenderWorker::spawn(Box::new(renderer), 8).unwrap();

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let owner = thread::spawn(move || {
            worker.request_sync().unwrap();
            assert!(worker.is_at_sync_point());
            worker.shutdown();
            let _ = done_tx.send(worker.is_running());
        });

        let still_running = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("shutdown did not return while parked at a sync point");
        assert!(!still_running);
        owner.join().unwrap();
        assert_eq!(calls.lock().unwrap().last(), Some(&Call::Shutdown));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let (renderer, _calls) = Recorder::new();
        assert!(matches!(
            RenderWorker::spawn(Box::new(renderer), 0),
            Err(Error::Config(_))
        ));
    }
}
