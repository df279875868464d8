//! Window thread loop and its control-side handle

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::sync::oneshot;

use super::backend::{WindowBackend, WindowId};
use super::handle::WindowHandle;
use crate::core::error::Error;
use crate::sync::{bounded_queue, Consumer, ManagedThread, RunFlag, SharedProducer};

/// Commands executed on the window thread
pub enum WindowCommand {
    Create {
        title: String,
        width: u32,
        height: u32,
        reply: oneshot::Sender<Result<WindowHandle, Error>>,
    },
    Destroy {
        window: WindowId,
        reply: oneshot::Sender<()>,
    },
}

impl fmt::Debug for WindowCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowCommand::Create { title, width, height, .. } => f
                .debug_struct("Create")
                .field("title", title)
                .field("width", width)
                .field("height", height)
                .finish(),
            WindowCommand::Destroy { window, .. } => {
                f.debug_struct("Destroy").field("window", window).finish()
            }
        }
    }
}

/// Handle to the window thread.
///
/// Any thread may create or destroy windows; requests are serialized onto
/// the command ring and each call blocks until the window thread answers.
///
/// Stopping the thread does not close the windows it owns. Destroy them
/// first.
pub struct WindowWorker {
    thread: ManagedThread,
    commands: Arc<SharedProducer<WindowCommand>>,
}

impl WindowWorker {
    /// Spawn the window thread.
    ///
    /// `make_backend` runs on the new thread, so the backend itself never
    /// has to cross threads. If it fails, the thread keeps running and
    /// every `create_window` reports the failure.
    pub fn spawn<B, F>(make_backend: F, queue_capacity: usize, poll_interval: Duration) -> Result<Self, Error>
    where
        B: WindowBackend + 'static,
        F: FnOnce() -> Result<B, Error> + Send + 'static,
    {
        if queue_capacity == 0 {
            return Err(Error::Config("window queue capacity must be at least 1".into()));
        }

        let (producer, consumer) = bounded_queue(queue_capacity);
        let commands = Arc::new(SharedProducer::new(producer));
        let loop_commands = Arc::clone(&commands);
        let mut window_thread = ManagedThread::new("window");
        window_thread.start(move |flag| {
            let backend = match make_backend() {
                Ok(backend) => Ok(backend),
                Err(e) => {
                    log::error!("Window backend failed to initialize: {}", e);
                    Err(e.to_string())
                }
            };
            WindowLoop {
                commands: consumer,
                producers: loop_commands,
                flag,
                backend,
                windows: HashMap::new(),
                poll_interval,
            }
            .run();
        })?;

        Ok(Self {
            thread: window_thread,
            commands,
        })
    }

    /// Open a window and wait for the window thread's answer
    pub fn create_window(&self, title: &str, width: u32, height: u32) -> Result<WindowHandle, Error> {
        let (reply, answer) = oneshot::channel();
        self.send(WindowCommand::Create {
            title: title.to_string(),
            width,
            height,
            reply,
        })?;
        answer.blocking_recv().map_err(|_| Error::NotRunning("window"))?
    }

    /// Close a window and wait until the window thread has released it
    pub fn destroy_window(&self, window: &WindowHandle) -> Result<(), Error> {
        let (reply, answer) = oneshot::channel();
        self.send(WindowCommand::Destroy {
            window: window.id(),
            reply,
        })?;
        answer.blocking_recv().map_err(|_| Error::NotRunning("window"))
    }

    fn send(&self, command: WindowCommand) -> Result<(), Error> {
        let mut command = command;
        loop {
            {
                // The liveness check and the push happen under the producer
                // lock, which the exiting window thread takes before its
                // final drain. A command is either drained or refused.
                let mut producer = self.commands.lock();
                if !self.thread.is_running() {
                    return Err(Error::NotRunning("window"));
                }
                match producer.push(command) {
                    Ok(()) => return Ok(()),
                    Err(rejected) => command = rejected,
                }
            }
            thread::yield_now();
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_running()
    }

    /// Ask the window thread to exit without waiting for it.
    ///
    /// A command already executing runs to completion; anything still
    /// queued is dropped and its caller gets `NotRunning`.
    pub fn request_stop(&self) {
        self.thread.request_stop();
    }

    /// Stop the window thread and join it
    pub fn stop(&mut self) {
        self.thread.stop();
    }
}

impl Drop for WindowWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State moved onto the window thread
struct WindowLoop<B: WindowBackend> {
    commands: Consumer<WindowCommand>,
    /// Shared with [`WindowWorker`]; locked for the final drain
    producers: Arc<SharedProducer<WindowCommand>>,
    flag: RunFlag,
    /// Initialization error message when the backend could not be built
    backend: Result<B, String>,
    windows: HashMap<WindowId, WindowHandle>,
    poll_interval: Duration,
}

impl<B: WindowBackend> WindowLoop<B> {
    fn run(&mut self) {
        log::info!("Window thread started");

        while self.flag.is_running() {
            while let Some(command) = self.commands.pop() {
                log::debug!("Window thread executing {:?}", command);
                self.execute(command);
            }

            if let Ok(backend) = &mut self.backend {
                for event in backend.poll_events() {
                    for window in self.windows.values() {
                        window.dispatch(&event);
                    }
                }
            }

            thread::sleep(self.poll_interval);
        }

        if !self.windows.is_empty() {
            log::warn!("Window thread exiting with {} windows still open", self.windows.len());
        }
        log::info!("Window thread exiting");
    }

    fn execute(&mut self, command: WindowCommand) {
        match command {
            WindowCommand::Create { title, width, height, reply } => {
                let result = match &mut self.backend {
                    Ok(backend) => backend.create(&title, width, height).map(|id| {
                        let handle = WindowHandle::new(id, width, height);
                        self.windows.insert(id, handle.clone());
                        log::info!("Window {:?} '{}' created ({}x{})", id, title, width, height);
                        handle
                    }),
                    Err(message) => Err(Error::Window(format!("backend unavailable: {}", message))),
                };
                if let Err(e) = &result {
                    log::warn!("Window creation failed: {}", e);
                }
                // The caller may have given up waiting
                let _ = reply.send(result);
            }
            WindowCommand::Destroy { window, reply } => {
                if self.windows.remove(&window).is_some() {
                    if let Ok(backend) = &mut self.backend {
                        backend.destroy(window);
                    }
                    log::info!("Window {:?} destroyed", window);
                }
                let _ = reply.send(());
            }
        }
    }
}

impl<B: WindowBackend> Drop for WindowLoop<B> {
    fn drop(&mut self) {
        // Also runs when the loop unwinds. Clearing the flag under the
        // producer lock means no request can land after the drain below.
        // Dropping the drained requests drops their reply senders, which
        // wakes any caller still blocked on an answer.
        let _producers = self.producers.lock();
        self.flag.set(false);
        while self.commands.pop().is_some() {}
    }
}
