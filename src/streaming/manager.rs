//! Background trunk load/unload worker
//!
//! Requests may come from any thread and land in a mutex + condvar guarded
//! queue. The worker takes one task at a time, flips the trunk's state in
//! the scene table and appends the task to the completion list. Nothing it
//! does is visible to the renderer until the control thread calls
//! [`StreamingManager::flush`].

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use super::draw_commands::{DrawCommandGenerator, DrawIndexedIndirectCommand};
use crate::core::error::Error;
use crate::scene::GlobalSceneTable;
use crate::sync::{ManagedThread, RunFlag};

/// Called from `flush` once the draw list reflects the task
pub type CompletionCallback = Box<dyn FnOnce() + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskKind {
    Load,
    Unload,
}

/// A request travelling pending queue -> worker -> completion list
pub struct StreamingTask {
    pub kind: TaskKind,
    pub trunk_id: String,
    callback: Option<CompletionCallback>,
}

impl fmt::Debug for StreamingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingTask")
            .field("kind", &self.kind)
            .field("trunk_id", &self.trunk_id)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Queues shared with the worker thread
#[derive(Default)]
struct Queues {
    pending: Mutex<VecDeque<StreamingTask>>,
    wake: Condvar,
    completed: Mutex<Vec<StreamingTask>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Streams trunks in and out and keeps the draw list consistent with them
pub struct StreamingManager<G: DrawCommandGenerator> {
    scene: Arc<GlobalSceneTable>,
    generator: G,
    queues: Arc<Queues>,
    worker: ManagedThread,
}

impl<G: DrawCommandGenerator> StreamingManager<G> {
    /// Start the streaming worker over `scene`, publishing into `generator`
    pub fn new(scene: Arc<GlobalSceneTable>, generator: G) -> Result<Self, Error> {
        let queues = Arc::new(Queues::default());

        let mut worker = ManagedThread::new("streaming");
        let worker_queues = Arc::clone(&queues);
        let worker_scene = Arc::clone(&scene);
        worker.start(move |flag| worker_loop(flag, &worker_queues, &worker_scene))?;

        Ok(Self {
            scene,
            generator,
            queues,
            worker,
        })
    }

    /// Ask for a trunk to be loaded. Never blocks on the worker.
    pub fn request_load(&self, trunk_id: impl Into<String>) {
        self.enqueue(TaskKind::Load, trunk_id.into(), None);
    }

    /// Ask for a trunk to be loaded; `on_loaded` runs in the `flush` that
    /// publishes it
    pub fn request_load_with<F>(&self, trunk_id: impl Into<String>, on_loaded: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(TaskKind::Load, trunk_id.into(), Some(Box::new(on_loaded)));
    }

    /// Ask for a trunk to be unloaded
    pub fn request_unload(&self, trunk_id: impl Into<String>) {
        self.enqueue(TaskKind::Unload, trunk_id.into(), None);
    }

    /// Ask for a trunk to be unloaded, with a completion callback
    pub fn request_unload_with<F>(&self, trunk_id: impl Into<String>, on_unloaded: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(TaskKind::Unload, trunk_id.into(), Some(Box::new(on_unloaded)));
    }

    fn enqueue(&self, kind: TaskKind, trunk_id: String, callback: Option<CompletionCallback>) {
        let mut pending = lock(&self.queues.pending);
        pending.push_back(StreamingTask {
            kind,
            trunk_id,
            callback,
        });
        self.queues.wake.notify_one();
    }

    /// Publish everything the worker finished since the last flush.
    ///
    /// Takes the whole completion list, rebuilds the draw list from the
    /// currently loaded trunks, uploads it, and only then runs the retired
    /// tasks' callbacks in completion order, so no callback can observe a
    /// draw list older than its own task. Control thread only. Returns the
    /// number of retired tasks.
    pub fn flush(&mut self) -> usize {
        let retired = std::mem::take(&mut *lock(&self.queues.completed));
        if retired.is_empty() {
            return 0;
        }

        self.rebuild_draw_commands();

        let count = retired.len();
        for task in retired {
            if let Some(callback) = task.callback {
                callback();
            }
        }
        count
    }

    fn rebuild_draw_commands(&mut self) {
        let commands: Vec<_> = self
            .scene
            .loaded_entries()
            .iter()
            .map(DrawIndexedIndirectCommand::from_mesh)
            .collect();

        // Upload failures are logged and the old list stays in place
        match self.generator.update_commands(&commands) {
            Ok(()) => log::debug!("Streaming: published {} draw commands", commands.len()),
            Err(e) => log::warn!("Streaming: draw command upload failed: {}", e),
        }
    }

    /// Stop the worker and join it. Tasks still pending are discarded.
    pub fn shutdown(&mut self) {
        self.worker.request_stop();
        {
            // Notify under the lock so a worker between its predicate
            // check and its wait cannot miss the wakeup
            let _pending = lock(&self.queues.pending);
            self.queues.wake.notify_all();
        }
        self.worker.join();
    }

    /// Requests not yet picked up by the worker
    pub fn pending(&self) -> usize {
        lock(&self.queues.pending).len()
    }

    /// Tasks processed but not yet flushed
    pub fn completed(&self) -> usize {
        lock(&self.queues.completed).len()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    pub fn scene(&self) -> &Arc<GlobalSceneTable> {
        &self.scene
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }
}

impl<G: DrawCommandGenerator> Drop for StreamingManager<G> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(flag: RunFlag, queues: &Queues, scene: &GlobalSceneTable) {
    log::info!("Streaming worker started");

    loop {
        let task = {
            let pending = lock(&queues.pending);
            let mut pending = queues
                .wake
                .wait_while(pending, |pending| pending.is_empty() && flag.is_running())
                .unwrap_or_else(PoisonError::into_inner);

            if !flag.is_running() {
                if !pending.is_empty() {
                    log::debug!("Streaming worker: discarding {} pending tasks", pending.len());
                }
                break;
            }
            match pending.pop_front() {
                Some(task) => task,
                None => continue,
            }
        };

        let known = match task.kind {
            TaskKind::Load => {
                log::info!("Streaming: loading trunk '{}'", task.trunk_id);
                scene.mark_loaded(&task.trunk_id)
            }
            TaskKind::Unload => {
                log::info!("Streaming: unloading trunk '{}'", task.trunk_id);
                scene.mark_unloaded(&task.trunk_id)
            }
        };
        if !known {
            log::debug!("Streaming: trunk '{}' is not registered", task.trunk_id);
        }

        lock(&queues.completed).push(task);
    }

    log::info!("Streaming worker exiting");
}
