//! In-process window backend with no native windows
//!
//! Used for headless runs and tests. Events are injected from any thread
//! through a [`HeadlessEvents`] handle.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::backend::{WindowBackend, WindowEvent, WindowId};
use crate::core::error::Error;

#[derive(Default)]
struct Shared {
    queued: Vec<WindowEvent>,
    open: HashSet<WindowId>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct HeadlessBackend {
    shared: Arc<Mutex<Shared>>,
    next_id: u64,
    window_limit: Option<usize>,
}

impl HeadlessBackend {
    /// Create a backend and the handle that feeds it events
    pub fn new() -> (Self, HeadlessEvents) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let backend = Self {
            shared: Arc::clone(&shared),
            next_id: 1,
            window_limit: None,
        };
        (backend, HeadlessEvents { shared })
    }

    /// Refuse to open more than `limit` windows at once
    pub fn with_window_limit(mut self, limit: usize) -> Self {
        self.window_limit = Some(limit);
        self
    }
}

impl WindowBackend for HeadlessBackend {
    fn create(&mut self, title: &str, _width: u32, _height: u32) -> Result<WindowId, Error> {
        let mut shared = lock(&self.shared);
        if let Some(limit) = self.window_limit {
            if shared.open.len() >= limit {
                return Err(Error::Window(format!(
                    "cannot open '{}': limit of {} windows reached",
                    title, limit
                )));
            }
        }
        let id = WindowId(self.next_id);
        self.next_id += 1;
        shared.open.insert(id);
        Ok(id)
    }

    fn destroy(&mut self, window: WindowId) {
        lock(&self.shared).open.remove(&window);
    }

    fn poll_events(&mut self) -> Vec<WindowEvent> {
        std::mem::take(&mut lock(&self.shared).queued)
    }
}

/// Injects events into a [`HeadlessBackend`]
#[derive(Clone)]
pub struct HeadlessEvents {
    shared: Arc<Mutex<Shared>>,
}

impl HeadlessEvents {
    /// Deliver `event` on the next poll
    pub fn push(&self, event: WindowEvent) {
        lock(&self.shared).queued.push(event);
    }

    pub fn close(&self, window: WindowId) {
        self.push(WindowEvent::CloseRequested { window });
    }

    pub fn resize(&self, window: WindowId, width: u32, height: u32) {
        self.push(WindowEvent::Resized { window, width, height });
    }

    /// Windows currently open on the backend
    pub fn open_windows(&self) -> usize {
        lock(&self.shared).open.len()
    }
}
