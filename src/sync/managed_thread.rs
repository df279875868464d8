//! Start/stop wrapper around a single OS thread

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::core::error::Error;

/// Cooperative run flag shared between a [`ManagedThread`] and its body.
///
/// The body checks [`RunFlag::is_running`] at the top of each loop
/// iteration. The flag also drops to `false` once the body returns, so
/// callers can tell a thread that exited on its own from a live one.
#[derive(Clone, Debug)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn set(&self, running: bool) {
        self.0.store(running, Ordering::Release);
    }
}

/// Drops the run flag when the body returns or unwinds
struct ClearOnExit(RunFlag);

impl Drop for ClearOnExit {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Owns at most one OS thread at a time.
///
/// `start` fails while a thread is alive. `stop` clears the run flag and
/// joins; it is safe to call any number of times and runs on drop.
pub struct ManagedThread {
    name: String,
    flag: RunFlag,
    handle: Option<JoinHandle<()>>,
}

impl ManagedThread {
    /// Create an idle thread slot. `name` becomes the OS thread name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flag: RunFlag::new(),
            handle: None,
        }
    }

    /// Spawn `body` on a new OS thread
    pub fn start<F>(&mut self, body: F) -> Result<(), Error>
    where
        F: FnOnce(RunFlag) + Send + 'static,
    {
        if self.flag.is_running() {
            return Err(Error::Thread(format!("'{}' is already running", self.name)));
        }
        // Reap a thread that exited on its own or is still winding down
        self.join();

        self.flag.set(true);
        let flag = self.flag.clone();
        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                let _clear = ClearOnExit(flag.clone());
                body(flag);
            });

        match spawned {
            Ok(handle) => {
                log::debug!("Thread '{}' started", self.name);
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.flag.set(false);
                Err(Error::Thread(format!("failed to spawn '{}': {}", self.name, e)))
            }
        }
    }

    /// Clear the run flag without joining
    pub fn request_stop(&self) {
        self.flag.set(false);
    }

    /// Join the thread if one was started. Does not touch the run flag.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Thread '{}' panicked", self.name);
            } else {
                log::debug!("Thread '{}' joined", self.name);
            }
        }
    }

    /// Request termination and wait for the thread to exit
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Whether the body is still executing
    pub fn is_running(&self) -> bool {
        self.flag.is_running()
    }

    /// A clone of the run flag, for checking liveness from other threads
    pub fn run_flag(&self) -> RunFlag {
        self.flag.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ManagedThread {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

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
    fn test_start_stop() {
        let iterations = Arc::new(AtomicUsize::new(0));
        let mut worker = ManagedThread::new("test-loop");

        let counter = Arc::clone(&iterations);
        worker
            .start(move |flag| {
                while flag.is_running() {
                    counter.fetch_add(1, Ordering::Relaxed);
                    thread::yield_now();
                }
            })
            .unwrap();

        assert!(worker.is_running());
        assert!(wait_until(Duration::from_secs(5), || iterations.load(Ordering::Relaxed) > 0));

        worker.stop();
        assert!(!worker.is_running());
        let after_stop = iterations.load(Ordering::Relaxed);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(iterations.load(Ordering::Relaxed), after_stop);
    }

    #[test]
    fn test_start_while_running_fails() {
        let mut worker = ManagedThread::new("test-double-start");
        worker
            .start(|flag| {
                while flag.is_running() {
                    thread::yield_now();
                }
            })
            .unwrap();

        assert!(matches!(worker.start(|_| {}), Err(Error::Thread(_))));
        worker.stop();
    }

    #[test]
    fn test_stop_twice_and_without_start() {
        let mut idle = ManagedThread::new("test-idle");
        idle.stop();
        idle.stop();

        let mut worker = ManagedThread::new("test-stop-twice");
        worker.start(|flag| while flag.is_running() { thread::yield_now() }).unwrap();
        worker.stop();
        worker.stop();
        assert!(!worker.is_running());
    }

    #[test]
    fn test_flag_clears_when_body_returns() {
        let mut worker = ManagedThread::new("test-one-shot");
        worker.start(|_| {}).unwrap();
        assert!(wait_until(Duration::from_secs(5), || !worker.is_running()));

        // Slot can be reused once the previous body finished
        worker.start(|flag| while flag.is_running() { thread::yield_now() }).unwrap();
        assert!(worker.is_running());
    }

    #[test]
    fn test_panicking_body_is_joined() {
        let mut worker = ManagedThread::new("test-panic");
        worker.start(|_| panic!("boom")).unwrap();
        worker.stop();
        assert!(!worker.is_running());
    }

    #[test]
    fn test_drop_joins() {
        let exited = Arc::new(AtomicBool::new(false));
        {
            let mut worker = ManagedThread::new("test-drop");
            let exited = Arc::clone(&exited);
            worker
                .start(move |flag| {
                    while flag.is_running() {
                        thread::yield_now();
                    }
                    exited.store(true, Ordering::SeqCst);
                })
                .unwrap();
        }
        assert!(exited.load(Ordering::SeqCst));
    }
}
