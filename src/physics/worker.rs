//! Physics thread stepping an external simulation on a wall-clock cadence
//!
//! There is no command queue. The thread compares wall-clock time against
//! the step interval and either steps with the actual elapsed time or
//! yields. It never sleeps, trading a busy core for step jitter well
//! below a millisecond.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crate::core::error::Error;
use crate::core::time::StepClock;
use crate::sync::{ManagedThread, RunFlag};

/// Physics backend driven by [`PhysicsWorker`].
///
/// `step` runs on the physics thread. `initialize` and `shutdown` are
/// called by the engine on the control thread around the worker's life.
pub trait PhysicsSystem: Send + Sync {
    fn initialize(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Advance the simulation by `delta_seconds`
    fn step(&self, delta_seconds: f32);

    fn shutdown(&self) {}
}

pub struct PhysicsWorker {
    thread: ManagedThread,
    system: Option<Arc<dyn PhysicsSystem>>,
    steps: Arc<AtomicU64>,
}

impl PhysicsWorker {
    /// Start stepping `system` at `hz` steps per second.
    ///
    /// With no system the thread still keeps time, but steps do nothing.
    pub fn spawn(system: Option<Arc<dyn PhysicsSystem>>, hz: f32) -> Result<Self, Error> {
        let clock = StepClock::from_hz(hz)?;
        let steps = Arc::new(AtomicU64::new(0));

        let mut physics_thread = ManagedThread::new("physics");
        let thread_system = system.clone();
        let thread_steps = Arc::clone(&steps);
        physics_thread.start(move |flag| run(flag, clock, thread_system, &thread_steps))?;

        Ok(Self {
            thread: physics_thread,
            system,
            steps,
        })
    }

    /// Steps taken so far
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Relaxed)
    }

    pub fn system(&self) -> Option<&Arc<dyn PhysicsSystem>> {
        self.system.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_running()
    }

    /// Stop stepping and join. A step in progress runs to completion.
    pub fn stop(&mut self) {
        self.thread.stop();
    }
}

impl Drop for PhysicsWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(flag: RunFlag, mut clock: StepClock, system: Option<Arc<dyn PhysicsSystem>>, steps: &AtomicU64) {
    log::info!(
        "Physics thread started ({:.1} Hz)",
        1.0 / clock.interval().as_secs_f64()
    );

    while flag.is_running() {
        match clock.poll() {
            Some(elapsed) => {
                if let Some(system) = &system {
                    system.step(elapsed.as_secs_f32());
                }
                steps.fetch_add(1, Ordering::Relaxed);
            }
            None => thread::yield_now(),
        }
    }

    log::info!("Physics thread exiting after {} steps", clock.steps());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
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

    #[derive(Default)]
    struct Recorder {
        deltas: Mutex<Vec<f32>>,
        step_delay: Duration,
    }

    impl PhysicsSystem for Recorder {
        fn step(&self, delta_seconds: f32) {
            self.deltas.lock().unwrap().push(delta_seconds);
            thread::sleep(self.step_delay);
        }
    }

    #[test]
    fn test_steps_with_elapsed_time() {
        let system = Arc::new(Recorder::default());
        let mut worker = PhysicsWorker::spawn(Some(system.clone() as Arc<dyn PhysicsSystem>), 200.0).unwrap();

        assert!(wait_until(Duration::from_secs(5), || worker.steps() >= 3));
        worker.stop();

        let deltas = system.deltas.lock().unwrap();
        assert_eq!(deltas.len() as u64, worker.steps());
        // Never stepped early
        assert!(deltas.iter().all(|&dt| dt >= 0.005 - 1e-6));
    }

    #[test]
    fn test_without_system() {
        let mut worker = PhysicsWorker::spawn(None, 1000.0).unwrap();
        assert!(wait_until(Duration::from_secs(5), || worker.steps() > 0));
        worker.stop();
        assert!(!worker.is_running());
    }

    #[test]
    fn test_stop_mid_step_and_twice() {
        let system = Arc::new(Recorder {
            step_delay: Duration::from_millis(50),
            ..Default::default()
        });
        let mut worker = PhysicsWorker::spawn(Some(system.clone() as Arc<dyn PhysicsSystem>), 1000.0).unwrap();
        assert!(wait_until(Duration::from_secs(5), || !system.deltas.lock().unwrap().is_empty()));

        worker.stop();
        worker.stop();
        let steps = worker.steps();
        thread::sleep(Duration::from_millis(10));
        assert_eq!(worker.steps(), steps);
    }

    #[test]
    fn test_invalid_frequency() {
        assert!(matches!(PhysicsWorker::spawn(None, 0.0), Err(Error::Config(_))));
        assert!(matches!(PhysicsWorker::spawn(None, f32::NAN), Err(Error::Config(_))));
    }
}
