//! Bounded lock-free single-producer/single-consumer ring buffer.
//!
//! The queue is created as a `(Producer, Consumer)` pair. Neither half is
//! `Clone` and both operations take `&mut self`, so a second producer or
//! consumer cannot exist without going through [`SharedProducer`] or some
//! other external serialization.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

struct Ring<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    /// Next slot the producer writes
    head: AtomicUsize,
    /// Next slot the consumer reads
    tail: AtomicUsize,
}

// Slots are only touched by the side that currently owns them, as decided
// by the cursors.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    #[inline]
    fn next(&self, index: usize) -> usize {
        let next = index + 1;
        if next == self.slots.len() { 0 } else { next }
    }

    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        if head >= tail {
            head - tail
        } else {
            self.slots.len() - tail + head
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len() - 1
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        let head = *self.head.get_mut();
        let mut tail = *self.tail.get_mut();
        while tail != head {
            // SAFETY: slots in [tail, head) hold initialized values that
            // were never popped.
            unsafe { self.slots[tail].get_mut().assume_init_drop() };
            tail = self.next(tail);
        }
    }
}

/// Create a queue holding at most `capacity` items.
///
/// One extra slot is allocated so that "full" (advancing the producer
/// cursor would land on the consumer cursor) and "empty" (cursors equal)
/// stay distinguishable.
///
/// # Panics
/// Panics if `capacity` is zero.
pub fn bounded_queue<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    assert!(capacity > 0, "bounded queue capacity must be at least 1");

    let slots: Vec<_> = (0..capacity + 1)
        .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
        .collect();
    let ring = Arc::new(Ring {
        slots: slots.into_boxed_slice(),
        head: AtomicUsize::new(0),
        tail: AtomicUsize::new(0),
    });

    (
        Producer { ring: Arc::clone(&ring) },
        Consumer { ring },
    )
}

/// Writing half of a bounded queue
pub struct Producer<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Producer<T> {
    /// Push an item, handing it back if the queue is full.
    ///
    /// Never blocks and never allocates. A failed push leaves every slot
    /// untouched.
    pub fn push(&mut self, item: T) -> Result<(), T> {
        let ring = &*self.ring;
        let head = ring.head.load(Ordering::Relaxed);
        let next = ring.next(head);
        if next == ring.tail.load(Ordering::Acquire) {
            return Err(item);
        }

        // SAFETY: `head` is outside [tail, head), so the consumer will not
        // read it until the release store below publishes it.
        unsafe { (*ring.slots[head].get()).write(item) };
        ring.head.store(next, Ordering::Release);
        Ok(())
    }

    /// Push, yielding the thread until the consumer makes room
    pub fn push_spin(&mut self, mut item: T) {
        loop {
            match self.push(item) {
                Ok(()) => return,
                Err(rejected) => {
                    item = rejected;
                    thread::yield_now();
                }
            }
        }
    }

    /// Approximate number of queued items
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.ring.capacity()
    }

    /// Maximum number of queued items
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

/// Reading half of a bounded queue
pub struct Consumer<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Consumer<T> {
    /// Pop the oldest item, `None` if the queue is empty. Never blocks.
    pub fn pop(&mut self) -> Option<T> {
        let ring = &*self.ring;
        let tail = ring.tail.load(Ordering::Relaxed);
        if tail == ring.head.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: the acquire load of `head` makes the producer's write to
        // `tail` visible, and the producer won't reuse the slot until the
        // release store below.
        let item = unsafe { (*ring.slots[tail].get()).assume_init_read() };
        ring.tail.store(ring.next(tail), Ordering::Release);
        Some(item)
    }

    /// Approximate number of queued items
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of queued items
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

/// Producer behind a mutex, for queues fed by more than one thread.
///
/// The lock is held only for the duration of a single push attempt, so
/// a spinning caller never blocks other producers for long.
pub struct SharedProducer<T> {
    inner: Mutex<Producer<T>>,
}

impl<T> SharedProducer<T> {
    pub fn new(producer: Producer<T>) -> Self {
        Self {
            inner: Mutex::new(producer),
        }
    }

    /// Exclusive access to the producer half.
    ///
    /// Holding the guard also keeps every other producer out, which lets a
    /// caller check some condition and push atomically with respect to them.
    pub fn lock(&self) -> MutexGuard<'_, Producer<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push an item, handing it back if the queue is full
    pub fn push(&self, item: T) -> Result<(), T> {
        self.lock().push(item)
    }

    /// Push, yielding the thread until the consumer makes room
    pub fn push_spin(&self, mut item: T) {
        loop {
            match self.push(item) {
                Ok(()) => return,
                Err(rejected) => {
                    item = rejected;
                    thread::yield_now();
                }
            }
        }
    }
}
