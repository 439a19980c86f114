use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use heapless::Deque;
use thiserror::Error;

use crate::constants::QUEUE_CAPACITY;
use crate::utils::Word;

/// A blocked or attempted queue operation was abandoned because the queue was shut down
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("queue has been shut down")]
pub struct QueueShutdown;

/// Word stream owned by a device
pub type WordQueue = BoundedQueue<Word, QUEUE_CAPACITY>;

struct State<T, const N: usize> {
    buffer: Deque<T, N>, // Ring storage
    shutdown: bool,      // Set once, never cleared
}

/// Fixed-capacity FIFO shared between a device and host threads.
///
/// `push` blocks while the queue is full and `pop` blocks while it is empty.
/// After [`BoundedQueue::shutdown`] every pending and future push or pop fails
/// with [`QueueShutdown`].
pub struct BoundedQueue<T, const N: usize> {
    state: Mutex<State<T, N>>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T: Copy, const N: usize> BoundedQueue<T, N> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                buffer: Deque::new(),
                shutdown: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T, N>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `value`, waiting for room
    pub fn push(&self, value: T) -> Result<(), QueueShutdown> {
        let mut state = self.lock();
        loop {
            if state.shutdown {
                return Err(QueueShutdown);
            }
            if !state.buffer.is_full() {
                break;
            }
            state = self
                .not_full
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        // Room was checked under the same lock
        let _ = state.buffer.push_back(value);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Removes the oldest value, waiting for one to arrive
    pub fn pop(&self) -> Result<T, QueueShutdown> {
        let mut state = self.lock();
        loop {
            if state.shutdown {
                return Err(QueueShutdown);
            }
            if let Some(value) = state.buffer.pop_front() {
                self.not_full.notify_one();
                return Ok(value);
            }
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Removes the oldest value if there is one
    pub fn try_pop(&self) -> Result<Option<T>, QueueShutdown> {
        let mut state = self.lock();
        if state.shutdown {
            return Err(QueueShutdown);
        }

        let value = state.buffer.pop_front();
        if value.is_some() {
            self.not_full.notify_one();
        }
        Ok(value)
    }

    /// Oldest value without removing it
    pub fn front(&self) -> Option<T> {
        self.lock().buffer.front().copied()
    }

    /// Releases every waiter; the queue stays unusable afterwards
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.shutdown = true;
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }

    pub fn is_empty(&self) -> bool {
        self.lock().buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().buffer.is_full()
    }

    pub fn len(&self) -> usize {
        self.lock().buffer.len()
    }

    pub fn capacity(&self) -> usize {
        N
    }
}

impl<T: Copy, const N: usize> Default for BoundedQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
