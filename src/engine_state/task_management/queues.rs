//! Work queues that move chunk ids between pipeline stages.
//!
//! Every operation takes the queue's mutex for its whole duration, so an
//! emptiness check and the pop that follows it can't be split by another
//! worker.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Mutex;

/// Plain first-in first-out queue.
#[derive(Debug)]
pub struct FifoQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> Default for FifoQueue<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }
}

impl<T> FifoQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item: T) {
        self.items.lock().unwrap().push_back(item);
    }

    pub fn pop(&self) -> Option<T> {
        self.items.lock().unwrap().pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().unwrap().is_empty()
    }
}

#[derive(Debug)]
struct UniqueInner<T> {
    order: VecDeque<T>,
    members: HashSet<T>,
}

/// FIFO queue that holds each item at most once.
///
/// Pushing an item that is already waiting is a no-op. Once an item has been
/// popped it can be pushed again, which is how a stage requeues a chunk that
/// isn't ready yet.
#[derive(Debug)]
pub struct UniqueQueue<T> {
    inner: Mutex<UniqueInner<T>>,
}

impl<T> Default for UniqueQueue<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(UniqueInner {
                order: VecDeque::new(),
                members: HashSet::new(),
            }),
        }
    }
}

impl<T: Copy + Eq + Hash> UniqueQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `item` unless it's already queued.
    ///
    /// # Returns
    /// `true` if the item was added
    pub fn push(&self, item: T) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if !inner.members.insert(item) {
            return false;
        }
        inner.order.push_back(item);
        true
    }

    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        let item = inner.order.pop_front()?;
        inner.members.remove(&item);
        Some(item)
    }

    /// Removes and returns everything queued, oldest first.
    pub fn drain(&self) -> Vec<T> {
        let mut inner = self.inner.lock().unwrap();
        inner.members.clear();
        inner.order.drain(..).collect()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.inner.lock().unwrap().members.contains(item)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().order.is_empty()
    }
}
