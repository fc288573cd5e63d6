use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// One FIFO sub-queue plus its read-exclusion flag.
///
/// `outstanding` is claimed with a compare-and-swap before the queue lock is
/// taken, so at most one reader holds a shard between read and commit. Pushes
/// only take the queue lock and never look at the flag.
pub(crate) struct Shard<V> {
  queue: Mutex<VecDeque<V>>,
  outstanding: AtomicBool,
}

impl<V> Shard<V> {
  pub(crate) fn new() -> Self {
    Self {
      queue: Mutex::new(VecDeque::new()),
      outstanding: AtomicBool::new(false),
    }
  }

  pub(crate) fn push_back(&self, value: V) {
    self.queue.lock().push_back(value);
  }

  fn try_claim(&self) -> bool {
    self
      .outstanding
      .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
      .is_ok()
  }

  pub(crate) fn release(&self) {
    self.outstanding.store(false, Ordering::Release);
  }

  pub(crate) fn read_front(&self) -> Option<V>
  where
    V: Clone, {
    if !self.try_claim() {
      return None;
    }
    let front = self.queue.lock().front().cloned();
    if front.is_none() {
      self.release();
    }
    front
  }

  pub(crate) fn read_front_batch(&self, max_count: Option<usize>) -> Option<Vec<V>>
  where
    V: Clone, {
    if !self.try_claim() {
      return None;
    }
    let queue = self.queue.lock();
    if queue.is_empty() {
      drop(queue);
      self.release();
      return None;
    }
    let count = max_count.map_or(queue.len(), |max| max.min(queue.len()));
    Some(queue.iter().take(count).rev().cloned().collect())
  }

  pub(crate) fn pop_front(&self, count: usize) {
    let mut queue = self.queue.lock();
    debug_assert!(
      count <= queue.len(),
      "commit of {} elements against a shard holding {}",
      count,
      queue.len()
    );
    let count = count.min(queue.len());
    queue.drain(..count);
    drop(queue);
    self.release();
  }

  pub(crate) fn len(&self) -> usize {
    self.queue.lock().len()
  }

  pub(crate) fn is_outstanding(&self) -> bool {
    self.outstanding.load(Ordering::Acquire)
  }

  pub(crate) fn snapshot(&self) -> VecDeque<V>
  where
    V: Clone, {
    self.queue.lock().clone()
  }
}
