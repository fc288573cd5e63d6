use std::fmt::Debug;

use super::QueueSize;

/// Size information shared by every queue in this crate.
///
/// Values returned by `len` are snapshots and may be stale by the time the
/// caller looks at them when other threads are pushing or popping.
pub trait QueueBase<E>: Debug + Send + Sync {
  fn len(&self) -> QueueSize;

  fn capacity(&self) -> QueueSize;

  fn is_empty(&self) -> bool {
    self.len() == QueueSize::Limited(0)
  }

  fn non_empty(&self) -> bool {
    !self.is_empty()
  }

  fn is_full(&self) -> bool {
    self.capacity() == self.len()
  }

  fn non_full(&self) -> bool {
    !self.is_full()
  }
}
