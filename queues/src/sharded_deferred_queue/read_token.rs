use std::fmt::{Debug, Formatter};

use super::ShardedDeferredQueue;

/// One-shot capability returned by a read.
///
/// Committing consumes the token, so a read can be committed at most once.
/// Dropping a token without committing or releasing it leaves its shard
/// marked as being read, and no later read will return elements from it.
#[must_use = "an unresolved read token blocks its shard forever"]
pub struct ReadToken<'q, V> {
  queue: &'q ShardedDeferredQueue<V>,
  shard: usize,
  count: usize,
}

impl<'q, V> ReadToken<'q, V> {
  pub(crate) fn new(queue: &'q ShardedDeferredQueue<V>, shard: usize, count: usize) -> Self {
    Self { queue, shard, count }
  }

  pub(crate) fn queue(&self) -> &'q ShardedDeferredQueue<V> {
    self.queue
  }

  pub fn shard(&self) -> usize {
    self.shard
  }

  /// Number of front elements removed on commit.
  pub fn count(&self) -> usize {
    self.count
  }

  /// Removes the elements that were read and reopens the shard.
  pub fn commit(self) {
    tracing::trace!("ReadToken::commit: shard = {}, count = {}", self.shard, self.count);
    self.queue.pop_front(self.shard, self.count);
  }

  /// Reopens the shard without removing anything.
  pub fn release(self) {
    tracing::trace!("ReadToken::release: shard = {}", self.shard);
    self.queue.release(self.shard);
  }
}

impl<V> Debug for ReadToken<'_, V> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ReadToken")
      .field("shard", &self.shard)
      .field("count", &self.count)
      .finish()
  }
}
