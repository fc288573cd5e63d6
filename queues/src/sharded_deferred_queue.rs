//! Key-sharded FIFO queues with peek-then-commit reads.
//!
//! Values are routed to one of `N` shards by a SipHash of their key, so the
//! same key always lands in the same shard and keeps its FIFO order there. A
//! read does not remove anything: it returns the front of the first shard that
//! is non-empty and not already being read, together with a [`ReadToken`].
//! Committing the token removes exactly what was read and lets the next reader
//! in. Until then every other reader skips that shard.

use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};

use siphasher::sip::SipHasher;

use crate::collections::{BuildError, QueueBase, QueueSize};

mod read_token;
mod shard;

pub use self::read_token::ReadToken;
use self::shard::Shard;

pub const DEFAULT_SHARD_COUNT: usize = 10;

pub struct ShardedDeferredQueue<V> {
  shards: Vec<Shard<V>>,
}

impl<V> ShardedDeferredQueue<V> {
  pub fn new(shard_count: usize) -> Result<Self, BuildError> {
    if shard_count == 0 {
      return Err(BuildError::ZeroShards);
    }
    let mut shards = Vec::with_capacity(shard_count);
    for _ in 0..shard_count {
      shards.push(Shard::new());
    }
    tracing::debug!("ShardedDeferredQueue::new: shard_count = {}", shard_count);
    Ok(Self { shards })
  }

  pub fn shard_count(&self) -> usize {
    self.shards.len()
  }

  /// Returns the shard `key` is routed to. Stable for a given shard count.
  pub fn shard_index<K>(&self, key: &K) -> usize
  where
    K: Hash + ?Sized, {
    let mut hasher = SipHasher::new();
    key.hash(&mut hasher);
    let hash = hasher.finish();
    (hash % self.shards.len() as u64) as usize
  }

  /// Appends `value` to the back of the shard selected by `key`.
  pub fn push<K>(&self, key: &K, value: V)
  where
    K: Hash + ?Sized, {
    let index = self.shard_index(key);
    self.shards[index].push_back(value);
  }

  /// Reads the front element of the first available shard without removing it.
  ///
  /// Shards are scanned in index order. A shard is available when it is
  /// non-empty and has no outstanding read. The returned token must be
  /// committed (or released) before that shard can be read again.
  pub fn read_front(&self) -> Option<(V, ReadToken<'_, V>)>
  where
    V: Clone, {
    self.shards.iter().enumerate().find_map(|(index, shard)| {
      shard
        .read_front()
        .map(|value| (value, ReadToken::new(self, index, 1)))
    })
  }

  /// Reads up to `max_count` elements (all of them when `None`) from the front
  /// of the first available shard.
  ///
  /// The batch is returned newest-first: for a shard holding `[A, B, C]`,
  /// `read_front_batch(Some(2))` yields `[B, A]`. The token commits exactly as
  /// many elements as were returned. `Some(0)` reads and claims nothing.
  pub fn read_front_batch(&self, max_count: Option<usize>) -> Option<(Vec<V>, ReadToken<'_, V>)>
  where
    V: Clone, {
    if max_count == Some(0) {
      return None;
    }
    self.shards.iter().enumerate().find_map(|(index, shard)| {
      shard.read_front_batch(max_count).map(|values| {
        let count = values.len();
        (values, ReadToken::new(self, index, count))
      })
    })
  }

  /// Removes what `token` read and reopens its shard for reading.
  ///
  /// # Panics
  ///
  /// Panics if `token` was issued by a different queue.
  pub fn commit(&self, token: ReadToken<'_, V>) {
    assert!(
      std::ptr::eq(token.queue(), self),
      "read token committed against a queue that did not issue it"
    );
    token.commit();
  }

  pub(crate) fn pop_front(&self, shard: usize, count: usize) {
    self.shards[shard].pop_front(count);
  }

  pub(crate) fn release(&self, shard: usize) {
    self.shards[shard].release();
  }

  pub fn shard_len(&self, shard: usize) -> usize {
    self.shards[shard].len()
  }

  pub fn is_read_outstanding(&self, shard: usize) -> bool {
    self.shards[shard].is_outstanding()
  }

  /// Copies the contents of one shard, front first.
  pub fn shard_snapshot(&self, shard: usize) -> VecDeque<V>
  where
    V: Clone, {
    self.shards[shard].snapshot()
  }
}

impl<V> Default for ShardedDeferredQueue<V> {
  fn default() -> Self {
    let shards = (0..DEFAULT_SHARD_COUNT).map(|_| Shard::new()).collect();
    Self { shards }
  }
}

impl<V> Debug for ShardedDeferredQueue<V> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ShardedDeferredQueue")
      .field("shard_count", &self.shards.len())
      .field("len", &self.shards.iter().map(Shard::len).sum::<usize>())
      .finish()
  }
}

impl<V: Send> QueueBase<V> for ShardedDeferredQueue<V> {
  fn len(&self) -> QueueSize {
    QueueSize::limited(self.shards.iter().map(Shard::len).sum())
  }

  fn capacity(&self) -> QueueSize {
    QueueSize::limitless()
  }
}

static_assertions::assert_impl_all!(ShardedDeferredQueue<String>: Send, Sync);

#[cfg(test)]
mod tests;
