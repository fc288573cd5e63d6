use std::io;

use thiserror::Error;

/// Errors raised while constructing a queue.
#[derive(Error, Debug)]
pub enum BuildError {
  #[error("shard count must be greater than zero")]
  ZeroShards,
  #[error("capacity must be greater than zero")]
  ZeroCapacity,
  #[error("capacity hint {hint} cannot be rounded up to a power of two")]
  CapacityOverflow { hint: usize },
  #[error("failed to spawn worker thread: {0}")]
  WorkerSpawn(#[from] io::Error),
}

static_assertions::assert_impl_all!(BuildError: Send, Sync);
