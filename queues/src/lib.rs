//! Concurrent queueing primitives for request-processing systems.
//!
//! - [`ShardedDeferredQueue`]: key-sharded FIFO queues with peek-then-commit reads.
//! - [`SnapshotBatchQueue`]: multi-producer queue drained in snapshots by a dedicated worker thread.
//! - [`VersionedRingQueue`]: fixed-capacity lock-free MPMC ring with per-slot versions.

pub mod collections;
pub mod sharded_deferred_queue;
pub mod snapshot_batch_queue;
pub mod versioned_ring_queue;

pub use collections::{BuildError, QueueBase, QueueError, QueueSize};
pub use sharded_deferred_queue::{ReadToken, ShardedDeferredQueue, DEFAULT_SHARD_COUNT};
pub use snapshot_batch_queue::{
  ConfigOption, IdleStrategy, QueueState, ShutdownReport, SnapshotBatchQueue, SnapshotBatchQueueConfig, SnapshotIter,
};
pub use versioned_ring_queue::VersionedRingQueue;
