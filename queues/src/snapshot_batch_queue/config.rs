use std::time::Duration;

use super::ConfigOption;

pub const DEFAULT_CAPACITY: usize = 1024;
pub const DEFAULT_DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_WORKER_NAME: &str = "snapshot-worker";

/// What the worker does while the queue is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdleStrategy {
  /// Spin briefly, then keep yielding the thread.
  #[default]
  Yield,
  /// Spin briefly, then park for at most the given duration. Producers
  /// unpark the worker when it is asleep.
  Park(Duration),
}

#[derive(Debug, Clone)]
pub struct SnapshotBatchQueueConfig {
  pub capacity: usize,
  /// How often `graceful_stop_and_join` re-checks the live count.
  pub drain_poll_interval: Duration,
  pub idle_strategy: IdleStrategy,
  pub worker_name: String,
}

impl Default for SnapshotBatchQueueConfig {
  fn default() -> Self {
    SnapshotBatchQueueConfig {
      capacity: DEFAULT_CAPACITY,
      drain_poll_interval: DEFAULT_DRAIN_POLL_INTERVAL,
      idle_strategy: IdleStrategy::default(),
      worker_name: DEFAULT_WORKER_NAME.to_string(),
    }
  }
}

impl SnapshotBatchQueueConfig {
  pub fn from(options: impl IntoIterator<Item = ConfigOption>) -> SnapshotBatchQueueConfig {
    let mut config = SnapshotBatchQueueConfig::default();
    for option in options {
      option.apply(&mut config);
    }
    config
  }
}
