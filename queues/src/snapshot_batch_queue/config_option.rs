use std::time::Duration;

use super::{IdleStrategy, SnapshotBatchQueueConfig};

#[derive(Debug, Clone)]
pub enum ConfigOption {
  SetCapacity(usize),
  SetDrainPollInterval(Duration),
  SetIdleStrategy(IdleStrategy),
  SetWorkerName(String),
}

impl ConfigOption {
  pub fn apply(&self, config: &mut SnapshotBatchQueueConfig) {
    match self {
      ConfigOption::SetCapacity(capacity) => {
        config.capacity = *capacity;
      }
      ConfigOption::SetDrainPollInterval(interval) => {
        config.drain_poll_interval = *interval;
      }
      ConfigOption::SetIdleStrategy(strategy) => {
        config.idle_strategy = *strategy;
      }
      ConfigOption::SetWorkerName(name) => {
        config.worker_name = name.clone();
      }
    }
  }

  pub fn with_capacity(capacity: usize) -> ConfigOption {
    ConfigOption::SetCapacity(capacity)
  }

  pub fn with_drain_poll_interval(interval: Duration) -> ConfigOption {
    ConfigOption::SetDrainPollInterval(interval)
  }

  pub fn with_idle_strategy(strategy: IdleStrategy) -> ConfigOption {
    ConfigOption::SetIdleStrategy(strategy)
  }

  pub fn with_worker_name(name: impl Into<String>) -> ConfigOption {
    ConfigOption::SetWorkerName(name.into())
  }
}
