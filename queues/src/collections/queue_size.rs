use std::cmp::Ordering;

/// The size of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueSize {
  /// The queue has no capacity limit.
  Limitless,
  /// The queue holds at most the given number of elements.
  Limited(usize),
}

impl QueueSize {
  pub const fn limitless() -> Self {
    Self::Limitless
  }

  pub const fn limited(value: usize) -> Self {
    Self::Limited(value)
  }

  pub const fn is_limitless(&self) -> bool {
    matches!(self, Self::Limitless)
  }

  /// Converts to a usize. `usize::MAX` when limitless.
  pub const fn to_usize(self) -> usize {
    match self {
      Self::Limitless => usize::MAX,
      Self::Limited(value) => value,
    }
  }

  /// Converts to an option. `None` when limitless.
  pub const fn to_option(self) -> Option<usize> {
    match self {
      Self::Limitless => None,
      Self::Limited(value) => Some(value),
    }
  }
}

impl Default for QueueSize {
  fn default() -> Self {
    QueueSize::limited(0)
  }
}

impl PartialOrd for QueueSize {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    match (self, other) {
      (QueueSize::Limitless, QueueSize::Limitless) => Some(Ordering::Equal),
      (QueueSize::Limitless, _) => Some(Ordering::Greater),
      (_, QueueSize::Limitless) => Some(Ordering::Less),
      (QueueSize::Limited(l), QueueSize::Limited(r)) => l.partial_cmp(r),
    }
  }
}
