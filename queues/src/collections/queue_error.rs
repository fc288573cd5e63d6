use thiserror::Error;

/// A push that could not be accepted. The rejected element is handed back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError<T> {
  /// The queue is at capacity.
  #[error("queue is full")]
  Full(T),
  /// The queue is no longer accepting elements.
  #[error("queue is closed")]
  Closed(T),
}

impl<T> QueueError<T> {
  /// Recovers the element that was rejected.
  pub fn into_inner(self) -> T {
    match self {
      QueueError::Full(element) | QueueError::Closed(element) => element,
    }
  }

  pub fn is_full(&self) -> bool {
    matches!(self, QueueError::Full(_))
  }

  pub fn is_closed(&self) -> bool {
    matches!(self, QueueError::Closed(_))
  }
}

#[cfg(test)]
mod tests {
  use super::QueueError;

  #[test]
  fn rejected_element_is_recoverable() {
    let full = QueueError::Full("a");
    let closed = QueueError::Closed("b");

    assert!(full.is_full());
    assert!(!full.is_closed());
    assert!(closed.is_closed());
    assert_eq!(full.to_string(), "queue is full");
    assert_eq!(closed.to_string(), "queue is closed");
    assert_eq!(full.into_inner(), "a");
    assert_eq!(closed.into_inner(), "b");
  }
}
