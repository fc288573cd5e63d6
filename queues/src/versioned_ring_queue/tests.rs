use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rstest::rstest;

use super::*;

#[rstest]
#[case(0, 2, 1)]
#[case(1, 2, 1)]
#[case(2, 2, 1)]
#[case(3, 4, 2)]
#[case(4, 4, 2)]
#[case(5, 8, 3)]
#[case(1000, 1024, 10)]
#[case(1024, 1024, 10)]
fn test_capacity_rounds_up_to_power_of_two(#[case] hint: usize, #[case] capacity: usize, #[case] bits: u32) {
  let queue = VersionedRingQueue::<u32>::new(hint).unwrap();
  assert_eq!(queue.capacity(), capacity);
  assert_eq!(queue.bits(), bits);
  assert_eq!(queue.mask(), capacity - 1);
  assert_eq!(queue.capacity_hint(), hint);
  assert_eq!(QueueBase::capacity(&queue), QueueSize::Limited(capacity));
}

#[test]
fn test_unrepresentable_hint_is_rejected() {
  let result = VersionedRingQueue::<u8>::new(usize::MAX);
  assert!(matches!(
    result,
    Err(BuildError::CapacityOverflow { hint }) if hint == usize::MAX
  ));
}

#[test]
fn test_debug_reports_layout() {
  let queue = VersionedRingQueue::<u8>::new(5).unwrap();
  assert_eq!(queue.debug(), "hint:5\t00000101\tcapacity:8\tmask:7\tbits:3");
}

#[test]
fn test_pop_on_empty_returns_none() {
  let queue = VersionedRingQueue::<i32>::new(4).unwrap();
  assert_eq!(queue.pop(), None);
  assert!(queue.is_empty());
}

#[test]
fn test_full_ring_rejects_until_pop() {
  let queue = VersionedRingQueue::new(4).unwrap();
  for i in 0..4 {
    assert_eq!(queue.push(i), Ok(()));
  }
  assert_eq!(queue.push(4), Err(QueueError::Full(4)));
  assert_eq!(queue.size(), 4);
  assert!(queue.is_full());

  assert_eq!(queue.pop(), Some(0));
  assert_eq!(queue.push(4), Ok(()));
  assert_eq!(queue.push(5), Err(QueueError::Full(5)));
}

#[test]
fn test_fifo_across_many_laps() {
  let queue = VersionedRingQueue::new(3).unwrap();
  let mut next_expected = 0;
  for i in 0..1_000 {
    queue.push(i).unwrap();
    if i % 3 == 2 {
      while let Some(value) = queue.pop() {
        assert_eq!(value, next_expected);
        next_expected += 1;
      }
    }
  }
  while let Some(value) = queue.pop() {
    assert_eq!(value, next_expected);
    next_expected += 1;
  }
  assert_eq!(next_expected, 1_000);
  assert_eq!(queue.size(), 0);
}

#[derive(Debug)]
struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
  fn drop(&mut self) {
    self.0.fetch_add(1, Ordering::SeqCst);
  }
}

#[test]
fn test_resident_values_are_dropped_with_the_ring() {
  let drops = Arc::new(AtomicUsize::new(0));
  let queue = VersionedRingQueue::new(8).unwrap();
  for _ in 0..5 {
    queue.push(DropCounter(drops.clone())).unwrap();
  }
  drop(queue.pop());
  assert_eq!(drops.load(Ordering::SeqCst), 1);

  drop(queue);
  assert_eq!(drops.load(Ordering::SeqCst), 5);
}

#[test]
fn test_rejected_value_is_returned_intact() {
  let queue = VersionedRingQueue::new(2).unwrap();
  queue.push("a".to_string()).unwrap();
  queue.push("b".to_string()).unwrap();
  let rejected = queue.push("c".to_string()).unwrap_err();
  assert!(rejected.is_full());
  assert_eq!(rejected.into_inner(), "c");
}
