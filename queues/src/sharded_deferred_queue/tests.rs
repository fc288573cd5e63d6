use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;

use rstest::rstest;

use super::*;
use crate::collections::BuildError;

fn key_for_shard(queue: &ShardedDeferredQueue<&'static str>, shard: usize) -> String {
  (0..)
    .map(|i| format!("key-{}", i))
    .find(|key| queue.shard_index(key.as_str()) == shard)
    .unwrap()
}

#[test]
fn test_zero_shards_is_rejected() {
  let result = ShardedDeferredQueue::<i32>::new(0);
  assert!(matches!(result, Err(BuildError::ZeroShards)));
}

#[test]
fn test_default_uses_default_shard_count() {
  let queue = ShardedDeferredQueue::<i32>::default();
  assert_eq!(queue.shard_count(), DEFAULT_SHARD_COUNT);
  assert_eq!(queue.capacity(), QueueSize::Limitless);
  assert!(queue.is_empty());
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(10)]
#[case(64)]
fn test_routing_is_deterministic(#[case] shard_count: usize) {
  let queue = ShardedDeferredQueue::<i32>::new(shard_count).unwrap();
  let other = ShardedDeferredQueue::<i32>::new(shard_count).unwrap();

  for i in 0..200 {
    let key = format!("user-{}", i);
    let index = queue.shard_index(key.as_str());
    assert!(index < shard_count);
    assert_eq!(index, queue.shard_index(key.as_str()));
    assert_eq!(index, queue.shard_index(&key.clone()));
    assert_eq!(index, other.shard_index(key.as_str()));
  }
}

#[test]
fn test_same_key_lands_in_same_shard_in_order() {
  let queue = ShardedDeferredQueue::new(8).unwrap();
  for value in ["HELLO", "WORLD", "FINALLY"] {
    queue.push("f1", value);
  }

  let shard = queue.shard_index("f1");
  assert_eq!(queue.shard_len(shard), 3);
  assert_eq!(queue.len(), QueueSize::Limited(3));
  assert_eq!(
    queue.shard_snapshot(shard).into_iter().collect::<Vec<_>>(),
    vec!["HELLO", "WORLD", "FINALLY"]
  );
}

#[test]
fn test_read_front_does_not_remove() {
  let queue = ShardedDeferredQueue::new(4).unwrap();
  queue.push("k", "A");
  queue.push("k", "B");

  let (value, token) = queue.read_front().unwrap();
  assert_eq!(value, "A");
  assert_eq!(token.shard(), queue.shard_index("k"));
  assert_eq!(token.count(), 1);
  assert_eq!(queue.len(), QueueSize::Limited(2));

  token.commit();
  assert_eq!(queue.len(), QueueSize::Limited(1));
  let (value, token) = queue.read_front().unwrap();
  assert_eq!(value, "B");
  queue.commit(token);
  assert!(queue.is_empty());
  assert!(queue.read_front().is_none());
}

#[test]
fn test_outstanding_read_blocks_shard_until_commit() {
  let queue = ShardedDeferredQueue::new(1).unwrap();
  queue.push("k", "A");
  queue.push("k", "B");

  let (first, token) = queue.read_front().unwrap();
  assert_eq!(first, "A");
  assert!(queue.is_read_outstanding(0));
  assert!(queue.read_front().is_none());
  assert!(queue.read_front_batch(None).is_none());

  token.commit();
  assert!(!queue.is_read_outstanding(0));
  let (second, token) = queue.read_front().unwrap();
  assert_eq!(second, "B");
  token.commit();
}

#[test]
fn test_busy_shard_is_skipped_for_next_one() {
  let queue = ShardedDeferredQueue::new(4).unwrap();
  let k0 = key_for_shard(&queue, 0);
  let k2 = key_for_shard(&queue, 2);
  queue.push(k0.as_str(), "zero");
  queue.push(k2.as_str(), "two");

  let (first, first_token) = queue.read_front().unwrap();
  assert_eq!(first, "zero");
  let (second, second_token) = queue.read_front().unwrap();
  assert_eq!(second, "two");
  assert_eq!(second_token.shard(), 2);
  assert!(queue.read_front().is_none());

  first_token.commit();
  second_token.commit();
  assert!(queue.is_empty());
}

#[test]
fn test_release_keeps_elements() {
  let queue = ShardedDeferredQueue::new(2).unwrap();
  queue.push("k", 7);

  let (_, token) = queue.read_front().unwrap();
  token.release();

  assert_eq!(queue.len(), QueueSize::Limited(1));
  let (value, token) = queue.read_front().unwrap();
  assert_eq!(value, 7);
  token.commit();
}

#[test]
fn test_dropped_token_starves_shard() {
  let queue = ShardedDeferredQueue::new(1).unwrap();
  queue.push("k", 1);
  queue.push("k", 2);

  let (_, token) = queue.read_front().unwrap();
  drop(token);

  assert!(queue.read_front().is_none());
  assert!(queue.is_read_outstanding(0));
  assert_eq!(queue.len(), QueueSize::Limited(2));
}

#[test]
fn test_batch_commit_leaves_remaining_front() {
  let queue = ShardedDeferredQueue::new(3).unwrap();
  for value in ["A", "B", "C"] {
    queue.push("k", value);
  }

  let (batch, token) = queue.read_front_batch(Some(2)).unwrap();
  assert_eq!(batch, vec!["B", "A"]);
  assert_eq!(token.count(), 2);
  token.commit();

  let shard = queue.shard_index("k");
  assert_eq!(queue.shard_snapshot(shard).into_iter().collect::<Vec<_>>(), vec!["C"]);
}

#[rstest]
#[case(None, vec![5, 4, 3, 2, 1])]
#[case(Some(10), vec![5, 4, 3, 2, 1])]
#[case(Some(1), vec![1])]
#[case(Some(3), vec![3, 2, 1])]
fn test_batch_is_newest_first(#[case] max_count: Option<usize>, #[case] expected: Vec<i32>) {
  let queue = ShardedDeferredQueue::new(2).unwrap();
  for value in 1..=5 {
    queue.push("batch", value);
  }

  let (batch, token) = queue.read_front_batch(max_count).unwrap();
  assert_eq!(batch, expected);
  assert_eq!(token.count(), expected.len());
  token.commit();
  assert_eq!(queue.len(), QueueSize::Limited(5 - expected.len()));
}

#[test]
fn test_zero_sized_batch_claims_nothing() {
  let queue = ShardedDeferredQueue::new(1).unwrap();
  queue.push("k", 1);

  assert!(queue.read_front_batch(Some(0)).is_none());
  assert!(!queue.is_read_outstanding(0));
  assert!(queue.read_front().is_some_and(|(_, token)| {
    token.commit();
    true
  }));
}

#[test]
fn test_empty_queue_reads_nothing() {
  let queue = ShardedDeferredQueue::<u8>::new(4).unwrap();
  assert!(queue.read_front().is_none());
  assert!(queue.read_front_batch(None).is_none());
  for shard in 0..queue.shard_count() {
    assert!(!queue.is_read_outstanding(shard));
  }
}

#[test]
#[should_panic(expected = "did not issue it")]
fn test_commit_against_foreign_queue_panics() {
  let issuer = ShardedDeferredQueue::new(1).unwrap();
  let other = ShardedDeferredQueue::new(1).unwrap();
  issuer.push("k", 1);
  let (_, token) = issuer.read_front().unwrap();
  other.commit(token);
}

#[test]
fn test_concurrent_readers_never_share_a_front() {
  const READERS: usize = 8;
  let queue = ShardedDeferredQueue::new(1).unwrap();
  queue.push("k", "A");
  queue.push("k", "B");

  let barrier = Barrier::new(READERS);
  let successes = AtomicUsize::new(0);
  let mut tokens = Vec::new();

  thread::scope(|s| {
    let handles = (0..READERS)
      .map(|_| {
        s.spawn(|| {
          barrier.wait();
          queue.read_front().map(|(value, token)| {
            successes.fetch_add(1, Ordering::SeqCst);
            (value, token)
          })
        })
      })
      .collect::<Vec<_>>();
    for handle in handles {
      if let Some(read) = handle.join().unwrap() {
        tokens.push(read);
      }
    }
  });

  assert_eq!(successes.load(Ordering::SeqCst), 1);
  let (value, token) = tokens.pop().unwrap();
  assert_eq!(value, "A");
  token.commit();
  assert_eq!(queue.read_front().map(|(value, token)| {
    token.commit();
    value
  }), Some("B"));
}

#[test]
fn test_concurrent_producers_and_consumers_drain_everything() {
  const PRODUCERS: usize = 4;
  const PER_PRODUCER: usize = 250;
  let queue = ShardedDeferredQueue::new(6).unwrap();
  let consumed = AtomicUsize::new(0);
  let sum = AtomicUsize::new(0);

  thread::scope(|s| {
    for p in 0..PRODUCERS {
      let queue = &queue;
      s.spawn(move || {
        for i in 0..PER_PRODUCER {
          queue.push(&format!("producer-{}-{}", p, i % 7), p * PER_PRODUCER + i);
        }
      });
    }
    for _ in 0..3 {
      s.spawn(|| {
        while consumed.load(Ordering::SeqCst) < PRODUCERS * PER_PRODUCER {
          match queue.read_front_batch(Some(5)) {
            Some((values, token)) => {
              sum.fetch_add(values.iter().sum::<usize>(), Ordering::SeqCst);
              consumed.fetch_add(values.len(), Ordering::SeqCst);
              token.commit();
            }
            None => thread::yield_now(),
          }
        }
      });
    }
  });

  let total = PRODUCERS * PER_PRODUCER;
  assert_eq!(consumed.load(Ordering::SeqCst), total);
  assert_eq!(sum.load(Ordering::SeqCst), total * (total - 1) / 2);
  assert!(queue.is_empty());
}
