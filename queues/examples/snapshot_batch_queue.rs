use std::thread;

use clap::Parser;
use concurrent_queues_rs::{SnapshotBatchQueue, SnapshotIter};
use tracing_subscriber::EnvFilter;

/// Several writers post into one queue; the worker prints every snapshot.
#[derive(Parser, Debug)]
struct Args {
  #[arg(long, default_value_t = 500)]
  capacity: usize,
  #[arg(long, default_value_t = 5)]
  writers: usize,
  #[arg(long, default_value_t = 100)]
  per_writer: usize,
  /// Drain timeout in milliseconds; waits for everything when omitted.
  #[arg(long)]
  timeout_ms: Option<u64>,
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();
  let args = Args::parse();

  let queue = SnapshotBatchQueue::new(args.capacity, |iter: &mut SnapshotIter<'_, String>| {
    let batch = iter.map(String::as_str).collect::<Vec<_>>();
    println!(">>>>>>batch_read>>>>>> {}", batch.join(" "));
  })
  .expect("failed to start snapshot queue");

  thread::scope(|s| {
    for writer in 0..args.writers {
      let queue = &queue;
      let per_writer = args.per_writer;
      s.spawn(move || {
        let rejected = (0..per_writer)
          .filter(|i| queue.push(format!("w{}:{}", writer + 1, i)).is_err())
          .count();
        if rejected > 0 {
          tracing::warn!("writer {} had {} pushes rejected", writer + 1, rejected);
        }
      });
    }
  });

  let report = queue.graceful_stop_and_join(args.timeout_ms.map(std::time::Duration::from_millis));
  println!("stopped, discarded {}", report.discarded);
}
