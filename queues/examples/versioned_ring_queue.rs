use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use clap::Parser;
use concurrent_queues_rs::VersionedRingQueue;
use tracing_subscriber::EnvFilter;

/// Producers and consumers hammer one ring; prints the layout and totals.
#[derive(Parser, Debug)]
struct Args {
  #[arg(long, default_value_t = 5)]
  capacity_hint: usize,
  #[arg(long, default_value_t = 2)]
  producers: usize,
  #[arg(long, default_value_t = 2)]
  consumers: usize,
  #[arg(long, default_value_t = 10_000)]
  per_producer: usize,
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();
  let args = Args::parse();
  let queue = VersionedRingQueue::new(args.capacity_hint).expect("capacity hint too large");
  println!("{}", queue.debug());

  let total = args.producers * args.per_producer;
  let popped = AtomicUsize::new(0);
  let full_hits = AtomicUsize::new(0);

  thread::scope(|s| {
    for p in 0..args.producers {
      let queue = &queue;
      let full_hits = &full_hits;
      let per_producer = args.per_producer;
      s.spawn(move || {
        for i in 0..per_producer {
          let mut value = p * per_producer + i;
          while let Err(err) = queue.push(value) {
            full_hits.fetch_add(1, Ordering::Relaxed);
            value = err.into_inner();
            thread::yield_now();
          }
        }
      });
    }
    for _ in 0..args.consumers {
      s.spawn(|| {
        while popped.load(Ordering::Relaxed) < total {
          if queue.pop().is_some() {
            popped.fetch_add(1, Ordering::Relaxed);
          } else {
            thread::yield_now();
          }
        }
      });
    }
  });

  println!(
    "popped {} of {}, push retries on full ring: {}",
    popped.load(Ordering::Relaxed),
    total,
    full_hits.load(Ordering::Relaxed)
  );
}
