use std::thread;

use clap::Parser;
use concurrent_queues_rs::ShardedDeferredQueue;
use tracing_subscriber::EnvFilter;

/// Two writers push under their own keys while two readers peek and commit.
#[derive(Parser, Debug)]
struct Args {
  #[arg(long, default_value_t = 10)]
  shards: usize,
  #[arg(long, default_value_t = 3)]
  single_reads: usize,
  /// Upper bound for the batch read; all available when omitted.
  #[arg(long)]
  batch: Option<usize>,
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();
  let args = Args::parse();
  let queue = ShardedDeferredQueue::new(args.shards).expect("invalid shard count");

  thread::scope(|s| {
    s.spawn(|| {
      for word in ["HELLO", "WORLD", "HELLO", "FINALLY", "END", "WWW", "XXX", "YYY", "ZZZ"] {
        queue.push("f1", word.to_string());
      }
    });
    s.spawn(|| {
      for word in ["AAA", "BBB", "CCC", "DDD", "EEE"] {
        queue.push("f2", word.to_string());
      }
    });
    for reader in 0..2 {
      let queue = &queue;
      let args = &args;
      s.spawn(move || {
        for _ in 0..args.single_reads {
          if let Some((value, token)) = queue.read_front() {
            println!("reader {}: {}", reader, value);
            token.commit();
          }
        }
        if let Some((values, token)) = queue.read_front_batch(args.batch) {
          println!("reader {} batch: {:?}", reader, values);
          token.commit();
        }
      });
    }
  });
}
