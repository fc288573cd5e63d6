//! Multi-producer queue drained in snapshots by a dedicated worker thread.
//!
//! Producers insert with a single atomic exchange on the list head and then
//! back-fill the two links of the node they just added. The worker is the only
//! thread that reads the tail or frees nodes: whenever the queue is non-empty
//! it detaches everything pushed so far in one step, hands the detached range
//! to the batch callback as a [`SnapshotIter`] (newest first), and frees it
//! once the callback returns.
//!
//! ```text
//!   head ──next──> n3 ──next──> n2 ──next──> n1 ──next──> tail (sentinel)
//!   (newest)     <──prev──    <──prev──    <──prev──
//! ```

use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, Thread};
use std::time::{Duration, Instant};

use crossbeam_utils::{Backoff, CachePadded};
use parking_lot::Mutex;

use crate::collections::{BuildError, QueueBase, QueueError, QueueSize};

mod config;
mod config_option;
mod node;
mod snapshot_iter;

pub use self::config::{
  IdleStrategy, SnapshotBatchQueueConfig, DEFAULT_CAPACITY, DEFAULT_DRAIN_POLL_INTERVAL, DEFAULT_WORKER_NAME,
};
pub use self::config_option::ConfigOption;
pub use self::snapshot_iter::SnapshotIter;
use self::node::{destroy_range, wait_for_link, Node};

type BatchCallback<V> = Box<dyn for<'a> FnMut(&mut SnapshotIter<'a, V>) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum QueueState {
  Running = 0,
  Stopping = 1,
  Stopped = 2,
}

impl From<u8> for QueueState {
  fn from(value: u8) -> Self {
    match value {
      0 => QueueState::Running,
      1 => QueueState::Stopping,
      _ => QueueState::Stopped,
    }
  }
}

/// Outcome of [`SnapshotBatchQueue::graceful_stop_and_join`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
  /// Elements freed without ever reaching the callback.
  pub discarded: usize,
}

impl ShutdownReport {
  pub fn delivered_all(&self) -> bool {
    self.discarded == 0
  }
}

struct Inner<V> {
  head: CachePadded<AtomicPtr<Node<V>>>,
  /// The sentinel. Its `prev` is the oldest undelivered node.
  tail: NonNull<Node<V>>,
  len: CachePadded<AtomicUsize>,
  /// Producers between their state check and the end of their link writes.
  pushers: AtomicUsize,
  state: AtomicU8,
  sleeping: AtomicBool,
  worker_thread: OnceLock<Thread>,
  config: SnapshotBatchQueueConfig,
  _marker: PhantomData<V>,
}

// A value is touched by exactly one thread at a time: its producer until the
// head exchange publishes it, then the worker.
unsafe impl<V: Send> Send for Inner<V> {}
unsafe impl<V: Send> Sync for Inner<V> {}

impl<V> Inner<V> {
  fn new(config: SnapshotBatchQueueConfig) -> Self {
    let tail = Node::sentinel();
    Self {
      head: CachePadded::new(AtomicPtr::new(tail.as_ptr())),
      tail,
      len: CachePadded::new(AtomicUsize::new(0)),
      pushers: AtomicUsize::new(0),
      state: AtomicU8::new(QueueState::Running as u8),
      sleeping: AtomicBool::new(false),
      worker_thread: OnceLock::new(),
      config,
      _marker: PhantomData,
    }
  }

  fn state(&self) -> QueueState {
    QueueState::from(self.state.load(Ordering::SeqCst))
  }

  fn is_running(&self) -> bool {
    self.state() == QueueState::Running
  }

  fn len(&self) -> usize {
    self.len.load(Ordering::Acquire)
  }

  fn push(&self, value: V) -> Result<(), QueueError<V>> {
    self.pushers.fetch_add(1, Ordering::SeqCst);
    let result = self.push_registered(value);
    self.pushers.fetch_sub(1, Ordering::Release);
    result
  }

  fn push_registered(&self, value: V) -> Result<(), QueueError<V>> {
    if !self.is_running() {
      return Err(QueueError::Closed(value));
    }
    let capacity = self.config.capacity;
    let reserved = self
      .len
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |len| (len < capacity).then_some(len + 1));
    if reserved.is_err() {
      tracing::trace!("SnapshotBatchQueue::push: rejected, capacity = {}", capacity);
      return Err(QueueError::Full(value));
    }

    let node = Node::data(value);
    let old_head = self.head.swap(node.as_ptr(), Ordering::AcqRel);
    // Between the exchange and these two stores the list is broken; readers
    // of either link wait for it. `prev` must be written last.
    unsafe {
      node.as_ref().next.store(old_head, Ordering::Release);
      (*old_head).prev.store(node.as_ptr(), Ordering::Release);
    }

    if self.sleeping.load(Ordering::SeqCst) {
      self.wake_worker();
    }
    Ok(())
  }

  fn wake_worker(&self) {
    if let Some(worker) = self.worker_thread.get() {
      worker.unpark();
    }
  }

  /// Blocks until there is something to capture. Returns false once the queue
  /// stopped running.
  fn wait_for_work(&self) -> bool {
    let backoff = Backoff::new();
    while self.len() == 0 && self.is_running() {
      if !backoff.is_completed() {
        backoff.snooze();
        continue;
      }
      match self.config.idle_strategy {
        IdleStrategy::Yield => thread::yield_now(),
        IdleStrategy::Park(timeout) => {
          self.sleeping.store(true, Ordering::SeqCst);
          if self.len.load(Ordering::SeqCst) == 0 && self.is_running() {
            thread::park_timeout(timeout);
          }
          self.sleeping.store(false, Ordering::SeqCst);
        }
      }
    }
    self.is_running()
  }

  /// Detaches every node pushed so far. Returns `(newest, oldest)`.
  ///
  /// # Safety
  ///
  /// Worker thread only, and only while the live count is non-zero.
  unsafe fn capture_snapshot(&self) -> (NonNull<Node<V>>, NonNull<Node<V>>) {
    let tail = self.tail.as_ref();
    // A counted node may not be linked yet; its producer is about to.
    let snap_end = wait_for_link(&tail.prev);
    tail.prev.store(ptr::null_mut(), Ordering::Relaxed);
    let snap_head = self.head.swap(self.tail.as_ptr(), Ordering::AcqRel);
    let snap_head = NonNull::new_unchecked(snap_head);
    if snap_head.as_ref().is_sentinel() {
      panic!("snapshot captured the sentinel as head while its end was linked");
    }
    (snap_head, snap_end)
  }

  /// Frees everything left in `[head, tail)`.
  ///
  /// # Safety
  ///
  /// The worker must have exited and no producer may be registered.
  unsafe fn discard_pending(&self) -> usize {
    let mut cur = self.tail.as_ref().prev.swap(ptr::null_mut(), Ordering::AcqRel);
    let mut discarded = 0;
    while let Some(node) = NonNull::new(cur) {
      cur = node.as_ref().prev.load(Ordering::Acquire);
      drop(Box::from_raw(node.as_ptr()));
      discarded += 1;
    }
    self.head.store(self.tail.as_ptr(), Ordering::Release);
    if discarded > 0 {
      self.len.fetch_sub(discarded, Ordering::AcqRel);
    }
    discarded
  }
}

impl<V> Drop for Inner<V> {
  fn drop(&mut self) {
    unsafe {
      self.discard_pending();
      drop(Box::from_raw(self.tail.as_ptr()));
    }
  }
}

/// Frees a captured snapshot when dropped, including while a panicking
/// callback unwinds the worker.
struct SnapshotGuard<'a, V> {
  inner: &'a Inner<V>,
  head: NonNull<Node<V>>,
  end: NonNull<Node<V>>,
}

impl<V> Drop for SnapshotGuard<'_, V> {
  fn drop(&mut self) {
    let freed = unsafe { destroy_range(self.head, self.end) };
    self.inner.len.fetch_sub(freed, Ordering::AcqRel);
  }
}

fn run_worker<V>(inner: Arc<Inner<V>>, mut callback: BatchCallback<V>) {
  let _ = inner.worker_thread.set(thread::current());
  tracing::debug!("SnapshotBatchQueue worker started: capacity = {}", inner.config.capacity);
  let mut batches = 0usize;
  while inner.wait_for_work() {
    let (head, end) = unsafe { inner.capture_snapshot() };
    let _guard = SnapshotGuard {
      inner: &inner,
      head,
      end,
    };
    let mut iter = SnapshotIter::new(head, end);
    callback(&mut iter);
    batches += 1;
  }
  tracing::debug!("SnapshotBatchQueue worker exited: batches = {}", batches);
}

/// Unbounded-by-design, capacity-checked queue with a single draining worker.
///
/// Starts `Running` and spawns its worker on construction. Call
/// [`graceful_stop_and_join`](Self::graceful_stop_and_join) to shut down;
/// dropping the queue without doing so stops it immediately and discards
/// whatever was not delivered.
pub struct SnapshotBatchQueue<V> {
  inner: Arc<Inner<V>>,
  worker: Mutex<Option<JoinHandle<()>>>,
}

impl<V: Send + 'static> SnapshotBatchQueue<V> {
  pub fn new<F>(capacity: usize, callback: F) -> Result<Self, BuildError>
  where
    F: for<'a> FnMut(&mut SnapshotIter<'a, V>) + Send + 'static, {
    Self::with_config(SnapshotBatchQueueConfig::from([ConfigOption::with_capacity(capacity)]), callback)
  }

  pub fn with_config<F>(config: SnapshotBatchQueueConfig, callback: F) -> Result<Self, BuildError>
  where
    F: for<'a> FnMut(&mut SnapshotIter<'a, V>) + Send + 'static, {
    if config.capacity == 0 {
      return Err(BuildError::ZeroCapacity);
    }
    let worker_name = config.worker_name.clone();
    let inner = Arc::new(Inner::new(config));
    let worker_inner = inner.clone();
    let callback: BatchCallback<V> = Box::new(callback);
    let handle = thread::Builder::new()
      .name(worker_name)
      .spawn(move || run_worker(worker_inner, callback))?;
    Ok(Self {
      inner,
      worker: Mutex::new(Some(handle)),
    })
  }
}

impl<V> SnapshotBatchQueue<V> {
  /// Adds `value` without blocking.
  ///
  /// Fails with [`QueueError::Full`] when the live count is at capacity and
  /// with [`QueueError::Closed`] once shutdown has begun.
  pub fn push(&self, value: V) -> Result<(), QueueError<V>> {
    self.inner.push(value)
  }

  /// Number of live elements, including the batch currently being processed.
  pub fn size(&self) -> usize {
    self.inner.len()
  }

  pub fn capacity(&self) -> usize {
    self.inner.config.capacity
  }

  pub fn started(&self) -> bool {
    self.inner.is_running()
  }

  pub fn state(&self) -> QueueState {
    self.inner.state()
  }

  pub fn config(&self) -> &SnapshotBatchQueueConfig {
    &self.inner.config
  }

  /// Waits for the queue to drain, then stops and joins the worker.
  ///
  /// The live count is polled every `drain_poll_interval` until it reaches
  /// zero or `timeout` elapses (`None` waits forever). Elements still queued
  /// after that are freed without being delivered. Calling this again after
  /// it returned does nothing.
  pub fn graceful_stop_and_join(&self, timeout: Option<Duration>) -> ShutdownReport {
    let Some(handle) = self.worker.lock().take() else {
      return ShutdownReport::default();
    };

    self.wait_for_drain(&handle, timeout);

    self.inner.state.store(QueueState::Stopping as u8, Ordering::SeqCst);
    self.inner.wake_worker();
    let backoff = Backoff::new();
    while self.inner.pushers.load(Ordering::SeqCst) > 0 {
      backoff.snooze();
    }

    if handle.join().is_err() {
      tracing::error!("SnapshotBatchQueue worker panicked");
    }

    let discarded = unsafe { self.inner.discard_pending() };
    self.inner.state.store(QueueState::Stopped as u8, Ordering::SeqCst);
    if discarded > 0 {
      tracing::warn!("SnapshotBatchQueue stopped: discarded {} undelivered elements", discarded);
    } else {
      tracing::debug!("SnapshotBatchQueue stopped");
    }
    ShutdownReport { discarded }
  }

  fn wait_for_drain(&self, handle: &JoinHandle<()>, timeout: Option<Duration>) {
    let started_at = Instant::now();
    let interval = self.inner.config.drain_poll_interval;
    while self.size() > 0 {
      if handle.is_finished() {
        tracing::warn!("SnapshotBatchQueue worker exited before the queue drained");
        return;
      }
      let sleep_for = match timeout {
        Some(timeout) => {
          let elapsed = started_at.elapsed();
          if elapsed >= timeout {
            tracing::debug!(
              "SnapshotBatchQueue drain timed out: timeout = {:?}, remaining = {}",
              timeout,
              self.size()
            );
            return;
          }
          interval.min(timeout - elapsed)
        }
        None => interval,
      };
      thread::sleep(sleep_for);
    }
  }
}

impl<V> Drop for SnapshotBatchQueue<V> {
  fn drop(&mut self) {
    if self.worker.get_mut().is_some() {
      self.graceful_stop_and_join(Some(Duration::ZERO));
    }
  }
}

impl<V> Debug for SnapshotBatchQueue<V> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SnapshotBatchQueue")
      .field("state", &self.state())
      .field("size", &self.size())
      .field("capacity", &self.capacity())
      .finish()
  }
}

impl<V: Send> QueueBase<V> for SnapshotBatchQueue<V> {
  fn len(&self) -> QueueSize {
    QueueSize::limited(self.size())
  }

  fn capacity(&self) -> QueueSize {
    QueueSize::limited(self.inner.config.capacity)
  }
}

static_assertions::assert_impl_all!(SnapshotBatchQueue<String>: Send, Sync);
static_assertions::assert_not_impl_any!(SnapshotBatchQueue<std::rc::Rc<u8>>: Send, Sync);
