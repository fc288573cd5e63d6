use std::cell::Cell;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

use crossbeam_utils::Backoff;

pub(crate) enum NodeKind<V> {
  /// The fixed end marker of the list. Carries no value.
  Sentinel,
  Data(V),
}

/// A list node.
///
/// `next` points to the node pushed just before this one (towards the
/// sentinel), `prev` to the node pushed just after it (towards the head).
/// Both links are written by producers after the head exchange, so a reader
/// may briefly observe them as null.
pub(crate) struct Node<V> {
  pub(crate) kind: NodeKind<V>,
  /// Set by the iterator once the node has been handed out. Worker-only.
  pub(crate) visited: Cell<bool>,
  pub(crate) next: AtomicPtr<Node<V>>,
  pub(crate) prev: AtomicPtr<Node<V>>,
}

impl<V> Node<V> {
  pub(crate) fn sentinel() -> NonNull<Node<V>> {
    Self::alloc(NodeKind::Sentinel)
  }

  pub(crate) fn data(value: V) -> NonNull<Node<V>> {
    Self::alloc(NodeKind::Data(value))
  }

  fn alloc(kind: NodeKind<V>) -> NonNull<Node<V>> {
    let node = Box::new(Node {
      kind,
      visited: Cell::new(false),
      next: AtomicPtr::new(ptr::null_mut()),
      prev: AtomicPtr::new(ptr::null_mut()),
    });
    NonNull::from(Box::leak(node))
  }

  pub(crate) fn is_sentinel(&self) -> bool {
    matches!(self.kind, NodeKind::Sentinel)
  }
}

/// Spins until a link written by a concurrent producer becomes visible.
///
/// Only call this for links that the snapshot protocol guarantees will be
/// filled in: the producer that owns the write has already exchanged the head.
pub(crate) fn wait_for_link<V>(link: &AtomicPtr<Node<V>>) -> NonNull<Node<V>> {
  let backoff = Backoff::new();
  loop {
    if let Some(node) = NonNull::new(link.load(Ordering::Acquire)) {
      return node;
    }
    backoff.snooze();
  }
}

/// Frees every node of a captured snapshot, walking from `end` (oldest) back
/// to `head` (newest). Returns the number of nodes freed.
///
/// # Safety
///
/// `[head, end]` must be a snapshot detached by the worker: no producer can
/// reach `head` any more and nothing else frees these nodes.
pub(crate) unsafe fn destroy_range<V>(head: NonNull<Node<V>>, end: NonNull<Node<V>>) -> usize {
  let mut cur = end;
  let mut freed = 0;
  while cur != head {
    // The newer node's producer fills in `prev` last, so once it is visible
    // that producer is done touching `cur`.
    let newer = wait_for_link(&cur.as_ref().prev);
    drop(Box::from_raw(cur.as_ptr()));
    freed += 1;
    cur = newer;
  }
  drop(Box::from_raw(head.as_ptr()));
  freed + 1
}
