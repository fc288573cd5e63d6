use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::ptr::NonNull;

use super::node::{wait_for_link, Node, NodeKind};

/// Cursor over one captured snapshot, newest element first.
///
/// Handed to the batch callback by the worker. The nodes are freed as soon as
/// the callback returns, so references obtained from the iterator cannot
/// outlive the call.
pub struct SnapshotIter<'a, V> {
  cur: NonNull<Node<V>>,
  last: NonNull<Node<V>>,
  _marker: PhantomData<&'a V>,
}

impl<'a, V> SnapshotIter<'a, V> {
  /// `head` is the most recently pushed node of the snapshot, `last` the oldest.
  pub(crate) fn new(head: NonNull<Node<V>>, last: NonNull<Node<V>>) -> Self {
    Self {
      cur: head,
      last,
      _marker: PhantomData,
    }
  }

  /// True once the oldest node of the snapshot has been visited.
  pub fn is_end(&self) -> bool {
    unsafe { self.last.as_ref() }.visited.get()
  }

  /// Moves to the next older element. A no-op at the end.
  pub fn advance(&mut self) {
    if self.is_end() {
      return;
    }
    let cur = unsafe { self.cur.as_ref() };
    cur.visited.set(true);
    if self.cur == self.last {
      return;
    }
    self.cur = wait_for_link(&cur.next);
  }

  /// The element under the cursor.
  ///
  /// # Panics
  ///
  /// Panics when called after the end has been reached.
  pub fn current(&self) -> &'a V {
    if self.is_end() {
      panic!("snapshot iterator dereferenced past its end");
    }
    let node: &'a Node<V> = unsafe { &*self.cur.as_ptr() };
    match &node.kind {
      NodeKind::Data(value) => value,
      NodeKind::Sentinel => panic!("snapshot iterator reached the sentinel node"),
    }
  }
}

impl<'a, V> Iterator for SnapshotIter<'a, V> {
  type Item = &'a V;

  fn next(&mut self) -> Option<Self::Item> {
    if self.is_end() {
      return None;
    }
    let value = self.current();
    self.advance();
    Some(value)
  }
}

impl<V> Debug for SnapshotIter<'_, V> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SnapshotIter").field("is_end", &self.is_end()).finish()
  }
}
