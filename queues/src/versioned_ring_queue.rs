//! Fixed-capacity lock-free MPMC ring with per-slot versions.
//!
//! Every slot carries a version whose parity says what it is ready for: even
//! means "writable", odd means "readable". The logical index `i` maps to slot
//! `i & mask` and lap `i >> bits`; during lap `L` a slot goes
//! `2L -> 2L+1 -> 2L+2`. A push may claim index `i` only while its slot is at
//! `2L` and a pop only while it is at `2L+1`, so neither side can lap the
//! other. Push and pop never wait: they fail fast when the ring is full or
//! empty and retry only when they lose a compare-and-swap on their cursor.

use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use crate::collections::{BuildError, QueueBase, QueueError, QueueSize};

mod slot;

use self::slot::Slot;

pub struct VersionedRingQueue<V> {
  slots: Box<[Slot<V>]>,
  capacity_hint: usize,
  mask: usize,
  bits: u32,
  next_push_index: CachePadded<AtomicUsize>,
  next_pop_index: CachePadded<AtomicUsize>,
}

unsafe impl<V: Send> Send for VersionedRingQueue<V> {}
unsafe impl<V: Send> Sync for VersionedRingQueue<V> {}

impl<V> VersionedRingQueue<V> {
  /// Creates a ring with the smallest power-of-two capacity that is at least
  /// `capacity_hint` (and at least 2).
  pub fn new(capacity_hint: usize) -> Result<Self, BuildError> {
    let capacity = capacity_hint
      .max(2)
      .checked_next_power_of_two()
      .ok_or(BuildError::CapacityOverflow { hint: capacity_hint })?;
    let slots = (0..capacity).map(|_| Slot::new()).collect::<Vec<_>>().into_boxed_slice();
    let queue = Self {
      slots,
      capacity_hint,
      mask: capacity - 1,
      bits: capacity.trailing_zeros(),
      next_push_index: CachePadded::new(AtomicUsize::new(0)),
      next_pop_index: CachePadded::new(AtomicUsize::new(0)),
    };
    tracing::debug!("VersionedRingQueue::new: {}", queue.debug());
    Ok(queue)
  }

  pub fn capacity(&self) -> usize {
    self.slots.len()
  }

  pub fn capacity_hint(&self) -> usize {
    self.capacity_hint
  }

  pub fn mask(&self) -> usize {
    self.mask
  }

  pub fn bits(&self) -> u32 {
    self.bits
  }

  /// Approximate number of resident elements, counting claimed slots whose
  /// value is still being written or read.
  pub fn size(&self) -> usize {
    let popped = self.next_pop_index.load(Ordering::Acquire);
    let pushed = self.next_push_index.load(Ordering::Acquire);
    pushed.wrapping_sub(popped).min(self.capacity())
  }

  /// Layout summary: hint (also as 8-bit binary), capacity, mask and bit width.
  pub fn debug(&self) -> String {
    format!(
      "hint:{}\t{:08b}\tcapacity:{}\tmask:{}\tbits:{}",
      self.capacity_hint,
      self.capacity_hint & 0xff,
      self.capacity(),
      self.mask,
      self.bits
    )
  }

  fn push_version(&self, index: usize) -> usize {
    (index >> self.bits) << 1
  }

  /// Inserts `value`, or hands it back in [`QueueError::Full`] when the slot
  /// for the next index has not been released by its previous lap's pop.
  pub fn push(&self, value: V) -> Result<(), QueueError<V>> {
    let mut index = self.next_push_index.load(Ordering::Acquire);
    loop {
      let slot = &self.slots[index & self.mask];
      let expected = self.push_version(index);
      let current = slot.version.load(Ordering::Acquire);
      if current < expected || current == usize::MAX {
        return Err(QueueError::Full(value));
      }
      // A version above `expected` means another producer already took this
      // index; the exchange below fails and reloads it.
      match self.next_push_index.compare_exchange_weak(
        index,
        index.wrapping_add(1),
        Ordering::AcqRel,
        Ordering::Acquire,
      ) {
        Ok(_) => {
          unsafe { slot.write(value) };
          slot.version.store(expected.wrapping_add(1), Ordering::Release);
          return Ok(());
        }
        Err(actual) => index = actual,
      }
    }
  }

  /// Removes the oldest published element. `None` when the slot at the next
  /// index has not been published yet.
  pub fn pop(&self) -> Option<V> {
    let mut index = self.next_pop_index.load(Ordering::Acquire);
    loop {
      let slot = &self.slots[index & self.mask];
      let expected = self.push_version(index).wrapping_add(1);
      let current = slot.version.load(Ordering::Acquire);
      if current < expected {
        return None;
      }
      match self.next_pop_index.compare_exchange_weak(
        index,
        index.wrapping_add(1),
        Ordering::AcqRel,
        Ordering::Acquire,
      ) {
        Ok(_) => {
          let value = unsafe { slot.read() };
          slot.version.store(expected.wrapping_add(1), Ordering::Release);
          return Some(value);
        }
        Err(actual) => index = actual,
      }
    }
  }
}

impl<V> Drop for VersionedRingQueue<V> {
  fn drop(&mut self) {
    for slot in self.slots.iter_mut() {
      slot.drop_if_readable();
    }
  }
}

impl<V> Debug for VersionedRingQueue<V> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("VersionedRingQueue")
      .field("capacity_hint", &self.capacity_hint)
      .field("capacity", &self.capacity())
      .field("mask", &self.mask)
      .field("bits", &self.bits)
      .field("size", &self.size())
      .finish()
  }
}

impl<V: Send> QueueBase<V> for VersionedRingQueue<V> {
  fn len(&self) -> QueueSize {
    QueueSize::limited(self.size())
  }

  fn capacity(&self) -> QueueSize {
    QueueSize::limited(self.slots.len())
  }
}

static_assertions::assert_impl_all!(VersionedRingQueue<String>: Send, Sync);
static_assertions::assert_not_impl_any!(VersionedRingQueue<std::rc::Rc<u8>>: Send, Sync);

#[cfg(test)]
mod tests;
