use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::AtomicUsize;

/// One ring cell. Even `version`: empty and writable. Odd: holds a value.
pub(crate) struct Slot<V> {
  pub(crate) version: AtomicUsize,
  value: UnsafeCell<MaybeUninit<V>>,
}

impl<V> Slot<V> {
  pub(crate) fn new() -> Self {
    Self {
      version: AtomicUsize::new(0),
      value: UnsafeCell::new(MaybeUninit::uninit()),
    }
  }

  /// # Safety
  ///
  /// The caller must have claimed this slot for writing and the slot must be
  /// empty.
  pub(crate) unsafe fn write(&self, value: V) {
    (*self.value.get()).write(value);
  }

  /// # Safety
  ///
  /// The caller must have claimed this slot for reading and the slot must
  /// hold a published value.
  pub(crate) unsafe fn read(&self) -> V {
    (*self.value.get()).assume_init_read()
  }

  pub(crate) fn drop_if_readable(&mut self) {
    let version = self.version.get_mut();
    if *version & 1 == 1 {
      *version = version.wrapping_add(1);
      unsafe { self.value.get_mut().assume_init_drop() };
    }
  }
}
