use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Latest-value register: two slots plus an atomic active index.
///
/// Writers fill the inactive slot and publish it with a release store;
/// readers acquire-load the index and copy the active slot without ever
/// blocking. Intermediate values are dropped, only the most recent write
/// is observable.
pub struct DoubleBuffer<T> {
    slots: [UnsafeCell<T>; 2],
    active: AtomicUsize,
    writer: Mutex<()>,
}

// Safety: writes are serialized by the writer mutex and always target the
// slot the active index steers readers away from; readers only copy out of
// the active slot.
unsafe impl<T: Copy + Send> Sync for DoubleBuffer<T> {}

impl<T: Copy + Default> DoubleBuffer<T> {
    pub fn new() -> Self {
        Self {
            slots: [UnsafeCell::new(T::default()), UnsafeCell::new(T::default())],
            active: AtomicUsize::new(0),
            writer: Mutex::new(()),
        }
    }

    pub fn write(&self, value: T) {
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let next = 1 - self.active.load(Ordering::Relaxed);
        unsafe { self.slots[next].get().write(value) };
        self.active.store(next, Ordering::Release);
    }

    pub fn read(&self) -> T {
        let current = self.active.load(Ordering::Acquire);
        unsafe { *self.slots[current].get() }
    }
}

impl<T: Copy + Default> Default for DoubleBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn starts_at_default() {
        let buffer: DoubleBuffer<i64> = DoubleBuffer::new();
        assert_eq!(buffer.read(), 0);
    }

    #[test]
    fn read_returns_last_write() {
        let buffer = DoubleBuffer::new();
        buffer.write(1);
        assert_eq!(buffer.read(), 1);
        buffer.write(2);
        buffer.write(3);
        assert_eq!(buffer.read(), 3);
    }

    #[test]
    fn reader_thread_sees_progress() {
        let buffer = Arc::new(DoubleBuffer::new());
        let writer = Arc::clone(&buffer);
        let handle = std::thread::spawn(move || {
            for i in 1..=1000u64 {
                writer.write(i);
            }
        });

        let mut last = 0;
        while last < 1000 {
            let seen = buffer.read();
            // Values are published in order, never backwards.
            assert!(seen >= last);
            last = seen;
        }
        handle.join().expect("writer thread");
    }
}
