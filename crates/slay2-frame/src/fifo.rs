//! Plain bounded circular byte queue.

use crate::wire::FIFO_CAPACITY;

/// Fixed-capacity FIFO of raw bytes.
///
/// Used as the per-channel outbound queue and by the loopback test
/// transports. Push reports overflow through its return value; nothing here
/// ever blocks.
pub struct ByteFifo {
    buf: Box<[u8; FIFO_CAPACITY]>,
    read: usize,
    write: usize,
    count: usize,
}

impl ByteFifo {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Box::new([0; FIFO_CAPACITY]),
            read: 0,
            write: 0,
            count: 0,
        }
    }

    /// Number of queued bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Remaining room.
    #[must_use]
    pub fn space(&self) -> usize {
        FIFO_CAPACITY - self.count
    }

    /// Total capacity.
    #[must_use]
    pub const fn capacity() -> usize {
        FIFO_CAPACITY
    }

    /// Append one byte. Returns false when full.
    pub fn push(&mut self, c: u8) -> bool {
        if self.count >= FIFO_CAPACITY {
            return false;
        }
        self.buf[self.write] = c;
        self.write += 1;
        if self.write >= FIFO_CAPACITY {
            self.write = 0;
        }
        self.count += 1;
        true
    }

    /// Remove and return the oldest byte.
    pub fn pop(&mut self) -> Option<u8> {
        if self.count == 0 {
            return None;
        }
        let c = self.buf[self.read];
        self.read += 1;
        if self.read >= FIFO_CAPACITY {
            self.read = 0;
        }
        self.count -= 1;
        Some(c)
    }

    /// Discard everything.
    pub fn flush(&mut self) {
        self.read = 0;
        self.write = 0;
        self.count = 0;
    }
}

impl Default for ByteFifo {
    fn default() -> Self {
        Self::new()
    }
}
