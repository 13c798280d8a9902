//! Bit-packing encoders for ACK and DATA frames.
//!
//! Both encoders share the same scheme: each pushed octet is spread over the
//! current wire byte and the start of the next one, with the tag bits forced
//! on. A sub-byte step counter tracks the bit offset inside the packing group
//! (4 wire bytes per 3 octets for ACK, 8 per 7 for DATA). Slot 0 of the
//! backing array is scratch so the first partial write has a byte to land in;
//! [`bytes`](AckEncoder::bytes) skips it.

use crate::wire::{ACK_BUFFER, DATA_WIRE_BUFFER, END_OF_ACK, END_OF_DATA};
use crate::{crc_step, CRC_SEED};

/// Encodes an ACK frame into the `01AAAAAA` wire alphabet (6 bits per byte).
#[derive(Clone)]
pub struct AckEncoder {
    buf: [u8; ACK_BUFFER],
    count: usize,
    step: u8,
    crc: u32,
}

impl AckEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: [0; ACK_BUFFER],
            count: 1,
            step: 0,
            crc: CRC_SEED,
        }
    }

    /// Discard all content and restart the running CRC.
    pub fn flush(&mut self) {
        self.count = 1;
        self.step = 0;
        self.crc = CRC_SEED;
    }

    /// Push one octet. Returns false (no effect) when the buffer is full.
    pub fn push(&mut self, c: u8) -> bool {
        if self.count + 1 >= self.buf.len() {
            return false;
        }
        self.crc = crc_step(self.crc, c);
        if self.step == 0 {
            self.buf[self.count] = 0;
        }
        let shift = 2 * self.step;
        self.buf[self.count] |= 0x40 | ((c << shift) & 0x3F);
        self.buf[self.count + 1] = 0x40 | (c >> (6 - shift));
        self.count += 1;
        self.step += 1;
        if self.step >= 3 {
            self.step = 0;
            self.count += 1;
        }
        true
    }

    /// Push a 32-bit value as four octets, most significant first.
    pub fn push_big32(&mut self, value: u32) -> bool {
        let mut ok = true;
        for byte in value.to_be_bytes() {
            ok &= self.push(byte);
        }
        ok
    }

    /// Round up to the next byte boundary and append the terminator.
    pub fn push_end(&mut self) -> bool {
        let count = self.count + usize::from(self.step != 0);
        if count < self.buf.len() {
            self.buf[count] = END_OF_ACK;
            self.count = count + 1;
            self.step = 0;
            return true;
        }
        false
    }

    /// The encoded wire bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buf[1..self.count]
    }

    /// Number of complete wire bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Running CRC32 over the octets pushed so far.
    #[must_use]
    pub fn crc32(&self) -> u32 {
        self.crc
    }
}

impl Default for AckEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes a DATA frame into the `1DDDDDDD` wire alphabet (7 bits per byte).
#[derive(Clone)]
pub struct DataEncoder {
    buf: [u8; DATA_WIRE_BUFFER],
    count: usize,
    step: u8,
    crc: u32,
}

impl DataEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: [0; DATA_WIRE_BUFFER],
            count: 1,
            step: 0,
            crc: CRC_SEED,
        }
    }

    /// Discard all content and restart the running CRC.
    pub fn flush(&mut self) {
        self.count = 1;
        self.step = 0;
        self.crc = CRC_SEED;
    }

    /// Push one octet. Returns false (no effect) when the buffer is full.
    pub fn push(&mut self, c: u8) -> bool {
        if self.count + 1 >= self.buf.len() {
            return false;
        }
        self.crc = crc_step(self.crc, c);
        if self.step == 0 {
            self.buf[self.count] = 0;
        }
        self.buf[self.count] |= 0x80 | ((c << self.step) & 0x7F);
        self.buf[self.count + 1] = 0x80 | (c >> (7 - self.step));
        self.count += 1;
        self.step += 1;
        if self.step >= 7 {
            self.step = 0;
            self.count += 1;
        }
        true
    }

    /// Push a 32-bit value as four octets, most significant first.
    pub fn push_big32(&mut self, value: u32) -> bool {
        let mut ok = true;
        for byte in value.to_be_bytes() {
            ok &= self.push(byte);
        }
        ok
    }

    /// Round up to the next byte boundary and append the terminator.
    pub fn push_end(&mut self) -> bool {
        let count = self.count + usize::from(self.step != 0);
        if count < self.buf.len() {
            self.buf[count] = END_OF_DATA;
            self.count = count + 1;
            self.step = 0;
            return true;
        }
        false
    }

    /// The encoded wire bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buf[1..self.count]
    }

    /// Number of complete wire bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Running CRC32 over the octets pushed so far.
    #[must_use]
    pub fn crc32(&self) -> u32 {
        self.crc
    }
}

impl Default for DataEncoder {
    fn default() -> Self {
        Self::new()
    }
}
