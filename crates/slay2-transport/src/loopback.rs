//! Loopback transports for tests and benchmarks.

use std::sync::{Arc, Mutex, PoisonError};

use slay2_frame::ByteFifo;

use crate::clock::SimClock;
use crate::traits::Transport;

/// Self-loop transport: everything transmitted comes back on the receive
/// side, like a nullmodem cable plugged into a single port.
///
/// One engine driving a `Nullmodem` talks to itself, which is enough to
/// exercise the full frame/ack round trip in a single polling loop.
pub struct Nullmodem {
    fifo: ByteFifo,
    clock: SimClock,
}

impl Nullmodem {
    #[must_use]
    pub fn new(clock: SimClock) -> Self {
        Self {
            fifo: ByteFifo::new(),
            clock,
        }
    }
}

impl Transport for Nullmodem {
    fn transmit(&mut self, data: &[u8]) -> usize {
        let mut accepted = 0;
        for &c in data {
            if !self.fifo.push(c) {
                break;
            }
            accepted += 1;
        }
        accepted
    }

    fn receive(&mut self, buf: &mut [u8]) -> usize {
        let mut read = 0;
        for slot in buf.iter_mut() {
            match self.fifo.pop() {
                Some(c) => {
                    *slot = c;
                    read += 1;
                }
                None => break,
            }
        }
        read
    }

    fn queued_tx_bytes(&mut self) -> usize {
        self.fifo.len()
    }

    fn now_millis(&mut self) -> u32 {
        self.clock.now()
    }
}

type SharedFifo = Arc<Mutex<ByteFifo>>;

fn locked(fifo: &SharedFifo) -> std::sync::MutexGuard<'_, ByteFifo> {
    fifo.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A crossed pair of in-memory links connecting two engines.
pub struct Loopback;

impl Loopback {
    /// Create two endpoints wired to each other: what A transmits, B
    /// receives, and vice versa. Both share the given clock.
    #[must_use]
    pub fn pair(clock: SimClock) -> (LoopbackEndpoint, LoopbackEndpoint) {
        let a_to_b: SharedFifo = Arc::new(Mutex::new(ByteFifo::new()));
        let b_to_a: SharedFifo = Arc::new(Mutex::new(ByteFifo::new()));
        let a = LoopbackEndpoint {
            outbound: Arc::clone(&a_to_b),
            inbound: Arc::clone(&b_to_a),
            clock: clock.clone(),
        };
        let b = LoopbackEndpoint {
            outbound: b_to_a,
            inbound: a_to_b,
            clock,
        };
        (a, b)
    }
}

/// One side of a [`Loopback`] pair.
pub struct LoopbackEndpoint {
    outbound: SharedFifo,
    inbound: SharedFifo,
    clock: SimClock,
}

impl Transport for LoopbackEndpoint {
    fn transmit(&mut self, data: &[u8]) -> usize {
        let mut fifo = locked(&self.outbound);
        let mut accepted = 0;
        for &c in data {
            if !fifo.push(c) {
                break;
            }
            accepted += 1;
        }
        accepted
    }

    fn receive(&mut self, buf: &mut [u8]) -> usize {
        let mut fifo = locked(&self.inbound);
        let mut read = 0;
        for slot in buf.iter_mut() {
            match fifo.pop() {
                Some(c) => {
                    *slot = c;
                    read += 1;
                }
                None => break,
            }
        }
        read
    }

    fn queued_tx_bytes(&mut self) -> usize {
        locked(&self.outbound).len()
    }

    fn now_millis(&mut self) -> u32 {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullmodem_echoes_itself() {
        let mut nm = Nullmodem::new(SimClock::new());
        assert_eq!(nm.transmit(b"hello"), 5);
        assert_eq!(nm.queued_tx_bytes(), 5);

        let mut buf = [0u8; 8];
        assert_eq!(nm.receive(&mut buf), 5);
        assert_eq!(&buf[..5], b"hello");
        assert_eq!(nm.queued_tx_bytes(), 0);
    }

    #[test]
    fn nullmodem_partial_accept_when_full() {
        let mut nm = Nullmodem::new(SimClock::new());
        let blob = vec![0x5A; ByteFifo::capacity() + 10];
        assert_eq!(nm.transmit(&blob), ByteFifo::capacity());
        assert_eq!(nm.transmit(b"x"), 0);
    }

    #[test]
    fn pair_crosses_directions() {
        let (mut a, mut b) = Loopback::pair(SimClock::new());
        a.transmit(b"ping");
        b.transmit(b"pong");

        let mut buf = [0u8; 4];
        assert_eq!(b.receive(&mut buf), 4);
        assert_eq!(&buf, b"ping");
        assert_eq!(a.receive(&mut buf), 4);
        assert_eq!(&buf, b"pong");
    }

    #[test]
    fn queued_count_tracks_own_side_only() {
        let (mut a, mut b) = Loopback::pair(SimClock::new());
        a.transmit(b"abc");
        assert_eq!(a.queued_tx_bytes(), 3);
        assert_eq!(b.queued_tx_bytes(), 0);

        let mut buf = [0u8; 3];
        b.receive(&mut buf);
        assert_eq!(a.queued_tx_bytes(), 0);
    }
}
