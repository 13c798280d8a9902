//! The capability the protocol engine requires from a physical link.

/// Non-blocking byte transport plus a monotonic millisecond clock.
///
/// Every method must return immediately. I/O failures are reported as "zero
/// bytes moved": the protocol recovers through its own CRC check and
/// retransmission timers, so the engine has no use for error values here.
/// Construction and configuration of concrete transports may fail and do
/// return [`TransportError`](crate::TransportError).
pub trait Transport {
    /// Queue up to `data.len()` bytes for transmission. Returns how many were
    /// accepted; the rest must be retried by the caller on a later cycle.
    fn transmit(&mut self, data: &[u8]) -> usize;

    /// Read available inbound bytes into `buf`. Returns 0 when none are
    /// pending.
    fn receive(&mut self, buf: &mut [u8]) -> usize;

    /// Number of bytes still waiting in the outbound queue. The engine uses
    /// this as its low-water gate before scheduling another frame.
    fn queued_tx_bytes(&mut self) -> usize;

    /// Monotonic milliseconds. Wraps modulo 2^32; must never report 0 during
    /// steady-state operation (0 is reserved as an uninitialized sentinel).
    fn now_millis(&mut self) -> u32;
}
