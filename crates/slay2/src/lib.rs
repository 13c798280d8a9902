//! Multiplexed reliable transport for raw serial links.
//!
//! SLAY2 gives application code up to eight independent logical byte-stream
//! channels over one physical serial link, with automatic retransmission,
//! CRC32 integrity checking, and resynchronization after noise or a peer
//! restart. It needs nothing from the line: no hardware framing, no flow
//! control, no error correction.
//!
//! # Crate Structure
//!
//! - [`frame`] — Self-synchronizing bit-packing frame codec with embedded CRC32
//! - [`transport`] — The byte-transport capability, serial devices and loopback test links
//! - [`link`] — The protocol engine: channels, scheduler, retransmission
//!
//! # Example
//!
//! ```
//! use slay2::link::Link;
//! use slay2::transport::{Loopback, SimClock};
//!
//! let (wire_a, wire_b) = Loopback::pair(SimClock::new());
//! let mut alice = Link::new(wire_a);
//! let mut bob = Link::new(wire_b);
//!
//! let tx = alice.open(0).unwrap();
//! let rx = bob.open(0).unwrap();
//! bob.set_receiver(rx, |_, payload| {
//!     println!("got {} bytes", payload.len());
//! });
//!
//! alice.send(tx, b"hello over the wire", false);
//! for _ in 0..32 {
//!     alice.task();
//!     bob.task();
//! }
//! ```

/// Re-export frame codec types.
pub mod frame {
    pub use slay2_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use slay2_transport::*;
}

/// Re-export protocol engine types.
pub mod link {
    pub use slay2_link::*;
}
