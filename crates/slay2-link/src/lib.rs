//! SLAY2 protocol engine.
//!
//! Multiplexes up to eight reliable logical byte-stream channels over one raw
//! serial link. The engine is purely cooperative: a host drives it by calling
//! [`Link::task`] cyclically, and every transport interaction is non-blocking.
//!
//! Reliability comes from three mechanisms working together:
//!
//! - an 8-bit wrapping sequence number per data frame, with a bounded window
//!   of three unacknowledged frames in flight;
//! - per-frame CRC32 with the zero-residue check done by the frame codec;
//! - timeout-driven retransmission of the oldest unacknowledged frame, with
//!   acknowledgments accepted strictly in order.
//!
//! Startup and recovery use SYNC bursts: each endpoint transmits five SYNC
//! markers once at startup, and any endpoint observing three or more
//! consecutive inbound SYNCs drops its receive sequence lock and clears its
//! in-flight state, so a restarted peer is picked up transparently.

pub mod channel;
pub mod error;
pub mod link;
pub mod scheduler;

pub use channel::{ChannelId, ChannelSet, NUM_CHANNELS};
pub use error::{LinkError, Result};
pub use link::{Link, Receiver};
