//! Transport capability for the SLAY2 protocol engine.
//!
//! The engine never talks to hardware directly; it is handed an
//! implementation of [`Transport`] at construction. This crate provides the
//! trait itself plus three implementations:
//!
//! - [`SerialPort`] — a raw-mode 8N1 termios serial device (Unix)
//! - [`Nullmodem`] — a self-loop over one bounded FIFO, for single-engine tests
//! - [`Loopback`] — a crossed pair of endpoints connecting two engines

pub mod clock;
pub mod error;
pub mod loopback;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use clock::SimClock;
pub use error::{Result, TransportError};
pub use loopback::{Loopback, LoopbackEndpoint, Nullmodem};
pub use traits::Transport;

#[cfg(unix)]
pub use serial::SerialPort;
