//! Wire-level byte values and buffer sizing.
//!
//! The five tag spaces — SYNC, ACK payload, END_OF_ACK, DATA payload,
//! END_OF_DATA — are mutually disjoint. Any byte outside them is garbage and
//! gets dropped by the receiver.

/// Synchronization marker. Sent as a burst of five at startup; three or more
/// consecutive inbound SYNC bytes trigger a resynchronization.
pub const SYNC: u8 = 0x2C;

/// Terminator of an encoded ACK frame.
pub const END_OF_ACK: u8 = 0x01;

/// Terminator of an encoded DATA frame.
pub const END_OF_DATA: u8 = 0x02;

/// Maximum payload of one DATA frame.
pub const MAX_FRAME_PAYLOAD: usize = 256;

/// Decoded DATA frame buffer: payload plus sequence number, channel number,
/// CRC32 and two reserved bytes.
pub const DATA_FRAME_BUFFER: usize = MAX_FRAME_PAYLOAD + 8;

/// Encoded DATA frame buffer: the 7-bit packing expands by 8/7, plus one byte
/// for round-up, one for the terminator and one reserved.
pub const DATA_WIRE_BUFFER: usize = (8 * DATA_FRAME_BUFFER) / 7 + 3;

/// Buffer size for encoded and decoded ACK frames.
pub const ACK_BUFFER: usize = 16;

/// Capacity of the per-channel outbound byte queue.
pub const FIFO_CAPACITY: usize = 1024;

/// True for bytes of an encoded ACK stream (pattern `01AAAAAA`).
#[must_use]
pub const fn is_ack(byte: u8) -> bool {
    byte & 0xC0 == 0x40
}

/// True for the ACK frame terminator.
#[must_use]
pub const fn is_end_of_ack(byte: u8) -> bool {
    byte == END_OF_ACK
}

/// True for bytes of an encoded DATA stream (pattern `1DDDDDDD`).
#[must_use]
pub const fn is_data(byte: u8) -> bool {
    byte & 0x80 == 0x80
}

/// True for the DATA frame terminator.
#[must_use]
pub const fn is_end_of_data(byte: u8) -> bool {
    byte == END_OF_DATA
}

/// True for the SYNC marker.
#[must_use]
pub const fn is_sync(byte: u8) -> bool {
    byte == SYNC
}
