//! Self-synchronizing frame codec for the SLAY2 serial link protocol.
//!
//! SLAY2 transfers DATA and ACK frames over a raw byte link. Instead of escape
//! sequences, every wire byte is tagged by its top bits, so payload bytes can
//! never collide with the frame terminators or the SYNC marker:
//!
//! ```text
//! SYNC (0x2C)
//!    +-7-+-6-+-5-+-4-+-3-+-2-+-1-+-0-+
//!    | 0 | 0 | 1 | 0 | 1 | 1 | 0 | 0 |
//!    +---+---+---+---+---+---+---+---+
//!
//! END_OF_ACK (0x01)            END_OF_DATA (0x02)
//!    0 0 0 0 0 0 0 1              0 0 0 0 0 0 1 0
//!
//! ACK stream byte: 6 payload bits each, 4 wire bytes carry 3 octets
//!    +-7-+-6-+-5-+-4-+-3-+-2-+-1-+-0-+
//!    | 0 | 1 | A | A | A | A | A | A |
//!    +---+---+---+---+---+---+---+---+
//!
//! DATA stream byte: 7 payload bits each, 8 wire bytes carry 7 octets
//!    +-7-+-6-+-5-+-4-+-3-+-2-+-1-+-0-+
//!    | 1 | D | D | D | D | D | D | D |
//!    +---+---+---+---+---+---+---+---+
//! ```
//!
//! Logical frame layouts (before bit packing):
//!
//! ```text
//! DATA frame:  [seq:1][channel:1][payload:0..256][crc32:4 BE]  + END_OF_DATA
//! ACK frame:   [seq:1][crc32:4 BE]                             + END_OF_ACK
//! ```
//!
//! The trailing CRC32 is the encoder's own running checksum, so a decoder that
//! accumulates CRC32 over every reconstructed byte of a frame — including the
//! CRC field itself — ends at exactly zero iff the frame arrived intact.

use crc::{Crc, CRC_32_MPEG_2};

pub mod decode;
pub mod encode;
pub mod fifo;
pub mod wire;

pub use decode::{AckDecoder, DataDecoder};
pub use encode::{AckEncoder, DataEncoder};
pub use fifo::ByteFifo;
pub use wire::{
    is_ack, is_data, is_end_of_ack, is_end_of_data, is_sync, ACK_BUFFER, DATA_FRAME_BUFFER,
    DATA_WIRE_BUFFER, END_OF_ACK, END_OF_DATA, FIFO_CAPACITY, MAX_FRAME_PAYLOAD, SYNC,
};

/// CRC-32/MPEG-2: polynomial 0x04C11DB7, all-ones seed, unreflected, no final
/// xor. This is the variant with the residue property the frame check relies
/// on: crc(message ++ crc(message)) == 0.
static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// Initial value of every running frame CRC.
pub const CRC_SEED: u32 = 0xFFFF_FFFF;

/// Fold one byte into a running CRC32 value.
pub(crate) fn crc_step(crc: u32, byte: u8) -> u32 {
    let mut digest = CRC32.digest_with_initial(crc);
    digest.update(&[byte]);
    digest.finalize()
}
