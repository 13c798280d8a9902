//! Bit-unpacking decoders for ACK and DATA streams.
//!
//! A decoder is the exact inverse of its encoder: it consumes tagged wire
//! bytes one at a time and reconstructs the original octets. Only *completed*
//! octets are folded into the running CRC — the first wire byte of a packing
//! group contributes bits but finishes nothing.
//!
//! [`AckDecoder::decode_at`] and [`DataDecoder::decode_at`] additionally read
//! the nth original octet straight out of an already-encoded buffer by direct
//! row/step arithmetic; the scheduler uses this to re-read the sequence number
//! of an in-flight frame without replaying the whole stream.

use crate::wire::{ACK_BUFFER, DATA_FRAME_BUFFER};
use crate::{crc_step, CRC_SEED};

/// Decodes the `01AAAAAA` ACK wire alphabet back into octets.
pub struct AckDecoder {
    buf: [u8; ACK_BUFFER],
    count: usize,
    step: u8,
    crc: u32,
}

impl AckDecoder {
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

    /// Consume one wire byte. Returns false (no effect) when the buffer is
    /// full.
    pub fn push(&mut self, c: u8) -> bool {
        if self.count + 1 >= self.buf.len() {
            return false;
        }
        let inc = usize::from(self.step != 0);
        let count = self.count + inc;
        let left = 8 - 2 * self.step;
        let right = 2 * self.step;

        let c = c & 0x3F;
        self.buf[count - 1] |= (u16::from(c) << left) as u8;
        self.buf[count] = c >> right;

        if inc != 0 {
            self.crc = crc_step(self.crc, self.buf[count - 1]);
        }
        self.count = count;
        self.step = (self.step + 1) & 3;
        true
    }

    /// The reconstructed octets.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buf[1..self.count]
    }

    /// Number of completed octets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Running CRC32 over the completed octets. Zero after a full valid frame.
    #[must_use]
    pub fn crc32(&self) -> u32 {
        self.crc
    }

    /// Read the nth original octet out of a fully received encoded buffer.
    #[must_use]
    pub fn decode_at(encoded: &[u8], n: usize) -> u8 {
        let row = 4 * (n / 3);
        let step = (n % 3) as u8;
        let offset = row + step as usize;
        let mut data = (encoded[offset] & 0x3F) >> (2 * step);
        data |= encoded[offset + 1] << (6 - 2 * step);
        data
    }
}

impl Default for AckDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes the `1DDDDDDD` DATA wire alphabet back into octets.
pub struct DataDecoder {
    buf: [u8; DATA_FRAME_BUFFER],
    count: usize,
    step: u8,
    crc: u32,
}

impl DataDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: [0; DATA_FRAME_BUFFER],
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

    /// Consume one wire byte. Returns false (no effect) when the buffer is
    /// full.
    pub fn push(&mut self, c: u8) -> bool {
        if self.count + 1 >= self.buf.len() {
            return false;
        }
        let inc = usize::from(self.step != 0);
        let count = self.count + inc;
        let left = 8 - self.step;
        let right = self.step;

        let c = c & 0x7F;
        self.buf[count - 1] |= (u16::from(c) << left) as u8;
        self.buf[count] = c >> right;

        if inc != 0 {
            self.crc = crc_step(self.crc, self.buf[count - 1]);
        }
        self.count = count;
        self.step = (self.step + 1) & 7;
        true
    }

    /// The reconstructed octets.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buf[1..self.count]
    }

    /// Number of completed octets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Running CRC32 over the completed octets. Zero after a full valid frame.
    #[must_use]
    pub fn crc32(&self) -> u32 {
        self.crc
    }

    /// Read the nth original octet out of a fully received encoded buffer.
    #[must_use]
    pub fn decode_at(encoded: &[u8], n: usize) -> u8 {
        let row = 8 * (n / 7);
        let step = (n % 7) as u8;
        let offset = row + step as usize;
        let mut data = (encoded[offset] & 0x7F) >> step;
        data |= encoded[offset + 1] << (7 - step);
        data
    }
}

impl Default for DataDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{AckEncoder, DataEncoder};
    use crate::wire::{END_OF_ACK, END_OF_DATA};

    fn encode_data_frame(payload: &[u8]) -> Vec<u8> {
        let mut enc = DataEncoder::new();
        for &b in payload {
            assert!(enc.push(b));
        }
        let crc = enc.crc32();
        assert!(enc.push_big32(crc));
        assert!(enc.push_end());
        enc.bytes().to_vec()
    }

    fn decode_data_frame(wire: &[u8]) -> (Vec<u8>, u32) {
        let mut dec = DataDecoder::new();
        for &b in wire {
            if b == END_OF_DATA {
                break;
            }
            assert!(dec.push(b));
        }
        (dec.bytes().to_vec(), dec.crc32())
    }

    #[test]
    fn data_round_trip_all_small_lengths() {
        for len in 0..64usize {
            let payload: Vec<u8> = (0..len).map(|i| (i * 7 + len) as u8).collect();
            let wire = encode_data_frame(&payload);
            let (decoded, crc) = decode_data_frame(&wire);
            assert_eq!(crc, 0, "residue not zero for len {len}");
            assert_eq!(&decoded[..len], &payload[..], "mismatch at len {len}");
            assert_eq!(decoded.len(), len + 4);
        }
    }

    #[test]
    fn data_round_trip_full_frame() {
        // Largest frame the system builds: seq + channel + 256 payload bytes.
        let payload: Vec<u8> = (0..258).map(|i| (i % 251) as u8).collect();
        let wire = encode_data_frame(&payload);
        let (decoded, crc) = decode_data_frame(&wire);
        assert_eq!(crc, 0);
        assert_eq!(&decoded[..payload.len()], &payload[..]);
    }

    #[test]
    fn ack_round_trip() {
        let mut enc = AckEncoder::new();
        assert!(enc.push(0x9B));
        let crc = enc.crc32();
        assert!(enc.push_big32(crc));
        assert!(enc.push_end());

        let mut dec = AckDecoder::new();
        for &b in enc.bytes() {
            if b == END_OF_ACK {
                break;
            }
            assert!(dec.push(b));
        }
        assert_eq!(dec.crc32(), 0);
        assert_eq!(dec.len(), 5);
        assert_eq!(dec.bytes()[0], 0x9B);
    }

    #[test]
    fn corrupted_bit_breaks_residue() {
        let payload = b"integrity matters";
        let mut wire = encode_data_frame(payload);
        wire[3] ^= 0x10; // stays inside the DATA tag space
        let (_, crc) = decode_data_frame(&wire);
        assert_ne!(crc, 0);
    }

    #[test]
    fn random_access_agrees_with_streaming() {
        let payload: Vec<u8> = (0..40).map(|i| (255 - i * 3) as u8).collect();
        let wire = encode_data_frame(&payload);
        let (decoded, _) = decode_data_frame(&wire);
        let encoded = &wire[..wire.len() - 1]; // strip terminator
        for (n, &expected) in decoded.iter().enumerate() {
            assert_eq!(DataDecoder::decode_at(encoded, n), expected, "octet {n}");
        }
    }

    #[test]
    fn random_access_ack_sequence_number() {
        let mut enc = AckEncoder::new();
        enc.push(0xC7);
        let crc = enc.crc32();
        enc.push_big32(crc);
        enc.push_end();
        let encoded = &enc.bytes()[..enc.len() - 1];
        assert_eq!(AckDecoder::decode_at(encoded, 0), 0xC7);
    }

    #[test]
    fn decoder_rejects_overflow() {
        let mut dec = AckDecoder::new();
        let mut accepted = 0;
        while dec.push(0x55) {
            accepted += 1;
        }
        assert!(accepted > 0);
        assert!(!dec.push(0x55));
    }

    #[test]
    fn flush_resets_state() {
        let mut dec = DataDecoder::new();
        dec.push(0x81);
        dec.push(0x82);
        assert!(!dec.is_empty());
        dec.flush();
        assert!(dec.is_empty());
        assert_eq!(dec.crc32(), crate::CRC_SEED);
    }
}
