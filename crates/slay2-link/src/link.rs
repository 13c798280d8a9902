//! The protocol engine: startup synchronization, inbound byte classification,
//! frame validation and delivery, and the transmission pump.

use slay2_frame::{wire, AckDecoder, DataDecoder, SYNC};
use slay2_transport::Transport;
use tracing::{debug, trace};

use crate::channel::{ChannelId, ChannelSet, NUM_CHANNELS};
use crate::error::{LinkError, Result};
use crate::scheduler::TxScheduler;

/// Delivery callback for one channel.
///
/// Fired synchronously from [`Link::task`] for every in-sequence, CRC-valid
/// data frame addressed to the channel. The payload slice is only valid for
/// the duration of the call. The callback receives the link's [`ChannelSet`]
/// so it may enqueue data on any open channel while the delivery is still in
/// progress.
pub type Receiver = Box<dyn FnMut(&mut ChannelSet, &[u8]) + Send>;

/// Startup burst: five consecutive SYNC markers.
const SYNC_BURST: [u8; 5] = [SYNC; 5];

/// Inbound SYNC run length that triggers a resynchronization.
const RESYNC_THRESHOLD: u32 = 3;

/// Low-water mark of the transport's outbound queue; roughly three encoded
/// ack frames. Above it, no new frame is handed to the transport.
const TX_LOW_WATER: usize = 24;

/// Decoded length of a valid ack frame: sequence number plus CRC32.
const ACK_FRAME_LEN: usize = 5;

/// A data frame decodes to more than this: sequence number, channel number,
/// at least one payload byte, CRC32.
const DATA_FRAME_MIN_LEN: usize = 6;

/// One multiplexed reliable link over a byte transport.
///
/// Everything is driven by cyclic calls to [`task`](Self::task); the engine
/// itself never blocks, sleeps or spawns.
pub struct Link<T: Transport> {
    transport: T,
    channels: ChannelSet,
    receivers: [Option<Receiver>; NUM_CHANNELS],
    scheduler: TxScheduler,
    rx_ack: AckDecoder,
    rx_data: DataDecoder,
    next_rx_seq: u8,
    sync_sent: bool,
    sync_run: u32,
}

impl<T: Transport> Link<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            channels: ChannelSet::new(),
            receivers: std::array::from_fn(|_| None),
            scheduler: TxScheduler::new(),
            rx_ack: AckDecoder::new(),
            rx_data: DataDecoder::new(),
            next_rx_seq: 0,
            sync_sent: false,
            sync_run: 0,
        }
    }

    /// Open the given channel. Fails when the id is out of range or the
    /// channel is already open.
    pub fn open(&mut self, id: u8) -> Result<ChannelId> {
        let channel = ChannelId::new(id).ok_or(LinkError::ChannelOutOfRange { id })?;
        if !self.channels.open(channel.index()) {
            return Err(LinkError::ChannelInUse { id });
        }
        debug!(channel = id, "channel opened");
        Ok(channel)
    }

    /// Close the channel and drop its receiver. Unsent queued data is
    /// discarded.
    pub fn close(&mut self, id: ChannelId) {
        self.channels.close(id.index());
        self.receivers[id.index()] = None;
        debug!(channel = %id, "channel closed");
    }

    /// Enqueue payload bytes on the channel. `more` signals that the caller
    /// intends to append before a short frame should be flushed. Returns the
    /// number of bytes accepted.
    pub fn send(&mut self, id: ChannelId, data: &[u8], more: bool) -> usize {
        self.channels.send(id, data, more)
    }

    /// Register the delivery callback for the channel.
    pub fn set_receiver(
        &mut self,
        id: ChannelId,
        receiver: impl FnMut(&mut ChannelSet, &[u8]) + Send + 'static,
    ) {
        self.receivers[id.index()] = Some(Box::new(receiver));
    }

    /// Remove the channel's delivery callback; frames for it are still
    /// acknowledged and sequenced, just not delivered.
    pub fn clear_receiver(&mut self, id: ChannelId) {
        self.receivers[id.index()] = None;
    }

    /// Capacity of every channel's outbound queue.
    #[must_use]
    pub const fn tx_buffer_size() -> usize {
        ChannelSet::tx_buffer_size()
    }

    /// Remaining room on the channel's outbound queue.
    #[must_use]
    pub fn tx_buffer_space(&self, id: ChannelId) -> usize {
        self.channels.tx_buffer_space(id)
    }

    /// Discard everything still queued for transmission on the channel.
    pub fn flush_tx_buffer(&mut self, id: ChannelId) {
        self.channels.flush_tx_buffer(id);
    }

    /// Consecutive retransmissions since the last accepted acknowledgment.
    #[must_use]
    pub fn nack_count(&self) -> u32 {
        self.scheduler.nack_count()
    }

    /// One engine cycle: startup sync, drain all pending inbound bytes, then
    /// hand at most one frame to the transport. Non-blocking; meant to be
    /// polled cyclically by the host.
    pub fn task(&mut self) {
        if !self.sync_sent {
            debug!("sending sync burst");
            if self.transport.transmit(&SYNC_BURST) >= SYNC_BURST.len() {
                self.resync();
                self.sync_sent = true;
            }
        }
        self.do_reception();
        self.do_transmission();
    }

    /// Clear receive-side sequencing and all in-flight scheduler state.
    fn resync(&mut self) {
        self.scheduler.reset();
        self.rx_ack.flush();
        self.rx_data.flush();
        self.next_rx_seq = 0;
    }

    fn do_reception(&mut self) {
        let mut byte = [0u8; 1];
        while self.transport.receive(&mut byte) > 0 {
            let c = byte[0];

            if wire::is_sync(c) {
                self.sync_run += 1;
                if self.sync_run >= RESYNC_THRESHOLD {
                    // The peer (re)started and sent its sync burst: drop the
                    // receive sequence lock so its next frame is accepted.
                    debug!("sync burst received, resynchronizing");
                    self.sync_run = 0;
                    self.resync();
                }
                continue;
            }
            self.sync_run = 0;

            if wire::is_ack(c) {
                self.rx_ack.push(c);
            } else if wire::is_end_of_ack(c) {
                self.finish_ack_frame();
            } else if wire::is_data(c) {
                self.rx_data.push(c);
            } else if wire::is_end_of_data(c) {
                self.finish_data_frame();
            }
            // Anything else is garbage and is dropped.
        }
    }

    fn finish_ack_frame(&mut self) {
        // Valid frames accumulate to a zero CRC residue.
        if self.rx_ack.crc32() == 0 && self.rx_ack.len() == ACK_FRAME_LEN {
            let seq = self.rx_ack.bytes()[0];
            trace!(seq, "ack received");
            self.scheduler.acknowledge(seq);
        }
        self.rx_ack.flush();
    }

    fn finish_data_frame(&mut self) {
        let len = self.rx_data.len();
        if self.rx_data.crc32() == 0 && len > DATA_FRAME_MIN_LEN {
            let seq = self.rx_data.bytes()[0];
            // Every CRC-valid frame is acknowledged, duplicates included, so
            // a lost ack does not wedge the peer's window.
            self.scheduler.schedule_ack(seq);
            if seq == self.next_rx_seq {
                let ch = usize::from(self.rx_data.bytes()[1]);
                if ch < NUM_CHANNELS {
                    if let Some(mut receiver) = self.receivers[ch].take() {
                        let payload = &self.rx_data.bytes()[2..len - 4];
                        trace!(seq, channel = ch, len = payload.len(), "frame delivered");
                        receiver(&mut self.channels, payload);
                        self.receivers[ch] = Some(receiver);
                    }
                }
                self.next_rx_seq = self.next_rx_seq.wrapping_add(1);
            } else {
                trace!(seq, expected = self.next_rx_seq, "duplicate frame re-acked");
            }
        }
        self.rx_data.flush();
    }

    fn do_transmission(&mut self) {
        if self.transport.queued_tx_bytes() > TX_LOW_WATER {
            return;
        }
        let now = self.transport.now_millis();
        if let Some(frame) = self.scheduler.next_transfer(now, &mut self.channels) {
            // A new outbound frame invalidates any partially decoded inbound
            // ack stream.
            self.rx_ack.flush();
            self.transport.transmit(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;
    use slay2_frame::{AckEncoder, DataEncoder, END_OF_ACK, END_OF_DATA};

    /// Scripted transport: tests feed the inbound queue and inspect the
    /// outbound log.
    struct TestWire {
        inbound: VecDeque<u8>,
        outbound: Vec<u8>,
        now: u32,
    }

    impl TestWire {
        fn new() -> Self {
            Self {
                inbound: VecDeque::new(),
                outbound: Vec::new(),
                now: 0,
            }
        }
    }

    impl Transport for TestWire {
        fn transmit(&mut self, data: &[u8]) -> usize {
            self.outbound.extend_from_slice(data);
            data.len()
        }

        fn receive(&mut self, buf: &mut [u8]) -> usize {
            match self.inbound.pop_front() {
                Some(c) => {
                    buf[0] = c;
                    1
                }
                None => 0,
            }
        }

        fn queued_tx_bytes(&mut self) -> usize {
            0
        }

        fn now_millis(&mut self) -> u32 {
            self.now += 1;
            self.now
        }
    }

    fn encoded_data_frame(seq: u8, channel: u8, payload: &[u8]) -> Vec<u8> {
        let mut enc = DataEncoder::new();
        enc.push(seq);
        enc.push(channel);
        for &c in payload {
            enc.push(c);
        }
        let crc = enc.crc32();
        enc.push_big32(crc);
        enc.push_end();
        enc.bytes().to_vec()
    }

    fn encoded_ack_frame(seq: u8) -> Vec<u8> {
        let mut enc = AckEncoder::new();
        enc.push(seq);
        let crc = enc.crc32();
        enc.push_big32(crc);
        enc.push_end();
        enc.bytes().to_vec()
    }

    fn collector(link: &mut Link<TestWire>, id: ChannelId) -> Arc<Mutex<Vec<u8>>> {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let inner = Arc::clone(&sink);
        link.set_receiver(id, move |_, payload| {
            inner.lock().unwrap().extend_from_slice(payload);
        });
        sink
    }

    fn feed(link: &mut Link<TestWire>, bytes: &[u8]) {
        link.transport.inbound.extend(bytes.iter().copied());
    }

    #[test]
    fn startup_sends_sync_burst() {
        let mut link = Link::new(TestWire::new());
        link.task();
        assert_eq!(&link.transport.outbound[..5], &[SYNC; 5]);
    }

    #[test]
    fn open_validates_channel_ids() {
        let mut link = Link::new(TestWire::new());
        assert_eq!(link.open(8), Err(LinkError::ChannelOutOfRange { id: 8 }));

        let id = link.open(3).unwrap();
        assert_eq!(link.open(3), Err(LinkError::ChannelInUse { id: 3 }));

        link.close(id);
        assert!(link.open(3).is_ok());
    }

    #[test]
    fn valid_frame_is_delivered_and_acked() {
        let mut link = Link::new(TestWire::new());
        let id = link.open(0).unwrap();
        let sink = collector(&mut link, id);

        feed(&mut link, &encoded_data_frame(0, 0, b"hello"));
        link.task();

        assert_eq!(sink.lock().unwrap().as_slice(), b"hello");
        let acks = link.transport.outbound.iter().filter(|&&b| b == END_OF_ACK);
        assert_eq!(acks.count(), 1);
    }

    #[test]
    fn duplicate_frame_is_reacked_but_not_redelivered() {
        let mut link = Link::new(TestWire::new());
        let id = link.open(0).unwrap();
        let sink = collector(&mut link, id);

        let frame = encoded_data_frame(0, 0, b"once");
        feed(&mut link, &frame);
        feed(&mut link, &frame);
        link.task();
        link.task();

        assert_eq!(sink.lock().unwrap().as_slice(), b"once");
        let acks = link.transport.outbound.iter().filter(|&&b| b == END_OF_ACK);
        assert_eq!(acks.count(), 2, "both copies must be acknowledged");
    }

    #[test]
    fn corrupted_frame_is_dropped_without_ack() {
        let mut link = Link::new(TestWire::new());
        let id = link.open(0).unwrap();
        let sink = collector(&mut link, id);

        let mut frame = encoded_data_frame(0, 0, b"damaged");
        frame[4] ^= 0x08; // stays inside the DATA tag space
        feed(&mut link, &frame);
        link.task();

        assert!(sink.lock().unwrap().is_empty());
        assert!(!link.transport.outbound.contains(&END_OF_ACK));
    }

    #[test]
    fn garbage_bytes_between_frames_are_ignored() {
        let mut link = Link::new(TestWire::new());
        let id = link.open(0).unwrap();
        let sink = collector(&mut link, id);

        feed(&mut link, &[0x00, 0x3F, 0x2B, 0x10]);
        feed(&mut link, &encoded_data_frame(0, 0, b"still fine"));
        feed(&mut link, &[0x1F]);
        link.task();

        assert_eq!(sink.lock().unwrap().as_slice(), b"still fine");
    }

    #[test]
    fn cleared_receiver_still_acks_and_sequences() {
        let mut link = Link::new(TestWire::new());
        let id = link.open(0).unwrap();
        let sink = collector(&mut link, id);
        link.clear_receiver(id);

        feed(&mut link, &encoded_data_frame(0, 0, b"unheard"));
        feed(&mut link, &encoded_data_frame(1, 0, b"heard"));
        link.task();
        assert!(sink.lock().unwrap().is_empty());

        // Sequencing advanced past the undelivered frame.
        let sink = collector(&mut link, id);
        feed(&mut link, &encoded_data_frame(2, 0, b"heard"));
        link.task();
        assert_eq!(sink.lock().unwrap().as_slice(), b"heard");
    }

    #[test]
    fn frame_for_unopened_channel_is_acked_but_dropped() {
        let mut link = Link::new(TestWire::new());
        feed(&mut link, &encoded_data_frame(0, 6, b"nobody home"));
        link.task();

        let acks = link.transport.outbound.iter().filter(|&&b| b == END_OF_ACK);
        assert_eq!(acks.count(), 1);
    }

    #[test]
    fn out_of_sequence_frame_advances_nothing() {
        let mut link = Link::new(TestWire::new());
        let id = link.open(0).unwrap();
        let sink = collector(&mut link, id);

        feed(&mut link, &encoded_data_frame(4, 0, b"from the future"));
        link.task();
        assert!(sink.lock().unwrap().is_empty());

        // The expected frame still goes through afterwards.
        feed(&mut link, &encoded_data_frame(0, 0, b"now"));
        link.task();
        assert_eq!(sink.lock().unwrap().as_slice(), b"now");
    }

    #[test]
    fn resync_resets_expected_sequence() {
        let mut link = Link::new(TestWire::new());
        let id = link.open(0).unwrap();
        let sink = collector(&mut link, id);

        feed(&mut link, &encoded_data_frame(0, 0, b"a"));
        link.task();
        // Same sequence again: duplicate, suppressed.
        feed(&mut link, &encoded_data_frame(0, 0, b"b"));
        link.task();
        assert_eq!(sink.lock().unwrap().as_slice(), b"a");

        // Peer restart: the sync burst unlocks sequence zero again.
        feed(&mut link, &[SYNC, SYNC, SYNC]);
        feed(&mut link, &encoded_data_frame(0, 0, b"c"));
        link.task();
        assert_eq!(sink.lock().unwrap().as_slice(), b"ac");
    }

    #[test]
    fn resync_clears_in_flight_window() {
        let mut link = Link::new(TestWire::new());
        let id = link.open(0).unwrap();
        link.send(id, b"unacknowledged", false);
        link.task();

        // Drive time past the deadline so the frame retransmits.
        link.transport.now += 1000;
        link.task();
        assert_eq!(link.nack_count(), 1);

        feed(&mut link, &[SYNC, SYNC, SYNC]);
        link.task();
        assert_eq!(link.nack_count(), 0);
    }

    #[test]
    fn two_sync_bytes_do_not_resync() {
        let mut link = Link::new(TestWire::new());
        let id = link.open(0).unwrap();
        let sink = collector(&mut link, id);

        feed(&mut link, &encoded_data_frame(0, 0, b"a"));
        link.task();
        // Interrupted run: two SYNCs, payload, another SYNC.
        feed(&mut link, &[SYNC, SYNC]);
        feed(&mut link, &encoded_data_frame(1, 0, b"b"));
        feed(&mut link, &[SYNC]);
        link.task();

        assert_eq!(sink.lock().unwrap().as_slice(), b"ab");
    }

    #[test]
    fn inbound_ack_releases_window() {
        let mut link = Link::new(TestWire::new());
        let id = link.open(0).unwrap();
        link.send(id, b"payload", false);
        link.task();

        feed(&mut link, &encoded_ack_frame(0));
        link.task();

        // With the window free again, a late clock jump retransmits nothing.
        link.transport.now += 1000;
        link.task();
        assert_eq!(link.nack_count(), 0);
    }

    #[test]
    fn truncated_ack_frame_is_ignored() {
        let mut link = Link::new(TestWire::new());
        let id = link.open(0).unwrap();
        link.send(id, b"payload", false);
        link.task();

        let ack = encoded_ack_frame(0);
        // Drop one payload byte but keep the terminator: CRC cannot be zero.
        feed(&mut link, &ack[..2]);
        feed(&mut link, &[END_OF_ACK]);
        link.task();

        link.transport.now += 1000;
        link.task();
        assert_eq!(link.nack_count(), 1, "frame must still be outstanding");
    }

    #[test]
    fn receiver_may_send_during_delivery() {
        let mut link = Link::new(TestWire::new());
        let rx = link.open(0).unwrap();
        let tx = link.open(1).unwrap();
        link.set_receiver(rx, move |channels, payload| {
            channels.send(tx, payload, false);
        });

        feed(&mut link, &encoded_data_frame(0, 0, b"forwarded"));
        link.task();
        // First cycle transmits the ack; the forwarded frame leaves next.
        link.task();

        // The forwarded copy leaves on channel 1 as a data frame.
        let wire = &link.transport.outbound;
        assert!(wire.contains(&END_OF_DATA));
        let start = wire.iter().position(|&b| wire::is_data(b)).unwrap();
        let end = wire.iter().position(|&b| b == END_OF_DATA).unwrap();
        let mut dec = DataDecoder::new();
        for &b in &wire[start..end] {
            assert!(dec.push(b));
        }
        assert_eq!(dec.crc32(), 0);
        assert_eq!(dec.bytes()[1], 1);
        assert_eq!(&dec.bytes()[2..dec.len() - 4], b"forwarded");
    }

    #[test]
    fn transmission_respects_low_water_mark() {
        struct Congested(TestWire);
        impl Transport for Congested {
            fn transmit(&mut self, data: &[u8]) -> usize {
                self.0.transmit(data)
            }
            fn receive(&mut self, buf: &mut [u8]) -> usize {
                self.0.receive(buf)
            }
            fn queued_tx_bytes(&mut self) -> usize {
                TX_LOW_WATER + 1
            }
            fn now_millis(&mut self) -> u32 {
                self.0.now_millis()
            }
        }

        let mut link = Link::new(Congested(TestWire::new()));
        let id = link.open(0).unwrap();
        link.send(id, b"held back", false);
        link.task();
        link.task();

        // Only the sync burst went out; the data frame is still queued.
        assert_eq!(link.transport.0.outbound.len(), 5);
    }
}
