//! Transmission scheduler: the single authority for what goes on the wire
//! next and for in-flight acknowledgment bookkeeping.

use std::collections::VecDeque;

use slay2_frame::{AckEncoder, DataDecoder, DataEncoder, MAX_FRAME_PAYLOAD};
use tracing::trace;

use crate::channel::{ChannelSet, NUM_CHANNELS};

/// Depth of both the ack queue and the in-flight data window.
pub(crate) const SCHEDULER_DEPTH: usize = 3;

/// Re-arm timeout for a retransmitted frame. Transmission of a 300 byte frame
/// takes ~27ms at 115k2 8N1; allow the same again for an ongoing transmission
/// on the reply direction, plus a generous 6ms for the ack itself.
const RETRANSMIT_TIMEOUT_MS: u32 = 60;

/// An encoded data frame that has been sent but not yet acknowledged.
struct InFlight {
    frame: DataEncoder,
    sent_at: u32,
    timeout_ms: u32,
}

impl InFlight {
    fn expired(&self, now: u32) -> bool {
        now.wrapping_sub(self.sent_at) > self.timeout_ms
    }
}

/// Priority-driven frame scheduler with a bounded in-flight window.
pub(crate) struct TxScheduler {
    acks: VecDeque<AckEncoder>,
    window: VecDeque<InFlight>,
    /// Holds the ack most recently popped for transmission, so its bytes stay
    /// borrowable after it leaves the queue.
    departing: Option<AckEncoder>,
    next_seq: u8,
    nacks: u32,
}

impl TxScheduler {
    pub(crate) fn new() -> Self {
        Self {
            acks: VecDeque::with_capacity(SCHEDULER_DEPTH),
            window: VecDeque::with_capacity(SCHEDULER_DEPTH),
            departing: None,
            next_seq: 0,
            nacks: 0,
        }
    }

    /// Clear both queues and restart the sequence space at zero. Invoked at
    /// startup and on every resynchronization.
    pub(crate) fn reset(&mut self) {
        self.acks.clear();
        self.window.clear();
        self.departing = None;
        self.next_seq = 0;
        self.nacks = 0;
    }

    /// The next frame to transmit, if any, in strict priority order:
    /// pending acks first, then timed-out retransmissions, then new data
    /// scanned by ascending channel id.
    pub(crate) fn next_transfer(
        &mut self,
        now: u32,
        channels: &mut ChannelSet,
    ) -> Option<&[u8]> {
        if let Some(ack) = self.acks.pop_front() {
            let ack = self.departing.insert(ack);
            return Some(ack.bytes());
        }

        // Only the oldest in-flight frame can time out first; acknowledgments
        // are strictly in order.
        let timed_out = self.window.front().is_some_and(|f| f.expired(now));
        if timed_out {
            self.nacks += 1;
            let entry = self.window.front_mut()?;
            entry.sent_at = now;
            entry.timeout_ms = RETRANSMIT_TIMEOUT_MS;
            trace!(
                seq = DataDecoder::decode_at(entry.frame.bytes(), 0),
                nacks = self.nacks,
                "retransmitting unacknowledged frame"
            );
            return Some(entry.frame.bytes());
        }

        for ch in 0..NUM_CHANNELS {
            let Some(state) = channels.slot_mut(ch) else {
                continue;
            };
            let queued = state.tx.len();
            let ready = queued >= MAX_FRAME_PAYLOAD || (queued > 0 && !state.more);
            if !ready {
                continue;
            }
            if self.window.len() >= SCHEDULER_DEPTH {
                // Window full: no new frame starts even though data is ready.
                return None;
            }

            let seq = self.next_seq;
            self.next_seq = self.next_seq.wrapping_add(1);

            // The encoder is sized for the largest frame; none of these
            // pushes can fail.
            let mut frame = DataEncoder::new();
            frame.push(seq);
            frame.push(ch as u8);
            let take = queued.min(MAX_FRAME_PAYLOAD);
            for _ in 0..take {
                if let Some(c) = state.tx.pop() {
                    frame.push(c);
                }
            }
            let crc = frame.crc32();
            frame.push_big32(crc);
            frame.push_end();

            // Initial deadline at 115k2 8N1: ~3ms for what may already sit in
            // the tx queue, 1ms per 10 payload bytes, ~30ms for a worst-case
            // frame ahead of the ack on the reply direction, ~1ms for the ack
            // itself, ~2ms of peer processing slack.
            let timeout_ms = 3 + (take as u32) / 10 + 30 + 1 + 2;
            trace!(seq, channel = ch, payload = take, "new data frame");
            self.window.push_back(InFlight {
                frame,
                sent_at: now,
                timeout_ms,
            });
            return self.window.back().map(|entry| entry.frame.bytes());
        }
        None
    }

    /// Accept an acknowledgment. Only the oldest in-flight frame can match;
    /// anything else (including an empty window) is ignored.
    pub(crate) fn acknowledge(&mut self, seq: u8) -> bool {
        let Some(oldest) = self.window.front() else {
            return false;
        };
        // The sequence number is not tracked separately; re-read it out of
        // the encoded frame.
        if DataDecoder::decode_at(oldest.frame.bytes(), 0) != seq {
            trace!(seq, "out-of-order ack ignored");
            return false;
        }
        self.window.pop_front();
        self.nacks = 0;
        true
    }

    /// Queue an ack frame for the given inbound sequence number. Dropped
    /// silently when the queue is full; the peer retransmits and the ack gets
    /// re-requested.
    pub(crate) fn schedule_ack(&mut self, seq: u8) -> bool {
        if self.acks.len() >= SCHEDULER_DEPTH {
            return false;
        }
        let mut ack = AckEncoder::new();
        ack.push(seq);
        let crc = ack.crc32();
        ack.push_big32(crc);
        ack.push_end();
        self.acks.push_back(ack);
        true
    }

    /// Consecutive retransmissions since the last accepted acknowledgment.
    pub(crate) fn nack_count(&self) -> u32 {
        self.nacks
    }
}
