//! Logical channels and their outbound queues.

use std::fmt;

use slay2_frame::ByteFifo;

/// Number of logical channels multiplexed over one link.
pub const NUM_CHANNELS: usize = 8;

/// Identity of an open channel, handed out by [`Link::open`](crate::Link::open).
///
/// Lower ids have higher transmission priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId(u8);

impl ChannelId {
    /// Wrap a raw channel number. None if it is outside the channel space.
    #[must_use]
    pub fn new(id: u8) -> Option<Self> {
        (usize::from(id) < NUM_CHANNELS).then_some(Self(id))
    }

    /// The raw channel number.
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-channel transmit state.
pub(crate) struct ChannelState {
    /// Outbound byte queue, drained by the scheduler in frame-sized chunks.
    pub(crate) tx: ByteFifo,
    /// Caller intends to append more before a short frame should be flushed.
    pub(crate) more: bool,
}

impl ChannelState {
    fn new() -> Self {
        Self {
            tx: ByteFifo::new(),
            more: false,
        }
    }
}

/// The fixed array of channel slots.
///
/// Owned by the protocol engine and passed explicitly to the scheduler and to
/// receive callbacks, so a callback can enqueue data on any open channel while
/// a delivery is still in progress.
pub struct ChannelSet {
    slots: [Option<ChannelState>; NUM_CHANNELS],
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Enqueue as many of `data` as fit on the channel's outbound queue and
    /// record the `more` flag. Returns the number of bytes accepted; 0 for a
    /// closed channel or a full queue. Never blocks.
    pub fn send(&mut self, id: ChannelId, data: &[u8], more: bool) -> usize {
        let Some(state) = self.slots[id.index()].as_mut() else {
            return 0;
        };
        let mut accepted = 0;
        for &c in data {
            if !state.tx.push(c) {
                break;
            }
            accepted += 1;
        }
        state.more = more;
        accepted
    }

    /// Capacity of every channel's outbound queue.
    #[must_use]
    pub const fn tx_buffer_size() -> usize {
        ByteFifo::capacity()
    }

    /// Remaining room on the channel's outbound queue. 0 for a closed channel.
    #[must_use]
    pub fn tx_buffer_space(&self, id: ChannelId) -> usize {
        self.slots[id.index()]
            .as_ref()
            .map_or(0, |state| state.tx.space())
    }

    /// Discard everything still queued for transmission on the channel.
    pub fn flush_tx_buffer(&mut self, id: ChannelId) {
        if let Some(state) = self.slots[id.index()].as_mut() {
            state.tx.flush();
        }
    }

    /// Whether the slot currently holds an open channel.
    #[must_use]
    pub fn is_open(&self, id: ChannelId) -> bool {
        self.slots[id.index()].is_some()
    }

    pub(crate) fn open(&mut self, index: usize) -> bool {
        if self.slots[index].is_some() {
            return false;
        }
        self.slots[index] = Some(ChannelState::new());
        true
    }

    pub(crate) fn close(&mut self, index: usize) {
        self.slots[index] = None;
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut ChannelState> {
        self.slots[index].as_mut()
    }
}
