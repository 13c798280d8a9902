/// Errors from the channel management surface.
///
/// The wire side of the protocol never reports errors: garbage bytes and
/// corrupted frames are dropped silently and recovery happens through CRC
/// checks and retransmission timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// The requested channel id is outside the fixed channel space.
    #[error("channel id {id} out of range (0..{max})", max = crate::channel::NUM_CHANNELS)]
    ChannelOutOfRange { id: u8 },

    /// The requested channel is already open.
    #[error("channel {id} is already open")]
    ChannelInUse { id: u8 },
}

pub type Result<T> = std::result::Result<T, LinkError>;
