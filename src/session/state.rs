use crate::protocol::constants::DEFAULT_WINDOW_SIZE;

/// Per-connection negotiated parameters and bandwidth accounting.
/// Created at accept, mutated by the session read/write paths and by
/// control-message handling, discarded at close.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Acknowledgement window. One shared value for both directions:
    /// an incoming Window-Ack-Size and an incoming Set-Peer-Bandwidth
    /// both land here, matching the reference behavior (see DESIGN.md)
    pub bandwidth: u32,

    /// Bytes read since the last acknowledgement we sent
    pub read_seq: u32,

    /// Bytes written since the last acknowledgement/ping cycle
    pub write_seq: u32,

    /// Cumulative bytes read, folded in at each window boundary;
    /// wraps like the 32-bit wire field
    pub total_read: u32,

    /// Cumulative bytes written, same folding rule
    pub total_write: u32,

    /// Message stream id bound by createStream negotiation; AV
    /// messages are stamped with it
    pub stream_id: u32,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState {
            bandwidth: DEFAULT_WINDOW_SIZE,
            read_seq: 0,
            write_seq: 0,
            total_read: 0,
            total_write: 0,
            stream_id: 0,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        SessionState::default()
    }
}
