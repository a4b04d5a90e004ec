use crate::protocol::{RtmpHeader, RtmpMessage};

/// Per-chunk-stream assembly state. One context exists per chunk
/// stream id, created lazily on first sight and never shared across
/// ids.
#[derive(Debug, Clone, Default)]
pub struct ChunkStreamContext {
    /// Baseline for type 1/2/3 header compression on this id
    pub(crate) prev_header: Option<RtmpHeader>,

    /// Last timestamp delta decoded from a type 1/2 header; a type-3
    /// chunk starting a new message re-applies it
    pub(crate) cached_delta: u32,

    /// Header of the message currently being assembled
    current: Option<RtmpHeader>,

    /// Payload bytes accumulated so far for the in-flight message
    buffer: Vec<u8>,
}

impl ChunkStreamContext {
    pub fn new() -> Self {
        ChunkStreamContext::default()
    }

    /// A message is in progress and only type-3 chunks are legal
    pub fn is_assembling(&self) -> bool {
        self.current.is_some()
    }

    /// Payload bytes still owed for the in-flight message
    pub fn bytes_remaining(&self) -> usize {
        match &self.current {
            Some(header) => (header.message_length as usize).saturating_sub(self.buffer.len()),
            None => 0,
        }
    }

    /// Begin assembling a message with the given resolved header
    pub fn begin(&mut self, header: RtmpHeader) {
        self.buffer.clear();
        self.buffer.reserve(header.message_length as usize);
        self.current = Some(header);
    }

    /// Append one chunk's payload; returns the completed message once
    /// the accumulated bytes reach the message length
    pub fn push(&mut self, data: &[u8]) -> Option<RtmpMessage> {
        self.buffer.extend_from_slice(data);
        let header = self.current?;
        if self.buffer.len() >= header.message_length as usize {
            self.current = None;
            return Some(RtmpMessage::new(header, std::mem::take(&mut self.buffer)));
        }
        None
    }

    /// Discard the in-flight message (Abort control message); the
    /// compression baseline survives
    pub fn discard_partial(&mut self) {
        self.current = None;
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assembly_across_chunks() {
        let mut ctx = ChunkStreamContext::new();
        let header = RtmpHeader::audio(0, 5, 1);
        ctx.begin(header);
        assert!(ctx.is_assembling());
        assert_eq!(ctx.bytes_remaining(), 5);

        assert!(ctx.push(&[1, 2, 3]).is_none());
        assert_eq!(ctx.bytes_remaining(), 2);

        let msg = ctx.push(&[4, 5]).expect("message should complete");
        assert_eq!(msg.payload, vec![1, 2, 3, 4, 5]);
        assert!(!ctx.is_assembling());
    }

    #[test]
    fn test_empty_payload_completes_immediately() {
        let mut ctx = ChunkStreamContext::new();
        ctx.begin(RtmpHeader::command(0, 0));
        let msg = ctx.push(&[]).expect("zero-length message");
        assert!(msg.payload.is_empty());
    }

    #[test]
    fn test_discard_partial() {
        let mut ctx = ChunkStreamContext::new();
        ctx.begin(RtmpHeader::video(0, 10, 1));
        ctx.push(&[1, 2, 3]);
        ctx.discard_partial();
        assert!(!ctx.is_assembling());
        assert_eq!(ctx.bytes_remaining(), 0);
    }
}
