use crate::protocol::constants::*;

/// Fully-resolved message header: timestamps are absolute, inherited
/// fields are filled in from the chunk-stream state that produced them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtmpHeader {
    pub timestamp: u32,
    pub message_length: u32,
    pub message_type: u8,
    pub message_stream_id: u32,
    pub chunk_stream_id: u32,
}

impl RtmpHeader {
    pub fn new(
        timestamp: u32,
        message_length: u32,
        message_type: u8,
        message_stream_id: u32,
        chunk_stream_id: u32,
    ) -> Self {
        RtmpHeader {
            timestamp,
            message_length,
            message_type,
            message_stream_id,
            chunk_stream_id,
        }
    }

    /// Header for a protocol control message (csid 2, stream 0,
    /// timestamp 0)
    pub fn control(message_type: u8, length: u32) -> Self {
        RtmpHeader::new(0, length, message_type, 0, CHUNK_STREAM_PROTOCOL)
    }

    /// Header for an AMF0 command message
    pub fn command(length: u32, stream_id: u32) -> Self {
        RtmpHeader::new(0, length, MSG_TYPE_COMMAND_AMF0, stream_id, CHUNK_STREAM_COMMAND)
    }

    /// Header for an AMF0 data message
    pub fn data(length: u32, stream_id: u32) -> Self {
        RtmpHeader::new(0, length, MSG_TYPE_DATA_AMF0, stream_id, CHUNK_STREAM_DATA)
    }

    /// Header for an audio message
    pub fn audio(timestamp: u32, length: u32, stream_id: u32) -> Self {
        RtmpHeader::new(timestamp, length, MSG_TYPE_AUDIO, stream_id, CHUNK_STREAM_AUDIO)
    }

    /// Header for a video message
    pub fn video(timestamp: u32, length: u32, stream_id: u32) -> Self {
        RtmpHeader::new(timestamp, length, MSG_TYPE_VIDEO, stream_id, CHUNK_STREAM_VIDEO)
    }
}

/// A complete logical message, reassembled from one or more chunks (or
/// about to be split into them)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtmpMessage {
    pub header: RtmpHeader,
    pub payload: Vec<u8>,
}

impl RtmpMessage {
    pub fn new(header: RtmpHeader, payload: Vec<u8>) -> Self {
        RtmpMessage { header, payload }
    }

    pub fn message_type(&self) -> u8 {
        self.header.message_type
    }

    pub fn message_stream_id(&self) -> u32 {
        self.header.message_stream_id
    }

    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }

    pub fn is_audio(&self) -> bool {
        self.header.message_type == MSG_TYPE_AUDIO
    }

    pub fn is_video(&self) -> bool {
        self.header.message_type == MSG_TYPE_VIDEO
    }

    pub fn is_command(&self) -> bool {
        self.header.message_type == MSG_TYPE_COMMAND_AMF0
            || self.header.message_type == MSG_TYPE_COMMAND_AMF3
    }

    pub fn is_data(&self) -> bool {
        self.header.message_type == MSG_TYPE_DATA_AMF0
            || self.header.message_type == MSG_TYPE_DATA_AMF3
    }
}

/// One audio or video elementary-stream unit handed to the serializer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvPacket {
    pub timestamp: u32,
    pub payload: Vec<u8>,
}

impl AvPacket {
    pub fn new(timestamp: u32, payload: Vec<u8>) -> Self {
        AvPacket { timestamp, payload }
    }
}
