use crate::protocol::constants::*;
use crate::{ByteBuffer, Error, Result};

/// A user-control (type 4) event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserControlEvent {
    StreamBegin(u32),
    StreamEof(u32),
    StreamDry(u32),
    SetBufferLength { stream_id: u32, buffer_ms: u32 },
    StreamIsRecorded(u32),
    PingRequest(u32),
    PingResponse(u32),
    Unknown { event_type: u16, data: u32 },
}

impl UserControlEvent {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut buf = ByteBuffer::new(payload.to_vec());
        let event_type = buf.read_u16_be()?;
        let event = match event_type {
            EVENT_STREAM_BEGIN => UserControlEvent::StreamBegin(buf.read_u32_be()?),
            EVENT_STREAM_EOF => UserControlEvent::StreamEof(buf.read_u32_be()?),
            EVENT_STREAM_DRY => UserControlEvent::StreamDry(buf.read_u32_be()?),
            EVENT_SET_BUFFER_LENGTH => UserControlEvent::SetBufferLength {
                stream_id: buf.read_u32_be()?,
                buffer_ms: buf.read_u32_be()?,
            },
            EVENT_STREAM_IS_RECORDED => UserControlEvent::StreamIsRecorded(buf.read_u32_be()?),
            EVENT_PING_REQUEST => UserControlEvent::PingRequest(buf.read_u32_be()?),
            EVENT_PING_RESPONSE => UserControlEvent::PingResponse(buf.read_u32_be()?),
            other => UserControlEvent::Unknown {
                event_type: other,
                data: buf.read_u32_be().unwrap_or(0),
            },
        };
        Ok(event)
    }

    pub fn encode(&self) -> Vec<u8> {
        let (event_type, words) = match *self {
            UserControlEvent::StreamBegin(id) => (EVENT_STREAM_BEGIN, vec![id]),
            UserControlEvent::StreamEof(id) => (EVENT_STREAM_EOF, vec![id]),
            UserControlEvent::StreamDry(id) => (EVENT_STREAM_DRY, vec![id]),
            UserControlEvent::SetBufferLength {
                stream_id,
                buffer_ms,
            } => (EVENT_SET_BUFFER_LENGTH, vec![stream_id, buffer_ms]),
            UserControlEvent::StreamIsRecorded(id) => (EVENT_STREAM_IS_RECORDED, vec![id]),
            UserControlEvent::PingRequest(ts) => (EVENT_PING_REQUEST, vec![ts]),
            UserControlEvent::PingResponse(ts) => (EVENT_PING_RESPONSE, vec![ts]),
            UserControlEvent::Unknown { event_type, data } => (event_type, vec![data]),
        };

        let mut out = Vec::with_capacity(2 + words.len() * 4);
        out.extend_from_slice(&event_type.to_be_bytes());
        for word in words {
            out.extend_from_slice(&word.to_be_bytes());
        }
        out
    }
}

/// Protocol control messages (type ids 1-6), decoded into their typed
/// form. These are absorbed by the session read loop and never surface
/// to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    SetChunkSize(u32),
    Abort(u32),
    Acknowledgement(u32),
    UserControl(UserControlEvent),
    WindowAckSize(u32),
    SetPeerBandwidth { window: u32, limit: u8 },
}

impl ControlMessage {
    /// Decode the payload of a message whose type id is in the control
    /// range; returns None for application message types.
    pub fn decode(message_type: u8, payload: &[u8]) -> Result<Option<ControlMessage>> {
        let mut buf = ByteBuffer::new(payload.to_vec());
        let msg = match message_type {
            MSG_TYPE_SET_CHUNK_SIZE => {
                let size = buf.read_u32_be()?;
                if size == 0 || size > MAX_CHUNK_SIZE {
                    return Err(Error::protocol(format!("Invalid chunk size: {}", size)));
                }
                ControlMessage::SetChunkSize(size)
            }
            MSG_TYPE_ABORT => ControlMessage::Abort(buf.read_u32_be()?),
            MSG_TYPE_ACK => ControlMessage::Acknowledgement(buf.read_u32_be()?),
            MSG_TYPE_USER_CONTROL => ControlMessage::UserControl(UserControlEvent::decode(payload)?),
            MSG_TYPE_WINDOW_ACK => ControlMessage::WindowAckSize(buf.read_u32_be()?),
            MSG_TYPE_SET_PEER_BW => ControlMessage::SetPeerBandwidth {
                window: buf.read_u32_be()?,
                limit: buf.read_u8()?,
            },
            _ => return Ok(None),
        };
        Ok(Some(msg))
    }

    /// Encode into (message type id, payload bytes)
    pub fn encode(&self) -> (u8, Vec<u8>) {
        match *self {
            ControlMessage::SetChunkSize(size) => {
                (MSG_TYPE_SET_CHUNK_SIZE, size.to_be_bytes().to_vec())
            }
            ControlMessage::Abort(csid) => (MSG_TYPE_ABORT, csid.to_be_bytes().to_vec()),
            ControlMessage::Acknowledgement(seq) => (MSG_TYPE_ACK, seq.to_be_bytes().to_vec()),
            ControlMessage::UserControl(event) => (MSG_TYPE_USER_CONTROL, event.encode()),
            ControlMessage::WindowAckSize(size) => {
                (MSG_TYPE_WINDOW_ACK, size.to_be_bytes().to_vec())
            }
            ControlMessage::SetPeerBandwidth { window, limit } => {
                let mut payload = window.to_be_bytes().to_vec();
                payload.push(limit);
                (MSG_TYPE_SET_PEER_BW, payload)
            }
        }
    }
}
