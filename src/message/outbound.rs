use crate::Result;
use crate::amf::{Amf0Value, amf0_object};
use crate::chunk::FirstChunk;
use crate::protocol::{AvPacket, ControlMessage, RtmpCommand, RtmpHeader, UserControlEvent};

/// Status levels and codes used in command responses
pub const LEVEL_STATUS: &str = "status";
pub const LEVEL_ERROR: &str = "error";
pub const CODE_CONNECT_SUCCESS: &str = "NetConnection.Connect.Success";
pub const CODE_PUBLISH_START: &str = "NetStream.Publish.Start";
pub const CODE_PUBLISH_BAD_NAME: &str = "NetStream.Publish.BadName";
pub const CODE_PLAY_START: &str = "NetStream.Play.Start";
pub const CODE_PLAY_RESET: &str = "NetStream.Play.Reset";
pub const CODE_PLAY_STREAM_NOT_FOUND: &str = "NetStream.Play.StreamNotFound";
pub const CODE_PLAY_STOP: &str = "NetStream.Play.Stop";
pub const CODE_UNPUBLISH_SUCCESS: &str = "NetStream.Unpublish.Success";

/// Everything a session can be asked to send. Each variant carries its
/// own typed payload, so a malformed or unknown send request is
/// unrepresentable.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    SetChunkSize(u32),
    Acknowledgement(u32),
    WindowAckSize(u32),
    SetPeerBandwidth { window: u32, limit: u8 },
    StreamBegin(u32),
    StreamEof(u32),
    StreamIsRecorded(u32),
    SetBufferLength { stream_id: u32, buffer_ms: u32 },
    PingRequest(u32),
    PingResponse(u32),
    ConnectResponse { transaction_id: f64, object_encoding: f64 },
    CreateStreamResponse { transaction_id: f64, stream_id: u32 },
    OnStatus { stream_id: u32, level: String, code: String, description: String },
    Command { stream_id: u32, command: RtmpCommand },
    Metadata { stream_id: u32, payload: Vec<u8> },
    Audio { packet: AvPacket, first: bool },
    Video { packet: AvPacket, first: bool },
}

impl OutboundMessage {
    /// onStatus helper with the usual status level
    pub fn on_status(stream_id: u32, code: &str, description: &str) -> Self {
        OutboundMessage::OnStatus {
            stream_id,
            level: LEVEL_STATUS.to_string(),
            code: code.to_string(),
            description: description.to_string(),
        }
    }

    /// Build the wire-ready header, payload and first-chunk form.
    /// `session_stream_id` fills in the message stream id for AV
    /// payloads, which belong to the stream bound at createStream time.
    pub fn into_parts(self, session_stream_id: u32) -> Result<(RtmpHeader, Vec<u8>, FirstChunk)> {
        let parts = match self {
            OutboundMessage::SetChunkSize(size) => control(ControlMessage::SetChunkSize(size)),
            OutboundMessage::Acknowledgement(seq) => control(ControlMessage::Acknowledgement(seq)),
            OutboundMessage::WindowAckSize(size) => control(ControlMessage::WindowAckSize(size)),
            OutboundMessage::SetPeerBandwidth { window, limit } => {
                control(ControlMessage::SetPeerBandwidth { window, limit })
            }
            OutboundMessage::StreamBegin(stream_id) => {
                control(ControlMessage::UserControl(UserControlEvent::StreamBegin(stream_id)))
            }
            OutboundMessage::StreamEof(stream_id) => {
                control(ControlMessage::UserControl(UserControlEvent::StreamEof(stream_id)))
            }
            OutboundMessage::StreamIsRecorded(stream_id) => control(ControlMessage::UserControl(
                UserControlEvent::StreamIsRecorded(stream_id),
            )),
            OutboundMessage::SetBufferLength { stream_id, buffer_ms } => {
                control(ControlMessage::UserControl(UserControlEvent::SetBufferLength {
                    stream_id,
                    buffer_ms,
                }))
            }
            OutboundMessage::PingRequest(ts) => {
                control(ControlMessage::UserControl(UserControlEvent::PingRequest(ts)))
            }
            OutboundMessage::PingResponse(ts) => {
                control(ControlMessage::UserControl(UserControlEvent::PingResponse(ts)))
            }
            OutboundMessage::ConnectResponse { transaction_id, object_encoding } => {
                let properties = amf0_object([
                    ("fmsVer", Amf0Value::String("FMS/3,5,3,888".to_string())),
                    ("capabilities", Amf0Value::Number(31.0)),
                    ("mode", Amf0Value::Number(1.0)),
                ]);
                let information = amf0_object([
                    ("level", Amf0Value::String(LEVEL_STATUS.to_string())),
                    ("code", Amf0Value::String(CODE_CONNECT_SUCCESS.to_string())),
                    (
                        "description",
                        Amf0Value::String("Connection succeeded.".to_string()),
                    ),
                    ("objectEncoding", Amf0Value::Number(object_encoding)),
                ]);
                let body = RtmpCommand::result(transaction_id, properties, information).encode()?;
                (RtmpHeader::command(body.len() as u32, 0), body, FirstChunk::Full)
            }
            OutboundMessage::CreateStreamResponse { transaction_id, stream_id } => {
                let body = RtmpCommand::result(
                    transaction_id,
                    Amf0Value::Null,
                    Amf0Value::Number(stream_id as f64),
                )
                .encode()?;
                (RtmpHeader::command(body.len() as u32, 0), body, FirstChunk::Full)
            }
            OutboundMessage::OnStatus { stream_id, level, code, description } => {
                let body = RtmpCommand::on_status(&level, &code, &description).encode()?;
                (
                    RtmpHeader::command(body.len() as u32, stream_id),
                    body,
                    FirstChunk::Full,
                )
            }
            OutboundMessage::Command { stream_id, command } => {
                let body = command.encode()?;
                (
                    RtmpHeader::command(body.len() as u32, stream_id),
                    body,
                    FirstChunk::Full,
                )
            }
            OutboundMessage::Metadata { stream_id, payload } => (
                RtmpHeader::data(payload.len() as u32, stream_id),
                payload,
                FirstChunk::Full,
            ),
            OutboundMessage::Audio { packet, first } => (
                RtmpHeader::audio(
                    packet.timestamp,
                    packet.payload.len() as u32,
                    session_stream_id,
                ),
                packet.payload,
                first_chunk(first),
            ),
            OutboundMessage::Video { packet, first } => (
                RtmpHeader::video(
                    packet.timestamp,
                    packet.payload.len() as u32,
                    session_stream_id,
                ),
                packet.payload,
                first_chunk(first),
            ),
        };
        Ok(parts)
    }
}

fn control(message: ControlMessage) -> (RtmpHeader, Vec<u8>, FirstChunk) {
    let (message_type, payload) = message.encode();
    (
        RtmpHeader::control(message_type, payload.len() as u32),
        payload,
        FirstChunk::Full,
    )
}

fn first_chunk(first: bool) -> FirstChunk {
    if first { FirstChunk::Full } else { FirstChunk::Delta }
}
