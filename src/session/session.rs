use crate::chunk::{ChunkReader, ChunkWriter};
use crate::message::OutboundMessage;
use crate::protocol::{ControlMessage, RtmpMessage, UserControlEvent};
use crate::session::state::SessionState;
use crate::utils::current_timestamp;
use crate::{Error, Result};
use log::debug;
use std::io::{Error as IoError, ErrorKind};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader, BufWriter};

/// The chunk-stream engine for one connection: assembler, serializer
/// and negotiated state behind a buffered transport. Owned by exactly
/// one task; all methods take `&mut self`, so no locking exists here.
pub struct RtmpSession<R, W> {
    reader: BufReader<R>,
    writer: BufWriter<W>,
    chunks_in: ChunkReader,
    chunks_out: ChunkWriter,
    state: SessionState,
}

impl<R, W> RtmpSession<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        RtmpSession {
            reader: BufReader::new(reader),
            writer: BufWriter::new(writer),
            chunks_in: ChunkReader::new(),
            chunks_out: ChunkWriter::new(),
            state: SessionState::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    /// Bind the message stream id negotiated by createStream
    pub fn set_stream_id(&mut self, stream_id: u32) {
        self.state.stream_id = stream_id;
    }

    pub fn read_chunk_size(&self) -> usize {
        self.chunks_in.chunk_size()
    }

    pub fn write_chunk_size(&self) -> usize {
        self.chunks_out.chunk_size()
    }

    /// Tell the peer our chunk size and switch the serializer over.
    /// The announcement itself is framed at the old size.
    pub async fn announce_chunk_size(&mut self, size: u32) -> Result<()> {
        self.send(OutboundMessage::SetChunkSize(size)).await?;
        self.chunks_out.set_chunk_size(size as usize);
        Ok(())
    }

    /// Read the next application-level message. Protocol control
    /// messages are applied to the session and never surface; the
    /// loop (not recursion, the input controls its depth) continues
    /// until an application message or a terminal error.
    pub async fn recv_message(&mut self) -> Result<RtmpMessage> {
        loop {
            self.maybe_send_read_ack().await?;

            let message = self.chunks_in.read_message(&mut self.reader).await?;
            let consumed = self.chunks_in.take_bytes_read() as u32;
            self.state.read_seq = self.state.read_seq.wrapping_add(consumed);

            match ControlMessage::decode(message.message_type(), &message.payload)? {
                Some(control) => self.apply_control(control).await?,
                None => return Ok(message),
            }
        }
    }

    /// Send one message, first interleaving the acknowledgement/ping
    /// cycle if the write window tripped. A single send may therefore
    /// put up to three messages on the wire.
    pub async fn send(&mut self, message: OutboundMessage) -> Result<()> {
        self.maybe_flush_write_window().await?;
        self.write_outbound(message).await
    }

    /// Await incoming data without consuming any. Used to multiplex
    /// the transport against a media channel from a single task.
    /// Returns an error on EOF.
    pub async fn readable(&mut self) -> Result<()> {
        let buf = self.reader.fill_buf().await?;
        if buf.is_empty() {
            return Err(Error::Io(IoError::new(
                ErrorKind::UnexpectedEof,
                "connection closed",
            )));
        }
        Ok(())
    }

    async fn apply_control(&mut self, control: ControlMessage) -> Result<()> {
        match control {
            ControlMessage::SetChunkSize(size) => {
                debug!("peer set chunk size to {}", size);
                self.chunks_in.set_chunk_size(size as usize);
            }
            ControlMessage::Abort(csid) => {
                debug!("peer aborted chunk stream {}", csid);
                self.chunks_in.abort(csid);
            }
            ControlMessage::Acknowledgement(seq) => {
                debug!("peer acknowledged {} bytes", seq);
            }
            ControlMessage::UserControl(UserControlEvent::PingRequest(ts)) => {
                self.send(OutboundMessage::PingResponse(ts)).await?;
            }
            ControlMessage::UserControl(event) => {
                debug!("user control event consumed: {:?}", event);
            }
            ControlMessage::WindowAckSize(size) => {
                debug!("peer window acknowledgement size {}", size);
                self.state.bandwidth = size;
            }
            ControlMessage::SetPeerBandwidth { window, limit } => {
                debug!("peer bandwidth {} (limit type {})", window, limit);
                self.state.bandwidth = window;
            }
        }
        Ok(())
    }

    async fn maybe_send_read_ack(&mut self) -> Result<()> {
        if self.state.read_seq >= self.state.bandwidth {
            self.state.total_read = self.state.total_read.wrapping_add(self.state.read_seq);
            self.state.read_seq = 0;
            let total = self.state.total_read;
            self.send(OutboundMessage::Acknowledgement(total)).await?;
        }
        Ok(())
    }

    async fn maybe_flush_write_window(&mut self) -> Result<()> {
        if self.state.write_seq > self.state.bandwidth {
            self.state.total_write = self.state.total_write.wrapping_add(self.state.write_seq);
            self.state.write_seq = 0;
            let total = self.state.total_write;
            self.write_outbound(OutboundMessage::Acknowledgement(total)).await?;
            self.write_outbound(OutboundMessage::PingRequest(current_timestamp()))
                .await?;
        }
        Ok(())
    }

    async fn write_outbound(&mut self, message: OutboundMessage) -> Result<()> {
        let (header, payload, first) = message.into_parts(self.state.stream_id)?;
        let written = self
            .chunks_out
            .write_message(&mut self.writer, &header, &payload, first)
            .await?;
        self.state.write_seq = self.state.write_seq.wrapping_add(written as u32);
        Ok(())
    }
}
