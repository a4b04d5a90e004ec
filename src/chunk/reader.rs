use crate::chunk::header::{read_basic_header, read_message_header, resolve_header};
use crate::chunk::stream::ChunkStreamContext;
use crate::protocol::RtmpMessage;
use crate::protocol::constants::DEFAULT_CHUNK_SIZE;
use crate::{Error, Result};
use log::trace;
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reassembles the interleaved chunk stream into logical messages.
/// Owns one assembly context per chunk stream id and the negotiated
/// read chunk size.
pub struct ChunkReader {
    streams: HashMap<u32, ChunkStreamContext>,
    chunk_size: usize,

    /// Wire bytes consumed since the last `take_bytes_read`, feeding
    /// the session's acknowledgement window
    bytes_read: u64,
}

impl ChunkReader {
    pub fn new() -> Self {
        ChunkReader {
            streams: HashMap::new(),
            chunk_size: DEFAULT_CHUNK_SIZE as usize,
            bytes_read: 0,
        }
    }

    /// Renegotiate the incoming chunk size (Set Chunk Size message)
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size;
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Discard the partial message on a chunk stream (Abort message)
    pub fn abort(&mut self, chunk_stream_id: u32) {
        if let Some(ctx) = self.streams.get_mut(&chunk_stream_id) {
            ctx.discard_partial();
        }
    }

    /// Drain the wire-byte counter
    pub fn take_bytes_read(&mut self) -> u64 {
        std::mem::take(&mut self.bytes_read)
    }

    /// Read chunks until one logical message completes. Chunks from
    /// other chunk streams may interleave freely; their partial bodies
    /// accumulate in their own contexts.
    pub async fn read_message<R: AsyncRead + Unpin>(&mut self, reader: &mut R) -> Result<RtmpMessage> {
        loop {
            if let Some(message) = self.read_chunk(reader).await? {
                return Ok(message);
            }
        }
    }

    async fn read_chunk<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut R,
    ) -> Result<Option<RtmpMessage>> {
        let (format, csid, consumed) = read_basic_header(reader).await?;
        self.bytes_read += consumed as u64;

        let ctx = self.streams.entry(csid).or_default();

        // While a message is in progress on this id only continuation
        // chunks are legal
        if format != 3 && ctx.is_assembling() {
            return Err(Error::chunk(format!(
                "incomplete body for chunk stream {}",
                csid
            )));
        }

        if !ctx.is_assembling() {
            let (fields, consumed) = read_message_header(reader, format).await?;
            self.bytes_read += consumed as u64;
            let header = resolve_header(fields, csid, ctx)?;
            trace!(
                "chunk stream {}: new message type={} len={} ts={}",
                csid, header.message_type, header.message_length, header.timestamp
            );
            ctx.begin(header);
        }

        let want = self.chunk_size.min(ctx.bytes_remaining());
        let mut data = vec![0u8; want];
        reader.read_exact(&mut data).await?;
        self.bytes_read += want as u64;

        Ok(ctx.push(&data))
    }
}

impl Default for ChunkReader {
    fn default() -> Self {
        ChunkReader::new()
    }
}
