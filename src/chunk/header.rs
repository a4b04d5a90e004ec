use crate::chunk::stream::ChunkStreamContext;
use crate::protocol::constants::EXTENDED_TIMESTAMP;
use crate::protocol::RtmpHeader;
use crate::{Error, Result};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Wire fields of a chunk message header before resolution against the
/// chunk stream's prior header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageHeaderFields {
    /// Type 0: absolute timestamp, length, type, message stream id
    Full {
        timestamp: u32,
        message_length: u32,
        message_type: u8,
        message_stream_id: u32,
    },
    /// Type 1: delta, length, type; stream id inherited
    Medium {
        timestamp_delta: u32,
        message_length: u32,
        message_type: u8,
    },
    /// Type 2: delta only
    Short { timestamp_delta: u32 },
    /// Type 3: everything inherited
    None,
}

/// Read the 1-3 byte basic header. Returns (format, chunk stream id,
/// bytes consumed). Ids 0 and 1 in the low 6 bits are encoding escapes
/// extending the id range from 64.
pub async fn read_basic_header<R: AsyncRead + Unpin>(reader: &mut R) -> Result<(u8, u32, usize)> {
    let first = reader.read_u8().await?;
    let format = (first >> 6) & 0x03;
    match first & 0x3F {
        0 => {
            let b = reader.read_u8().await?;
            Ok((format, 64 + b as u32, 2))
        }
        1 => {
            let mut b = [0u8; 2];
            reader.read_exact(&mut b).await?;
            Ok((format, 64 + b[0] as u32 + 256 * b[1] as u32, 3))
        }
        n => Ok((format, n as u32, 1)),
    }
}

/// Encode the shortest legal basic header for a chunk stream id
pub fn encode_basic_header(format: u8, chunk_stream_id: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(3);
    if chunk_stream_id <= 63 {
        out.push((format << 6) | chunk_stream_id as u8);
    } else if chunk_stream_id <= 319 {
        out.push(format << 6);
        out.push((chunk_stream_id - 64) as u8);
    } else {
        out.push((format << 6) | 1);
        let id = chunk_stream_id - 64;
        out.push((id & 0xFF) as u8);
        out.push((id >> 8) as u8);
    }
    out
}

async fn read_u24_be<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u32> {
    let mut b = [0u8; 3];
    reader.read_exact(&mut b).await?;
    Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
}

/// A 24-bit field equal to 0xFFFFFF is followed by the real 32-bit
/// value; this applies to absolute timestamps and deltas alike.
async fn read_timestamp_field<R: AsyncRead + Unpin>(
    reader: &mut R,
    raw: u32,
) -> Result<(u32, usize)> {
    if raw == EXTENDED_TIMESTAMP {
        let mut b = [0u8; 4];
        reader.read_exact(&mut b).await?;
        Ok((u32::from_be_bytes(b), 4))
    } else {
        Ok((raw, 0))
    }
}

/// Read the message header for the given chunk format. Returns the raw
/// fields and the number of bytes consumed.
pub async fn read_message_header<R: AsyncRead + Unpin>(
    reader: &mut R,
    format: u8,
) -> Result<(MessageHeaderFields, usize)> {
    match format {
        0 => {
            let raw_ts = read_u24_be(reader).await?;
            let message_length = read_u24_be(reader).await?;
            let message_type = reader.read_u8().await?;
            let mut sid = [0u8; 4];
            reader.read_exact(&mut sid).await?;
            let message_stream_id = u32::from_le_bytes(sid);
            let (timestamp, ext) = read_timestamp_field(reader, raw_ts).await?;
            Ok((
                MessageHeaderFields::Full {
                    timestamp,
                    message_length,
                    message_type,
                    message_stream_id,
                },
                11 + ext,
            ))
        }
        1 => {
            let raw_delta = read_u24_be(reader).await?;
            let message_length = read_u24_be(reader).await?;
            let message_type = reader.read_u8().await?;
            let (timestamp_delta, ext) = read_timestamp_field(reader, raw_delta).await?;
            Ok((
                MessageHeaderFields::Medium {
                    timestamp_delta,
                    message_length,
                    message_type,
                },
                7 + ext,
            ))
        }
        2 => {
            let raw_delta = read_u24_be(reader).await?;
            let (timestamp_delta, ext) = read_timestamp_field(reader, raw_delta).await?;
            Ok((MessageHeaderFields::Short { timestamp_delta }, 3 + ext))
        }
        3 => Ok((MessageHeaderFields::None, 0)),
        n => Err(Error::chunk(format!("Invalid chunk format: {}", n))),
    }
}

/// Resolve raw header fields into an absolute header using the chunk
/// stream's prior header, and update the cached delta used by type-3
/// chunks that start a new message.
pub fn resolve_header(
    fields: MessageHeaderFields,
    chunk_stream_id: u32,
    ctx: &mut ChunkStreamContext,
) -> Result<RtmpHeader> {
    let header = match fields {
        MessageHeaderFields::Full {
            timestamp,
            message_length,
            message_type,
            message_stream_id,
        } => {
            ctx.cached_delta = 0;
            RtmpHeader::new(
                timestamp,
                message_length,
                message_type,
                message_stream_id,
                chunk_stream_id,
            )
        }
        MessageHeaderFields::Medium {
            timestamp_delta,
            message_length,
            message_type,
        } => {
            let prev = prior_header(ctx, chunk_stream_id)?;
            ctx.cached_delta = timestamp_delta;
            RtmpHeader::new(
                prev.timestamp.wrapping_add(timestamp_delta),
                message_length,
                message_type,
                prev.message_stream_id,
                chunk_stream_id,
            )
        }
        MessageHeaderFields::Short { timestamp_delta } => {
            let prev = prior_header(ctx, chunk_stream_id)?;
            ctx.cached_delta = timestamp_delta;
            RtmpHeader::new(
                prev.timestamp.wrapping_add(timestamp_delta),
                prev.message_length,
                prev.message_type,
                prev.message_stream_id,
                chunk_stream_id,
            )
        }
        MessageHeaderFields::None => {
            // A type-3 chunk starting a new message repeats the delta
            // of the last type-1/2 header on this id; after a type-0
            // header the cached delta is zero and the timestamp is
            // inherited verbatim.
            let prev = prior_header(ctx, chunk_stream_id)?;
            RtmpHeader::new(
                prev.timestamp.wrapping_add(ctx.cached_delta),
                prev.message_length,
                prev.message_type,
                prev.message_stream_id,
                chunk_stream_id,
            )
        }
    };
    ctx.prev_header = Some(header);
    Ok(header)
}

fn prior_header(ctx: &ChunkStreamContext, chunk_stream_id: u32) -> Result<RtmpHeader> {
    ctx.prev_header.ok_or_else(|| {
        Error::chunk(format!(
            "Compressed header without prior header on chunk stream {}",
            chunk_stream_id
        ))
    })
}

fn push_timestamp_field(out: &mut Vec<u8>, value: u32) {
    let field = value.min(EXTENDED_TIMESTAMP);
    out.push((field >> 16) as u8);
    out.push((field >> 8) as u8);
    out.push(field as u8);
}

fn push_extended_timestamp(out: &mut Vec<u8>, value: u32) {
    if value >= EXTENDED_TIMESTAMP {
        out.extend_from_slice(&value.to_be_bytes());
    }
}

/// Encode an 11-byte type-0 message header (plus extended timestamp)
pub fn encode_type0_header(header: &RtmpHeader, message_length: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(15);
    push_timestamp_field(&mut out, header.timestamp);
    out.push((message_length >> 16) as u8);
    out.push((message_length >> 8) as u8);
    out.push(message_length as u8);
    out.push(header.message_type);
    out.extend_from_slice(&header.message_stream_id.to_le_bytes());
    push_extended_timestamp(&mut out, header.timestamp);
    out
}

/// Encode a 7-byte type-1 message header (plus extended timestamp).
/// Length and type are always re-encoded: they are not guaranteed
/// constant between messages on a chunk stream.
pub fn encode_type1_header(timestamp_delta: u32, message_length: u32, message_type: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(11);
    push_timestamp_field(&mut out, timestamp_delta);
    out.push((message_length >> 16) as u8);
    out.push((message_length >> 8) as u8);
    out.push(message_length as u8);
    out.push(message_type);
    push_extended_timestamp(&mut out, timestamp_delta);
    out
}

/// Encode a 3-byte type-2 message header (plus extended timestamp)
pub fn encode_type2_header(timestamp_delta: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(7);
    push_timestamp_field(&mut out, timestamp_delta);
    push_extended_timestamp(&mut out, timestamp_delta);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_header_one_byte() {
        let bytes = encode_basic_header(0, 4);
        assert_eq!(bytes, vec![0x04]);
        let (fmt, csid, n) = read_basic_header(&mut bytes.as_slice()).await.unwrap();
        assert_eq!((fmt, csid, n), (0, 4, 1));
    }

    #[tokio::test]
    async fn test_basic_header_two_byte() {
        let bytes = encode_basic_header(3, 100);
        assert_eq!(bytes, vec![0xC0, 36]);
        let (fmt, csid, n) = read_basic_header(&mut bytes.as_slice()).await.unwrap();
        assert_eq!((fmt, csid, n), (3, 100, 2));
    }

    #[tokio::test]
    async fn test_basic_header_three_byte() {
        let bytes = encode_basic_header(1, 1000);
        assert_eq!(bytes[0], (1 << 6) | 1);
        let (fmt, csid, n) = read_basic_header(&mut bytes.as_slice()).await.unwrap();
        assert_eq!((fmt, csid, n), (1, 1000, 3));

        // Boundary of the two-byte form
        let bytes = encode_basic_header(0, 319);
        assert_eq!(bytes.len(), 2);
        let (_, csid, _) = read_basic_header(&mut bytes.as_slice()).await.unwrap();
        assert_eq!(csid, 319);
    }

    #[tokio::test]
    async fn test_type0_header_round_trip() {
        let header = RtmpHeader::audio(40, 20, 5);
        let bytes = encode_type0_header(&header, 20);
        assert_eq!(bytes.len(), 11);

        let (fields, n) = read_message_header(&mut bytes.as_slice(), 0).await.unwrap();
        assert_eq!(n, 11);
        assert_eq!(
            fields,
            MessageHeaderFields::Full {
                timestamp: 40,
                message_length: 20,
                message_type: crate::MSG_TYPE_AUDIO,
                message_stream_id: 5,
            }
        );
    }

    #[tokio::test]
    async fn test_extended_timestamp_at_boundary() {
        // Exactly 0xFFFFFF must use the 4-byte extension
        let header = RtmpHeader::video(0xFFFFFF, 1, 1);
        let bytes = encode_type0_header(&header, 1);
        assert_eq!(bytes.len(), 15);

        let (fields, n) = read_message_header(&mut bytes.as_slice(), 0).await.unwrap();
        assert_eq!(n, 15);
        match fields {
            MessageHeaderFields::Full { timestamp, .. } => assert_eq!(timestamp, 0xFFFFFF),
            other => panic!("unexpected fields: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extended_timestamp_below_boundary() {
        // 0xFFFFFE fits in 24 bits and must not trigger the extension
        let header = RtmpHeader::video(0xFFFFFE, 1, 1);
        let bytes = encode_type0_header(&header, 1);
        assert_eq!(bytes.len(), 11);

        let (fields, _) = read_message_header(&mut bytes.as_slice(), 0).await.unwrap();
        match fields {
            MessageHeaderFields::Full { timestamp, .. } => assert_eq!(timestamp, 0xFFFFFE),
            other => panic!("unexpected fields: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_type2_extended_delta() {
        let bytes = encode_type2_header(0x0100_0000);
        assert_eq!(bytes.len(), 7);
        let (fields, n) = read_message_header(&mut bytes.as_slice(), 2).await.unwrap();
        assert_eq!(n, 7);
        assert_eq!(
            fields,
            MessageHeaderFields::Short {
                timestamp_delta: 0x0100_0000
            }
        );
    }

    #[test]
    fn test_resolve_delta_headers() {
        let mut ctx = ChunkStreamContext::new();
        let full = MessageHeaderFields::Full {
            timestamp: 100,
            message_length: 10,
            message_type: crate::MSG_TYPE_AUDIO,
            message_stream_id: 1,
        };
        let h0 = resolve_header(full, 4, &mut ctx).unwrap();
        assert_eq!(h0.timestamp, 100);

        let medium = MessageHeaderFields::Medium {
            timestamp_delta: 40,
            message_length: 12,
            message_type: crate::MSG_TYPE_AUDIO,
        };
        let h1 = resolve_header(medium, 4, &mut ctx).unwrap();
        assert_eq!(h1.timestamp, 140);
        assert_eq!(h1.message_stream_id, 1);
        assert_eq!(h1.message_length, 12);

        // Type 3 starting a new message repeats the last delta
        let h3 = resolve_header(MessageHeaderFields::None, 4, &mut ctx).unwrap();
        assert_eq!(h3.timestamp, 180);
        assert_eq!(h3.message_length, 12);
    }

    #[test]
    fn test_resolve_type3_after_full_header_inherits_verbatim() {
        let mut ctx = ChunkStreamContext::new();
        let full = MessageHeaderFields::Full {
            timestamp: 500,
            message_length: 8,
            message_type: crate::MSG_TYPE_VIDEO,
            message_stream_id: 1,
        };
        resolve_header(full, 6, &mut ctx).unwrap();
        let h3 = resolve_header(MessageHeaderFields::None, 6, &mut ctx).unwrap();
        assert_eq!(h3.timestamp, 500);
    }

    #[test]
    fn test_resolve_without_prior_header_fails() {
        let mut ctx = ChunkStreamContext::new();
        let medium = MessageHeaderFields::Medium {
            timestamp_delta: 1,
            message_length: 1,
            message_type: crate::MSG_TYPE_AUDIO,
        };
        assert!(resolve_header(medium, 4, &mut ctx).is_err());
        assert!(resolve_header(MessageHeaderFields::None, 4, &mut ctx).is_err());
    }
}
