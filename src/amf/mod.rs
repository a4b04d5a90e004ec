mod amf0;
mod decoder;
mod encoder;

pub use amf0::*;
pub use decoder::*;
pub use encoder::*;

use crate::Result;

/// Encode a sequence of values into one AMF0 payload
pub fn encode_values(values: &[Amf0Value]) -> Result<Vec<u8>> {
    let mut encoder = Amf0Encoder::new();
    for value in values {
        encoder.encode(value)?;
    }
    Ok(encoder.into_bytes())
}

/// Decode every value in an AMF0 payload
pub fn decode_values(data: &[u8]) -> Result<Vec<Amf0Value>> {
    let mut buffer = crate::ByteBuffer::new(data.to_vec());
    let mut decoder = Amf0Decoder::new(&mut buffer);
    let mut values = Vec::new();
    while decoder.has_remaining() {
        values.push(decoder.decode()?);
    }
    Ok(values)
}
