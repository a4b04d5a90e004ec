use crate::utils::{calculate_hmac_sha256, current_timestamp, generate_random_bytes};
use crate::{ByteBuffer, Error, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// RTMP version byte carried in C0/S0
pub const RTMP_VERSION: u8 = 3;

/// Size of the C1/S1/C2/S2 packets
pub const HANDSHAKE_SIZE: usize = 1536;

/// FMS version bytes a digest-style C1 carries
const FMS_VERSION: [u8; 4] = [0x05, 0x00, 0x01, 0x01];

/// HMAC key for the S1 digest
const SERVER_DIGEST_KEY: &[u8] = b"Genuine Adobe Flash Media Server 001";

/// Client hello: C0 (version) + C1 (time, zero, random payload)
#[derive(Debug, Clone)]
pub struct C0C1 {
    pub version: u8,
    pub timestamp: u32,
    pub zero: u32,
    pub random: Vec<u8>,
}

impl C0C1 {
    pub fn create_client() -> Self {
        C0C1 {
            version: RTMP_VERSION,
            timestamp: current_timestamp(),
            zero: 0,
            random: generate_random_bytes(HANDSHAKE_SIZE - 8),
        }
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 1 + HANDSHAKE_SIZE {
            return Err(Error::handshake(format!(
                "C0+C1 too short: {} bytes",
                data.len()
            )));
        }
        let version = data[0];
        if version != RTMP_VERSION {
            return Err(Error::handshake(format!(
                "Unsupported RTMP version: {}",
                version
            )));
        }

        let mut buffer = ByteBuffer::new(data[1..1 + HANDSHAKE_SIZE].to_vec());
        let timestamp = buffer.read_u32_be()?;
        let zero = buffer.read_u32_be()?;
        let random = buffer.read_bytes(HANDSHAKE_SIZE - 8)?;

        Ok(C0C1 {
            version,
            timestamp,
            zero,
            random,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = ByteBuffer::with_capacity(1 + HANDSHAKE_SIZE);
        let _ = buffer.write_u8(self.version);
        let _ = buffer.write_u32_be(self.timestamp);
        let _ = buffer.write_u32_be(self.zero);
        let _ = buffer.write_bytes(&self.random);
        buffer.into_vec()
    }

    /// Digest-style C1s carry the FMS version bytes at one of two
    /// fixed offsets in the random section
    pub fn offers_digest(&self) -> bool {
        self.random.len() >= 768
            && (self.random[0..4] == FMS_VERSION || self.random[764..768] == FMS_VERSION)
    }
}

/// Server reply: S0 (version) + S1 (our time + random) + S2 (echo of C1)
#[derive(Debug, Clone)]
pub struct S0S1S2 {
    pub version: u8,
    pub s1_timestamp: u32,
    pub s1_random: Vec<u8>,
    pub s2_timestamp: u32,
    pub s2_timestamp2: u32,
    pub s2_random_echo: Vec<u8>,
}

impl S0S1S2 {
    pub fn generate(c0c1: &C0C1) -> Self {
        let mut s1_random = generate_random_bytes(HANDSHAKE_SIZE - 8);
        if c0c1.offers_digest() {
            let digest = calculate_hmac_sha256(SERVER_DIGEST_KEY, &s1_random[0..32]);
            s1_random[0..32].copy_from_slice(&digest);
        }

        S0S1S2 {
            version: RTMP_VERSION,
            s1_timestamp: current_timestamp(),
            s1_random,
            s2_timestamp: c0c1.timestamp,
            s2_timestamp2: current_timestamp(),
            s2_random_echo: c0c1.random.clone(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = ByteBuffer::with_capacity(1 + HANDSHAKE_SIZE * 2);
        let _ = buffer.write_u8(self.version);
        let _ = buffer.write_u32_be(self.s1_timestamp);
        let _ = buffer.write_u32_be(0);
        let _ = buffer.write_bytes(&self.s1_random);
        let _ = buffer.write_u32_be(self.s2_timestamp);
        let _ = buffer.write_u32_be(self.s2_timestamp2);
        let _ = buffer.write_bytes(&self.s2_random_echo);
        buffer.into_vec()
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 1 + HANDSHAKE_SIZE * 2 {
            return Err(Error::handshake(format!(
                "S0+S1+S2 too short: {} bytes",
                data.len()
            )));
        }
        let version = data[0];
        if version != RTMP_VERSION {
            return Err(Error::handshake(format!(
                "Unsupported RTMP version: {}",
                version
            )));
        }

        let mut s1 = ByteBuffer::new(data[1..1 + HANDSHAKE_SIZE].to_vec());
        let s1_timestamp = s1.read_u32_be()?;
        let _zero = s1.read_u32_be()?;
        let s1_random = s1.read_bytes(HANDSHAKE_SIZE - 8)?;

        let mut s2 = ByteBuffer::new(data[1 + HANDSHAKE_SIZE..1 + HANDSHAKE_SIZE * 2].to_vec());
        let s2_timestamp = s2.read_u32_be()?;
        let s2_timestamp2 = s2.read_u32_be()?;
        let s2_random_echo = s2.read_bytes(HANDSHAKE_SIZE - 8)?;

        Ok(S0S1S2 {
            version,
            s1_timestamp,
            s1_random,
            s2_timestamp,
            s2_timestamp2,
            s2_random_echo,
        })
    }
}

/// Handshake finale: C2 must echo S1's timestamp and random payload
#[derive(Debug, Clone)]
pub struct C2 {
    pub timestamp: u32,
    pub timestamp2: u32,
    pub random_echo: Vec<u8>,
}

impl C2 {
    pub fn create_from_s1(s0s1s2: &S0S1S2) -> Self {
        C2 {
            timestamp: s0s1s2.s1_timestamp,
            timestamp2: current_timestamp(),
            random_echo: s0s1s2.s1_random.clone(),
        }
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HANDSHAKE_SIZE {
            return Err(Error::handshake(format!("C2 too short: {} bytes", data.len())));
        }
        let mut buffer = ByteBuffer::new(data.to_vec());
        let timestamp = buffer.read_u32_be()?;
        let timestamp2 = buffer.read_u32_be()?;
        let random_echo = buffer.read_bytes(HANDSHAKE_SIZE - 8)?;
        Ok(C2 {
            timestamp,
            timestamp2,
            random_echo,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = ByteBuffer::with_capacity(HANDSHAKE_SIZE);
        let _ = buffer.write_u32_be(self.timestamp);
        let _ = buffer.write_u32_be(self.timestamp2);
        let _ = buffer.write_bytes(&self.random_echo);
        buffer.into_vec()
    }

    pub fn validate(&self, s0s1s2: &S0S1S2) -> Result<()> {
        if self.timestamp != s0s1s2.s1_timestamp {
            return Err(Error::handshake("C2 timestamp mismatch"));
        }
        if self.random_echo != s0s1s2.s1_random {
            return Err(Error::handshake("C2 random echo mismatch"));
        }
        Ok(())
    }
}

/// Run the server side of the handshake over a transport
pub async fn server_handshake<R, W>(reader: &mut R, writer: &mut W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut c0c1_buf = vec![0u8; 1 + HANDSHAKE_SIZE];
    reader.read_exact(&mut c0c1_buf).await?;
    let c0c1 = C0C1::parse(&c0c1_buf)?;

    let s0s1s2 = S0S1S2::generate(&c0c1);
    writer.write_all(&s0s1s2.encode()).await?;
    writer.flush().await?;

    let mut c2_buf = vec![0u8; HANDSHAKE_SIZE];
    reader.read_exact(&mut c2_buf).await?;
    C2::parse(&c2_buf)?.validate(&s0s1s2)?;

    Ok(())
}

/// Run the client side of the handshake over a transport
pub async fn client_handshake<R, W>(reader: &mut R, writer: &mut W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let c0c1 = C0C1::create_client();
    writer.write_all(&c0c1.encode()).await?;
    writer.flush().await?;

    let mut s_buf = vec![0u8; 1 + HANDSHAKE_SIZE * 2];
    reader.read_exact(&mut s_buf).await?;
    let s0s1s2 = S0S1S2::parse(&s_buf)?;

    let c2 = C2::create_from_s1(&s0s1s2);
    writer.write_all(&c2.encode()).await?;
    writer.flush().await?;

    Ok(())
}
