use crate::protocol::AvPacket;
use crate::{Error, Result};
use log::debug;
use std::collections::HashMap;
use tokio::sync::{RwLock, broadcast};

/// One media unit relayed from a publisher to its players
#[derive(Debug, Clone)]
pub enum MediaFrame {
    Audio(AvPacket),
    Video(AvPacket),
    Metadata(Vec<u8>),
}

/// Fan-out point for one published stream. Init frames (metadata and
/// codec sequence headers) are cached so late joiners can start
/// decoding.
struct StreamHub {
    sender: broadcast::Sender<MediaFrame>,
    metadata: Option<Vec<u8>>,
    audio_header: Option<AvPacket>,
    video_header: Option<AvPacket>,
}

impl StreamHub {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        StreamHub {
            sender,
            metadata: None,
            audio_header: None,
            video_header: None,
        }
    }

    fn init_frames(&self) -> Vec<MediaFrame> {
        let mut frames = Vec::new();
        if let Some(meta) = &self.metadata {
            frames.push(MediaFrame::Metadata(meta.clone()));
        }
        if let Some(packet) = &self.video_header {
            frames.push(MediaFrame::Video(packet.clone()));
        }
        if let Some(packet) = &self.audio_header {
            frames.push(MediaFrame::Audio(packet.clone()));
        }
        frames
    }
}

/// AAC sequence header: AAC codec id in the high nibble, packet type 0
fn is_audio_sequence_header(payload: &[u8]) -> bool {
    payload.len() >= 2 && payload[0] >> 4 == 10 && payload[1] == 0
}

/// AVC sequence header: keyframe + AVC codec id, packet type 0
fn is_video_sequence_header(payload: &[u8]) -> bool {
    payload.len() >= 2 && payload[0] == 0x17 && payload[1] == 0
}

/// Maps stream names to their publishers' fan-out hubs. Shared by all
/// connection tasks; the chunk engine itself never touches this.
pub struct StreamRegistry {
    streams: RwLock<HashMap<String, StreamHub>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        StreamRegistry {
            streams: RwLock::new(HashMap::new()),
        }
    }

    /// Claim a stream name for publishing
    pub async fn publish(&self, name: &str) -> Result<()> {
        let mut streams = self.streams.write().await;
        if streams.contains_key(name) {
            return Err(Error::stream(format!(
                "Stream '{}' is already being published",
                name
            )));
        }
        streams.insert(name.to_string(), StreamHub::new());
        Ok(())
    }

    /// Release a stream name; closes every player's receiver
    pub async fn unpublish(&self, name: &str) {
        self.streams.write().await.remove(name);
    }

    pub async fn is_publishing(&self, name: &str) -> bool {
        self.streams.read().await.contains_key(name)
    }

    /// Fan a frame out to all players, caching init frames for late
    /// joiners
    pub async fn broadcast(&self, name: &str, frame: MediaFrame) {
        let mut streams = self.streams.write().await;
        let Some(hub) = streams.get_mut(name) else {
            return;
        };

        match &frame {
            MediaFrame::Metadata(payload) => hub.metadata = Some(payload.clone()),
            MediaFrame::Audio(packet) if is_audio_sequence_header(&packet.payload) => {
                hub.audio_header = Some(packet.clone())
            }
            MediaFrame::Video(packet) if is_video_sequence_header(&packet.payload) => {
                hub.video_header = Some(packet.clone())
            }
            _ => {}
        }

        // A send error just means no player is currently subscribed
        if hub.sender.send(frame).is_err() {
            debug!("stream '{}' has no players", name);
        }
    }

    /// Attach a player: cached init frames plus a live receiver, or
    /// None if nobody publishes under this name
    pub async fn subscribe(
        &self,
        name: &str,
    ) -> Option<(Vec<MediaFrame>, broadcast::Receiver<MediaFrame>)> {
        let streams = self.streams.read().await;
        let hub = streams.get(name)?;
        Some((hub.init_frames(), hub.sender.subscribe()))
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        StreamRegistry::new()
    }
}
