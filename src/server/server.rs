use crate::handshake::server_handshake;
use crate::message::{
    CODE_PLAY_RESET, CODE_PLAY_START, CODE_PLAY_STOP, CODE_PLAY_STREAM_NOT_FOUND,
    CODE_PUBLISH_BAD_NAME, CODE_PUBLISH_START, CODE_UNPUBLISH_SUCCESS, LEVEL_ERROR,
    OutboundMessage,
};
use crate::protocol::constants::BW_LIMIT_DYNAMIC;
use crate::protocol::{AvPacket, RtmpCommand};
use crate::server::config::ServerConfig;
use crate::server::registry::{MediaFrame, StreamRegistry};
use crate::session::RtmpSession;
use crate::{Error, Result};
use log::{debug, info, warn};
use std::io::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{broadcast, watch};
use tokio::time::timeout;
use uuid::Uuid;

type ServerSession = RtmpSession<OwnedReadHalf, OwnedWriteHalf>;

/// TCP front end: accepts connections and runs one task per
/// connection through handshake, command negotiation and the
/// publish/play loops. All chunk-stream state lives inside each
/// task's session; only the stream registry is shared.
pub struct RtmpServer {
    config: Arc<ServerConfig>,
    registry: Arc<StreamRegistry>,
    connections: Arc<AtomicUsize>,
    shutdown_tx: watch::Sender<bool>,
}

impl RtmpServer {
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        RtmpServer {
            config: Arc::new(config),
            registry: Arc::new(StreamRegistry::new()),
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<StreamRegistry> {
        self.registry.clone()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Signal the accept loop to stop
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Accept connections until shutdown
    pub async fn listen(&self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::session(format!("Failed to bind {}: {}", addr, e)))?;
        info!("RTMP server listening on {}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = shutdown_rx.changed() => break,
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("accept error: {}", e);
                        continue;
                    }
                },
            };

            if self.connections.load(Ordering::SeqCst) >= self.config.max_connections {
                warn!("connection limit reached, rejecting {}", peer_addr);
                drop(stream);
                continue;
            }

            let config = self.config.clone();
            let registry = self.registry.clone();
            let connections = self.connections.clone();
            connections.fetch_add(1, Ordering::SeqCst);

            tokio::spawn(async move {
                let conn_id = Uuid::new_v4().to_string();
                info!("connection {} accepted from {}", conn_id, peer_addr);

                match serve_connection(&config, &registry, stream, &conn_id).await {
                    Ok(()) => info!("connection {} closed", conn_id),
                    Err(e) if is_clean_close(&e) => {
                        info!("connection {} disconnected", conn_id)
                    }
                    Err(e) => warn!("connection {} failed: {}", conn_id, e),
                }

                connections.fetch_sub(1, Ordering::SeqCst);
            });
        }

        info!("RTMP server stopped");
        Ok(())
    }
}

/// A peer hanging up mid-read is the normal end of a connection, not a
/// failure worth warning about
fn is_clean_close(error: &Error) -> bool {
    match error {
        Error::Io(e) => matches!(
            e.kind(),
            ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::BrokenPipe
        ),
        _ => false,
    }
}

async fn serve_connection(
    config: &ServerConfig,
    registry: &Arc<StreamRegistry>,
    stream: TcpStream,
    conn_id: &str,
) -> Result<()> {
    if let Err(e) = stream.set_nodelay(true) {
        warn!("connection {}: failed to set TCP_NODELAY: {}", conn_id, e);
    }

    let (mut read_half, mut write_half) = stream.into_split();
    timeout(
        config.idle_timeout,
        server_handshake(&mut read_half, &mut write_half),
    )
    .await
    .map_err(|_| Error::handshake("handshake timed out"))??;
    debug!("connection {}: handshake complete", conn_id);

    let mut session = RtmpSession::new(read_half, write_half);
    let mut next_stream_id = 1u32;

    // Command negotiation until the connection commits to a role
    loop {
        let message = timeout(config.idle_timeout, session.recv_message())
            .await
            .map_err(|_| Error::session("connection idle"))??;

        if !message.is_command() {
            debug!(
                "connection {}: ignoring message type {} during negotiation",
                conn_id,
                message.message_type()
            );
            continue;
        }

        let command = RtmpCommand::decode(&message.payload)?;
        debug!("connection {}: command '{}'", conn_id, command.name);

        match command.name.as_str() {
            "connect" => handle_connect(config, &mut session, &command).await?,
            "createStream" => {
                let stream_id = next_stream_id;
                next_stream_id += 1;
                session.set_stream_id(stream_id);
                session
                    .send(OutboundMessage::CreateStreamResponse {
                        transaction_id: command.transaction_id,
                        stream_id,
                    })
                    .await?;
            }
            "publish" => return run_publisher(config, registry, &mut session, &command, conn_id).await,
            "play" => return run_player(config, registry, &mut session, &command, conn_id).await,
            "deleteStream" | "closeStream" => return Ok(()),
            other => debug!("connection {}: ignoring command '{}'", conn_id, other),
        }
    }
}

async fn handle_connect(
    config: &ServerConfig,
    session: &mut ServerSession,
    command: &RtmpCommand,
) -> Result<()> {
    let object_encoding = command
        .command_object
        .as_ref()
        .and_then(|obj| obj.get_property("objectEncoding"))
        .and_then(|v| v.as_number())
        .unwrap_or(0.0);
    if let Some(app) = command
        .command_object
        .as_ref()
        .and_then(|obj| obj.get_property("app"))
        .and_then(|v| v.as_string())
    {
        debug!("connect to app '{}'", app);
    }

    session
        .send(OutboundMessage::WindowAckSize(config.window_ack_size))
        .await?;
    session
        .send(OutboundMessage::SetPeerBandwidth {
            window: config.peer_bandwidth,
            limit: BW_LIMIT_DYNAMIC,
        })
        .await?;
    session.announce_chunk_size(config.chunk_size).await?;
    session
        .send(OutboundMessage::ConnectResponse {
            transaction_id: command.transaction_id,
            object_encoding,
        })
        .await?;
    Ok(())
}

async fn run_publisher(
    config: &ServerConfig,
    registry: &Arc<StreamRegistry>,
    session: &mut ServerSession,
    command: &RtmpCommand,
    conn_id: &str,
) -> Result<()> {
    let name = command
        .first_string_argument()
        .ok_or_else(|| Error::protocol("publish without a stream name"))?
        .to_string();
    let stream_id = session.state().stream_id;

    if let Err(e) = registry.publish(&name).await {
        warn!("connection {}: cannot publish '{}': {}", conn_id, name, e);
        session
            .send(OutboundMessage::OnStatus {
                stream_id,
                level: LEVEL_ERROR.to_string(),
                code: CODE_PUBLISH_BAD_NAME.to_string(),
                description: format!("Stream '{}' is already being published.", name),
            })
            .await?;
        return Err(e);
    }

    info!("connection {}: publishing '{}'", conn_id, name);
    session
        .send(OutboundMessage::on_status(
            stream_id,
            CODE_PUBLISH_START,
            &format!("Publishing '{}'.", name),
        ))
        .await?;

    let result = publisher_loop(config, registry, session, &name).await;
    registry.unpublish(&name).await;
    info!("connection {}: stopped publishing '{}'", conn_id, name);
    result
}

async fn publisher_loop(
    config: &ServerConfig,
    registry: &Arc<StreamRegistry>,
    session: &mut ServerSession,
    name: &str,
) -> Result<()> {
    loop {
        let message = timeout(config.idle_timeout, session.recv_message())
            .await
            .map_err(|_| Error::session("publisher idle"))??;

        if message.is_audio() {
            let frame = MediaFrame::Audio(AvPacket::new(message.timestamp(), message.payload));
            registry.broadcast(name, frame).await;
        } else if message.is_video() {
            let frame = MediaFrame::Video(AvPacket::new(message.timestamp(), message.payload));
            registry.broadcast(name, frame).await;
        } else if message.is_data() {
            registry.broadcast(name, MediaFrame::Metadata(message.payload)).await;
        } else if message.is_command() {
            let command = RtmpCommand::decode(&message.payload)?;
            match command.name.as_str() {
                "deleteStream" | "closeStream" | "FCUnpublish" => {
                    let stream_id = session.state().stream_id;
                    session
                        .send(OutboundMessage::on_status(
                            stream_id,
                            CODE_UNPUBLISH_SUCCESS,
                            "Stream ended.",
                        ))
                        .await?;
                    return Ok(());
                }
                other => debug!("ignoring command '{}' while publishing", other),
            }
        } else {
            debug!("ignoring message type {} while publishing", message.message_type());
        }
    }
}

enum PlayerStep {
    Frame(std::result::Result<MediaFrame, broadcast::error::RecvError>),
    Socket(Result<()>),
}

async fn run_player(
    _config: &ServerConfig,
    registry: &Arc<StreamRegistry>,
    session: &mut ServerSession,
    command: &RtmpCommand,
    conn_id: &str,
) -> Result<()> {
    let name = command
        .first_string_argument()
        .ok_or_else(|| Error::protocol("play without a stream name"))?
        .to_string();
    let stream_id = session.state().stream_id;

    let Some((init_frames, mut rx)) = registry.subscribe(&name).await else {
        warn!("connection {}: no publisher for '{}'", conn_id, name);
        session
            .send(OutboundMessage::OnStatus {
                stream_id,
                level: LEVEL_ERROR.to_string(),
                code: CODE_PLAY_STREAM_NOT_FOUND.to_string(),
                description: format!("Stream '{}' not found.", name),
            })
            .await?;
        return Ok(());
    };

    info!("connection {}: playing '{}'", conn_id, name);
    session.send(OutboundMessage::StreamBegin(stream_id)).await?;
    session
        .send(OutboundMessage::on_status(
            stream_id,
            CODE_PLAY_RESET,
            &format!("Resetting '{}'.", name),
        ))
        .await?;
    session
        .send(OutboundMessage::on_status(
            stream_id,
            CODE_PLAY_START,
            &format!("Started playing '{}'.", name),
        ))
        .await?;

    // First packet of each kind carries a full header; the rest ride
    // on timestamp deltas
    let mut first_audio = true;
    let mut first_video = true;
    for frame in init_frames {
        send_frame(session, frame, &mut first_audio, &mut first_video).await?;
    }

    loop {
        // The select arms borrow the receiver and the session
        // disjointly; the follow-up work happens after the step is
        // chosen so the session is free again
        let step = tokio::select! {
            frame = rx.recv() => PlayerStep::Frame(frame),
            ready = session.readable() => PlayerStep::Socket(ready),
        };

        match step {
            PlayerStep::Frame(Ok(frame)) => {
                send_frame(session, frame, &mut first_audio, &mut first_video).await?;
            }
            PlayerStep::Frame(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                warn!(
                    "connection {}: dropped {} frames of '{}' (slow consumer)",
                    conn_id, skipped, name
                );
            }
            PlayerStep::Frame(Err(broadcast::error::RecvError::Closed)) => {
                session.send(OutboundMessage::StreamEof(stream_id)).await?;
                session
                    .send(OutboundMessage::on_status(
                        stream_id,
                        CODE_PLAY_STOP,
                        "Stream ended.",
                    ))
                    .await?;
                return Ok(());
            }
            PlayerStep::Socket(ready) => {
                ready?;
                let message = session.recv_message().await?;
                if message.is_command() {
                    let command = RtmpCommand::decode(&message.payload)?;
                    match command.name.as_str() {
                        "deleteStream" | "closeStream" => return Ok(()),
                        other => debug!("ignoring command '{}' while playing", other),
                    }
                } else {
                    debug!("ignoring message type {} while playing", message.message_type());
                }
            }
        }
    }
}

async fn send_frame(
    session: &mut ServerSession,
    frame: MediaFrame,
    first_audio: &mut bool,
    first_video: &mut bool,
) -> Result<()> {
    match frame {
        MediaFrame::Audio(packet) => {
            let first = std::mem::replace(first_audio, false);
            session.send(OutboundMessage::Audio { packet, first }).await
        }
        MediaFrame::Video(packet) => {
            let first = std::mem::replace(first_video, false);
            session.send(OutboundMessage::Video { packet, first }).await
        }
        MediaFrame::Metadata(payload) => {
            let stream_id = session.state().stream_id;
            session
                .send(OutboundMessage::Metadata { stream_id, payload })
                .await
        }
    }
}
