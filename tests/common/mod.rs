// Shared helpers: a minimal client role used to exercise the server,
// built from the same session engine.

use rtmp::{
    OutboundMessage, Result, RtmpCommand, RtmpMessage, RtmpServer, RtmpSession, ServerConfig,
    client_handshake,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::{sleep, timeout};

pub type ClientSession = RtmpSession<OwnedReadHalf, OwnedWriteHalf>;

/// Start a server on the given port and wait until it accepts
pub async fn start_server(port: u16) -> Arc<RtmpServer> {
    let config = ServerConfig::builder()
        .host("127.0.0.1")
        .port(port)
        .chunk_size(4096)
        .build()
        .expect("valid test config");

    let server = Arc::new(RtmpServer::new(config));
    let listener = server.clone();
    tokio::spawn(async move { listener.listen().await });

    for _ in 0..50 {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return server;
        }
        sleep(Duration::from_millis(50)).await;
    }
    panic!("server did not start on port {}", port);
}

/// Dial the server and complete the handshake
pub async fn connect_client(port: u16) -> Result<ClientSession> {
    let stream = TcpStream::connect(("127.0.0.1", port)).await?;
    let (mut reader, mut writer) = stream.into_split();
    client_handshake(&mut reader, &mut writer).await?;
    Ok(RtmpSession::new(reader, writer))
}

/// Read messages until the next command, decoding it
pub async fn recv_command(session: &mut ClientSession) -> Result<RtmpCommand> {
    loop {
        let message = recv_message(session).await?;
        if message.is_command() {
            return RtmpCommand::decode(&message.payload);
        }
    }
}

pub async fn recv_message(session: &mut ClientSession) -> Result<RtmpMessage> {
    timeout(Duration::from_secs(5), session.recv_message())
        .await
        .expect("recv_message timed out")
}

/// connect + createStream negotiation; returns the allocated stream id
pub async fn negotiate(session: &mut ClientSession, app: &str) -> Result<u32> {
    let tc_url = format!("rtmp://127.0.0.1/{}", app);
    session
        .send(OutboundMessage::Command {
            stream_id: 0,
            command: RtmpCommand::connect(app, &tc_url),
        })
        .await?;
    let result = recv_command(session).await?;
    assert_eq!(result.name, "_result", "connect must succeed");

    session
        .send(OutboundMessage::Command {
            stream_id: 0,
            command: RtmpCommand::create_stream(2.0),
        })
        .await?;
    let result = recv_command(session).await?;
    assert_eq!(result.name, "_result", "createStream must succeed");
    let stream_id = result.arguments[0]
        .as_number()
        .expect("createStream result carries the stream id") as u32;

    session.set_stream_id(stream_id);
    Ok(stream_id)
}
