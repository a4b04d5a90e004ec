// Session-level tests driving the chunk engine over an in-memory
// duplex transport: one side is a real session, the other writes and
// reads raw chunk-framed bytes so control traffic can be observed.

use rtmp::{
    AvPacket, ChunkReader, ChunkWriter, ControlMessage, Error, FirstChunk, OutboundMessage,
    RtmpCommand, RtmpHeader, RtmpMessage, RtmpSession, UserControlEvent,
    CHUNK_STREAM_AUDIO, MSG_TYPE_ACK, MSG_TYPE_AUDIO, MSG_TYPE_USER_CONTROL,
};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf, duplex, split};
use tokio::time::timeout;

type TestSession = RtmpSession<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

/// A session wired to a raw peer end we can poke bytes through
fn session_with_raw_peer() -> (TestSession, DuplexStream) {
    let (raw, peer) = duplex(64 * 1024);
    let (reader, writer) = split(peer);
    (RtmpSession::new(reader, writer), raw)
}

/// Two fully-wired sessions talking to each other
fn session_pair() -> (TestSession, TestSession) {
    let (a, b) = duplex(64 * 1024);
    let (ar, aw) = split(a);
    let (br, bw) = split(b);
    (RtmpSession::new(ar, aw), RtmpSession::new(br, bw))
}

fn audio_message(timestamp: u32, payload_len: usize) -> (RtmpHeader, Vec<u8>) {
    let payload = vec![0x2Au8; payload_len];
    (
        RtmpHeader::audio(timestamp, payload_len as u32, 1),
        payload,
    )
}

fn control_wire(writer: &mut ChunkWriter, control: ControlMessage) -> Vec<u8> {
    let (message_type, payload) = control.encode();
    let header = RtmpHeader::control(message_type, payload.len() as u32);
    writer.encode_message(&header, &payload, FirstChunk::Full)
}

async fn recv(session: &mut TestSession) -> rtmp::Result<RtmpMessage> {
    timeout(Duration::from_secs(5), session.recv_message())
        .await
        .expect("recv_message timed out")
}

#[tokio::test]
async fn test_av_round_trip_between_sessions() {
    let (mut sender, mut receiver) = session_pair();
    sender.set_stream_id(1);

    let packet = AvPacket::new(40, (0..20).collect());
    sender
        .send(OutboundMessage::Audio {
            packet: packet.clone(),
            first: true,
        })
        .await
        .unwrap();

    let msg = recv(&mut receiver).await.unwrap();
    assert!(msg.is_audio());
    assert_eq!(msg.timestamp(), 40);
    assert_eq!(msg.message_stream_id(), 1);
    assert_eq!(msg.header.message_length, 20);
    assert_eq!(msg.payload, packet.payload);
}

#[tokio::test]
async fn test_command_round_trip_between_sessions() {
    let (mut sender, mut receiver) = session_pair();

    sender
        .send(OutboundMessage::ConnectResponse {
            transaction_id: 1.0,
            object_encoding: 0.0,
        })
        .await
        .unwrap();

    let msg = recv(&mut receiver).await.unwrap();
    assert!(msg.is_command());
    let cmd = RtmpCommand::decode(&msg.payload).unwrap();
    assert_eq!(cmd.name, "_result");
    assert_eq!(cmd.transaction_id, 1.0);
}

#[tokio::test]
async fn test_set_chunk_size_is_absorbed_and_applied() {
    let (mut session, mut raw) = session_with_raw_peer();
    let mut chunks = ChunkWriter::new();

    let wire = control_wire(&mut chunks, ControlMessage::SetChunkSize(4096));
    raw.write_all(&wire).await.unwrap();

    // A 1000-byte message framed at the renegotiated size arrives in
    // one chunk; the session must have applied the new size already
    chunks.set_chunk_size(4096);
    let (header, payload) = audio_message(0, 1000);
    let wire = chunks.encode_message(&header, &payload, FirstChunk::Full);
    raw.write_all(&wire).await.unwrap();

    let msg = recv(&mut session).await.unwrap();
    assert!(msg.is_audio(), "control message must never surface");
    assert_eq!(msg.payload.len(), 1000);
    assert_eq!(session.read_chunk_size(), 4096);
}

#[tokio::test]
async fn test_window_ack_size_updates_bandwidth() {
    let (mut session, mut raw) = session_with_raw_peer();
    let mut chunks = ChunkWriter::new();

    let wire = control_wire(&mut chunks, ControlMessage::WindowAckSize(1234));
    raw.write_all(&wire).await.unwrap();
    let (header, payload) = audio_message(0, 10);
    let wire = chunks.encode_message(&header, &payload, FirstChunk::Full);
    raw.write_all(&wire).await.unwrap();

    let msg = recv(&mut session).await.unwrap();
    assert!(msg.is_audio());
    assert_eq!(session.state().bandwidth, 1234);
}

#[tokio::test]
async fn test_ping_request_answered_with_pong() {
    let (mut session, mut raw) = session_with_raw_peer();
    let mut chunks = ChunkWriter::new();

    let wire = control_wire(
        &mut chunks,
        ControlMessage::UserControl(UserControlEvent::PingRequest(777)),
    );
    raw.write_all(&wire).await.unwrap();
    let (header, payload) = audio_message(0, 4);
    let wire = chunks.encode_message(&header, &payload, FirstChunk::Full);
    raw.write_all(&wire).await.unwrap();

    let msg = recv(&mut session).await.unwrap();
    assert!(msg.is_audio());

    let mut reader = ChunkReader::new();
    let reply = reader.read_message(&mut raw).await.unwrap();
    assert_eq!(reply.message_type(), MSG_TYPE_USER_CONTROL);
    match ControlMessage::decode(reply.message_type(), &reply.payload).unwrap() {
        Some(ControlMessage::UserControl(UserControlEvent::PingResponse(ts))) => {
            assert_eq!(ts, 777)
        }
        other => panic!("expected pong, got {:?}", other),
    }
}

#[tokio::test]
async fn test_abort_discards_partial_message() {
    let (mut session, mut raw) = session_with_raw_peer();

    // First chunk of a 200-byte message on the audio chunk stream
    let header = RtmpHeader::audio(0, 200, 1);
    let mut wire = rtmp::encode_basic_header(0, CHUNK_STREAM_AUDIO);
    wire.extend(rtmp::encode_type0_header(&header, 200));
    wire.extend_from_slice(&[0u8; 128]);
    raw.write_all(&wire).await.unwrap();

    // Abort that chunk stream, then start a fresh message on it
    let mut chunks = ChunkWriter::new();
    let wire = control_wire(&mut chunks, ControlMessage::Abort(CHUNK_STREAM_AUDIO));
    raw.write_all(&wire).await.unwrap();

    let (header, payload) = audio_message(50, 10);
    let mut fresh = ChunkWriter::new();
    let wire = fresh.encode_message(&header, &payload, FirstChunk::Full);
    raw.write_all(&wire).await.unwrap();

    let msg = recv(&mut session).await.unwrap();
    assert!(msg.is_audio());
    assert_eq!(msg.payload.len(), 10);
    assert_eq!(msg.timestamp(), 50);
}

#[tokio::test]
async fn test_framing_violation_is_fatal() {
    let (mut session, mut raw) = session_with_raw_peer();

    let header = RtmpHeader::audio(0, 200, 1);
    let mut wire = rtmp::encode_basic_header(0, CHUNK_STREAM_AUDIO);
    wire.extend(rtmp::encode_type0_header(&header, 200));
    wire.extend_from_slice(&[0u8; 128]);
    // A second type-0 header on the same id while the body is short
    let (header, payload) = audio_message(50, 10);
    let mut fresh = ChunkWriter::new();
    wire.extend(fresh.encode_message(&header, &payload, FirstChunk::Full));
    raw.write_all(&wire).await.unwrap();

    let err = timeout(Duration::from_secs(5), session.recv_message())
        .await
        .expect("recv_message timed out")
        .unwrap_err();
    match err {
        Error::Chunk(msg) => assert!(msg.contains("incomplete body"), "got: {}", msg),
        other => panic!("expected chunk error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_read_window_triggers_single_acknowledgement() {
    let (mut session, mut raw) = session_with_raw_peer();
    session.state_mut().bandwidth = 1000;

    // One full-header message (112 wire bytes) and ten delta messages
    // (108 each); the window trips at 1084 cumulative bytes, on entry
    // to the eleventh read
    let mut chunks = ChunkWriter::new();
    let mut wire_totals = Vec::new();
    for i in 0..11u32 {
        let (header, payload) = audio_message(i * 40, 100);
        let first = if i == 0 { FirstChunk::Full } else { FirstChunk::Delta };
        let wire = chunks.encode_message(&header, &payload, first);
        wire_totals.push(wire.len() as u32);
        raw.write_all(&wire).await.unwrap();
    }

    for _ in 0..11 {
        let msg = recv(&mut session).await.unwrap();
        assert!(msg.is_audio());
    }

    let bytes_before_trip: u32 = wire_totals[..10].iter().sum();
    assert!(bytes_before_trip >= 1000);
    assert_eq!(session.state().total_read, bytes_before_trip);
    assert_eq!(session.state().read_seq, wire_totals[10]);

    // Exactly one acknowledgement, carrying the cumulative total
    let mut reader = ChunkReader::new();
    let ack = reader.read_message(&mut raw).await.unwrap();
    assert_eq!(ack.message_type(), MSG_TYPE_ACK);
    assert_eq!(ack.payload, bytes_before_trip.to_be_bytes().to_vec());

    let no_more = timeout(Duration::from_millis(100), reader.read_message(&mut raw)).await;
    assert!(no_more.is_err(), "only one acknowledgement may be sent");
}

#[tokio::test]
async fn test_write_window_injects_ack_and_ping() {
    let (mut session, mut raw) = session_with_raw_peer();
    session.state_mut().bandwidth = 500;
    session.set_stream_id(1);

    for i in 0..10u32 {
        let packet = AvPacket::new(i * 40, vec![0x55u8; 100]);
        session
            .send(OutboundMessage::Audio {
                packet,
                first: i == 0,
            })
            .await
            .unwrap();
    }

    // 112 + 4 * 108 = 544 > 500 after five sends, so the sixth send is
    // preceded by an acknowledgement and a ping request
    let mut reader = ChunkReader::new();
    let mut kinds = Vec::new();
    for _ in 0..12 {
        let msg = timeout(Duration::from_secs(5), reader.read_message(&mut raw))
            .await
            .expect("peer read timed out")
            .unwrap();
        kinds.push((msg.message_type(), msg.payload.clone()));
    }

    let audio_count = kinds.iter().filter(|(ty, _)| *ty == MSG_TYPE_AUDIO).count();
    assert_eq!(audio_count, 10);
    assert_eq!(kinds[5].0, MSG_TYPE_ACK);
    assert_eq!(kinds[5].1, 544u32.to_be_bytes().to_vec());
    assert_eq!(kinds[6].0, MSG_TYPE_USER_CONTROL);
    match ControlMessage::decode(kinds[6].0, &kinds[6].1).unwrap() {
        Some(ControlMessage::UserControl(UserControlEvent::PingRequest(_))) => {}
        other => panic!("expected ping request, got {:?}", other),
    }
}

#[tokio::test]
async fn test_announce_chunk_size_reframes_output() {
    let (mut session, mut raw) = session_with_raw_peer();
    session.set_stream_id(1);

    session.announce_chunk_size(4096).await.unwrap();
    assert_eq!(session.write_chunk_size(), 4096);

    // A 1000-byte frame now fits one chunk on the wire
    let packet = AvPacket::new(0, vec![1u8; 1000]);
    session
        .send(OutboundMessage::Audio { packet, first: true })
        .await
        .unwrap();

    let mut reader = ChunkReader::new();
    let announcement = reader.read_message(&mut raw).await.unwrap();
    match ControlMessage::decode(announcement.message_type(), &announcement.payload).unwrap() {
        Some(ControlMessage::SetChunkSize(size)) => {
            assert_eq!(size, 4096);
            reader.set_chunk_size(size as usize);
        }
        other => panic!("expected set chunk size, got {:?}", other),
    }

    let audio = reader.read_message(&mut raw).await.unwrap();
    assert_eq!(audio.payload.len(), 1000);
}
