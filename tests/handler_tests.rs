//! Echo handler tests — drives `EchoServer` against detached sockets and
//! inspects the frames it queues.

use serde_json::{Value, json};
use sio_protocol::{EnginePacket, Events, Packet, PacketType, Payload};
use sio_server::{ACK_VALUES, EchoServer};
use sio_transport::{AckHandle, Event, EventHandler, Socket, TransportError};
use tokio::sync::mpsc::UnboundedReceiver;

fn decode(frame: &str) -> Packet {
    match EnginePacket::decode(frame).unwrap() {
        EnginePacket::Message(body) => Packet::decode(&body).unwrap(),
        other => panic!("expected a message frame, got {other:?}"),
    }
}

fn drain(rx: &mut UnboundedReceiver<String>) -> Vec<Packet> {
    let mut packets = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        packets.push(decode(&frame));
    }
    packets
}

fn echoed_text(packet: Packet) -> Value {
    assert_eq!(packet.kind, PacketType::Event);
    let (name, args) = packet.into_event().unwrap();
    assert_eq!(name, Events::FROM_SERVER);
    assert_eq!(args.len(), 1);
    args.into_iter().next().unwrap()
}

async fn send_msg(socket: &Socket, args: Vec<Value>, ack_id: Option<u64>) -> Result<(), TransportError> {
    let ack = ack_id.map(|id| AckHandle::new(id, socket.clone()));
    EchoServer::new()
        .on_event(socket, Event::new(Events::MSG, args, ack))
        .await
}

// ─────────────────────────────────────────────────────────────────────────────
// Echo
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn echoes_string_without_ack() {
    let (socket, mut rx) = Socket::detached("s1");
    send_msg(&socket, vec![json!("hello")], None).await.unwrap();

    let packets = drain(&mut rx);
    assert_eq!(packets.len(), 1);
    assert_eq!(echoed_text(packets.into_iter().next().unwrap()), json!("hello"));
}

#[tokio::test]
async fn echoes_number_as_text() {
    let (socket, mut rx) = Socket::detached("s1");
    send_msg(&socket, vec![json!(42)], None).await.unwrap();

    let packets = drain(&mut rx);
    assert_eq!(echoed_text(packets.into_iter().next().unwrap()), json!("42"));
}

#[tokio::test]
async fn echoes_missing_payload_as_undefined() {
    let (socket, mut rx) = Socket::detached("s1");
    send_msg(&socket, vec![], None).await.unwrap();

    let packets = drain(&mut rx);
    assert_eq!(echoed_text(packets.into_iter().next().unwrap()), json!("undefined"));
}

#[tokio::test]
async fn echoes_only_first_argument() {
    let (socket, mut rx) = Socket::detached("s1");
    send_msg(&socket, vec![json!({"a": 1}), json!("ignored")], None)
        .await
        .unwrap();

    let packets = drain(&mut rx);
    assert_eq!(packets.len(), 1);
    assert_eq!(
        echoed_text(packets.into_iter().next().unwrap()),
        json!("[object Object]")
    );
}

#[test]
fn on_message_is_synchronous() {
    let (socket, mut rx) = Socket::detached("s1");
    EchoServer::new()
        .on_message(&socket, Payload::Value(json!(true)), None)
        .unwrap();
    let packets = drain(&mut rx);
    assert_eq!(echoed_text(packets.into_iter().next().unwrap()), json!("true"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Acknowledgement
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ack_is_sent_once_before_echo() {
    let (socket, mut rx) = Socket::detached("s1");
    send_msg(&socket, vec![json!("hello")], Some(7)).await.unwrap();

    let packets = drain(&mut rx);
    assert_eq!(packets.len(), 2);

    let ack = &packets[0];
    assert_eq!(ack.kind, PacketType::Ack);
    assert_eq!(ack.id, Some(7));
    assert_eq!(ack.data, Some(json!([1, 2, 3])));

    assert_eq!(echoed_text(packets[1].clone()), json!("hello"));
}

#[tokio::test]
async fn ack_values_do_not_depend_on_payload() {
    for payload in [json!(null), json!("x"), json!([9, 9]), json!({"k": "v"})] {
        let (socket, mut rx) = Socket::detached("s1");
        send_msg(&socket, vec![payload], Some(0)).await.unwrap();

        let packets = drain(&mut rx);
        let expected: Vec<Value> = ACK_VALUES.into_iter().map(Value::from).collect();
        assert_eq!(packets[0].data, Some(Value::Array(expected)));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Other events and lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn other_events_are_ignored() {
    let (socket, mut rx) = Socket::detached("s1");
    let ack = AckHandle::new(1, socket.clone());
    EchoServer::new()
        .on_event(&socket, Event::new("chat", vec![json!("hi")], Some(ack)))
        .await
        .unwrap();
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn connect_emits_nothing() {
    let (socket, mut rx) = Socket::detached("s1");
    EchoServer::new().on_connect(&socket).await;
    assert!(drain(&mut rx).is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Failures
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn echo_to_closed_socket_fails() {
    let (socket, rx) = Socket::detached("gone");
    drop(rx);
    assert!(socket.is_closed());

    let err = send_msg(&socket, vec![json!("hello")], None).await.unwrap_err();
    match err {
        TransportError::ConnectionClosed { socket_id } => assert_eq!(socket_id, "gone"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn ack_to_closed_socket_fails() {
    let (socket, rx) = Socket::detached("gone");
    drop(rx);
    let result = send_msg(&socket, vec![json!("hello")], Some(3)).await;
    assert!(matches!(result, Err(TransportError::ConnectionClosed { .. })));
}

#[test]
fn reserved_events_cannot_be_emitted() {
    let (socket, mut rx) = Socket::detached("s1");
    let err = socket.emit(Events::DISCONNECT, json!("x")).unwrap_err();
    assert!(matches!(err, TransportError::ReservedEvent(name) if name == "disconnect"));
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn detached_socket_is_on_default_namespace() {
    let (socket, _rx) = Socket::detached("s1");
    assert_eq!(socket.id(), "s1");
    assert_eq!(socket.namespace(), "/");
}
