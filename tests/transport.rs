#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Connection-driver tests over in-memory duplex streams.
//! The driver is generic over the byte stream, so the full read/handle/reply
//! path runs here without sockets.

use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use mqtt_gateway_core::auth::{build_connection_credentials, CredentialValidator};
use mqtt_gateway_core::protocol::connection::Event;
use mqtt_gateway_core::transport::drive_connection;
use mqtt_gateway_core::MqttCodec;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

const SECRET: &str = "transport-signature-key";

fn push_string(dst: &mut Vec<u8>, value: &str) {
    dst.extend_from_slice(&(value.len() as u16).to_be_bytes());
    dst.extend_from_slice(value.as_bytes());
}

fn connect_bytes(keep_alive_secs: u16) -> Vec<u8> {
    let creds = build_connection_credentials(
        "G",
        "AA:BB:CC:DD:EE:FF",
        "u1",
        &json!({}),
        SECRET,
    );

    let mut var = Vec::new();
    push_string(&mut var, "MQTT");
    var.push(4);
    var.push(0x80 | 0x40 | 0x02); // username + password + clean session
    var.extend_from_slice(&keep_alive_secs.to_be_bytes());
    push_string(&mut var, &creds.client_id);
    push_string(&mut var, &creds.username);
    push_string(&mut var, &creds.password);

    let mut frame = vec![0x10, var.len() as u8];
    frame.extend_from_slice(&var);
    frame
}

fn spawn_driver(
    server: tokio::io::DuplexStream,
) -> (tokio::task::JoinHandle<()>, mpsc::Receiver<Event>) {
    let (events_tx, events_rx) = mpsc::channel(16);
    let validator = CredentialValidator::new(Some(SECRET.to_string()));
    let driver = tokio::spawn(drive_connection(server, validator, 1024 * 1024, events_tx));
    (driver, events_rx)
}

#[tokio::test]
async fn test_connect_gets_connack_and_event() {
    let (client, server) = tokio::io::duplex(4096);
    let (driver, mut events) = spawn_driver(server);

    let mut client = Framed::new(client, MqttCodec::default());
    client
        .send(Bytes::from(connect_bytes(60)))
        .await
        .expect("write connect");

    let reply = client.next().await.expect("reply").expect("well-formed");
    assert_eq!(reply.as_bytes(), &[0x20, 0x02, 0x00, 0x00]);

    let Some(Event::Connect(info)) = events.recv().await else {
        panic!("expected a connect event");
    };
    assert_eq!(info.keep_alive_millis, 90_000);

    drop(client);
    driver.await.expect("driver exits cleanly");
}

#[tokio::test]
async fn test_connect_trickled_in_chunks_still_completes() {
    // The CONNECT arrives one piece at a time with pauses in between; the
    // driver must keep accumulating and answer once the frame completes.
    let (mut client, server) = tokio::io::duplex(4096);
    let (driver, mut events) = spawn_driver(server);

    let frame = connect_bytes(60);
    for piece in frame.chunks(7) {
        client.write_all(piece).await.expect("write chunk");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let mut connack = [0u8; 4];
    client.read_exact(&mut connack).await.expect("read connack");
    assert_eq!(&connack, &[0x20, 0x02, 0x00, 0x00]);
    assert!(matches!(events.recv().await, Some(Event::Connect(_))));

    drop(client);
    driver.await.expect("driver exits cleanly");
}

#[tokio::test]
async fn test_disconnect_ends_the_driver() {
    let (mut client, server) = tokio::io::duplex(4096);
    let (driver, mut events) = spawn_driver(server);

    client
        .write_all(&connect_bytes(60))
        .await
        .expect("write connect");
    let mut connack = [0u8; 4];
    client.read_exact(&mut connack).await.expect("read connack");

    client
        .write_all(&[0xE0, 0x00])
        .await
        .expect("write disconnect");

    assert!(matches!(events.recv().await, Some(Event::Connect(_))));
    assert!(matches!(events.recv().await, Some(Event::Disconnect)));

    // The driver exits on its own without the client hanging up.
    driver.await.expect("driver exits cleanly");
    assert!(events.recv().await.is_none());
}

#[tokio::test]
async fn test_malformed_length_tears_down_the_connection() {
    let (mut client, server) = tokio::io::duplex(4096);
    let (driver, mut events) = spawn_driver(server);

    client
        .write_all(&[0x30, 0x80, 0x80, 0x80, 0x80])
        .await
        .expect("write malformed length");

    assert!(matches!(events.recv().await, Some(Event::ProtocolError(_))));
    driver.await.expect("driver exits cleanly");
}
