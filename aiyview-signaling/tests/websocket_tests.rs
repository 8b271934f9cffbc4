//! Control channel tests against a loopback uv4l-style WebSocket server

mod common;

use aiyview_signaling::{
    CallOptions, ClientMessage, ControlChannel, ServerMessage, SignalingClient, SignalingState,
    WebSocketChannel,
};
use common::{candidate, offer, MockPeer};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Serve one connection: wait for `call`, push an offer and two candidates the
/// way uv4l encodes them, then report every frame received until close.
async fn start_fake_uv4l() -> (SocketAddr, oneshot::Receiver<Vec<Value>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (done_tx, done_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let mut received = Vec::new();

        while let Some(Ok(frame)) = ws.next().await {
            let text = match frame {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            let value: Value = serde_json::from_str(&text).unwrap();
            let what = value["what"].as_str().unwrap_or_default().to_string();
            received.push(value);

            match what.as_str() {
                "call" => {
                    // Candidates may arrive ahead of the offer
                    let early = ServerMessage::IceCandidate(Some(candidate(1)));
                    ws.send(Message::Text(early.to_json().unwrap())).await.unwrap();
                    ws.send(Message::Text("{garbage".to_string())).await.unwrap();
                    let offer = ServerMessage::Offer(offer());
                    ws.send(Message::Text(offer.to_json().unwrap())).await.unwrap();
                }
                "answer" => {
                    let batch = ServerMessage::IceCandidates {
                        candidates: vec![candidate(2), candidate(3)],
                        malformed: 0,
                    };
                    ws.send(Message::Text(batch.to_json().unwrap())).await.unwrap();
                    let done = ServerMessage::IceCandidate(None);
                    ws.send(Message::Text(done.to_json().unwrap())).await.unwrap();
                }
                "hangup" => {}
                _ => {}
            }
        }

        let _ = done_tx.send(received);
    });

    (addr, done_rx)
}

#[tokio::test]
async fn test_full_exchange_over_websocket() {
    let (addr, done_rx) = start_fake_uv4l().await;
    let url = format!("ws://{}/stream/webrtc", addr);

    let channel = assert_ok!(WebSocketChannel::connect(&url).await);
    assert_eq!(channel.url(), url);
    let mut client = SignalingClient::new(channel, MockPeer::new(), CallOptions::default(), "ws-test");
    client.initiate().await.unwrap();

    let mut protocol_errors = 0;
    while client.peer().added_lines().len() < 3 {
        let message = timeout(Duration::from_secs(5), client.next_message())
            .await
            .expect("server went quiet")
            .expect("server closed early");
        match message {
            Ok(message) => client.handle_server_message(message).await.unwrap(),
            Err(_) => protocol_errors += 1,
        }
    }

    assert_eq!(protocol_errors, 1);
    assert_eq!(client.state(), SignalingState::Connected);
    assert_eq!(
        client.peer().added_lines(),
        (1..=3).map(|n| candidate(n).candidate).collect::<Vec<_>>()
    );

    client.teardown().await;
    assert!(!client.channel().is_open());

    let received = timeout(Duration::from_secs(5), done_rx).await.unwrap().unwrap();
    let whats: Vec<&str> = received.iter().map(|v| v["what"].as_str().unwrap()).collect();
    assert_eq!(whats, vec!["call", "answer", "hangup"]);
    assert_eq!(received[0]["options"]["vformat"], 55);
    assert!(received[1]["data"].is_string());
}

#[tokio::test]
async fn test_connect_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = WebSocketChannel::connect(&format!("ws://{}/stream/webrtc", addr))
        .await
        .map(|_| ());
    let err = assert_err!(result);
    assert_eq!(err.error_code(), "TRANSPORT_ERROR");
}

#[tokio::test]
async fn test_send_after_close_fails() {
    let (addr, _done_rx) = start_fake_uv4l().await;
    let mut channel = WebSocketChannel::connect(&format!("ws://{}/stream/webrtc", addr))
        .await
        .unwrap();

    channel.close().await.unwrap();
    assert!(!channel.is_open());
    assert!(channel.send(&ClientMessage::Hangup).await.is_err());
    assert!(channel.recv().await.is_none());
}
