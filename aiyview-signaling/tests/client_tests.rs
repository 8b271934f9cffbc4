//! Signaling state machine tests against in-process fakes

mod common;

use aiyview_core::{AiyViewError, DetectionResult};
use aiyview_signaling::{
    CallOptions, ClientMessage, SdpType, ServerMessage, SessionDescription, SignalingClient,
    SignalingState,
};
use common::{candidate, offer, MemoryChannel, MockPeer};

fn client(peer: MockPeer) -> SignalingClient<MemoryChannel, MockPeer> {
    SignalingClient::new(MemoryChannel::new(), peer, CallOptions::default(), "test-session")
}

#[tokio::test]
async fn test_initiate_sends_call_with_options() {
    let options = CallOptions {
        force_hw_vcodec: false,
        vformat: 30,
        trickle_ice: false,
    };
    let mut client = SignalingClient::new(MemoryChannel::new(), MockPeer::new(), options.clone(), "s");

    client.initiate().await.unwrap();

    assert_eq!(client.state(), SignalingState::AwaitingOffer);
    assert_eq!(client.channel().sent, vec![ClientMessage::Call { options }]);

    // A second call is not allowed
    let err = client.initiate().await.unwrap_err();
    assert!(matches!(err, AiyViewError::InvalidState { .. }));
    assert_eq!(client.channel().sent.len(), 1);
}

#[tokio::test]
async fn test_offer_answer_flow() {
    let mut client = client(MockPeer::new());
    client.initiate().await.unwrap();

    client.handle_offer(offer()).await.unwrap();

    assert_eq!(client.state(), SignalingState::Connected);
    assert_eq!(
        client.peer().calls(),
        vec!["set_remote_description", "create_answer", "set_local_description"]
    );

    let sent = &client.channel().sent;
    assert_eq!(sent.len(), 2);
    let ClientMessage::Answer { data } = &sent[1] else {
        panic!("expected an answer, got {:?}", sent[1]);
    };
    let description: SessionDescription = serde_json::from_str(data).unwrap();
    assert_eq!(description.sdp_type, SdpType::Answer);
}

#[tokio::test]
async fn test_early_candidates_applied_in_order_after_answer() {
    let mut client = client(MockPeer::new());
    client.initiate().await.unwrap();

    for n in 1..=3 {
        client.handle_ice_candidate(candidate(n)).await;
    }
    assert_eq!(client.pending_candidates(), 3);
    assert!(client.peer().added_lines().is_empty());

    client.handle_offer(offer()).await.unwrap();
    client.handle_ice_candidate(candidate(4)).await;

    let expected: Vec<String> = (1..=4).map(|n| candidate(n).candidate).collect();
    assert_eq!(client.peer().added_lines(), expected);
    assert_eq!(client.pending_candidates(), 0);

    let stats = client.stats();
    assert_eq!(stats.candidates_received, 4);
    assert_eq!(stats.candidates_applied, 4);
    assert_eq!(stats.candidates_dropped, 0);
}

#[tokio::test]
async fn test_rejected_candidate_does_not_stop_the_rest() {
    let rejected = candidate(2).candidate;
    let mut client = client(MockPeer::rejecting(&rejected));
    client.initiate().await.unwrap();

    client
        .handle_server_message(ServerMessage::IceCandidates {
            candidates: vec![candidate(1), candidate(2), candidate(3)],
            malformed: 0,
        })
        .await
        .unwrap();
    client.handle_offer(offer()).await.unwrap();

    assert_eq!(
        client.peer().added_lines(),
        vec![candidate(1).candidate, candidate(3).candidate]
    );
    assert_eq!(client.stats().candidates_rejected, 1);
    assert_eq!(client.state(), SignalingState::Connected);
}

#[tokio::test]
async fn test_batch_with_broken_entry_applies_the_rest_in_order() {
    let entries = serde_json::json!([
        serde_json::to_string(&candidate(1)).unwrap(),
        "{broken",
        serde_json::to_string(&candidate(3)).unwrap(),
    ]);
    let text = serde_json::json!({
        "what": "iceCandidates",
        "data": entries.to_string(),
    })
    .to_string();

    let mut client = client(MockPeer::new());
    client.initiate().await.unwrap();
    client.handle_offer(offer()).await.unwrap();

    let batch = ServerMessage::parse(&text).unwrap();
    client.handle_server_message(batch).await.unwrap();

    assert_eq!(
        client.peer().added_lines(),
        vec![candidate(1).candidate, candidate(3).candidate]
    );
    let stats = client.stats();
    assert_eq!(stats.candidates_received, 3);
    assert_eq!(stats.candidates_applied, 2);
    assert_eq!(stats.candidates_dropped, 1);
    assert_eq!(client.state(), SignalingState::Connected);
}

#[tokio::test]
async fn test_failed_remote_description_moves_to_failed() {
    let mut client = client(MockPeer::failing("set_remote_description"));
    client.initiate().await.unwrap();
    client.handle_ice_candidate(candidate(1)).await;

    let err = client.handle_offer(offer()).await.unwrap_err();
    assert!(matches!(err, AiyViewError::Negotiation { .. }));
    assert_eq!(client.state(), SignalingState::Failed);

    // No answer, no retry, and later candidates are dropped
    assert_eq!(client.channel().sent_whats(), vec!["call"]);
    client.handle_ice_candidate(candidate(2)).await;
    assert!(client.peer().added_lines().is_empty());
    assert_eq!(client.stats().candidates_dropped, 2);
    assert_eq!(client.peer().calls(), vec!["set_remote_description"]);
}

#[tokio::test]
async fn test_failed_answer_creation_sends_nothing() {
    let mut client = client(MockPeer::failing("create_answer"));
    client.initiate().await.unwrap();

    assert!(client.handle_offer(offer()).await.is_err());
    assert_eq!(client.state(), SignalingState::Failed);
    assert_eq!(client.channel().sent_whats(), vec!["call"]);
}

#[tokio::test]
async fn test_second_offer_is_rejected() {
    let mut client = client(MockPeer::new());
    client.initiate().await.unwrap();
    client.handle_offer(offer()).await.unwrap();

    assert!(client.handle_offer(offer()).await.is_err());
    assert_eq!(client.state(), SignalingState::Connected);
    assert_eq!(client.peer().calls().len(), 3);
}

#[tokio::test]
async fn test_gathering_complete_and_unknown_messages_are_ignored() {
    let mut client = client(MockPeer::new());
    client.initiate().await.unwrap();

    client
        .handle_server_message(ServerMessage::IceCandidate(None))
        .await
        .unwrap();
    let unknown = ServerMessage::parse(r#"{"what":"message","data":"hello"}"#).unwrap();
    client.handle_server_message(unknown).await.unwrap();

    assert_eq!(client.state(), SignalingState::AwaitingOffer);
    assert_eq!(client.stats().candidates_received, 0);
}

#[tokio::test]
async fn test_teardown_is_idempotent() {
    let mut client = client(MockPeer::new());
    client.initiate().await.unwrap();
    client.handle_offer(offer()).await.unwrap();

    client.teardown().await;
    client.teardown().await;

    assert_eq!(client.state(), SignalingState::Closed);
    assert_eq!(client.channel().sent_whats(), vec!["call", "answer", "hangup"]);
    assert_eq!(client.peer().close_count(), 1);
    assert_eq!(client.channel().closes, 1);
}

#[tokio::test]
async fn test_channel_closed_skips_hangup() {
    let mut client = SignalingClient::new(
        MemoryChannel::with_incoming(vec![ServerMessage::Offer(offer())]),
        MockPeer::new(),
        CallOptions::default(),
        "s",
    );
    client.initiate().await.unwrap();

    while let Some(message) = client.next_message().await {
        client.handle_server_message(message.unwrap()).await.unwrap();
    }
    client.handle_channel_closed().await;

    assert_eq!(client.state(), SignalingState::Closed);
    assert_eq!(client.channel().sent_whats(), vec!["call", "answer"]);
    assert_eq!(client.peer().close_count(), 1);
    assert_eq!(client.stats().messages_received, 1);
}

#[tokio::test]
async fn test_request_ice_candidates() {
    let mut client = client(MockPeer::new());
    client.request_ice_candidates().await.unwrap();
    assert_eq!(client.channel().sent_whats(), vec!["generateIceCandidates"]);
}

#[tokio::test]
async fn test_metadata_forwarded_to_sink() {
    let mut client = client(MockPeer::new());
    let mut received: Vec<DetectionResult> = Vec::new();
    let mut sink = |result: DetectionResult| received.push(result);

    client
        .on_metadata_message(
            br#"{"objects":[{"name":"face","x":0.1,"y":0.1,"width":0.2,"height":0.2,"score":0.9,"joy":0.4}]}"#,
            &mut sink,
        )
        .unwrap();
    assert!(client.on_metadata_message(b"not json", &mut sink).is_err());
    client
        .on_metadata_message(br#"{"objects":[]}"#, &mut sink)
        .unwrap();

    assert_eq!(received.len(), 2);
    assert_eq!(received[0].len(), 1);
    assert!(received[1].is_empty());

    let stats = client.stats();
    assert_eq!(stats.metadata_messages, 3);
    assert_eq!(stats.metadata_rejected, 1);
}
