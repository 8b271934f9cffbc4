//! Signaling client state machine
//!
//! One [`SignalingClient`] drives one viewer session: it asks the uv4l server
//! for a call, answers the server's offer, applies remote ICE candidates in
//! arrival order once the remote description is in place, and hands
//! detection metadata from the data channel to a [`DetectionSink`].
//!
//! ```text
//! idle --call--> awaiting-offer --answer--> answer-sent --flush--> connected
//!   \________________ any negotiation error ________________/ -> failed
//!   any state --channel closed / teardown--> closed
//! ```

use crate::candidates::CandidateQueue;
use crate::peer::PeerConnection;
use crate::protocol::{
    CallOptions, ClientMessage, IceCandidateDescriptor, ServerMessage, SessionDescription,
};
use crate::transport::ControlChannel;
use aiyview_core::{AiyViewError, AiyViewResult, DetectionResult, DetectionSink};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Connection state of a signaling session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    /// Created, no call requested yet
    Idle,
    /// Call sent, waiting for the server's offer
    AwaitingOffer,
    /// Answer sent to the server
    AnswerSent,
    /// Negotiation finished and queued candidates flushed
    Connected,
    /// A negotiation step failed; nothing is retried
    Failed,
    /// Torn down
    Closed,
}

impl SignalingState {
    /// Whether the session has reached a state it cannot leave except by teardown
    pub fn is_terminal(&self) -> bool {
        matches!(self, SignalingState::Failed | SignalingState::Closed)
    }
}

impl fmt::Display for SignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalingState::Idle => write!(f, "idle"),
            SignalingState::AwaitingOffer => write!(f, "awaiting-offer"),
            SignalingState::AnswerSent => write!(f, "answer-sent"),
            SignalingState::Connected => write!(f, "connected"),
            SignalingState::Failed => write!(f, "failed"),
            SignalingState::Closed => write!(f, "closed"),
        }
    }
}

/// Message and candidate counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalingStats {
    /// Control messages sent
    pub messages_sent: u64,
    /// Control messages received, including unparseable ones
    pub messages_received: u64,
    /// Remote candidates received
    pub candidates_received: u64,
    /// Remote candidates accepted by the peer connection
    pub candidates_applied: u64,
    /// Remote candidates the peer connection rejected
    pub candidates_rejected: u64,
    /// Remote candidates discarded without being applied
    pub candidates_dropped: u64,
    /// Metadata messages received on the data channel
    pub metadata_messages: u64,
    /// Metadata messages that could not be parsed
    pub metadata_rejected: u64,
}

/// Client side of the uv4l signaling exchange
pub struct SignalingClient<C, P> {
    session_id: String,
    options: CallOptions,
    channel: C,
    peer: P,
    state: SignalingState,
    candidates: CandidateQueue,
    stats: SignalingStats,
}

impl<C, P> SignalingClient<C, P>
where
    C: ControlChannel,
    P: PeerConnection,
{
    /// Create a client over an open control channel and an existing peer connection
    pub fn new(channel: C, peer: P, options: CallOptions, session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            options,
            channel,
            peer,
            state: SignalingState::Idle,
            candidates: CandidateQueue::new(),
            stats: SignalingStats::default(),
        }
    }

    /// Current state
    pub fn state(&self) -> SignalingState {
        self.state
    }

    /// Session identifier used in logs
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Counters collected so far
    pub fn stats(&self) -> SignalingStats {
        self.stats
    }

    /// Candidates waiting for the remote description
    pub fn pending_candidates(&self) -> usize {
        self.candidates.pending()
    }

    /// Peer connection driven by this client
    pub fn peer(&self) -> &P {
        &self.peer
    }

    /// Control channel used by this client
    pub fn channel(&self) -> &C {
        &self.channel
    }

    fn transition(&mut self, next: SignalingState) {
        if self.state != next {
            info!("Session {} state: {} -> {}", self.session_id, self.state, next);
            self.state = next;
        }
    }

    async fn send(&mut self, message: ClientMessage) -> AiyViewResult<()> {
        self.channel.send(&message).await?;
        self.stats.messages_sent += 1;
        Ok(())
    }

    /// Request a call from the server. Only valid from [`SignalingState::Idle`].
    pub async fn initiate(&mut self) -> AiyViewResult<()> {
        if self.state != SignalingState::Idle {
            return Err(AiyViewError::InvalidState {
                expected: SignalingState::Idle.to_string(),
                actual: self.state.to_string(),
            });
        }

        let call = ClientMessage::Call {
            options: self.options.clone(),
        };
        info!(
            "Initiating call (force_hw_vcodec={}, vformat={}, trickle_ice={})",
            self.options.force_hw_vcodec, self.options.vformat, self.options.trickle_ice
        );
        self.send(call).await?;
        self.transition(SignalingState::AwaitingOffer);
        Ok(())
    }

    /// Ask the server for its gathered candidates in one batch
    pub async fn request_ice_candidates(&mut self) -> AiyViewResult<()> {
        self.send(ClientMessage::GenerateIceCandidates).await
    }

    /// Wait for the next message on the control channel; `None` once it closes
    pub async fn next_message(&mut self) -> Option<AiyViewResult<ServerMessage>> {
        let message = self.channel.recv().await;
        if message.is_some() {
            self.stats.messages_received += 1;
        }
        message
    }

    /// Dispatch one server message.
    ///
    /// Negotiation failures are returned after the session has moved to
    /// [`SignalingState::Failed`]; candidate rejections are only logged.
    pub async fn handle_server_message(&mut self, message: ServerMessage) -> AiyViewResult<()> {
        match message {
            ServerMessage::Offer(description) => self.handle_offer(description).await,
            ServerMessage::IceCandidate(Some(candidate)) => {
                self.handle_ice_candidate(candidate).await;
                Ok(())
            }
            ServerMessage::IceCandidate(None) => {
                info!("Remote ICE gathering complete");
                Ok(())
            }
            ServerMessage::IceCandidates {
                candidates,
                malformed,
            } => {
                debug!("Received batch of {} remote candidates", candidates.len());
                if malformed > 0 {
                    warn!("Dropped {} malformed candidate(s) from batch", malformed);
                    self.stats.candidates_received += malformed as u64;
                    self.stats.candidates_dropped += malformed as u64;
                }
                for candidate in candidates {
                    self.handle_ice_candidate(candidate).await;
                }
                Ok(())
            }
            ServerMessage::Unknown { what, message } => {
                warn!("Unhandled control message '{}': {}", what, message);
                Ok(())
            }
        }
    }

    /// Answer the server's offer.
    ///
    /// Applies the remote description, creates and applies the local answer,
    /// sends it, then flushes any buffered candidates. The first step that
    /// fails moves the session to [`SignalingState::Failed`].
    pub async fn handle_offer(&mut self, remote: SessionDescription) -> AiyViewResult<()> {
        if self.state.is_terminal() {
            return Err(AiyViewError::InvalidState {
                expected: SignalingState::AwaitingOffer.to_string(),
                actual: self.state.to_string(),
            });
        }
        if matches!(
            self.state,
            SignalingState::AnswerSent | SignalingState::Connected
        ) {
            warn!("Ignoring renegotiation offer in state {}", self.state);
            return Err(AiyViewError::InvalidState {
                expected: SignalingState::AwaitingOffer.to_string(),
                actual: self.state.to_string(),
            });
        }

        debug!("Remote offer:\n{}", remote.sdp);
        match self.negotiate(remote).await {
            Ok(()) => {
                self.transition(SignalingState::AnswerSent);
                self.flush_candidates().await;
                self.transition(SignalingState::Connected);
                Ok(())
            }
            Err(e) => {
                error!("Negotiation failed for session {}: {}", self.session_id, e);
                let dropped = self.candidates.clear();
                self.stats.candidates_dropped += dropped as u64;
                self.transition(SignalingState::Failed);
                Err(e)
            }
        }
    }

    async fn negotiate(&mut self, remote: SessionDescription) -> AiyViewResult<()> {
        self.peer.set_remote_description(remote).await?;
        self.candidates.open();
        debug!("Remote description applied");

        let answer = self.peer.create_answer().await?;
        self.peer.set_local_description(answer.clone()).await?;
        debug!("Local description applied");

        let message = ClientMessage::answer(&answer)?;
        self.send(message).await?;
        info!("Sent answer for session {}", self.session_id);
        Ok(())
    }

    /// Take one remote candidate.
    ///
    /// The candidate is queued behind any earlier ones and the queue is
    /// flushed if the remote description is already applied. Candidates
    /// arriving after a failure or teardown are dropped.
    pub async fn handle_ice_candidate(&mut self, candidate: IceCandidateDescriptor) {
        self.stats.candidates_received += 1;

        if self.state.is_terminal() {
            warn!(
                "Dropping ICE candidate in state {}: {}",
                self.state, candidate.candidate
            );
            self.stats.candidates_dropped += 1;
            return;
        }

        self.candidates.push(candidate);
        if self.candidates.is_open() {
            self.flush_candidates().await;
        } else {
            debug!(
                "Buffered ICE candidate until remote description is set ({} pending)",
                self.candidates.pending()
            );
        }
    }

    async fn flush_candidates(&mut self) {
        let ready = self.candidates.drain_ready();
        if ready.is_empty() {
            return;
        }

        let count = ready.len();
        for candidate in ready {
            match self.peer.add_ice_candidate(candidate).await {
                Ok(()) => self.stats.candidates_applied += 1,
                Err(e) => {
                    warn!("Failed to add candidate: {}", e);
                    self.stats.candidates_rejected += 1;
                }
            }
        }
        debug!("Added {} remote candidate(s)", count);
    }

    /// Parse a data channel payload and hand the result to `sink`.
    ///
    /// Payloads that are not a detection result are logged and dropped.
    pub fn on_metadata_message<S>(&mut self, payload: &[u8], sink: &mut S) -> AiyViewResult<()>
    where
        S: DetectionSink + ?Sized,
    {
        self.stats.metadata_messages += 1;
        match DetectionResult::from_slice(payload) {
            Ok(result) => {
                debug!("Detection result with {} item(s)", result.len());
                sink.on_detection(result);
                Ok(())
            }
            Err(e) => {
                warn!("Dropping metadata message: {}", e);
                self.stats.metadata_rejected += 1;
                Err(e)
            }
        }
    }

    /// React to the server closing the control channel
    pub async fn handle_channel_closed(&mut self) {
        info!("Control channel closed for session {}", self.session_id);
        self.teardown().await;
    }

    /// End the session: hang up if the channel is still usable, then close
    /// the peer connection and the channel. Calling it again does nothing.
    pub async fn teardown(&mut self) {
        if self.state == SignalingState::Closed {
            return;
        }

        if self.channel.is_open() {
            if let Err(e) = self.send(ClientMessage::Hangup).await {
                warn!("Failed to send hangup: {}", e);
            }
        }
        if let Err(e) = self.peer.close().await {
            warn!("Failed to close peer connection: {}", e);
        }
        if let Err(e) = self.channel.close().await {
            warn!("Failed to close control channel: {}", e);
        }

        let dropped = self.candidates.clear();
        self.stats.candidates_dropped += dropped as u64;
        self.transition(SignalingState::Closed);
    }
}
