//! In-process fakes shared by the signaling integration tests

#![allow(dead_code)]

use aiyview_core::{AiyViewError, AiyViewResult};
use aiyview_signaling::{
    ClientMessage, ControlChannel, IceCandidateDescriptor, PeerConnection, ServerMessage,
    SessionDescription,
};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

/// Peer connection that records every call
#[derive(Default)]
pub struct MockPeer {
    pub calls: Mutex<Vec<String>>,
    pub added: Mutex<Vec<IceCandidateDescriptor>>,
    pub remote_set: Mutex<bool>,
    pub closes: Mutex<u32>,
    /// Steps that should fail, e.g. "set_remote_description"
    pub failing_steps: HashSet<&'static str>,
    /// Candidate lines the peer rejects
    pub rejected_lines: HashSet<String>,
}

impl MockPeer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(step: &'static str) -> Self {
        let mut peer = Self::default();
        peer.failing_steps.insert(step);
        peer
    }

    pub fn rejecting(line: &str) -> Self {
        let mut peer = Self::default();
        peer.rejected_lines.insert(line.to_string());
        peer
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn added_lines(&self) -> Vec<String> {
        self.added
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.candidate.clone())
            .collect()
    }

    pub fn close_count(&self) -> u32 {
        *self.closes.lock().unwrap()
    }

    fn step(&self, step: &str) -> AiyViewResult<()> {
        self.calls.lock().unwrap().push(step.to_string());
        if self.failing_steps.contains(step) {
            return Err(AiyViewError::Negotiation {
                step: step.to_string(),
                reason: "mock failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PeerConnection for MockPeer {
    async fn set_remote_description(&self, _description: SessionDescription) -> AiyViewResult<()> {
        self.step("set_remote_description")?;
        *self.remote_set.lock().unwrap() = true;
        Ok(())
    }

    async fn create_answer(&self) -> AiyViewResult<SessionDescription> {
        self.step("create_answer")?;
        Ok(SessionDescription::answer("v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\n"))
    }

    async fn set_local_description(&self, _description: SessionDescription) -> AiyViewResult<()> {
        self.step("set_local_description")
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateDescriptor) -> AiyViewResult<()> {
        assert!(
            *self.remote_set.lock().unwrap(),
            "candidate applied before the remote description"
        );
        self.calls.lock().unwrap().push("add_ice_candidate".to_string());
        if self.rejected_lines.contains(&candidate.candidate) {
            return Err(AiyViewError::IceCandidateRejected {
                candidate: candidate.candidate,
                reason: "mock rejection".to_string(),
            });
        }
        self.added.lock().unwrap().push(candidate);
        Ok(())
    }

    async fn close(&self) -> AiyViewResult<()> {
        *self.closes.lock().unwrap() += 1;
        Ok(())
    }
}

/// Control channel backed by in-memory queues
pub struct MemoryChannel {
    pub incoming: VecDeque<AiyViewResult<ServerMessage>>,
    pub sent: Vec<ClientMessage>,
    pub open: bool,
    pub closes: u32,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self {
            incoming: VecDeque::new(),
            sent: Vec::new(),
            open: true,
            closes: 0,
        }
    }

    pub fn with_incoming(messages: Vec<ServerMessage>) -> Self {
        let mut channel = Self::new();
        channel.incoming = messages.into_iter().map(Ok).collect();
        channel
    }

    pub fn sent_whats(&self) -> Vec<&'static str> {
        self.sent.iter().map(ClientMessage::what).collect()
    }
}

#[async_trait]
impl ControlChannel for MemoryChannel {
    async fn send(&mut self, message: &ClientMessage) -> AiyViewResult<()> {
        if !self.open {
            return Err(AiyViewError::ControlChannelClosed);
        }
        self.sent.push(message.clone());
        Ok(())
    }

    async fn recv(&mut self) -> Option<AiyViewResult<ServerMessage>> {
        if !self.open {
            return None;
        }
        let next = self.incoming.pop_front();
        if next.is_none() {
            self.open = false;
        }
        next
    }

    async fn close(&mut self) -> AiyViewResult<()> {
        self.open = false;
        self.closes += 1;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

pub fn candidate(n: u32) -> IceCandidateDescriptor {
    IceCandidateDescriptor::new(format!("candidate:{} 1 UDP 2122260223 192.168.1.{} 5000{} typ host", n, n, n))
        .with_mid("0", 0)
}

pub fn offer() -> SessionDescription {
    SessionDescription::offer("v=0\r\no=- 1 1 IN IP4 192.168.1.10\r\ns=-\r\nt=0 0\r\n")
}
