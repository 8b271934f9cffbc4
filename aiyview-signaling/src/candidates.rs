//! Remote ICE candidate buffering
//!
//! Candidates can arrive before the remote description has been applied.
//! They are held here, in arrival order, until the gate opens.

use crate::protocol::IceCandidateDescriptor;
use std::collections::VecDeque;

/// Ordered buffer of remote candidates gated on the remote description
#[derive(Debug, Default)]
pub struct CandidateQueue {
    pending: VecDeque<IceCandidateDescriptor>,
    remote_applied: bool,
}

impl CandidateQueue {
    /// Create an empty, closed queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a candidate at the back of the queue
    pub fn push(&mut self, candidate: IceCandidateDescriptor) {
        self.pending.push_back(candidate);
    }

    /// Mark the remote description as applied
    pub fn open(&mut self) {
        self.remote_applied = true;
    }

    /// Whether the remote description has been applied
    pub fn is_open(&self) -> bool {
        self.remote_applied
    }

    /// Take every buffered candidate in arrival order, or nothing while the
    /// remote description is still missing. Taken candidates never come back.
    pub fn drain_ready(&mut self) -> Vec<IceCandidateDescriptor> {
        if !self.remote_applied {
            return Vec::new();
        }
        self.pending.drain(..).collect()
    }

    /// Drop everything still buffered, returning how many were discarded
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// Number of candidates waiting for the remote description
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
