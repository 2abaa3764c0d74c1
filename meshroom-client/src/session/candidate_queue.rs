use crate::transport::PeerTransport;
use meshroom_core::IceCandidate;
use std::collections::VecDeque;
use tracing::warn;

/// Remote candidates that arrived before the remote description.
#[derive(Debug, Default)]
pub struct CandidateQueue {
    pending: VecDeque<IceCandidate>,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, candidate: IceCandidate) {
        self.pending.push_back(candidate);
    }

    /// Applies every queued candidate in arrival order once the transport
    /// has a remote description. Otherwise leaves the queue untouched.
    ///
    /// Returns how many candidates were taken off the queue.
    pub async fn try_flush(&mut self, transport: &dyn PeerTransport) -> usize {
        if self.pending.is_empty() || !transport.has_remote_description().await {
            return 0;
        }

        let mut flushed = 0;
        while let Some(candidate) = self.pending.pop_front() {
            flushed += 1;
            if let Err(e) = transport.add_ice_candidate(candidate).await {
                warn!("Rejected ICE candidate: {:?}", e);
            }
        }
        flushed
    }

    /// Drops everything; used at session teardown.
    pub fn discard(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
