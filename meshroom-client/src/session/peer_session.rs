use crate::media::{LocalMedia, MediaKind, RemoteStream, RemoteTrack};
use crate::session::candidate_queue::CandidateQueue;
use crate::session::negotiation::{IgnoreReason, NegotiationInput, NegotiationState, Transition};
use crate::signaling::SignalingOutput;
use crate::transport::{PeerTransport, SessionKey};
use anyhow::Result;
use meshroom_core::{Identity, Signal};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionRole {
    Initiator,
    Answerer,
}

/// Outcome of feeding one inbound signal to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Applied,
    /// Candidate held until the remote description is set.
    Queued,
    Ignored(IgnoreReason),
}

/// Negotiation with one remote participant.
///
/// Owned exclusively by the room actor. Every state change goes through
/// [`NegotiationState::apply`] and is committed only after the matching
/// transport or signaling step has completed.
pub struct PeerSession {
    key: SessionKey,
    role: SessionRole,
    state: NegotiationState,
    candidates: CandidateQueue,
    transport: Box<dyn PeerTransport>,
    stream: Option<RemoteStream>,
    present: bool,
}

impl PeerSession {
    pub fn new(key: SessionKey, role: SessionRole, transport: Box<dyn PeerTransport>) -> Self {
        Self {
            key,
            role,
            state: NegotiationState::Idle,
            candidates: CandidateQueue::new(),
            transport,
            stream: None,
            present: false,
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn remote(&self) -> &Identity {
        &self.key.identity
    }

    pub fn generation(&self) -> u64 {
        self.key.generation
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn stream(&self) -> Option<&RemoteStream> {
        self.stream.as_ref()
    }

    pub fn pending_candidates(&self) -> usize {
        self.candidates.len()
    }

    /// Whether a presence snapshot has listed the remote identity.
    pub fn is_present(&self) -> bool {
        self.present
    }

    pub fn mark_present(&mut self) {
        self.present = true;
    }

    /// Sends the initial offer.
    pub async fn initiate(&mut self, out: &dyn SignalingOutput) -> Result<Handled> {
        let next = match self.state.apply(NegotiationInput::Initiate) {
            Transition::Advance(next) => next,
            Transition::Ignore(reason) => return Ok(Handled::Ignored(reason)),
        };

        let offer = self.transport.create_offer().await?;
        out.send_signal(self.remote(), Signal::Offer(offer)).await?;
        self.state = next;

        info!("Sent offer to {}", self.key);
        Ok(Handled::Applied)
    }

    pub async fn handle_signal(
        &mut self,
        signal: Signal,
        out: &dyn SignalingOutput,
    ) -> Result<Handled> {
        match signal {
            Signal::Offer(desc) => {
                let next = match self.state.apply(NegotiationInput::RemoteOffer) {
                    Transition::Advance(next) => next,
                    Transition::Ignore(reason) => return Ok(Handled::Ignored(reason)),
                };
                self.transport.set_remote_description(desc).await?;
                self.state = next;
                self.flush_candidates().await;

                let answer = self.transport.create_answer().await?;
                out.send_signal(self.remote(), Signal::Answer(answer)).await?;
                self.advance(NegotiationInput::LocalAnswerSent);

                info!("Answered offer from {}", self.key);
                Ok(Handled::Applied)
            }

            Signal::Answer(desc) => {
                let next = match self.state.apply(NegotiationInput::RemoteAnswer) {
                    Transition::Advance(next) => next,
                    Transition::Ignore(reason) => return Ok(Handled::Ignored(reason)),
                };
                self.transport.set_remote_description(desc).await?;
                self.state = next;
                self.flush_candidates().await;

                info!("Session with {} is stable", self.key);
                Ok(Handled::Applied)
            }

            Signal::Candidate(candidate) => {
                if self.state.is_terminal() {
                    return Ok(Handled::Ignored(IgnoreReason::Terminated));
                }
                self.candidates.enqueue(candidate);
                if self.flush_candidates().await > 0 {
                    Ok(Handled::Applied)
                } else {
                    Ok(Handled::Queued)
                }
            }
        }
    }

    /// Records a remote track. Returns false once the session is terminal.
    pub fn add_remote_track(&mut self, track: RemoteTrack) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        match self.stream.as_mut() {
            Some(stream) => stream.insert(track),
            None => self.stream = Some(RemoteStream::new(track)),
        }
        true
    }

    pub async fn replace_media(&mut self, media: &LocalMedia) -> Result<()> {
        if self.state.is_terminal() {
            return Ok(());
        }
        self.transport.replace_media(media).await
    }

    pub async fn set_track_enabled(&mut self, kind: MediaKind, enabled: bool) -> Result<()> {
        if self.state.is_terminal() {
            return Ok(());
        }
        self.transport.set_track_enabled(kind, enabled).await
    }

    /// Releases the transport and drops queued candidates.
    pub async fn close(&mut self) {
        self.terminate(NegotiationInput::Close).await;
    }

    /// Marks the session failed and releases it.
    pub async fn fail(&mut self) {
        self.terminate(NegotiationInput::Fault).await;
    }

    async fn terminate(&mut self, input: NegotiationInput) {
        if !self.advance(input) {
            return;
        }
        let dropped = self.candidates.discard();
        if dropped > 0 {
            debug!("Discarded {} pending candidates for {}", dropped, self.key);
        }
        self.stream = None;
        if let Err(e) = self.transport.close().await {
            warn!("Failed to close transport for {}: {:?}", self.key, e);
        }
        info!("Session with {} is {}", self.key, self.state);
    }

    async fn flush_candidates(&mut self) -> usize {
        self.candidates.try_flush(self.transport.as_ref()).await
    }

    fn advance(&mut self, input: NegotiationInput) -> bool {
        match self.state.apply(input) {
            Transition::Advance(next) => {
                self.state = next;
                true
            }
            Transition::Ignore(_) => false,
        }
    }
}
