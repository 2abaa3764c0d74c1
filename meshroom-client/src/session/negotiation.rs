use serde::Serialize;
use std::fmt;

/// Offer/answer progress of one peer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NegotiationState {
    Idle,
    OfferSent,
    OfferReceived,
    Stable,
    Closed,
    Failed,
}

impl NegotiationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, NegotiationState::Closed | NegotiationState::Failed)
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationInput {
    /// Local side starts the exchange as initiator.
    Initiate,
    RemoteOffer,
    /// Local answer created, applied and sent.
    LocalAnswerSent,
    RemoteAnswer,
    Close,
    /// Unrecoverable transport error.
    Fault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Offer while a negotiation is already under way.
    Glare,
    /// Answer for a session that is already stable.
    DuplicateAnswer,
    /// Input that makes no sense in the current state.
    OutOfTurn,
    /// Session is closed or failed.
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Advance(NegotiationState),
    Ignore(IgnoreReason),
}

impl NegotiationState {
    /// Next state for `input`. Pure; the caller performs the side effects.
    pub fn apply(self, input: NegotiationInput) -> Transition {
        use NegotiationInput as I;
        use NegotiationState as S;

        if self.is_terminal() {
            return Transition::Ignore(IgnoreReason::Terminated);
        }

        match (self, input) {
            (_, I::Close) => Transition::Advance(S::Closed),
            (_, I::Fault) => Transition::Advance(S::Failed),

            (S::Idle, I::Initiate) => Transition::Advance(S::OfferSent),
            (_, I::Initiate) => Transition::Ignore(IgnoreReason::OutOfTurn),

            (S::Idle, I::RemoteOffer) => Transition::Advance(S::OfferReceived),
            (_, I::RemoteOffer) => Transition::Ignore(IgnoreReason::Glare),

            (S::OfferReceived, I::LocalAnswerSent) => Transition::Advance(S::Stable),
            (_, I::LocalAnswerSent) => Transition::Ignore(IgnoreReason::OutOfTurn),

            (S::OfferSent, I::RemoteAnswer) => Transition::Advance(S::Stable),
            (S::Stable, I::RemoteAnswer) => Transition::Ignore(IgnoreReason::DuplicateAnswer),
            (_, I::RemoteAnswer) => Transition::Ignore(IgnoreReason::OutOfTurn),
        }
    }
}
