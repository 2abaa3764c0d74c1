use crate::model::identity::Identity;
use crate::model::participant::Participant;
use crate::model::room::RoomId;
use crate::model::signaling::{InboxDelivery, MessageId, SignalMessage};
use serde::{Deserialize, Serialize};

/// Frame sent by a relay client. Every request is answered by a
/// [`RelayEvent::Reply`] carrying the same `request_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayRequest {
    #[serde(rename = "requestId")]
    pub request_id: u64,
    #[serde(flatten)]
    pub op: RelayOp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all_fields = "camelCase")]
pub enum RelayOp {
    Join {
        room: RoomId,
        identity: Identity,
        display_name: String,
    },
    Leave {
        room: RoomId,
        identity: Identity,
    },
    List {
        room: RoomId,
    },
    WatchPresence {
        room: RoomId,
    },
    UnwatchPresence {
        room: RoomId,
    },
    Send {
        room: RoomId,
        to: Identity,
        message: SignalMessage,
    },
    WatchInbox {
        room: RoomId,
        identity: Identity,
    },
    UnwatchInbox {
        room: RoomId,
        identity: Identity,
    },
    Ack {
        room: RoomId,
        identity: Identity,
        id: MessageId,
    },
    ClearInbox {
        room: RoomId,
        identity: Identity,
    },
}

/// Frame pushed by the relay server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all_fields = "camelCase")]
pub enum RelayEvent {
    Reply {
        request_id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        participant: Option<Participant>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        participants: Option<Vec<Participant>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Presence {
        room: RoomId,
        participants: Vec<Participant>,
    },
    Inbox {
        room: RoomId,
        identity: Identity,
        delivery: InboxDelivery,
    },
}

impl RelayEvent {
    pub fn ok(request_id: u64) -> Self {
        RelayEvent::Reply {
            request_id,
            participant: None,
            participants: None,
            error: None,
        }
    }

    pub fn failed(request_id: u64, error: impl Into<String>) -> Self {
        RelayEvent::Reply {
            request_id,
            participant: None,
            participants: None,
            error: Some(error.into()),
        }
    }
}
