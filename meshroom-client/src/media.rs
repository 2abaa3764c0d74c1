use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_local::TrackLocal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Audio, MediaKind::Video];

    pub fn from_codec_type(codec_type: RTPCodecType) -> Option<Self> {
        match codec_type {
            RTPCodecType::Audio => Some(MediaKind::Audio),
            RTPCodecType::Video => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub fn codec_type(self) -> RTPCodecType {
        match self {
            MediaKind::Audio => RTPCodecType::Audio,
            MediaKind::Video => RTPCodecType::Video,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

pub type LocalTrackRef = Arc<dyn TrackLocal + Send + Sync>;

#[derive(Clone)]
pub struct LocalTrack {
    pub kind: MediaKind,
    pub track: LocalTrackRef,
    pub enabled: bool,
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("kind", &self.kind)
            .field("id", &self.track.id())
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// The local capture shared read-only by every peer session.
///
/// At most one track per [`MediaKind`]. A disabled track stays attached to
/// the media source but is not sent.
#[derive(Clone, Default, Debug)]
pub struct LocalMedia {
    tracks: Vec<LocalTrack>,
}

impl LocalMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the track for `kind`, enabled.
    pub fn with_track(mut self, kind: MediaKind, track: LocalTrackRef) -> Self {
        self.tracks.retain(|t| t.kind != kind);
        self.tracks.push(LocalTrack {
            kind,
            track,
            enabled: true,
        });
        self
    }

    pub fn tracks(&self) -> &[LocalTrack] {
        &self.tracks
    }

    pub fn track(&self, kind: MediaKind) -> Option<&LocalTrack> {
        self.tracks.iter().find(|t| t.kind == kind)
    }

    /// The track to put on the wire for `kind`, if any.
    pub fn active_track(&self, kind: MediaKind) -> Option<LocalTrackRef> {
        self.track(kind)
            .filter(|t| t.enabled)
            .map(|t| t.track.clone())
    }

    pub fn is_enabled(&self, kind: MediaKind) -> bool {
        self.track(kind).is_some_and(|t| t.enabled)
    }

    /// Returns false when there is no track of that kind.
    pub fn set_enabled(&mut self, kind: MediaKind, enabled: bool) -> bool {
        match self.tracks.iter_mut().find(|t| t.kind == kind) {
            Some(track) => {
                track.enabled = enabled;
                true
            }
            None => false,
        }
    }
}

/// A media track received from a remote peer.
///
/// The transport that produced it decides the concrete handle type; the
/// webrtc transport stores `webrtc::track::track_remote::TrackRemote`.
#[derive(Clone)]
pub struct RemoteTrack {
    kind: MediaKind,
    id: String,
    stream_id: String,
    handle: Arc<dyn Any + Send + Sync>,
}

impl RemoteTrack {
    pub fn new<H>(
        kind: MediaKind,
        id: impl Into<String>,
        stream_id: impl Into<String>,
        handle: Arc<H>,
    ) -> Self
    where
        H: Any + Send + Sync,
    {
        Self {
            kind,
            id: id.into(),
            stream_id: stream_id.into(),
            handle,
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn handle<H>(&self) -> Option<Arc<H>>
    where
        H: Any + Send + Sync,
    {
        self.handle.clone().downcast::<H>().ok()
    }
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .finish()
    }
}

/// Everything one remote peer is sending us.
#[derive(Debug, Clone)]
pub struct RemoteStream {
    pub stream_id: String,
    pub tracks: Vec<RemoteTrack>,
}

impl RemoteStream {
    pub fn new(first: RemoteTrack) -> Self {
        Self {
            stream_id: first.stream_id.clone(),
            tracks: vec![first],
        }
    }

    /// Adds a track, replacing one with the same id.
    pub fn insert(&mut self, track: RemoteTrack) {
        self.tracks.retain(|t| t.id != track.id);
        self.tracks.push(track);
    }

    pub fn track(&self, kind: MediaKind) -> Option<&RemoteTrack> {
        self.tracks.iter().find(|t| t.kind == kind)
    }
}
