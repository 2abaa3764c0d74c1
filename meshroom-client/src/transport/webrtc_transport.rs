use crate::media::{LocalMedia, MediaKind, RemoteTrack};
use crate::transport::peer_transport::{PeerTransport, TransportContext, TransportFactory};
use crate::transport::transport_config::TransportConfig;
use crate::transport::transport_event::{SessionKey, TransportEvent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use meshroom_core::{IceCandidate, SdpKind, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::track::track_remote::TrackRemote;

#[derive(Debug, Clone, Default)]
pub struct WebrtcTransportFactory {
    config: TransportConfig,
}

impl WebrtcTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TransportFactory for WebrtcTransportFactory {
    async fn create(&self, ctx: TransportContext) -> Result<Box<dyn PeerTransport>> {
        let transport = WebrtcTransport::new(ctx, &self.config).await?;
        Ok(Box::new(transport))
    }
}

pub struct WebrtcTransport {
    pub key: SessionKey,
    pub peer_connection: Arc<RTCPeerConnection>,
    senders: Vec<(MediaKind, Arc<RTCRtpSender>)>,
    media: LocalMedia,
}

impl WebrtcTransport {
    /// Builds a peer connection with the local tracks attached.
    /// Connection events are forwarded to `ctx.events`.
    pub async fn new(ctx: TransportContext, config: &TransportConfig) -> Result<Self> {
        let TransportContext {
            key, media, events, ..
        } = ctx;

        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let mut senders = Vec::new();
        for local in media.tracks() {
            let sender = peer_connection
                .add_track(local.track.clone())
                .await
                .with_context(|| format!("Failed to add local {} track", local.kind))?;
            if !local.enabled {
                sender.replace_track(None).await?;
            }
            senders.push((local.kind, sender));
        }

        // Still receive kinds we do not send.
        for kind in MediaKind::ALL {
            if media.track(kind).is_none() {
                peer_connection
                    .add_transceiver_from_kind(
                        kind.codec_type(),
                        Some(RTCRtpTransceiverInit {
                            direction: RTCRtpTransceiverDirection::Recvonly,
                            send_encodings: vec![],
                        }),
                    )
                    .await?;
            }
        }

        Self::register_callbacks(&peer_connection, &key, events);

        Ok(Self {
            key,
            peer_connection,
            senders,
            media,
        })
    }

    fn register_callbacks(
        peer_connection: &Arc<RTCPeerConnection>,
        key: &SessionKey,
        event_tx: mpsc::Sender<TransportEvent>,
    ) {
        let state_tx = event_tx.clone();
        let state_key = key.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let key = state_key.clone();

                Box::pin(async move {
                    info!("Peer connection state for {}: {:?}", key, s);
                    if s == RTCPeerConnectionState::Failed {
                        let _ = tx.send(TransportEvent::Failed(key)).await;
                    }
                })
            },
        ));

        let ice_tx = event_tx.clone();
        let ice_key = key.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let key = ice_key.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx
                    .send(TransportEvent::CandidateGenerated(key, from_rtc_candidate(init)))
                    .await;
            })
        }));

        let track_tx = event_tx;
        let track_key = key.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                let key = track_key.clone();

                Box::pin(async move {
                    let Some(kind) = MediaKind::from_codec_type(track.kind()) else {
                        return;
                    };
                    debug!("Remote {} track {} from {}", kind, track.id(), key);
                    let remote = RemoteTrack::new(kind, track.id(), track.stream_id(), track);
                    let _ = tx.send(TransportEvent::TrackArrived(key, remote)).await;
                })
            },
        ));
    }

    fn sender(&self, kind: MediaKind) -> Option<&Arc<RTCRtpSender>> {
        self.senders
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, sender)| sender)
    }
}

#[async_trait]
impl PeerTransport for WebrtcTransport {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = match desc.kind {
            SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
        };
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn has_remote_description(&self) -> bool {
        self.peer_connection.remote_description().await.is_some()
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer_connection
            .add_ice_candidate(to_rtc_candidate(candidate))
            .await
            .context("Failed to add ICE candidate")?;
        Ok(())
    }

    async fn replace_media(&mut self, media: &LocalMedia) -> Result<()> {
        for kind in MediaKind::ALL {
            let Some(sender) = self.sender(kind) else {
                if media.track(kind).is_some() {
                    warn!(
                        "No {} sender on {}; the new track needs a fresh session",
                        kind, self.key
                    );
                }
                continue;
            };
            sender
                .replace_track(media.active_track(kind))
                .await
                .with_context(|| format!("Failed to replace {} track", kind))?;
        }
        self.media = media.clone();
        Ok(())
    }

    async fn set_track_enabled(&mut self, kind: MediaKind, enabled: bool) -> Result<()> {
        self.media.set_enabled(kind, enabled);
        if let Some(sender) = self.sender(kind) {
            sender.replace_track(self.media.active_track(kind)).await?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

fn from_rtc_candidate(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

fn to_rtc_candidate(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_m_line_index,
        username_fragment: candidate.username_fragment,
    }
}
