//! Viewer session
//!
//! A [`Viewer`] owns one signaling session and one overlay renderer and
//! drives both from a single task. The shutdown signal, control-channel
//! messages, peer events and the staleness tick are polled in that order by
//! one `tokio::select!`; session state is only ever touched from that loop.

use crate::config::ViewerConfig;
use crate::event::{EventStream, ViewerEvent};
use aiyview_core::AiyViewResult;
use aiyview_diagnostics::{ConnectionInfo, SessionStats};
use aiyview_media::{Canvas, DisplayList, OverlayRenderer, VideoSurface};
use aiyview_signaling::{
    ControlChannel, PeerConnection, PeerConnectionState, PeerEvent, PeerEventReceiver,
    ServerMessage, SignalingClient, SignalingState, WebRtcPeer, WebSocketChannel,
};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Viewer connected to a real uv4l server
pub type LiveViewer = Viewer<DisplayList, WebSocketChannel, WebRtcPeer>;

/// One thing the loop woke up for
enum LoopInput {
    Shutdown,
    Control(Option<AiyViewResult<ServerMessage>>),
    Peer(Option<PeerEvent>),
    Tick,
}

/// A live view of one camera with its detection overlay
pub struct Viewer<C, K, P> {
    config: ViewerConfig,
    client: SignalingClient<K, P>,
    peer_events: PeerEventReceiver,
    renderer: OverlayRenderer<C>,
    surface: VideoSurface,
    events_tx: mpsc::UnboundedSender<ViewerEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<ViewerEvent>>,
    last_state: SignalingState,
    started_at: DateTime<Utc>,
}

impl LiveViewer {
    /// Connect to the uv4l server described by `config`.
    ///
    /// Opens the control channel, then creates the peer connection. The
    /// channel is closed again if the peer cannot be created. The call is
    /// only placed once [`Viewer::run`] starts.
    pub async fn connect(config: ViewerConfig) -> AiyViewResult<Self> {
        config.validate()?;

        let session_id = Uuid::new_v4().to_string();
        info!(
            "Starting session {} against {}",
            session_id,
            config.signaling_url()
        );

        let mut channel = WebSocketChannel::connect(&config.signaling_url()).await?;
        let (peer, peer_events) =
            match WebRtcPeer::new(vec![config.stun_url()], &session_id).await {
                Ok(created) => created,
                Err(e) => {
                    error!("Failed to create peer connection: {}", e);
                    if let Err(close_err) = channel.close().await {
                        warn!("Failed to close control channel: {}", close_err);
                    }
                    return Err(e);
                }
            };
        let canvas = match &config.svg_output {
            Some(path) => DisplayList::with_svg_output(path),
            None => DisplayList::new(),
        };

        Ok(Self::with_parts(
            config,
            channel,
            peer,
            peer_events,
            canvas,
            session_id,
        ))
    }
}

impl<C, K, P> Viewer<C, K, P>
where
    C: Canvas,
    K: ControlChannel,
    P: PeerConnection,
{
    /// Assemble a viewer from an open control channel, a peer connection
    /// and the receiver its events arrive on
    pub fn with_parts(
        config: ViewerConfig,
        channel: K,
        peer: P,
        peer_events: PeerEventReceiver,
        canvas: C,
        session_id: impl Into<String>,
    ) -> Self {
        let client = SignalingClient::new(channel, peer, config.call_options.clone(), session_id);
        let renderer = OverlayRenderer::new(canvas, config.overlay.clone());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            config,
            client,
            peer_events,
            renderer,
            surface: VideoSurface::new(),
            events_tx,
            events_rx: Some(events_rx),
            last_state: SignalingState::Idle,
            started_at: Utc::now(),
        }
    }

    /// Take the event stream. Only the first call returns it.
    ///
    /// Events are only queued once the stream has been taken; a viewer
    /// nobody listens to keeps no backlog.
    pub fn events(&mut self) -> Option<EventStream> {
        self.events_rx.take().map(EventStream::new)
    }

    /// Session identifier
    pub fn session_id(&self) -> &str {
        self.client.session_id()
    }

    /// Current signaling state
    pub fn state(&self) -> SignalingState {
        self.client.state()
    }

    /// Configuration the viewer was built with
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// The overlay renderer
    pub fn renderer(&self) -> &OverlayRenderer<C> {
        &self.renderer
    }

    /// The signaling client
    pub fn client(&self) -> &SignalingClient<K, P> {
        &self.client
    }

    /// Counters from both halves of the session
    pub fn stats(&self) -> SessionStats {
        let signaling = self.client.stats();
        let overlay = self.renderer.stats();
        SessionStats {
            control_messages_sent: signaling.messages_sent,
            control_messages_received: signaling.messages_received,
            candidates_received: signaling.candidates_received,
            candidates_applied: signaling.candidates_applied,
            candidates_rejected: signaling.candidates_rejected,
            candidates_dropped: signaling.candidates_dropped,
            metadata_messages: signaling.metadata_messages,
            metadata_rejected: signaling.metadata_rejected,
            detections_rendered: overlay.renders,
            items_drawn: overlay.items_drawn,
            items_skipped: overlay.items_skipped,
            stale_clears: overlay.stale_clears,
            renders_dropped: overlay.dropped,
        }
    }

    /// Snapshot of the session for status reporting
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo::snapshot(
            self.client.session_id(),
            self.config.signaling_url(),
            self.client.state(),
            self.started_at,
            Utc::now(),
            self.stats(),
        )
    }

    fn emit(&self, event: ViewerEvent) {
        debug!("Viewer event: {}", event.event_type());
        if self.events_rx.is_some() {
            return;
        }
        // A dropped stream is fine
        let _ = self.events_tx.send(event);
    }

    fn report_state(&mut self) {
        let state = self.client.state();
        if state != self.last_state {
            self.last_state = state;
            self.emit(ViewerEvent::StateChanged { state });
        }
    }

    /// Place the call and run the session until `shutdown` resolves, the
    /// server closes the control channel or the channel fails.
    ///
    /// The session is torn down before returning, whatever ended it.
    pub async fn run<F>(&mut self, shutdown: F) -> AiyViewResult<SessionStats>
    where
        F: Future<Output = ()>,
    {
        if let Err(e) = self.client.initiate().await {
            error!("Failed to place call: {}", e);
            self.finish(format!("call failed: {}", e)).await;
            return Err(e);
        }
        self.report_state();

        tokio::pin!(shutdown);
        let mut sweep = interval(self.renderer.sweep_interval());
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut peer_open = true;

        let reason = loop {
            let input = tokio::select! {
                biased;

                _ = &mut shutdown => LoopInput::Shutdown,
                message = self.client.next_message() => LoopInput::Control(message),
                event = self.peer_events.recv(), if peer_open => LoopInput::Peer(event),
                _ = sweep.tick() => LoopInput::Tick,
            };

            match input {
                LoopInput::Shutdown => break "shutdown requested".to_string(),
                LoopInput::Control(None) => {
                    self.client.handle_channel_closed().await;
                    break "control channel closed".to_string();
                }
                LoopInput::Control(Some(Ok(message))) => self.on_server_message(message).await,
                LoopInput::Control(Some(Err(e))) => {
                    let recoverable = e.is_recoverable();
                    self.emit(ViewerEvent::Error {
                        error: e.to_string(),
                        recoverable,
                    });
                    if !recoverable {
                        error!("Control channel failed: {}", e);
                        break format!("control channel failed: {}", e);
                    }
                    warn!("Ignoring control message: {}", e);
                }
                LoopInput::Peer(Some(event)) => self.on_peer_event(event),
                LoopInput::Peer(None) => {
                    debug!("Peer event channel closed");
                    peer_open = false;
                }
                LoopInput::Tick => {
                    if self.renderer.sweep(Instant::now()) {
                        self.emit(ViewerEvent::OverlayCleared);
                    }
                }
            }
            self.report_state();
        };

        self.finish(reason).await;
        Ok(self.stats())
    }

    async fn finish(&mut self, reason: String) {
        self.client.teardown().await;
        self.report_state();
        info!("{}", self.connection_info());
        self.emit(ViewerEvent::Closed { reason });
    }

    async fn on_server_message(&mut self, message: ServerMessage) {
        let is_offer = matches!(message, ServerMessage::Offer(_));
        let was_failed = self.client.state() == SignalingState::Failed;

        if let Err(e) = self.client.handle_server_message(message).await {
            if !was_failed && self.client.state() == SignalingState::Failed {
                self.emit(ViewerEvent::NegotiationFailed {
                    reason: e.to_string(),
                });
            } else {
                self.emit(ViewerEvent::Error {
                    error: e.to_string(),
                    recoverable: e.is_recoverable(),
                });
            }
            return;
        }

        // Without trickle ICE the server only sends candidates when asked
        if is_offer && !self.config.call_options.trickle_ice {
            if let Err(e) = self.client.request_ice_candidates().await {
                warn!("Failed to request ICE candidates: {}", e);
                self.emit(ViewerEvent::Error {
                    error: e.to_string(),
                    recoverable: e.is_recoverable(),
                });
            }
        }
    }

    fn on_peer_event(&mut self, event: PeerEvent) {
        if matches!(event, PeerEvent::TrackAdded { .. }) && !event.is_video_track() {
            debug!("Ignoring remote track: {:?}", event);
            return;
        }

        match event {
            PeerEvent::TrackAdded { track_id, .. } => {
                info!("Remote video track {} added", track_id);
                let size = self.config.video_size;
                let was_ready = self.surface.is_ready();
                match self.surface.on_metadata_loaded(size.width, size.height) {
                    Ok(Some(size)) => self.size_overlay(size.width, size.height, was_ready),
                    Ok(None) => {}
                    Err(e) => warn!("Unusable video size: {}", e),
                }
            }
            PeerEvent::FirstMediaPacket { kind } => {
                if kind != "video" {
                    return;
                }
                if let Some(size) = self.surface.on_playing() {
                    self.size_overlay(size.width, size.height, false);
                }
            }
            PeerEvent::DataChannelOpen { label } => {
                info!("Metadata channel '{}' open", label);
                self.emit(ViewerEvent::MetadataChannelOpen { label });
            }
            PeerEvent::DataChannelMessage { label, data, .. } => {
                self.on_metadata(&label, &data);
            }
            PeerEvent::DataChannelClosed { label } => {
                info!("Metadata channel '{}' closed", label);
                self.emit(ViewerEvent::MetadataChannelClosed { label });
            }
            PeerEvent::DataChannelError { label, reason } => {
                warn!("Metadata channel '{}' error: {}", label, reason);
                self.emit(ViewerEvent::Error {
                    error: format!("data channel '{}': {}", label, reason),
                    recoverable: true,
                });
            }
            PeerEvent::StateChanged(state) => {
                if state == PeerConnectionState::Failed {
                    error!("Peer connection failed");
                }
                self.emit(ViewerEvent::PeerStateChanged { state });
            }
        }
    }

    fn size_overlay(&mut self, width: u32, height: u32, resized: bool) {
        if let Err(e) = self.renderer.initialize_surface(width, height) {
            warn!("Failed to size overlay: {}", e);
            return;
        }
        if resized {
            self.emit(ViewerEvent::VideoResized { width, height });
        } else {
            self.emit(ViewerEvent::VideoReady { width, height });
        }
    }

    fn on_metadata(&mut self, label: &str, payload: &[u8]) {
        let before = self.renderer.stats();
        if let Err(e) = self
            .client
            .on_metadata_message(payload, &mut self.renderer)
        {
            self.emit(ViewerEvent::Error {
                error: format!("metadata on '{}': {}", label, e),
                recoverable: e.is_recoverable(),
            });
            return;
        }

        let after = self.renderer.stats();
        if after.renders > before.renders {
            self.emit(ViewerEvent::DetectionsRendered {
                drawn: (after.items_drawn - before.items_drawn) as usize,
                skipped: (after.items_skipped - before.items_skipped) as usize,
            });
        } else if after.dropped > before.dropped {
            self.emit(ViewerEvent::Error {
                error: "detection result dropped: video not ready".to_string(),
                recoverable: true,
            });
        }
    }
}
