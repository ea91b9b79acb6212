use crate::core::config::FeedConfig;
use crate::core::connection_state::{AtomicConnectionState, ConnectionState};
use crate::core::staleness::StalenessTracker;
use crate::traits::*;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsWrite = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsRead = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// How often blocking waits re-check the shutdown flag
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// An open, subscribed WebSocket session.
pub struct Session {
    write: WsWrite,
    read: WsRead,
}

/// Lightweight observation handle for a [`FeedClient`].
///
/// Cheap to clone; lets supervising code inspect connection state and
/// request a deliberate close without owning the client.
#[derive(Clone)]
pub struct FeedHandle {
    state: Arc<AtomicConnectionState>,
    staleness: Arc<StalenessTracker>,
    shutdown_flag: Arc<AtomicBool>,
}

impl FeedHandle {
    /// Current connection state
    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Check if the session is live and subscribed
    #[inline]
    pub fn is_subscribed(&self) -> bool {
        self.state.is_subscribed()
    }

    /// Time since the last frame, if any frame arrived this session
    pub fn time_since_last_frame(&self) -> Option<Duration> {
        self.staleness.time_since_last_frame()
    }

    /// Request a deliberate close. `run()` returns `Ok(())` shortly after.
    pub fn close(&self) {
        self.shutdown_flag.store(false, Ordering::Release);
    }
}

/// Supervised WebSocket feed client.
///
/// Owns the full connection lifecycle: connect, authenticate, subscribe,
/// decode frames into typed events, detect staleness, and reconnect with
/// backoff. Decoded events are delivered to a single consumer through one
/// unbounded channel taken via [`events()`](FeedClient::events).
///
/// # Type Parameters
/// - `D`: [`FrameDecoder`] implementation for the venue's wire format
pub struct FeedClient<D: FrameDecoder> {
    config: FeedConfig,
    decoder: Arc<D>,
    state: Arc<AtomicConnectionState>,
    staleness: Arc<StalenessTracker>,
    event_tx: mpsc::UnboundedSender<D::Event>,
    event_rx: Option<mpsc::UnboundedReceiver<D::Event>>,
}

impl<D: FrameDecoder> FeedClient<D> {
    /// Create a new client from configuration and a frame decoder.
    pub fn new(config: FeedConfig, decoder: D) -> Self {
        let staleness = Arc::new(StalenessTracker::new(config.staleness_window));
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            config,
            decoder: Arc::new(decoder),
            state: Arc::new(AtomicConnectionState::default()),
            staleness,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Take the event receiver.
    ///
    /// The sequence is lazy: events accumulate only while `run()` is being
    /// polled. It ends (the channel closes) when `run()` returns. Can only
    /// be taken once.
    pub fn events(&mut self) -> Option<mpsc::UnboundedReceiver<D::Event>> {
        self.event_rx.take()
    }

    /// Get an observation handle for supervisors.
    pub fn handle(&self) -> FeedHandle {
        FeedHandle {
            state: Arc::clone(&self.state),
            staleness: Arc::clone(&self.staleness),
            shutdown_flag: Arc::clone(&self.config.shutdown_flag),
        }
    }

    /// Current connection state
    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    fn is_running(&self) -> bool {
        self.config.shutdown_flag.load(Ordering::Acquire)
    }

    /// Establish a session: handshake, auth, subscriptions, ack wait.
    ///
    /// Fails with `FeedError::Connection` / `FeedError::Timeout` if the
    /// handshake or the subscription acknowledgments do not complete within
    /// their configured bounds. Events received while waiting for acks
    /// (including the acks themselves) are forwarded to the consumer.
    pub async fn connect(&self) -> Result<Session> {
        self.state.set(ConnectionState::Connecting);

        let connected = tokio::time::timeout(
            self.config.handshake_timeout,
            connect_async(&self.config.url),
        )
        .await
        .map_err(|_| FeedError::Timeout(format!("handshake to {}", self.config.url)))?
        .map_err(|e| FeedError::Connection(e.to_string()))?;

        let (mut write, mut read) = connected.0.split();
        debug!("Connected to {}", self.config.url);

        // Auth first, then subscriptions
        if let Some(ref auth) = self.config.auth {
            if let Some(auth_msg) = auth.get_auth_message().await? {
                write
                    .send(ws_message_to_tungstenite(&auth_msg))
                    .await
                    .map_err(|e| FeedError::Connection(format!("failed to send auth: {}", e)))?;
                debug!("Sent authentication message");
            }
        }

        for sub in &self.config.subscriptions {
            write
                .send(ws_message_to_tungstenite(sub))
                .await
                .map_err(|e| {
                    FeedError::Connection(format!("failed to send subscription: {}", e))
                })?;
        }
        debug!("Sent {} subscription messages", self.config.subscriptions.len());

        let pending_acks = self.config.subscriptions.len();
        if pending_acks > 0 {
            tokio::time::timeout(
                self.config.subscribe_ack_timeout,
                self.wait_for_acks(&mut read, pending_acks),
            )
            .await
            .map_err(|_| {
                FeedError::Timeout(format!(
                    "waiting for {} subscription acks",
                    pending_acks
                ))
            })??;
        }

        Ok(Session { write, read })
    }

    /// Read frames until `pending` subscription acknowledgments arrived.
    async fn wait_for_acks(&self, read: &mut WsRead, mut pending: usize) -> Result<()> {
        while pending > 0 {
            match read.next().await {
                Some(Ok(msg)) => {
                    self.staleness.record_frame();
                    if let Some(frame) = tungstenite_to_ws_message(msg) {
                        if let Some(event) = self.decode_frame(frame) {
                            if self.decoder.is_subscription_ack(&event) {
                                pending -= 1;
                            }
                            if self.event_tx.send(event).is_err() {
                                return Err(FeedError::ChannelClosed);
                            }
                        }
                    }
                }
                Some(Err(e)) => return Err(FeedError::Connection(e.to_string())),
                None => {
                    return Err(FeedError::ConnectionClosed(
                        "stream ended during subscription".into(),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Run the supervised feed until deliberately closed.
    ///
    /// Reconnects with the configured backoff on connection loss or
    /// staleness; the attempt counter resets after any session that stayed
    /// subscribed for at least `stable_session_min`. Returns `Ok(())` on
    /// deliberate close, `Err(FeedError::ReconnectionFailed)` if the
    /// strategy gives up.
    pub async fn run(&mut self) -> Result<()> {
        let mut attempt = 0usize;

        loop {
            if !self.is_running() {
                self.state.set(ConnectionState::Disconnected);
                return Ok(());
            }

            self.staleness.reset();

            match self.connect().await {
                Ok(mut session) => {
                    info!("Feed subscribed to {}", self.config.url);
                    self.state.set(ConnectionState::Subscribed);
                    let session_start = Instant::now();

                    let outcome = self.run_session(&mut session).await;

                    let was_stable = session_start.elapsed() >= self.config.stable_session_min;
                    self.state.set(ConnectionState::Disconnected);

                    match outcome {
                        Ok(()) => {
                            info!("Feed session deliberately closed");
                            return Ok(());
                        }
                        Err(e) => {
                            warn!("Feed session ended: {}", e);
                            if was_stable {
                                debug!("Session was stable, resetting backoff");
                                attempt = 0;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!("Feed connect failed: {}", e);
                    self.state.set(ConnectionState::Disconnected);
                }
            }

            if !self.is_running() {
                return Ok(());
            }

            match self.config.reconnect_strategy.next_delay(attempt) {
                Some(delay) => {
                    info!("Reconnecting in {:?} (attempt {})", delay, attempt + 1);
                    if !self.interruptible_sleep(delay).await {
                        return Ok(());
                    }
                    attempt += 1;
                }
                None => {
                    warn!("Reconnection strategy exhausted, stopping");
                    return Err(FeedError::ReconnectionFailed {
                        attempts: attempt,
                        reason: "strategy exhausted".into(),
                    });
                }
            }
        }
    }

    /// Consume frames on a live session.
    ///
    /// Returns `Ok(())` only on deliberate close; any other exit is an
    /// error that the reconnect loop in `run()` handles.
    async fn run_session(&self, session: &mut Session) -> Result<()> {
        loop {
            if !self.is_running() {
                self.state.set(ConnectionState::Closing);
                let _ = session.write.close().await;
                return Ok(());
            }

            let to_stale = self.staleness.time_to_stale();

            tokio::select! {
                msg = session.read.next() => {
                    match msg {
                        Some(Ok(msg)) => {
                            self.staleness.record_frame();
                            if let Some(frame) = tungstenite_to_ws_message(msg) {
                                if let Some(event) = self.decode_frame(frame) {
                                    if self.event_tx.send(event).is_err() {
                                        // Consumer dropped the receiver; treat
                                        // as a deliberate close
                                        debug!("Event channel closed, closing session");
                                        self.state.set(ConnectionState::Closing);
                                        let _ = session.write.close().await;
                                        return Ok(());
                                    }
                                }
                            }
                        }
                        Some(Err(e)) => {
                            return Err(FeedError::Connection(e.to_string()));
                        }
                        None => {
                            return Err(FeedError::ConnectionClosed("stream ended".into()));
                        }
                    }
                }

                _ = tokio::time::sleep(to_stale.min(SHUTDOWN_POLL)) => {
                    if self.staleness.is_stale() {
                        warn!(
                            "No frame for {:?}, marking feed stale and force-closing",
                            self.staleness.window()
                        );
                        self.state.set(ConnectionState::Stale);
                        let _ = session.write.close().await;
                        return Err(FeedError::Stale(self.staleness.window()));
                    }
                    // Otherwise this was just a shutdown-flag poll tick
                }
            }
        }
    }

    /// Decode one frame; malformed frames are logged and skipped, never
    /// fatal to the session.
    fn decode_frame(&self, frame: WsMessage) -> Option<D::Event> {
        match self.decoder.decode(frame) {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping malformed frame: {}", e);
                None
            }
        }
    }

    /// Sleep, waking early when the shutdown flag drops.
    /// Returns false if shutdown was requested during the sleep.
    async fn interruptible_sleep(&self, duration: Duration) -> bool {
        let mut elapsed = Duration::ZERO;
        while elapsed < duration {
            if !self.is_running() {
                return false;
            }
            let slice = SHUTDOWN_POLL.min(duration - elapsed);
            tokio::time::sleep(slice).await;
            elapsed += slice;
        }
        self.is_running()
    }
}

/// Convert WsMessage to tungstenite Message
fn ws_message_to_tungstenite(msg: &WsMessage) -> Message {
    match msg {
        WsMessage::Text(text) => Message::Text(text.clone()),
        WsMessage::Binary(data) => Message::Binary(data.clone()),
    }
}

/// Convert tungstenite Message to WsMessage
fn tungstenite_to_ws_message(msg: Message) -> Option<WsMessage> {
    match msg {
        Message::Text(text) => Some(WsMessage::Text(text)),
        Message::Binary(data) => Some(WsMessage::Binary(data)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}
