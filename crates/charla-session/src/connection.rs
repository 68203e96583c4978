//! The connection state machine.
//!
//! Owns at most one live channel per client session, bound to the
//! currently selected conversation. `bind` guarantees the previous
//! connection instance has fully reached `Closed`, and stopped delivering
//! into the [`MessageStore`], before the new instance may deliver for its
//! key. That ordering is what prevents cross-conversation message leakage.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use metrics::counter;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use charla_core::{ChatError, ConversationKey, Message, Result};
use charla_settings::ReconnectSettings;

use crate::store::MessageStore;
use crate::transport::{FrameSink, FrameStream, Transport};

/// Outbound frames buffered per connection before sends are dropped.
const OUTBOUND_BUFFER: usize = 64;

/// Upper bound on the transport handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Lifecycle of one connection instance.
///
/// `Closed` is terminal for the instance; rebinding constructs a fresh one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    /// No connection has been attempted this session.
    Idle,
    /// Handshake in progress.
    Connecting,
    /// Live; inbound frames are being delivered to the store.
    Open,
    /// Torn down, failed, or closed by the peer. Sends fall back to
    /// request/response while here.
    Closed,
}

struct ActiveConnection {
    key: ConversationKey,
    outbound: mpsc::Sender<String>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

struct Inner {
    /// Bumped on every `bind`/`unbind`. Reader tasks and reconnect loops
    /// carry the epoch they were spawned under; a mismatch means they have
    /// been superseded and must not touch manager state.
    epoch: u64,
    key: Option<ConversationKey>,
    conn: Option<ActiveConnection>,
}

/// Owns the single live channel and its connect/teardown state machine.
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    store: Arc<MessageStore>,
    reconnect: ReconnectSettings,
    state_tx: watch::Sender<ChannelState>,
    inner: Mutex<Inner>,
}

impl ConnectionManager {
    /// Create a manager in `Idle`.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<MessageStore>,
        reconnect: ReconnectSettings,
    ) -> Arc<Self> {
        let (state_tx, _) = watch::channel(ChannelState::Idle);
        Arc::new(Self {
            transport,
            store,
            reconnect,
            state_tx,
            inner: Mutex::new(Inner {
                epoch: 0,
                key: None,
                conn: None,
            }),
        })
    }

    /// Bind the channel to `key`, tearing down any previous connection
    /// first.
    ///
    /// Returns once the new channel is `Open`, or with
    /// [`ChatError::Connection`] if the handshake failed (state is then
    /// `Closed` and sends fall back to request/response).
    pub async fn bind(self: &Arc<Self>, key: ConversationKey) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.epoch += 1;
        let epoch = inner.epoch;
        Self::teardown(&mut inner, &self.state_tx).await;
        inner.key = Some(key);
        let _ = self.state_tx.send_replace(ChannelState::Connecting);
        info!(%key, "binding channel");
        match self.connect_locked(&mut inner, key, epoch).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = self.state_tx.send_replace(ChannelState::Closed);
                warn!(%key, error = %e, "channel failed to open");
                self.schedule_reconnect(key, epoch);
                Err(e)
            }
        }
    }

    /// Tear down the current connection, if any.
    pub async fn unbind(&self) {
        let mut inner = self.inner.lock().await;
        inner.epoch += 1;
        inner.key = None;
        Self::teardown(&mut inner, &self.state_tx).await;
    }

    /// Current state.
    pub fn state(&self) -> ChannelState {
        *self.state_tx.borrow()
    }

    /// Subscribe to state changes, the non-blocking status indicator.
    pub fn state_changes(&self) -> watch::Receiver<ChannelState> {
        self.state_tx.subscribe()
    }

    /// The conversation the manager is currently bound to.
    pub async fn bound_key(&self) -> Option<ConversationKey> {
        self.inner.lock().await.key
    }

    /// Outbound frame sender, if the channel is `Open` for exactly `key`.
    ///
    /// The key check and the state check happen under one lock so the
    /// router cannot race a concurrent rebind.
    pub async fn frame_sender(&self, key: ConversationKey) -> Option<mpsc::Sender<String>> {
        let inner = self.inner.lock().await;
        match &inner.conn {
            Some(conn) if conn.key == key && *self.state_tx.borrow() == ChannelState::Open => {
                Some(conn.outbound.clone())
            }
            _ => None,
        }
    }

    /// Abort and await the old connection's tasks.
    ///
    /// Awaiting the aborted reader is the delivery barrier: once it
    /// resolves, the old task (and the stream it owned) is gone, so no
    /// further frame from the old transport can reach any log.
    async fn teardown(inner: &mut Inner, state_tx: &watch::Sender<ChannelState>) {
        if let Some(conn) = inner.conn.take() {
            conn.reader.abort();
            conn.writer.abort();
            let _ = conn.reader.await;
            let _ = conn.writer.await;
            let _ = state_tx.send_replace(ChannelState::Closed);
            debug!(key = %conn.key, "channel torn down");
        }
    }

    async fn connect_locked(
        self: &Arc<Self>,
        inner: &mut Inner,
        key: ConversationKey,
        epoch: u64,
    ) -> Result<()> {
        let (sink, stream) = self.open_with_timeout(key).await?;
        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let writer = tokio::spawn(write_loop(sink, out_rx));
        let reader = tokio::spawn(Arc::clone(self).read_loop(key, epoch, stream));
        inner.conn = Some(ActiveConnection {
            key,
            outbound: out_tx,
            reader,
            writer,
        });
        let _ = self.state_tx.send_replace(ChannelState::Open);
        info!(%key, "channel open");
        Ok(())
    }

    async fn open_with_timeout(
        &self,
        key: ConversationKey,
    ) -> Result<(FrameSink, FrameStream)> {
        match tokio::time::timeout(CONNECT_TIMEOUT, self.transport.open(key)).await {
            Ok(result) => result,
            Err(_) => Err(ChatError::Connection(format!(
                "handshake timed out after {CONNECT_TIMEOUT:?}"
            ))),
        }
    }

    /// Deliver inbound frames for `key` until the stream ends.
    async fn read_loop(self: Arc<Self>, key: ConversationKey, epoch: u64, mut stream: FrameStream) {
        while let Some(item) = stream.next().await {
            match item {
                Ok(text) => match serde_json::from_str::<Message>(&text) {
                    Ok(message) => {
                        let _ = self.store.append(key, message).await;
                    }
                    Err(e) => {
                        counter!("charla_frames_quarantined_total").increment(1);
                        warn!(%key, error = %e, "malformed frame quarantined");
                    }
                },
                Err(e) => {
                    warn!(%key, error = %e, "channel transport error");
                    break;
                }
            }
        }
        self.on_transport_closed(key, epoch).await;
    }

    /// Abnormal end of the inbound stream (peer close or transport error).
    async fn on_transport_closed(self: &Arc<Self>, key: ConversationKey, epoch: u64) {
        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            // A newer bind/unbind owns the state now.
            return;
        }
        if let Some(conn) = inner.conn.take() {
            conn.writer.abort();
        }
        let _ = self.state_tx.send_replace(ChannelState::Closed);
        warn!(%key, "channel closed by peer or transport failure");
        drop(inner);
        self.schedule_reconnect(key, epoch);
    }

    fn schedule_reconnect(self: &Arc<Self>, key: ConversationKey, epoch: u64) {
        if !self.reconnect.enabled || self.reconnect.max_attempts == 0 {
            return;
        }
        let mgr = Arc::clone(self);
        let _ = tokio::spawn(async move { mgr.reconnect_loop(key, epoch).await });
    }

    /// Bounded exponential backoff, bound to the key that was selected
    /// when the loss happened. Any newer `bind`/`unbind` bumps the epoch
    /// and cancels the loop.
    async fn reconnect_loop(self: Arc<Self>, key: ConversationKey, epoch: u64) {
        let cap = Duration::from_millis(self.reconnect.max_delay_ms);
        let mut delay = Duration::from_millis(self.reconnect.base_delay_ms).min(cap);
        for attempt in 1..=self.reconnect.max_attempts {
            tokio::time::sleep(delay).await;
            let mut inner = self.inner.lock().await;
            if inner.epoch != epoch {
                debug!(%key, "reconnect cancelled by newer bind");
                return;
            }
            counter!("charla_reconnect_attempts_total").increment(1);
            info!(%key, attempt, "reconnecting channel");
            let _ = self.state_tx.send_replace(ChannelState::Connecting);
            match self.connect_locked(&mut inner, key, epoch).await {
                Ok(()) => return,
                Err(e) => {
                    let _ = self.state_tx.send_replace(ChannelState::Closed);
                    warn!(%key, attempt, error = %e, "reconnect attempt failed");
                }
            }
            drop(inner);
            delay = (delay * 2).min(cap);
        }
        warn!(%key, attempts = self.reconnect.max_attempts, "reconnect attempts exhausted");
    }
}

/// Forward queued outbound frames into the transport sink.
async fn write_loop(mut sink: FrameSink, mut rx: mpsc::Receiver<String>) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = sink.send(frame).await {
            warn!(error = %e, "outbound frame failed");
            break;
        }
    }
    let _ = sink.close().await;
}
