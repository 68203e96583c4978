//! Session orchestration: directory, selection, delivery.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use charla_api::{HttpPersistence, PersistenceApi};
use charla_core::{ChatError, Conversation, ConversationKey, Message, Result, SessionContext};
use charla_settings::CharlaSettings;

use crate::connection::{ChannelState, ConnectionManager};
use crate::directory::ConversationDirectory;
use crate::read_marker::ReadReceiptTracker;
use crate::router::DeliveryRouter;
use crate::store::MessageStore;
use crate::transport::{Transport, WsTransport};

/// One viewer's messaging session.
///
/// Owns the store, the connection manager, the router, the directory, and
/// the read tracker, and sequences them through [`select`](Self::select):
/// channel teardown+reopen, history reload, read receipt, in that order.
pub struct ChatSession {
    session: SessionContext,
    api: Arc<dyn PersistenceApi>,
    store: Arc<MessageStore>,
    manager: Arc<ConnectionManager>,
    router: DeliveryRouter,
    directory: ConversationDirectory,
    tracker: ReadReceiptTracker,
    /// Selection generation; an overlapping newer `select` supersedes the
    /// in-flight history result of an older one.
    selection: AtomicU64,
    active: parking_lot::Mutex<Option<ConversationKey>>,
}

impl ChatSession {
    /// Wire a session from explicit parts. Used directly by tests; hosts
    /// usually go through [`open`](Self::open).
    pub fn new(
        session: SessionContext,
        settings: &CharlaSettings,
        api: Arc<dyn PersistenceApi>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let store = Arc::new(MessageStore::new());
        let manager =
            ConnectionManager::new(transport, Arc::clone(&store), settings.reconnect.clone());
        let router = DeliveryRouter::new(
            Arc::clone(&manager),
            Arc::clone(&api),
            Arc::clone(&store),
        );
        let directory = ConversationDirectory::new(Arc::clone(&api));
        let tracker = ReadReceiptTracker::new(Arc::clone(&api));
        Self {
            session,
            api,
            store,
            manager,
            router,
            directory,
            tracker,
            selection: AtomicU64::new(0),
            active: parking_lot::Mutex::new(None),
        }
    }

    /// Wire a session against the production HTTP backend and WebSocket
    /// transport.
    pub fn open(session: SessionContext, settings: &CharlaSettings) -> Result<Self> {
        let api: Arc<dyn PersistenceApi> =
            Arc::new(HttpPersistence::new(&settings.api, session.clone())?);
        let transport: Arc<dyn Transport> =
            Arc::new(WsTransport::new(&settings.api, &session));
        Ok(Self::new(session, settings, api, transport))
    }

    /// Fetch the viewer's conversation list, in server order.
    pub async fn load_directory(&self) -> Result<Vec<Conversation>> {
        self.directory.load().await
    }

    /// Make `conversation` the active one.
    ///
    /// Sequence: (a) channel teardown+reopen for the pair, (b) history
    /// reload into the store, (c) read receipt, fired exactly once per
    /// call, after the history fetch.
    ///
    /// A failed channel handshake is non-fatal (sends fall back to
    /// request/response); a failed history fetch is fatal for the call. If
    /// a newer `select` overlaps this one, the stale history result is
    /// discarded rather than written into any log.
    pub async fn select(&self, conversation: &Conversation) -> Result<()> {
        let key = conversation.key();
        let generation = self.selection.fetch_add(1, Ordering::SeqCst) + 1;
        *self.active.lock() = Some(key);
        info!(%key, "conversation selected");

        if let Err(e) = self.manager.bind(key).await {
            warn!(%key, error = %e, "channel unavailable, continuing with fallback sends");
        }

        let history = self.api.history(key).await?;
        if self.selection.load(Ordering::SeqCst) == generation {
            self.store.load_history(key, history).await;
        } else {
            debug!(%key, "history result superseded, not stored");
        }

        match self.tracker.mark_read(key, self.session.role).await {
            Ok(()) => {}
            Err(e @ ChatError::Auth(_)) => return Err(e),
            Err(e) => {
                warn!(%key, error = %e, "mark-read failed; counter clears on next directory load");
            }
        }
        Ok(())
    }

    /// Send `content` to the active conversation.
    pub async fn send(&self, content: &str) -> Result<()> {
        let key = (*self.active.lock())
            .ok_or_else(|| ChatError::Send("no conversation selected".into()))?;
        self.router.send(key, content, self.session.role).await
    }

    /// Snapshot of the active log for `key`.
    pub async fn messages(&self, key: ConversationKey) -> Vec<Message> {
        self.store.log(key).await
    }

    /// Current channel state.
    pub fn connection_state(&self) -> ChannelState {
        self.manager.state()
    }

    /// Subscribe to channel state changes, the UI status indicator.
    pub fn state_changes(&self) -> watch::Receiver<ChannelState> {
        self.manager.state_changes()
    }

    /// The currently selected conversation, if any.
    pub fn active_key(&self) -> Option<ConversationKey> {
        *self.active.lock()
    }

    /// Tear down the channel at session end.
    pub async fn close(&self) {
        self.manager.unbind().await;
        *self.active.lock() = None;
    }
}
