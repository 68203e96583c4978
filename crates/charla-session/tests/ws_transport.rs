//! End-to-end channel tests against a local WebSocket relay.
//!
//! The relay is the production shape in miniature: it authenticates the
//! upgrade from the `token` query parameter, accepts outbound envelopes,
//! and echoes each one back as a stored message with a server-assigned id.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::ws::{Message as WsFrame, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::get;

use charla_api::PersistenceApi;
use charla_core::{
    ChatError, Conversation, ConversationKey, Envelope, Message, MessageId, Result, Role,
    SessionContext,
};
use charla_session::{
    ChannelState, ConnectionManager, DeliveryRouter, MessageStore, WsTransport,
};
use charla_settings::{ApiSettings, ReconnectSettings};

#[derive(Clone, Debug, PartialEq)]
struct Handshake {
    patient: i64,
    clinician: i64,
    token: String,
}

/// Echo relay: every inbound envelope comes back as a stored message.
#[derive(Clone, Default)]
struct Relay {
    next_id: Arc<AtomicU64>,
    handshakes: Arc<parking_lot::Mutex<Vec<Handshake>>>,
}

impl Relay {
    async fn start(self) -> SocketAddr {
        let app = Router::new()
            .route("/mensajes/{patient}/{clinician}", get(upgrade))
            .with_state(self);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind relay");
        let addr = listener.local_addr().expect("relay addr");
        let _ = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve relay");
        });
        addr
    }
}

async fn upgrade(
    State(relay): State<Relay>,
    Path((patient, clinician)): Path<(i64, i64)>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    relay.handshakes.lock().push(Handshake {
        patient,
        clinician,
        token: params.get("token").cloned().unwrap_or_default(),
    });
    ws.on_upgrade(move |socket| echo(relay, socket))
}

async fn echo(relay: Relay, mut socket: WebSocket) {
    while let Some(Ok(frame)) = socket.recv().await {
        let WsFrame::Text(text) = frame else { continue };
        let Ok(envelope) = serde_json::from_str::<serde_json::Value>(&text) else {
            continue;
        };
        // "adiós" makes the relay hang up, for dead-peer tests.
        if envelope["contenido"] == "adiós" {
            return;
        }
        let id = relay.next_id.fetch_add(1, Ordering::SeqCst) + 901;
        let reply = serde_json::json!({
            "id": id,
            "contenido": envelope["contenido"],
            "timestamp": "2026-08-29T12:00:00",
            "remitente_rol": envelope["remitente_rol"],
        });
        if socket.send(WsFrame::Text(reply.to_string().into())).await.is_err() {
            return;
        }
    }
}

/// Persistence stub; these tests exercise the channel path only, so any
/// fallback call is a failure.
struct NoFallbackApi;

#[async_trait]
impl PersistenceApi for NoFallbackApi {
    async fn conversations(&self) -> Result<Vec<Conversation>> {
        Ok(vec![])
    }

    async fn history(&self, _key: ConversationKey) -> Result<Vec<Message>> {
        Ok(vec![])
    }

    async fn send(&self, _envelope: &Envelope) -> Result<Message> {
        Err(ChatError::Send("fallback used with channel open".into()))
    }

    async fn mark_read(&self, _key: ConversationKey, _viewer: Role) -> Result<()> {
        Ok(())
    }
}

fn no_reconnect() -> ReconnectSettings {
    ReconnectSettings {
        enabled: false,
        ..ReconnectSettings::default()
    }
}

fn settings_for(addr: SocketAddr) -> ApiSettings {
    ApiSettings {
        base_url: "http://unused.invalid".into(),
        ws_base_url: format!("ws://{addr}"),
        timeout_ms: 30_000,
    }
}

fn viewer(token: &str) -> SessionContext {
    SessionContext::new(Role::Patient, 7, "Ana", token)
}

async fn wait_for_len(store: &MessageStore, key: ConversationKey, n: usize) {
    for _ in 0..400 {
        if store.len(key).await == n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("store never reached {n} messages for {key}");
}

async fn wait_for_state(mgr: &ConnectionManager, want: ChannelState) {
    for _ in 0..400 {
        if mgr.state() == want {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("state never reached {want:?}, still {:?}", mgr.state());
}

#[tokio::test]
async fn handshake_carries_pair_and_token() {
    let relay = Relay::default();
    let handshakes = Arc::clone(&relay.handshakes);
    let addr = relay.start().await;

    let settings = settings_for(addr);
    let transport = Arc::new(WsTransport::new(&settings, &viewer("s3cr3t token")));
    let store = Arc::new(MessageStore::new());
    let mgr = ConnectionManager::new(transport, store, no_reconnect());

    mgr.bind(ConversationKey::new(7, 3)).await.unwrap();

    // The percent-encoded token round-trips through the query string.
    assert_eq!(
        *handshakes.lock(),
        vec![Handshake {
            patient: 7,
            clinician: 3,
            token: "s3cr3t token".into(),
        }]
    );
    mgr.unbind().await;
}

#[tokio::test]
async fn relay_echo_lands_in_store() {
    let addr = Relay::default().start().await;
    let settings = settings_for(addr);
    let transport = Arc::new(WsTransport::new(&settings, &viewer("tok")));
    let store = Arc::new(MessageStore::new());
    let mgr = ConnectionManager::new(transport, Arc::clone(&store), no_reconnect());
    let router = DeliveryRouter::new(
        Arc::clone(&mgr),
        Arc::new(NoFallbackApi),
        Arc::clone(&store),
    );

    let key = ConversationKey::new(7, 3);
    mgr.bind(key).await.unwrap();

    router.send(key, "Me duele la cabeza", Role::Patient).await.unwrap();

    // Nothing is appended locally until the relay's echo arrives.
    wait_for_len(&store, key, 1).await;
    let log = store.log(key).await;
    assert_eq!(log[0].id, Some(MessageId::new("901")));
    assert_eq!(log[0].content, "Me duele la cabeza");
    assert_eq!(log[0].sender_role, Role::Patient);
    mgr.unbind().await;
}

#[tokio::test]
async fn relay_hangup_closes_channel() {
    let addr = Relay::default().start().await;
    let settings = settings_for(addr);
    let transport = Arc::new(WsTransport::new(&settings, &viewer("tok")));
    let store = Arc::new(MessageStore::new());
    let mgr = ConnectionManager::new(transport, Arc::clone(&store), no_reconnect());
    let router = DeliveryRouter::new(
        Arc::clone(&mgr),
        Arc::new(NoFallbackApi),
        Arc::clone(&store),
    );

    let key = ConversationKey::new(7, 3);
    mgr.bind(key).await.unwrap();

    router.send(key, "adiós", Role::Patient).await.unwrap();

    wait_for_state(&mgr, ChannelState::Closed).await;
    assert!(store.log(key).await.is_empty());
}
