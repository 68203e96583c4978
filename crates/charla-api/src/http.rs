//! `reqwest` implementation of [`PersistenceApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use charla_core::{
    ChatError, Conversation, ConversationKey, Envelope, Message, Result, Role, SessionContext,
};
use charla_settings::ApiSettings;

use crate::api::PersistenceApi;

/// HTTP client against the persistence service.
pub struct HttpPersistence {
    client: reqwest::Client,
    base_url: String,
    session: SessionContext,
}

impl std::fmt::Debug for HttpPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPersistence")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpPersistence {
    /// Build a client from API settings and the caller's session.
    pub fn new(settings: &ApiSettings, session: SessionContext) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .map_err(|e| ChatError::Connection(format!("http client build: {e}")))?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Map a non-success response into the operation's error class.
    ///
    /// 401/403 always become [`ChatError::Auth`], unmodified across all
    /// operations.
    async fn check(
        resp: reqwest::Response,
        wrap: fn(String) -> ChatError,
    ) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ChatError::Auth(format!("{status}: {body}")));
        }
        Err(wrap(format!("status {status}: {body}")))
    }
}

#[async_trait]
impl PersistenceApi for HttpPersistence {
    async fn conversations(&self) -> Result<Vec<Conversation>> {
        let resp = self
            .client
            .get(self.url("/mensajes/conversaciones"))
            .header("Authorization", self.session.bearer())
            .send()
            .await
            .map_err(|e| ChatError::DirectoryLoad(e.to_string()))?;
        let resp = Self::check(resp, ChatError::DirectoryLoad).await?;
        let rows: Vec<Conversation> = resp
            .json()
            .await
            .map_err(|e| ChatError::DirectoryLoad(format!("bad body: {e}")))?;
        debug!(count = rows.len(), "conversation directory loaded");
        Ok(rows)
    }

    async fn history(&self, key: ConversationKey) -> Result<Vec<Message>> {
        let path = format!("/mensajes/history/{}/{}", key.patient, key.clinician);
        let resp = self
            .client
            .get(self.url(&path))
            .header("Authorization", self.session.bearer())
            .send()
            .await
            .map_err(|e| ChatError::HistoryLoad(e.to_string()))?;
        let resp = Self::check(resp, ChatError::HistoryLoad).await?;
        let messages: Vec<Message> = resp
            .json()
            .await
            .map_err(|e| ChatError::HistoryLoad(format!("bad body: {e}")))?;
        debug!(%key, count = messages.len(), "history loaded");
        Ok(messages)
    }

    async fn send(&self, envelope: &Envelope) -> Result<Message> {
        let resp = self
            .client
            .post(self.url("/mensajes/send"))
            .header("Authorization", self.session.bearer())
            .json(envelope)
            .send()
            .await
            .map_err(|e| ChatError::Send(e.to_string()))?;
        let resp = Self::check(resp, ChatError::Send).await?;
        let message: Message = resp
            .json()
            .await
            .map_err(|e| ChatError::Send(format!("bad body: {e}")))?;
        debug!(key = %envelope.key(), id = ?message.id, "fallback send persisted");
        Ok(message)
    }

    async fn mark_read(&self, key: ConversationKey, viewer: Role) -> Result<()> {
        let path = format!("/mensajes/leidos/{}/{}", key.patient, key.clinician);
        let resp = self
            .client
            .post(self.url(&path))
            .header("Authorization", self.session.bearer())
            .json(&serde_json::json!({ "rol": viewer }))
            .send()
            .await
            .map_err(|e| ChatError::MarkRead(e.to_string()))?;
        let _ = Self::check(resp, ChatError::MarkRead).await?;
        debug!(%key, %viewer, "read marker cleared");
        Ok(())
    }
}
