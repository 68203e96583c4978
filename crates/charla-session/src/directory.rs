//! The viewer's conversation list.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use charla_api::PersistenceApi;
use charla_core::{Conversation, ConversationKey, Result};

/// Fetches and holds the conversations visible to the caller, one row per
/// distinct patient/clinician pair.
///
/// Rows keep the server-provided ordering; the core never re-sorts. The
/// cached `unread_count` values only change on the next [`load`](Self::load);
/// marking a conversation read does not zero them locally.
pub struct ConversationDirectory {
    api: Arc<dyn PersistenceApi>,
    rows: RwLock<Vec<Conversation>>,
}

impl ConversationDirectory {
    /// Create an empty directory backed by `api`.
    pub fn new(api: Arc<dyn PersistenceApi>) -> Self {
        Self {
            api,
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Fetch the viewer's conversations, replacing the cached list.
    ///
    /// Failures surface unmodified; no retry is attempted here; the user
    /// navigating again is the retry.
    pub async fn load(&self) -> Result<Vec<Conversation>> {
        let fetched = self.api.conversations().await?;
        debug!(count = fetched.len(), "directory refreshed");
        let mut rows = self.rows.write().await;
        rows.clone_from(&fetched);
        Ok(fetched)
    }

    /// Snapshot of the cached rows, in server order.
    pub async fn conversations(&self) -> Vec<Conversation> {
        self.rows.read().await.clone()
    }

    /// Look up a cached row by conversation key.
    pub async fn find(&self, key: ConversationKey) -> Option<Conversation> {
        let rows = self.rows.read().await;
        rows.iter().find(|c| c.key() == key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use charla_core::{ChatError, Envelope, Message, Role};

    struct FakeApi {
        rows: Vec<Conversation>,
        fail: bool,
    }

    fn conv(patient: i64, clinician: i64, unread: u32) -> Conversation {
        Conversation {
            patient_id: charla_core::PatientId(patient),
            patient_name: format!("P{patient}"),
            clinician_id: charla_core::ClinicianId(clinician),
            clinician_name: format!("C{clinician}"),
            last_message: "hola".into(),
            last_timestamp: "2026-08-29T09:00:00".into(),
            unread_count: unread,
        }
    }

    #[async_trait]
    impl PersistenceApi for FakeApi {
        async fn conversations(&self) -> Result<Vec<Conversation>> {
            if self.fail {
                return Err(ChatError::DirectoryLoad("boom".into()));
            }
            Ok(self.rows.clone())
        }

        async fn history(&self, _key: ConversationKey) -> Result<Vec<Message>> {
            Ok(vec![])
        }

        async fn send(&self, _envelope: &Envelope) -> Result<Message> {
            Err(ChatError::Send("unused".into()))
        }

        async fn mark_read(&self, _key: ConversationKey, _viewer: Role) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn load_keeps_server_order() {
        // Deliberately not sorted by anything.
        let api = Arc::new(FakeApi {
            rows: vec![conv(9, 1, 0), conv(2, 3, 5), conv(7, 3, 1)],
            fail: false,
        });
        let dir = ConversationDirectory::new(api);
        let rows = dir.load().await.unwrap();

        let keys: Vec<_> = rows.iter().map(Conversation::key).collect();
        assert_eq!(
            keys,
            vec![
                ConversationKey::new(9, 1),
                ConversationKey::new(2, 3),
                ConversationKey::new(7, 3)
            ]
        );
        assert_eq!(dir.conversations().await.len(), 3);
    }

    #[tokio::test]
    async fn load_failure_surfaces_directory_error() {
        let dir = ConversationDirectory::new(Arc::new(FakeApi {
            rows: vec![],
            fail: true,
        }));
        let err = dir.load().await.unwrap_err();
        assert!(matches!(err, ChatError::DirectoryLoad(_)));
        assert!(dir.conversations().await.is_empty());
    }

    #[tokio::test]
    async fn find_by_key() {
        let api = Arc::new(FakeApi {
            rows: vec![conv(7, 3, 2)],
            fail: false,
        });
        let dir = ConversationDirectory::new(api);
        let _ = dir.load().await.unwrap();

        let found = dir.find(ConversationKey::new(7, 3)).await.unwrap();
        assert_eq!(found.unread_count, 2);
        assert!(dir.find(ConversationKey::new(1, 1)).await.is_none());
    }

    #[tokio::test]
    async fn unread_count_is_not_zeroed_locally() {
        let api = Arc::new(FakeApi {
            rows: vec![conv(7, 3, 4)],
            fail: false,
        });
        let dir = ConversationDirectory::new(Arc::clone(&api) as Arc<dyn PersistenceApi>);
        let _ = dir.load().await.unwrap();

        // Marking read happens elsewhere; the cached row keeps its counter
        // until the next load.
        api.mark_read(ConversationKey::new(7, 3), Role::Patient)
            .await
            .unwrap();
        let row = dir.find(ConversationKey::new(7, 3)).await.unwrap();
        assert_eq!(row.unread_count, 4);
    }
}
