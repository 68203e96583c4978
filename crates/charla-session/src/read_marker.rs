//! Read receipt signaling.

use std::sync::Arc;

use metrics::counter;
use tracing::debug;

use charla_api::PersistenceApi;
use charla_core::{ConversationKey, Result, Role};

/// Signals the persistence service that the active conversation has been
/// viewed.
///
/// The read marker itself lives server-side; this tracker only triggers its
/// update and never touches the directory's cached unread counters.
pub struct ReadReceiptTracker {
    api: Arc<dyn PersistenceApi>,
}

impl ReadReceiptTracker {
    /// Create a tracker backed by `api`.
    pub fn new(api: Arc<dyn PersistenceApi>) -> Self {
        Self { api }
    }

    /// Clear the viewer's unread counter for `key`.
    ///
    /// Invoked once per conversation selection, after history load.
    pub async fn mark_read(&self, key: ConversationKey, viewer: Role) -> Result<()> {
        counter!("charla_mark_read_total").increment(1);
        self.api.mark_read(key, viewer).await?;
        debug!(%key, %viewer, "read marker updated");
        Ok(())
    }
}
