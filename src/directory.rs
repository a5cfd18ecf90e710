//! Directory seam between the session and the REST backend
//!
//! The session talks to the stream directory through this trait so tests can
//! substitute an in-memory catalog for the HTTP client.

use crate::client::EscRadioClient;
use crate::error::Result;
use crate::models::RadioStream;
use async_trait::async_trait;

/// Source of stream variants and their fresh detail records
#[async_trait]
pub trait StreamDirectory: Send + Sync {
    /// Fetch the full catalog of stream variants
    async fn list_streams(&self) -> Result<Vec<RadioStream>>;

    /// Fetch the fresher detail record for one variant
    async fn stream_detail(&self, id: u64) -> Result<RadioStream>;

    /// Catalog filtered to user-selectable variants
    ///
    /// Fallback relays are part of the catalog but are not offered as a
    /// quality choice.
    async fn selectable_streams(&self) -> Result<Vec<RadioStream>> {
        Ok(self
            .list_streams()
            .await?
            .into_iter()
            .filter(|s| !s.is_fallback_relay())
            .collect())
    }
}

#[async_trait]
impl StreamDirectory for EscRadioClient {
    async fn list_streams(&self) -> Result<Vec<RadioStream>> {
        EscRadioClient::list_streams(self).await
    }

    async fn stream_detail(&self, id: u64) -> Result<RadioStream> {
        EscRadioClient::stream_detail(self, id).await
    }
}
