use async_trait::async_trait;

use super::youtube::StreamResult;
use crate::common::errors::ExtractionResult;

pub type BoxedSource = Box<dyn SourcePlugin>;

/// Trait every extraction service implements.
#[async_trait]
pub trait SourcePlugin: Send + Sync {
    /// Unique identifier for this service (e.g. "youtube"), also the cache
    /// namespace and TTL override key.
    fn name(&self) -> &str;

    /// Normalizes any accepted form of `input` to one URL so equivalent
    /// inputs share a cache entry. Fails for input this service cannot handle.
    fn canonical_url(&self, input: &str) -> ExtractionResult<String>;

    async fn fetch_stream_info(&self, input: &str) -> ExtractionResult<StreamResult>;

    /// Drops service-level state such as downloaded scripts.
    fn clear_caches(&self);
}
