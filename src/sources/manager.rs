use std::sync::Arc;

use super::{
    cache::{CacheKey, ResultCache, ResultKind},
    plugin::BoxedSource,
    youtube::{StreamResult, YouTubeSource},
};
use crate::{
    common::errors::{ExtractionError, ExtractionResult},
    configs::Config,
    transport::Transport,
};

/// Routes inputs to the service that understands them and keeps finished
/// results in the shared cache.
pub struct SourceManager {
    pub sources: Vec<BoxedSource>,
    cache: ResultCache<Arc<StreamResult>>,
}

impl SourceManager {
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        let mut sources: Vec<BoxedSource> = Vec::new();

        macro_rules! register_source {
            ($enabled:expr, $name:literal, $ctor:expr) => {
                if $enabled {
                    tracing::info!("Loaded source: {}", $name);
                    sources.push(Box::new($ctor));
                }
            };
        }

        register_source!(
            config.youtube.enabled,
            "YouTube",
            YouTubeSource::new(config, transport.clone())
        );

        Self::with_sources(sources, ResultCache::from_config(&config.cache))
    }

    pub fn with_sources(sources: Vec<BoxedSource>, cache: ResultCache<Arc<StreamResult>>) -> Self {
        Self { sources, cache }
    }

    /// Extracts `input` with the first source that accepts it, answering from
    /// the cache when possible. Concurrent calls for the same content share
    /// one extraction.
    pub async fn fetch_stream_info(&self, input: &str) -> ExtractionResult<Arc<StreamResult>> {
        for source in &self.sources {
            let Ok(url) = source.canonical_url(input) else {
                continue;
            };
            tracing::trace!("Loading '{}' with source: {}", url, source.name());

            let key = CacheKey::new(source.name(), url, ResultKind::StreamInfo);
            return self
                .cache
                .get_or_load(key, || async {
                    source.fetch_stream_info(input).await.map(Arc::new)
                })
                .await;
        }

        tracing::debug!("No source could handle input: {}", input);
        Err(ExtractionError::UnsupportedUrl(input.to_string()))
    }

    pub fn is_loading(&self, service: &str, url: &str) -> bool {
        self.cache
            .is_loading(&CacheKey::new(service, url, ResultKind::StreamInfo))
    }

    pub fn trim_cache(&self) {
        self.cache.trim();
    }

    /// Clears cached results and every source's script and session state.
    pub fn clear_caches(&self) {
        self.cache.clear();
        for source in &self.sources {
            source.clear_caches();
        }
    }
}
