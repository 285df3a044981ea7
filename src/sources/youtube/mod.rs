use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{Instrument, debug, info, info_span};

pub mod cipher;
pub mod clients;
pub mod extractor;
pub mod itag;
pub mod playability;
pub mod player;
pub mod potoken;
pub mod streams;
pub mod url;
pub mod utils;

use cipher::CipherManager;
use clients::{ClientKind, VisitorDataCache};
use extractor::VideoMetadata;
use player::PlayerOrchestrator;
use potoken::{NoPoTokenProvider, PoTokenProvider};
use streams::{AudioStream, StreamAssembler, StreamingDescriptor, VideoStream};

use crate::{
    common::errors::{ExtractionError, ExtractionResult},
    configs::Config,
    sources::SourcePlugin,
    transport::{Localization, Transport},
};

/// Everything known about one video: metadata plus every resolved stream,
/// each list in preference order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResult {
    pub metadata: VideoMetadata,
    pub audio_streams: Vec<AudioStream>,
    pub video_streams: Vec<VideoStream>,
    pub video_only_streams: Vec<VideoStream>,
    pub dash_mpd_url: Option<String>,
    pub hls_url: Option<String>,
}

/// HLS manifests from iOS are the most complete, then the html5 ones.
fn hls_rank(kind: ClientKind) -> u8 {
    match kind {
        ClientKind::Ios => 0,
        ClientKind::Web | ClientKind::WebEmbedded | ClientKind::Tv => 1,
        ClientKind::Android => 2,
    }
}

fn manifest_urls(descriptors: &[StreamingDescriptor]) -> (Option<String>, Option<String>) {
    let dash = descriptors
        .iter()
        .find_map(|d| d.dash_manifest_url())
        .map(str::to_string);
    let hls = descriptors
        .iter()
        .filter_map(|d| d.hls_manifest_url().map(|url| (hls_rank(d.client), url)))
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, url)| url.to_string());
    (dash, hls)
}

pub struct YouTubeSource {
    transport: Arc<dyn Transport>,
    cipher: Arc<CipherManager>,
    visitor_data: VisitorDataCache,
    po_tokens: RwLock<Arc<dyn PoTokenProvider>>,
    localization: Localization,
    fetch_ios: AtomicBool,
}

impl YouTubeSource {
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        let youtube = &config.youtube;
        let cipher = Arc::new(CipherManager::new(
            transport.clone(),
            cipher::default_runner(),
            Duration::from_secs(youtube.script_ttl_hours.saturating_mul(60 * 60)),
        ));

        Self {
            transport,
            cipher,
            visitor_data: VisitorDataCache::default(),
            po_tokens: RwLock::new(Arc::new(NoPoTokenProvider)),
            localization: Localization::new(youtube.hl.clone(), youtube.gl.clone()),
            fetch_ios: AtomicBool::new(youtube.fetch_ios),
        }
    }

    pub fn set_fetch_ios(&self, enabled: bool) {
        self.fetch_ios.store(enabled, Ordering::Relaxed);
    }

    pub fn set_po_token_provider(&self, provider: Arc<dyn PoTokenProvider>) {
        *self.po_tokens.write() = provider;
    }

    /// Extracts metadata and streams for a watch URL or bare video id.
    pub async fn fetch_stream_info(&self, input: &str) -> ExtractionResult<StreamResult> {
        let video_id = self::url::parse_video_id(input)?;
        let span = info_span!("extract", video_id = %video_id);
        self.extract(&video_id).instrument(span).await
    }

    async fn extract(&self, video_id: &str) -> ExtractionResult<StreamResult> {
        let po_tokens = self.po_tokens.read().clone();

        let orchestrator = PlayerOrchestrator {
            transport: self.transport.as_ref(),
            cipher: &self.cipher,
            visitor_data: &self.visitor_data,
            po_tokens: po_tokens.as_ref(),
            localization: &self.localization,
            fetch_ios: self.fetch_ios.load(Ordering::Relaxed),
        };
        let responses = orchestrator.fetch(video_id).await?;

        let mut metadata = extractor::from_player(&responses.primary, responses.age_gated);
        if let Some(next) = &responses.next {
            extractor::apply_next(&mut metadata, next);
        }

        let assembled = StreamAssembler::new(&self.cipher, video_id, metadata.stream_type)
            .assemble(&responses.descriptors)
            .await;
        let (dash_mpd_url, hls_url) = manifest_urls(&responses.descriptors);

        if assembled.is_empty() && dash_mpd_url.is_none() && hls_url.is_none() {
            return Err(if assembled.dropped > 0 {
                ExtractionError::deobfuscation(format!(
                    "all {} streams of {} failed to resolve",
                    assembled.dropped, video_id
                ))
            } else {
                ExtractionError::ContentUnavailable(format!("{video_id} has no playable streams"))
            });
        }

        debug!(
            "{}: {} audio, {} video, {} video-only, {} dropped",
            video_id,
            assembled.audio.len(),
            assembled.video.len(),
            assembled.video_only.len(),
            assembled.dropped
        );

        Ok(StreamResult {
            metadata,
            audio_streams: assembled.audio,
            video_streams: assembled.video,
            video_only_streams: assembled.video_only,
            dash_mpd_url,
            hls_url,
        })
    }

    /// Forgets the player script, everything extracted from it and the
    /// session's visitor data.
    pub fn clear_caches(&self) {
        info!("clearing YouTube script and session caches");
        self.cipher.clear();
        self.visitor_data.clear();
    }
}

#[async_trait]
impl SourcePlugin for YouTubeSource {
    fn name(&self) -> &str {
        "youtube"
    }

    fn canonical_url(&self, input: &str) -> ExtractionResult<String> {
        let id = self::url::parse_video_id(input)?;
        Ok(self::url::watch_url(&id))
    }

    async fn fetch_stream_info(&self, input: &str) -> ExtractionResult<StreamResult> {
        YouTubeSource::fetch_stream_info(self, input).await
    }

    fn clear_caches(&self) {
        YouTubeSource::clear_caches(self);
    }
}
