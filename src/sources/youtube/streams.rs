use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    cipher::CipherManager,
    clients::ClientKind,
    itag::{
        self, AudioTrack, AudioTrackType, ByteRange, EnrichedFormat, FormatOccurrence, ItagType,
    },
    utils::{get_array, get_int, get_str},
};
use crate::common::{
    errors::{ExtractionError, ExtractionResult},
    types::SessionNonce,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryMethod {
    Progressive,
    Dash,
    Hls,
    Smooth,
    Torrent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum StreamType {
    #[default]
    Video,
    Live,
    PostLive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub id: String,
    /// Playback URL when `is_url`, otherwise a reference only a manifest can resolve.
    pub content: String,
    pub is_url: bool,
    pub format: EnrichedFormat,
    pub delivery: DeliveryMethod,
    pub manifest_url: Option<String>,
}

/// Two streams are interchangeable when these agree, whatever their URLs say.
/// Audio tracks of one itag in different languages are distinct streams.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Equivalence<'a> {
    pub itag: u32,
    pub delivery: DeliveryMethod,
    pub is_url: bool,
    pub track_id: Option<&'a str>,
    pub track_locale: Option<&'a str>,
    pub track_type: Option<AudioTrackType>,
}

impl Stream {
    pub fn equivalence(&self) -> Equivalence<'_> {
        let track = self.format.audio_track.as_ref();
        Equivalence {
            itag: self.format.id,
            delivery: self.delivery,
            is_url: self.is_url,
            track_id: track.map(|t| t.id.as_str()),
            track_locale: track.and_then(|t| t.locale.as_deref()),
            track_type: track.and_then(|t| t.track_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStream {
    #[serde(flatten)]
    pub stream: Stream,
    pub average_bitrate_kbps: Option<u32>,
    pub audio_track: Option<AudioTrack>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStream {
    #[serde(flatten)]
    pub stream: Stream,
    pub is_video_only: bool,
    pub resolution: Option<String>,
}

impl AsRef<Stream> for AudioStream {
    fn as_ref(&self) -> &Stream {
        &self.stream
    }
}

impl AsRef<Stream> for VideoStream {
    fn as_ref(&self) -> &Stream {
        &self.stream
    }
}

/// Streaming data returned to one profile, with what its URLs need appended.
#[derive(Debug, Clone)]
pub struct StreamingDescriptor {
    pub client: ClientKind,
    pub streaming_data: Value,
    pub cpn: SessionNonce,
    pub streaming_token: Option<String>,
}

impl StreamingDescriptor {
    pub fn dash_manifest_url(&self) -> Option<&str> {
        get_str(&self.streaming_data, "dashManifestUrl")
    }

    pub fn hls_manifest_url(&self) -> Option<&str> {
        get_str(&self.streaming_data, "hlsManifestUrl")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledStreams {
    pub audio: Vec<AudioStream>,
    pub video: Vec<VideoStream>,
    pub video_only: Vec<VideoStream>,
    /// Candidates whose URL could not be resolved.
    pub dropped: usize,
}

impl AssembledStreams {
    pub fn is_empty(&self) -> bool {
        self.audio.is_empty() && self.video.is_empty() && self.video_only.is_empty()
    }
}

fn push_unique<S: AsRef<Stream>>(list: &mut Vec<S>, candidate: S) -> bool {
    let key = candidate.as_ref().equivalence();
    if list.iter().any(|s| s.as_ref().equivalence() == key) {
        return false;
    }
    list.push(candidate);
    true
}

struct CipherParts {
    url: String,
    signature: String,
    param: String,
}

/// Splits a `signatureCipher` query string into its url, `s` and `sp` parts.
fn decode_signature_cipher(cipher: &str) -> Option<CipherParts> {
    let mut url = None;
    let mut signature = None;
    let mut param = None;

    for part in cipher.split('&') {
        if let Some((k, v)) = part.split_once('=') {
            let decoded = urlencoding::decode(v).ok()?.into_owned();
            match k {
                "url" => url = Some(decoded),
                "s" => signature = Some(decoded),
                "sp" => param = Some(decoded),
                _ => {}
            }
        }
    }

    Some(CipherParts {
        url: url?,
        signature: signature?,
        param: param.unwrap_or_else(|| "signature".to_string()),
    })
}

fn byte_range(format: &Value, key: &str) -> Option<ByteRange> {
    let range = format.get(key)?;
    Some(ByteRange {
        start: get_str(range, "start")?.parse().ok()?,
        end: get_str(range, "end")?.parse().ok()?,
    })
}

fn positive(format: &Value, key: &str) -> Option<i64> {
    Some(get_int(format, key, -1)).filter(|n| *n > 0)
}

/// `video/mp4; codecs="avc1.640028"` -> `avc1.640028`
fn codec_of(mime_type: &str) -> Option<String> {
    mime_type
        .split('"')
        .nth(1)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

fn audio_track(format: &Value, stream_url: &str) -> Option<AudioTrack> {
    let track = format.get("audioTrack")?;
    let id = get_str(track, "id")?.to_string();
    let locale = id
        .split_once('.')
        .map(|(locale, _)| locale.to_string())
        .filter(|l| !l.is_empty());
    Some(AudioTrack {
        name: get_str(track, "displayName").map(str::to_string),
        locale,
        track_type: AudioTrackType::from_stream_url(stream_url),
        id,
    })
}

pub fn occurrence_of(format: &Value, itag_type: ItagType, stream_url: &str) -> FormatOccurrence {
    let mut occurrence = FormatOccurrence {
        bitrate: positive(format, "bitrate").map(|n| n as u64),
        quality: get_str(format, "quality").map(str::to_string),
        mime_type: get_str(format, "mimeType")
            .and_then(|m| m.split(';').next())
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty()),
        codec: get_str(format, "mimeType").and_then(codec_of),
        init_range: byte_range(format, "initRange"),
        index_range: byte_range(format, "indexRange"),
        content_length: positive(format, "contentLength").map(|n| n as u64),
        approx_duration_ms: positive(format, "approxDurationMs").map(|n| n as u64),
        target_duration_sec: positive(format, "targetDurationSec").map(|n| n as u32),
        ..Default::default()
    };

    match itag_type {
        ItagType::Audio => {
            occurrence.sample_rate = positive(format, "audioSampleRate").map(|n| n as u32);
            occurrence.audio_channels = Some(get_int(format, "audioChannels", 2) as u32);
            occurrence.audio_track = audio_track(format, stream_url);
        }
        ItagType::Video | ItagType::VideoOnly => {
            occurrence.width = positive(format, "width").map(|n| n as u32);
            occurrence.height = positive(format, "height").map(|n| n as u32);
            occurrence.fps = positive(format, "fps").map(|n| n as u32);
        }
    }
    occurrence
}

pub struct StreamAssembler<'a> {
    cipher: &'a CipherManager,
    video_id: &'a str,
    stream_type: StreamType,
}

impl<'a> StreamAssembler<'a> {
    pub fn new(cipher: &'a CipherManager, video_id: &'a str, stream_type: StreamType) -> Self {
        Self {
            cipher,
            video_id,
            stream_type,
        }
    }

    async fn resolve_url(
        &self,
        format: &Value,
        descriptor: &StreamingDescriptor,
    ) -> ExtractionResult<String> {
        let mut url = if let Some(plain) = get_str(format, "url") {
            plain.to_string()
        } else {
            let cipher = get_str(format, "signatureCipher")
                .or_else(|| get_str(format, "cipher"))
                .ok_or_else(|| ExtractionError::malformed("format has neither url nor cipher"))?;
            let parts = decode_signature_cipher(cipher)
                .ok_or_else(|| ExtractionError::malformed("incomplete signature cipher"))?;
            let signature = self
                .cipher
                .deobfuscate_signature(self.video_id, &parts.signature)
                .await?;
            format!("{}&{}={}", parts.url, parts.param, signature)
        };

        url.push_str("&cpn=");
        url.push_str(descriptor.cpn.as_str());

        url = match self
            .cipher
            .deobfuscate_throttling_url(self.video_id, &url)
            .await
        {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("keeping throttled url for {}: {}", self.video_id, e);
                url
            }
        };

        if let Some(token) = &descriptor.streaming_token {
            url.push_str("&pot=");
            url.push_str(token);
        }
        Ok(url)
    }

    async fn build_stream(
        &self,
        format: &Value,
        descriptor: &StreamingDescriptor,
        wanted: ItagType,
    ) -> ExtractionResult<Option<(Stream, ItagType)>> {
        let id = get_int(format, "itag", -1);
        let item = match u32::try_from(id).ok().and_then(|id| itag::lookup(id).ok()) {
            Some(item) if item.itag_type == wanted => item,
            Some(_) => return Ok(None),
            None => {
                debug!("skipping unknown itag {}", id);
                return Ok(None);
            }
        };

        let url = self.resolve_url(format, descriptor).await.map_err(|e| {
            warn!(
                "dropping itag {} from {} for {}: {}",
                item.id, descriptor.client, self.video_id, e
            );
            e
        })?;

        let is_url = match wanted {
            ItagType::Video | ItagType::VideoOnly if self.stream_type == StreamType::Video => {
                !get_str(format, "type")
                    .is_some_and(|t| t.eq_ignore_ascii_case("FORMAT_STREAM_TYPE_OTF"))
            }
            _ => self.stream_type != StreamType::PostLive,
        };
        let dash = self.stream_type != StreamType::Video || !is_url;
        let delivery = if dash {
            DeliveryMethod::Dash
        } else {
            DeliveryMethod::Progressive
        };
        let manifest_url = if self.stream_type != StreamType::Video {
            descriptor.dash_manifest_url().map(str::to_string)
        } else {
            None
        };

        let occurrence = occurrence_of(format, item.itag_type, &url);
        Ok(Some((
            Stream {
                id: item.id.to_string(),
                content: url,
                is_url,
                format: EnrichedFormat::new(item, occurrence),
                delivery,
                manifest_url,
            },
            item.itag_type,
        )))
    }

    async fn collect_from(
        &self,
        descriptor: &StreamingDescriptor,
        key: &str,
        wanted: ItagType,
        out: &mut AssembledStreams,
    ) {
        for format in get_array(&descriptor.streaming_data, key) {
            let (stream, itag_type) = match self.build_stream(format, descriptor, wanted).await {
                Ok(Some(built)) => built,
                Ok(None) => continue,
                Err(_) => {
                    out.dropped += 1;
                    continue;
                }
            };
            match itag_type {
                ItagType::Audio => {
                    let candidate = AudioStream {
                        average_bitrate_kbps: stream.format.average_bitrate_kbps,
                        audio_track: stream.format.audio_track.clone(),
                        stream,
                    };
                    push_unique(&mut out.audio, candidate);
                }
                ItagType::Video | ItagType::VideoOnly => {
                    let is_video_only = itag_type == ItagType::VideoOnly;
                    let candidate = VideoStream {
                        resolution: stream.format.resolution.clone(),
                        is_video_only,
                        stream,
                    };
                    if is_video_only {
                        push_unique(&mut out.video_only, candidate);
                    } else {
                        push_unique(&mut out.video, candidate);
                    }
                }
            }
        }
    }

    /// Builds the deduplicated stream lists. `descriptors` must be in profile
    /// priority order; the first equivalent stream found wins.
    pub async fn assemble(&self, descriptors: &[StreamingDescriptor]) -> AssembledStreams {
        let mut out = AssembledStreams::default();
        for descriptor in descriptors {
            self.collect_from(descriptor, "adaptiveFormats", ItagType::Audio, &mut out)
                .await;
            self.collect_from(descriptor, "formats", ItagType::Video, &mut out)
                .await;
            self.collect_from(descriptor, "adaptiveFormats", ItagType::VideoOnly, &mut out)
                .await;
        }
        debug!(
            "assembled {} audio, {} video, {} video-only streams for {}",
            out.audio.len(),
            out.video.len(),
            out.video_only.len(),
            self.video_id
        );
        out
    }
}
