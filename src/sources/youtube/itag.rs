//! Static catalog of the numeric format identifiers ("itags") the backend uses.

use serde::Serialize;

use crate::common::errors::{ExtractionError, ExtractionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItagType {
    Audio,
    Video,
    VideoOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaFormat {
    Mpeg4,
    V3gpp,
    Webm,
    M4a,
    WebmA,
    WebmAOpus,
}

impl MediaFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mpeg4 => "video/mp4",
            Self::V3gpp => "video/3gpp",
            Self::Webm => "video/webm",
            Self::M4a => "audio/mp4",
            Self::WebmA | Self::WebmAOpus => "audio/webm",
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Mpeg4 => "mp4",
            Self::V3gpp => "3gp",
            Self::Webm => "webm",
            Self::M4a => "m4a",
            Self::WebmA => "webm",
            Self::WebmAOpus => "opus",
        }
    }
}

/// One catalog entry. Video entries carry a resolution label, audio entries a
/// nominal bitrate in kbps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItagItem {
    pub id: u32,
    pub itag_type: ItagType,
    pub format: MediaFormat,
    pub resolution: Option<&'static str>,
    pub avg_bitrate_kbps: Option<u32>,
    pub fps: Option<u32>,
}

const DEFAULT_FPS: u32 = 30;

const fn video(id: u32, itag_type: ItagType, format: MediaFormat, resolution: &'static str) -> ItagItem {
    ItagItem {
        id,
        itag_type,
        format,
        resolution: Some(resolution),
        avg_bitrate_kbps: None,
        fps: Some(DEFAULT_FPS),
    }
}

const fn video_fps(id: u32, format: MediaFormat, resolution: &'static str, fps: u32) -> ItagItem {
    ItagItem {
        id,
        itag_type: ItagType::VideoOnly,
        format,
        resolution: Some(resolution),
        avg_bitrate_kbps: None,
        fps: Some(fps),
    }
}

const fn audio(id: u32, format: MediaFormat, kbps: u32) -> ItagItem {
    ItagItem {
        id,
        itag_type: ItagType::Audio,
        format,
        resolution: None,
        avg_bitrate_kbps: Some(kbps),
        fps: None,
    }
}

use ItagType::{Video, VideoOnly};
use MediaFormat::*;

static ITAG_LIST: &[ItagItem] = &[
    // muxed video
    video(17, Video, V3gpp, "144p"),
    video(36, Video, V3gpp, "240p"),
    video(18, Video, Mpeg4, "360p"),
    video(34, Video, Mpeg4, "360p"),
    video(35, Video, Mpeg4, "480p"),
    video(59, Video, Mpeg4, "480p"),
    video(78, Video, Mpeg4, "480p"),
    video(22, Video, Mpeg4, "720p"),
    video(37, Video, Mpeg4, "1080p"),
    video(38, Video, Mpeg4, "1080p"),
    video(43, Video, Webm, "360p"),
    video(44, Video, Webm, "480p"),
    video(45, Video, Webm, "720p"),
    video(46, Video, Webm, "1080p"),
    // audio
    audio(171, WebmA, 128),
    audio(172, WebmA, 256),
    audio(599, M4a, 32),
    audio(139, M4a, 48),
    audio(140, M4a, 128),
    audio(141, M4a, 256),
    audio(600, WebmAOpus, 35),
    audio(249, WebmAOpus, 50),
    audio(250, WebmAOpus, 70),
    audio(251, WebmAOpus, 160),
    // video only
    video(160, VideoOnly, Mpeg4, "144p"),
    video(394, VideoOnly, Mpeg4, "144p"),
    video(133, VideoOnly, Mpeg4, "240p"),
    video(395, VideoOnly, Mpeg4, "240p"),
    video(134, VideoOnly, Mpeg4, "360p"),
    video(396, VideoOnly, Mpeg4, "360p"),
    video(135, VideoOnly, Mpeg4, "480p"),
    video(212, VideoOnly, Mpeg4, "480p"),
    video(397, VideoOnly, Mpeg4, "480p"),
    video(136, VideoOnly, Mpeg4, "720p"),
    video(398, VideoOnly, Mpeg4, "720p"),
    video_fps(298, Mpeg4, "720p60", 60),
    video(137, VideoOnly, Mpeg4, "1080p"),
    video(399, VideoOnly, Mpeg4, "1080p"),
    video_fps(299, Mpeg4, "1080p60", 60),
    video(400, VideoOnly, Mpeg4, "1440p"),
    video(266, VideoOnly, Mpeg4, "2160p"),
    video(401, VideoOnly, Mpeg4, "2160p"),
    video(278, VideoOnly, Webm, "144p"),
    video(242, VideoOnly, Webm, "240p"),
    video(243, VideoOnly, Webm, "360p"),
    video(244, VideoOnly, Webm, "480p"),
    video(245, VideoOnly, Webm, "480p"),
    video(246, VideoOnly, Webm, "480p"),
    video(247, VideoOnly, Webm, "720p"),
    video(248, VideoOnly, Webm, "1080p"),
    video(271, VideoOnly, Webm, "1440p"),
    // 272 is either 3840x2160 or 7680x4320 depending on the upload
    video(272, VideoOnly, Webm, "2160p"),
    video_fps(302, Webm, "720p60", 60),
    video_fps(303, Webm, "1080p60", 60),
    video_fps(308, Webm, "1440p60", 60),
    video(313, VideoOnly, Webm, "2160p"),
    video_fps(315, Webm, "2160p60", 60),
];

pub fn all() -> &'static [ItagItem] {
    ITAG_LIST
}

pub fn is_supported(id: u32) -> bool {
    ITAG_LIST.iter().any(|item| item.id == id)
}

pub fn lookup(id: u32) -> ExtractionResult<&'static ItagItem> {
    ITAG_LIST
        .iter()
        .find(|item| item.id == id)
        .ok_or_else(|| ExtractionError::malformed(format!("itag {} is not supported", id)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioTrackType {
    Original,
    Dubbed,
    Descriptive,
    Secondary,
}

impl AudioTrackType {
    /// Reads the `acont` entry of a stream URL's `xtags` parameter.
    pub fn from_stream_url(stream_url: &str) -> Option<Self> {
        let parsed = url::Url::parse(stream_url).ok()?;
        let xtags = parsed
            .query_pairs()
            .find(|(k, _)| k == "xtags")
            .map(|(_, v)| v.into_owned())?;
        xtags
            .split(':')
            .find_map(|tag| tag.strip_prefix("acont="))
            .and_then(|kind| match kind {
                "original" => Some(Self::Original),
                "dubbed" | "dubbed-auto" => Some(Self::Dubbed),
                "descriptive" => Some(Self::Descriptive),
                "secondary" => Some(Self::Secondary),
                _ => None,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    pub id: String,
    pub name: Option<String>,
    pub locale: Option<String>,
    pub track_type: Option<AudioTrackType>,
}

/// Fields that only exist for one particular occurrence of a format in a
/// player response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatOccurrence {
    pub bitrate: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub quality: Option<String>,
    pub mime_type: Option<String>,
    pub codec: Option<String>,
    pub init_range: Option<ByteRange>,
    pub index_range: Option<ByteRange>,
    pub content_length: Option<u64>,
    pub approx_duration_ms: Option<u64>,
    pub sample_rate: Option<u32>,
    pub audio_channels: Option<u32>,
    pub target_duration_sec: Option<u32>,
    pub audio_track: Option<AudioTrack>,
}

/// A catalog entry combined with one occurrence's details. Built once, never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedFormat {
    pub id: u32,
    pub itag_type: ItagType,
    pub format: MediaFormat,
    /// Container type as the response declared it, or the catalog's default.
    pub mime_type: String,
    pub suffix: &'static str,
    pub resolution: Option<String>,
    pub bitrate: Option<u64>,
    pub average_bitrate_kbps: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub quality: Option<String>,
    pub codec: Option<String>,
    pub init_range: Option<ByteRange>,
    pub index_range: Option<ByteRange>,
    pub content_length: Option<u64>,
    pub approx_duration_ms: Option<u64>,
    pub sample_rate: Option<u32>,
    pub audio_channels: Option<u32>,
    pub target_duration_sec: Option<u32>,
    pub audio_track: Option<AudioTrack>,
}

impl EnrichedFormat {
    pub fn new(base: &ItagItem, occurrence: FormatOccurrence) -> Self {
        let resolution = match (base.itag_type, occurrence.height) {
            (ItagType::Audio, _) => None,
            (_, Some(h)) if h > 0 => {
                let fps = occurrence.fps.unwrap_or(0);
                Some(if fps > 30 {
                    format!("{}p{}", h, fps)
                } else {
                    format!("{}p", h)
                })
            }
            _ => base.resolution.map(str::to_string),
        };

        Self {
            id: base.id,
            itag_type: base.itag_type,
            format: base.format,
            mime_type: occurrence
                .mime_type
                .unwrap_or_else(|| base.format.mime_type().to_string()),
            suffix: base.format.suffix(),
            resolution,
            bitrate: occurrence.bitrate,
            average_bitrate_kbps: base.avg_bitrate_kbps,
            width: occurrence.width,
            height: occurrence.height,
            fps: occurrence.fps.or(base.fps),
            quality: occurrence.quality,
            codec: occurrence.codec,
            init_range: occurrence.init_range,
            index_range: occurrence.index_range,
            content_length: occurrence.content_length,
            approx_duration_ms: occurrence.approx_duration_ms,
            sample_rate: occurrence.sample_rate,
            audio_channels: occurrence.audio_channels,
            target_duration_sec: occurrence.target_duration_sec,
            audio_track: occurrence.audio_track,
        }
    }
}
