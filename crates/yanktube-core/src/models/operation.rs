use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Which timeout budget applies to an upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutTier {
    /// Short lookups that only return a JSON document
    Metadata,
    /// One media item
    SingleItem,
    /// A playlist resolved and archived upstream; fans out to many sub-resolutions
    Collection,
}

/// How the upstream body is read and handed to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferMode {
    /// Body decoded as JSON and returned as a JSON document
    Json,
    /// Body relayed chunk by chunk as it arrives
    Streamed,
    /// Body read completely before the response is committed
    Buffered,
}

/// Everything that distinguishes one relay operation from another.
#[derive(Debug, PartialEq, Eq)]
pub struct OperationProfile {
    pub name: &'static str,
    /// Client-facing route
    pub route: &'static str,
    /// Route on the processing backend, relative to its base URL
    pub upstream_path: &'static str,
    pub tier: TimeoutTier,
    pub transfer: TransferMode,
    pub uses_quality: bool,
    pub default_content_type: Option<&'static str>,
    pub default_disposition: Option<&'static str>,
    /// `error` field of the envelope when the upstream call fails
    pub failure_message: &'static str,
}

static METADATA: OperationProfile = OperationProfile {
    name: "metadata",
    route: "/metadata",
    upstream_path: "/details",
    tier: TimeoutTier::Metadata,
    transfer: TransferMode::Json,
    uses_quality: false,
    default_content_type: None,
    default_disposition: None,
    failure_message: "Failed to fetch details",
};

static SINGLE_VIDEO: OperationProfile = OperationProfile {
    name: "download_video",
    route: "/download/video",
    upstream_path: "/download/video",
    tier: TimeoutTier::SingleItem,
    transfer: TransferMode::Streamed,
    uses_quality: true,
    default_content_type: Some("video/mp4"),
    default_disposition: Some("attachment; filename=\"video.mp4\""),
    failure_message: "Failed to download video",
};

static SINGLE_AUDIO: OperationProfile = OperationProfile {
    name: "download_audio",
    route: "/download/audio",
    upstream_path: "/download/audio",
    tier: TimeoutTier::SingleItem,
    transfer: TransferMode::Streamed,
    uses_quality: false,
    default_content_type: Some("audio/mpeg"),
    default_disposition: Some("attachment; filename=\"audio.mp3\""),
    failure_message: "Failed to download audio",
};

static COLLECTION_VIDEO: OperationProfile = OperationProfile {
    name: "download_collection_video",
    route: "/download/collection/video",
    upstream_path: "/download/playlist/video",
    tier: TimeoutTier::Collection,
    transfer: TransferMode::Buffered,
    uses_quality: true,
    default_content_type: Some("application/zip"),
    default_disposition: Some("attachment; filename=\"playlist_videos.zip\""),
    failure_message: "Failed to download playlist videos",
};

static COLLECTION_AUDIO: OperationProfile = OperationProfile {
    name: "download_collection_audio",
    route: "/download/collection/audio",
    upstream_path: "/download/playlist/audio",
    tier: TimeoutTier::Collection,
    transfer: TransferMode::Buffered,
    uses_quality: false,
    default_content_type: Some("application/zip"),
    default_disposition: Some("attachment; filename=\"playlist_audio.zip\""),
    failure_message: "Failed to download playlist audio",
};

/// The closed set of relay operations. Each variant selects a row of the operation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Metadata,
    SingleVideo,
    SingleAudio,
    CollectionVideo,
    CollectionAudio,
}

impl OperationKind {
    pub const ALL: [OperationKind; 5] = [
        OperationKind::Metadata,
        OperationKind::SingleVideo,
        OperationKind::SingleAudio,
        OperationKind::CollectionVideo,
        OperationKind::CollectionAudio,
    ];

    pub fn profile(self) -> &'static OperationProfile {
        match self {
            OperationKind::Metadata => &METADATA,
            OperationKind::SingleVideo => &SINGLE_VIDEO,
            OperationKind::SingleAudio => &SINGLE_AUDIO,
            OperationKind::CollectionVideo => &COLLECTION_VIDEO,
            OperationKind::CollectionAudio => &COLLECTION_AUDIO,
        }
    }

    pub fn name(self) -> &'static str {
        self.profile().name
    }

    pub fn route(self) -> &'static str {
        self.profile().route
    }

    pub fn upstream_path(self) -> &'static str {
        self.profile().upstream_path
    }

    pub fn tier(self) -> TimeoutTier {
        self.profile().tier
    }

    pub fn transfer(self) -> TransferMode {
        self.profile().transfer
    }

    /// Whether the `quality` parameter is validated and forwarded
    pub fn uses_quality(self) -> bool {
        self.profile().uses_quality
    }

    pub fn failure_message(self) -> &'static str {
        self.profile().failure_message
    }

    pub fn is_download(self) -> bool {
        self != OperationKind::Metadata
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
