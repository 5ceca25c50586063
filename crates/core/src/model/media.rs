use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlaybackError {
    #[error("video URL cannot be empty")]
    EmptyUrl,

    #[error("video URL is not valid: {0}")]
    InvalidUrl(String),

    #[error("unsupported video URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("adaptive streaming is not supported on this platform")]
    AdaptiveUnsupported,
}

//
// ─── SOURCE ────────────────────────────────────────────────────────────────────
//

/// Container kind inferred from the lesson's video URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    /// Playlist manifest (HLS) with switchable quality levels.
    AdaptiveManifest,
    /// A single progressively downloadable file.
    Progressive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    url: Url,
    kind: MediaKind,
}

const MANIFEST_EXTENSION: &str = ".m3u8";

impl MediaSource {
    /// Parse and classify a lesson video URL.
    ///
    /// The manifest check looks at the path only, so query strings such as
    /// signed-URL tokens do not affect classification.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError` for empty, unparsable or non-HTTP(S) URLs.
    pub fn parse(raw: &str) -> Result<Self, PlaybackError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PlaybackError::EmptyUrl);
        }
        let url = Url::parse(raw).map_err(|e| PlaybackError::InvalidUrl(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(PlaybackError::UnsupportedScheme(other.to_owned())),
        }
        let kind = if url.path().to_ascii_lowercase().ends_with(MANIFEST_EXTENSION) {
            MediaKind::AdaptiveManifest
        } else {
            MediaKind::Progressive
        };
        Ok(Self { url, kind })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.kind
    }
}

//
// ─── STRATEGY ──────────────────────────────────────────────────────────────────
//

/// What the host platform can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackSupport {
    /// An adaptive-streaming client library is usable.
    pub adaptive_client: bool,
    /// The media element itself understands manifests.
    pub native_manifest: bool,
}

impl PlaybackSupport {
    #[must_use]
    pub fn full() -> Self {
        Self {
            adaptive_client: true,
            native_manifest: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStrategy {
    /// Attach the adaptive client to the media element.
    AdaptiveClient,
    /// Hand the manifest URL straight to a media element with native support.
    NativeManifest,
    /// Assign a progressive file URL to the media element.
    Direct,
}

impl PlaybackStrategy {
    /// Pick how `source` should be played given the platform's support.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::AdaptiveUnsupported` when a manifest cannot be
    /// played either way.
    pub fn select(source: &MediaSource, support: PlaybackSupport) -> Result<Self, PlaybackError> {
        match source.kind() {
            MediaKind::Progressive => Ok(Self::Direct),
            MediaKind::AdaptiveManifest if support.adaptive_client => Ok(Self::AdaptiveClient),
            MediaKind::AdaptiveManifest if support.native_manifest => Ok(Self::NativeManifest),
            MediaKind::AdaptiveManifest => Err(PlaybackError::AdaptiveUnsupported),
        }
    }
}

/// A rendition offered by an adaptive manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLevel {
    pub height: u32,
    pub bitrate: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_manifest_by_path() {
        let src = MediaSource::parse("https://cdn.example.com/v/master.M3U8?token=abc").unwrap();
        assert_eq!(src.kind(), MediaKind::AdaptiveManifest);

        let src = MediaSource::parse("https://cdn.example.com/v/lesson.mp4?x=.m3u8").unwrap();
        assert_eq!(src.kind(), MediaKind::Progressive);
    }

    #[test]
    fn rejects_bad_urls() {
        assert_eq!(MediaSource::parse("  ").unwrap_err(), PlaybackError::EmptyUrl);
        assert!(matches!(
            MediaSource::parse("not a url").unwrap_err(),
            PlaybackError::InvalidUrl(_)
        ));
        assert_eq!(
            MediaSource::parse("ftp://host/a.mp4").unwrap_err(),
            PlaybackError::UnsupportedScheme("ftp".into())
        );
    }

    #[test]
    fn falls_back_to_native_then_fails() {
        let src = MediaSource::parse("https://cdn.example.com/a.m3u8").unwrap();
        assert_eq!(
            PlaybackStrategy::select(&src, PlaybackSupport::full()).unwrap(),
            PlaybackStrategy::AdaptiveClient
        );
        let native_only = PlaybackSupport {
            adaptive_client: false,
            native_manifest: true,
        };
        assert_eq!(
            PlaybackStrategy::select(&src, native_only).unwrap(),
            PlaybackStrategy::NativeManifest
        );
        assert_eq!(
            PlaybackStrategy::select(&src, PlaybackSupport::default()).unwrap_err(),
            PlaybackError::AdaptiveUnsupported
        );
    }

    #[test]
    fn progressive_needs_no_support() {
        let src = MediaSource::parse("http://cdn.example.com/a.mp4").unwrap();
        assert_eq!(
            PlaybackStrategy::select(&src, PlaybackSupport::default()).unwrap(),
            PlaybackStrategy::Direct
        );
    }
}
