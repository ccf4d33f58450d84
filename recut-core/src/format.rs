//! Track format descriptions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of elementary stream a track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Video,
    Audio,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Format of a single track, as negotiated between stages.
///
/// Video- and audio-specific fields are optional; a format describes one or
/// the other depending on `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFormat {
    /// Track kind.
    pub kind: TrackKind,
    /// MIME type, e.g. `video/avc` or `audio/mp4a-latm`.
    pub mime: String,
    /// Width in pixels (video).
    pub width: Option<u32>,
    /// Height in pixels (video).
    pub height: Option<u32>,
    /// Nominal frame rate (video).
    pub frame_rate: Option<u32>,
    /// Target bit rate in bits per second.
    pub bit_rate: Option<u64>,
    /// Sample rate in Hz (audio).
    pub sample_rate: Option<u32>,
    /// Channel count (audio).
    pub channels: Option<u8>,
    /// Track duration in microseconds, when known.
    pub duration_us: Option<i64>,
    /// Codec-specific configuration data (parameter sets).
    pub codec_data: Option<Vec<u8>>,
}

impl MediaFormat {
    /// Create a video format.
    pub fn video(mime: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            kind: TrackKind::Video,
            mime: mime.into(),
            width: Some(width),
            height: Some(height),
            frame_rate: None,
            bit_rate: None,
            sample_rate: None,
            channels: None,
            duration_us: None,
            codec_data: None,
        }
    }

    /// Create an audio format.
    pub fn audio(mime: impl Into<String>, sample_rate: u32, channels: u8) -> Self {
        Self {
            kind: TrackKind::Audio,
            mime: mime.into(),
            width: None,
            height: None,
            frame_rate: None,
            bit_rate: None,
            sample_rate: Some(sample_rate),
            channels: Some(channels),
            duration_us: None,
            codec_data: None,
        }
    }

    /// Set the frame rate, builder style.
    pub fn with_frame_rate(mut self, fps: u32) -> Self {
        self.frame_rate = Some(fps);
        self
    }

    /// Set the bit rate, builder style.
    pub fn with_bit_rate(mut self, bps: u64) -> Self {
        self.bit_rate = Some(bps);
        self
    }

    /// Set the duration, builder style.
    pub fn with_duration_us(mut self, duration_us: i64) -> Self {
        self.duration_us = Some(duration_us);
        self
    }

    /// Set codec configuration data, builder style.
    pub fn with_codec_data(mut self, data: Vec<u8>) -> Self {
        self.codec_data = Some(data);
        self
    }

    /// Check if this format describes a video track.
    pub fn is_video(&self) -> bool {
        self.kind == TrackKind::Video
    }

    /// Check if this format describes an audio track.
    pub fn is_audio(&self) -> bool {
        self.kind == TrackKind::Audio
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TrackKind::Video => write!(
                f,
                "{} {}x{}",
                self.mime,
                self.width.unwrap_or(0),
                self.height.unwrap_or(0)
            ),
            TrackKind::Audio => write!(
                f,
                "{} {}Hz {}ch",
                self.mime,
                self.sample_rate.unwrap_or(0),
                self.channels.unwrap_or(0)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_format() {
        let fmt = MediaFormat::video("video/avc", 1920, 1080).with_frame_rate(30);
        assert!(fmt.is_video());
        assert_eq!(fmt.width, Some(1920));
        assert_eq!(fmt.frame_rate, Some(30));
        assert!(fmt.sample_rate.is_none());
    }

    #[test]
    fn test_audio_format() {
        let fmt = MediaFormat::audio("audio/mp4a-latm", 48000, 2);
        assert!(fmt.is_audio());
        assert_eq!(fmt.sample_rate, Some(48000));
        assert_eq!(fmt.channels, Some(2));
        assert!(fmt.width.is_none());
    }

    #[test]
    fn test_format_display() {
        let fmt = MediaFormat::video("video/avc", 640, 480);
        assert_eq!(fmt.to_string(), "video/avc 640x480");
    }
}
