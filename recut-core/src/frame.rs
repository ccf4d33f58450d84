//! Frame abstraction exchanged between pipeline stages.
//!
//! A frame is the unit of data handed from one stage to the next. Ownership
//! of the payload buffer transfers with the frame; stages never share or
//! mutate a buffer after handoff.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Flags describing frame properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FrameFlags: u32 {
        /// Sentinel: no further frames will arrive for this track.
        const EOF = 0x0001;
        /// Sync point (keyframe / random access point).
        const SYNC = 0x0002;
        /// Codec configuration data (parameter sets), not media data.
        const CODEC_CONFIG = 0x0004;
    }
}

/// A unit of media data flowing through the stage graph.
///
/// Frames are produced by exactly one stage and consumed by exactly one
/// downstream stage. An EOF frame carries no payload.
#[derive(Clone)]
pub struct Frame {
    /// Track this frame belongs to.
    pub track_id: u32,
    /// Presentation timestamp in microseconds on the output timeline.
    pub pts_us: i64,
    /// Frame flags.
    pub flags: FrameFlags,
    /// Owned data buffer. `None` for control-only frames (EOF).
    payload: Option<Vec<u8>>,
}

impl Frame {
    /// Create a new frame with an owned payload.
    pub fn new(track_id: u32, pts_us: i64, payload: Vec<u8>) -> Self {
        Self {
            track_id,
            pts_us,
            flags: FrameFlags::empty(),
            payload: Some(payload),
        }
    }

    /// Create the end-of-stream sentinel for a track.
    pub fn end_of_stream(track_id: u32) -> Self {
        Self {
            track_id,
            pts_us: 0,
            flags: FrameFlags::EOF,
            payload: None,
        }
    }

    /// Set flags, builder style.
    pub fn with_flags(mut self, flags: FrameFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Check if this is the end-of-stream sentinel.
    pub fn is_end_of_stream(&self) -> bool {
        self.flags.contains(FrameFlags::EOF)
    }

    /// Check if this is a sync point.
    pub fn is_sync(&self) -> bool {
        self.flags.contains(FrameFlags::SYNC)
    }

    /// Check if this frame carries codec configuration data.
    pub fn is_codec_config(&self) -> bool {
        self.flags.contains(FrameFlags::CODEC_CONFIG)
    }

    /// Get the payload data, if any.
    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    /// Get a mutable reference to the payload data, if any.
    pub fn payload_mut(&mut self) -> Option<&mut Vec<u8>> {
        self.payload.as_mut()
    }

    /// Take ownership of the payload, leaving the frame empty.
    pub fn take_payload(&mut self) -> Option<Vec<u8>> {
        self.payload.take()
    }

    /// Payload size in bytes (0 for control-only frames).
    pub fn size(&self) -> usize {
        self.payload.as_ref().map(Vec::len).unwrap_or(0)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("track_id", &self.track_id)
            .field("pts_us", &self.pts_us)
            .field("flags", &self.flags)
            .field("size", &self.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = Frame::new(0, 40_000, vec![0u8; 128]);
        assert_eq!(frame.track_id, 0);
        assert_eq!(frame.pts_us, 40_000);
        assert_eq!(frame.size(), 128);
        assert!(!frame.is_end_of_stream());
    }

    #[test]
    fn test_end_of_stream_sentinel() {
        let frame = Frame::end_of_stream(1);
        assert!(frame.is_end_of_stream());
        assert!(frame.payload().is_none());
        assert_eq!(frame.size(), 0);
    }

    #[test]
    fn test_take_payload() {
        let mut frame = Frame::new(0, 0, vec![1, 2, 3]);
        let payload = frame.take_payload();
        assert_eq!(payload, Some(vec![1, 2, 3]));
        assert!(frame.payload().is_none());
    }

    #[test]
    fn test_flags() {
        let frame = Frame::new(0, 0, vec![]).with_flags(FrameFlags::SYNC);
        assert!(frame.is_sync());
        assert!(!frame.is_codec_config());
    }
}
