//! Collaborator interfaces the pipeline consumes.
//!
//! The pipeline core never implements a codec, extractor, or muxer; it
//! drives platform implementations through these traits. Each stage owns
//! its collaborator handle exclusively for the lifetime of a run.

use crate::error::Result;
use recut_core::{Frame, FrameFlags, MediaFormat, MediaLocator, Segment};

/// Metadata for one buffer moving through a codec or muxer.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferInfo {
    /// Presentation timestamp in microseconds.
    pub pts_us: i64,
    /// Buffer flags (EOF, SYNC, CODEC_CONFIG).
    pub flags: FrameFlags,
    /// Payload size in bytes.
    pub size: usize,
}

/// Whether a codec device decodes or encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecDirection {
    Decode,
    Encode,
}

/// Outcome of dequeuing an output buffer from a codec device.
#[derive(Debug)]
pub enum CodecEvent {
    /// An output buffer is ready.
    Buffer {
        /// Index to read via [`CodecDevice::output_buffer`] and return via
        /// [`CodecDevice::release_output_buffer`].
        index: usize,
        /// Buffer metadata.
        info: BufferInfo,
    },
    /// Nothing ready within the timeout.
    TryAgain,
    /// The device's output format changed; query
    /// [`CodecDevice::output_format`]. A legitimate mid-stream event,
    /// never an error.
    FormatChanged,
    /// The device's output buffer set changed; no action required.
    BuffersChanged,
}

/// A hardware or software codec, decoder or encoder.
///
/// Every dequeue call is timeout-bounded so the driving loop stays
/// responsive to cancellation.
pub trait CodecDevice: Send {
    /// One-time configuration with the input (decode) or target (encode)
    /// format.
    fn configure(&mut self, format: &MediaFormat, direction: CodecDirection) -> Result<()>;

    /// Start the device after configuration.
    fn start(&mut self) -> Result<()>;

    /// Dequeue an input buffer index, or `None` if none freed up within
    /// `timeout_us`.
    fn dequeue_input_buffer(&mut self, timeout_us: i64) -> Result<Option<usize>>;

    /// Queue data into a previously dequeued input buffer. An empty payload
    /// with the EOF flag signals end of input.
    fn queue_input_buffer(
        &mut self,
        index: usize,
        data: &[u8],
        pts_us: i64,
        flags: FrameFlags,
    ) -> Result<()>;

    /// Dequeue the next output event, waiting at most `timeout_us`.
    fn dequeue_output_buffer(&mut self, timeout_us: i64) -> Result<CodecEvent>;

    /// Read the contents of a dequeued output buffer.
    fn output_buffer(&self, index: usize) -> Result<&[u8]>;

    /// Return an output buffer to the device.
    fn release_output_buffer(&mut self, index: usize, render: bool) -> Result<()>;

    /// Current output format; valid after a `FormatChanged` event.
    fn output_format(&self) -> Result<MediaFormat>;

    /// Stop the device. Safe to call on a device that never started.
    fn stop(&mut self);

    /// Release all device resources. Called exactly once during teardown.
    fn release(&mut self);
}

/// Seek behavior for extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    /// Seek to the closest sync sample at or before the target.
    PreviousSync,
    /// Seek to the closest sync sample at or after the target.
    NextSync,
    /// Seek to the closest sync sample.
    ClosestSync,
}

/// Demuxing collaborator reading samples from one container.
pub trait Extractor: Send {
    /// Number of tracks in the container.
    fn track_count(&self) -> usize;

    /// Format of track `index`.
    fn track_format(&self, index: usize) -> Result<MediaFormat>;

    /// Select the track subsequent reads pull from.
    fn select_track(&mut self, index: usize) -> Result<()>;

    /// Read the current sample into `buf`, returning its size, or `None`
    /// at end of file. Does not advance.
    fn read_sample(&mut self, buf: &mut Vec<u8>) -> Result<Option<usize>>;

    /// Presentation time of the current sample on the native timeline.
    fn sample_time_us(&self) -> i64;

    /// Flags of the current sample.
    fn sample_flags(&self) -> FrameFlags;

    /// Advance to the next sample. Returns false at end of file.
    fn advance(&mut self) -> bool;

    /// Seek to `time_us` on the native timeline.
    fn seek_to(&mut self, time_us: i64, mode: SeekMode) -> Result<()>;

    /// Native duration of the container in microseconds.
    fn duration_us(&self) -> i64;
}

/// Muxing collaborator writing final encoded samples to an output container.
pub trait Muxer: Send {
    /// Register an output track; returns the muxer's track index.
    fn add_track(&mut self, format: &MediaFormat) -> Result<usize>;

    /// Start the muxer after all tracks are registered.
    fn start(&mut self) -> Result<()>;

    /// Write one encoded sample.
    fn write_sample(&mut self, track_index: usize, data: &[u8], info: &BufferInfo) -> Result<()>;

    /// Finalize the container (write trailer/footer).
    fn stop(&mut self) -> Result<()>;

    /// Release the output resource. Called exactly once during teardown,
    /// on success and failure alike.
    fn release(&mut self);
}

/// Optional per-frame video effect.
pub trait Effector: Send {
    /// Apply the effect to a frame in place.
    fn apply(&mut self, frame: &mut Frame) -> Result<()>;

    /// Time range the effect applies to, on the output timeline. Frames
    /// outside the range pass through unmodified. `None` means the whole
    /// timeline.
    fn segment(&self) -> Option<Segment>;
}

/// Capability object supplying platform collaborators.
///
/// Passed explicitly into pipeline construction; the engine keeps no
/// ambient global media state.
pub trait MediaEnv: Send + Sync {
    /// Open an extractor for a source file.
    fn open_extractor(&self, locator: &MediaLocator) -> Result<Box<dyn Extractor>>;

    /// Create a decoder able to consume `format`.
    fn create_decoder(&self, format: &MediaFormat) -> Result<Box<dyn CodecDevice>>;

    /// Create an encoder producing `format`.
    fn create_encoder(&self, format: &MediaFormat) -> Result<Box<dyn CodecDevice>>;

    /// Create a muxer writing to `locator`.
    fn create_muxer(&self, locator: &MediaLocator) -> Result<Box<dyn Muxer>>;
}
