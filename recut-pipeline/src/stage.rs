//! Stage protocol.
//!
//! Every node in the graph implements the same capability set so the
//! execution engine can drive sources, codecs, effectors, and the sink
//! uniformly.

use crate::error::Result;
use recut_core::{Frame, MediaFormat};

/// Bounded wait for any underlying codec call, in microseconds. A stage's
/// `step` never blocks longer than this.
pub const STEP_TIMEOUT_US: i64 = 5_000;

/// Track id assigned to the video branch at resolution.
pub const VIDEO_TRACK_ID: u32 = 0;

/// Track id assigned to the audio branch at resolution.
pub const AUDIO_TRACK_ID: u32 = 1;

/// Outcome of one stage step.
#[derive(Debug)]
pub enum StepResult {
    /// One frame of output was produced.
    Produced(Frame),
    /// Nothing available yet; try again on a later tick.
    NoDataYet,
    /// The stage has emitted EOF on every track it owns.
    EofReached,
    /// The stage's output format changed mid-stream. The immediate
    /// downstream neighbor must be reconfigured before further data flows.
    FormatChanged(MediaFormat),
}

/// One processing node in the stage graph.
///
/// Each stage buffers at most one in-flight frame: the engine only pushes
/// when [`Stage::can_accept`] is true, which is the backpressure rule that
/// bounds memory and preserves per-track ordering.
pub trait Stage: Send {
    /// Stage name for diagnostics.
    fn name(&self) -> &str;

    /// One-time setup, negotiating with the upstream output format.
    /// Configuring a stage twice is a configuration error.
    fn configure(&mut self, upstream: Option<&MediaFormat>) -> Result<()>;

    /// React to a mid-stream upstream format change. Not an error and
    /// must not terminate the run.
    fn reconfigure(&mut self, track_id: u32, format: &MediaFormat) -> Result<()>;

    /// Negotiated output format, once configured.
    fn output_format(&self) -> Option<MediaFormat>;

    /// Whether the stage can take one more input frame.
    fn can_accept(&self) -> bool;

    /// Hand one frame to the stage. Only valid when [`Stage::can_accept`]
    /// returned true.
    fn push(&mut self, frame: Frame) -> Result<()>;

    /// Attempt to produce at most one frame of output. Non-blocking beyond
    /// [`STEP_TIMEOUT_US`].
    fn step(&mut self) -> Result<StepResult>;

    /// True once EOF has been emitted (or consumed, for the sink) on every
    /// track this stage owns.
    fn is_done(&self) -> bool;

    /// Release underlying resources. Idempotent; invoked during teardown
    /// on success and failure alike.
    fn close(&mut self);
}
