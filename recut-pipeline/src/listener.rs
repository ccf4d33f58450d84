//! Caller-facing progress notifications.

use crate::error::PipelineError;

/// Receives lifecycle and progress notifications for one run.
///
/// Notifications are delivered on the worker context driving the run;
/// callers needing main-thread delivery must marshal themselves. All
/// methods default to no-ops.
pub trait ProgressListener: Send + Sync {
    /// The run began executing.
    fn on_media_start(&self) {}

    /// Progress changed; `progress` is in `[0, 1]`. The first notification
    /// of a run reports exactly 0 and the final notification of a
    /// successful run reports exactly 1.
    fn on_media_progress(&self, _progress: f32) {}

    /// The run was paused.
    fn on_media_pause(&self) {}

    /// The run stopped, either by cancellation or on the way to completion.
    fn on_media_stop(&self) {}

    /// The run completed successfully. Never fires after an error.
    fn on_media_done(&self) {}

    /// The run failed. No further notifications follow.
    fn on_error(&self, _error: &PipelineError) {}
}

/// Listener that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl ProgressListener for NullListener {}
