//! Effector stage: optional per-frame video transform.

use crate::device::Effector;
use crate::error::{PipelineError, Result};
use crate::stage::{Stage, StepResult};
use recut_core::{Frame, MediaFormat};
use tracing::debug;

/// Applies a video effect inside its declared time range and passes frames
/// through untouched outside it. EOF frames always pass through.
pub struct EffectorStage {
    name: String,
    effector: Box<dyn Effector>,
    format: Option<MediaFormat>,
    pending: Option<Frame>,
    configured: bool,
    eof_forwarded: bool,
}

impl EffectorStage {
    /// Wrap an effector collaborator.
    pub fn new(name: impl Into<String>, effector: Box<dyn Effector>) -> Self {
        Self {
            name: name.into(),
            effector,
            format: None,
            pending: None,
            configured: false,
            eof_forwarded: false,
        }
    }
}

impl Stage for EffectorStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&mut self, upstream: Option<&MediaFormat>) -> Result<()> {
        if self.configured {
            return Err(PipelineError::config(format!(
                "{} already configured",
                self.name
            )));
        }
        let format = upstream.ok_or_else(|| {
            PipelineError::config(format!("{} requires an upstream format", self.name))
        })?;
        if !format.is_video() {
            return Err(PipelineError::config(format!(
                "{} only applies to video, got {}",
                self.name, format.kind
            )));
        }
        self.format = Some(format.clone());
        self.configured = true;
        Ok(())
    }

    fn reconfigure(&mut self, _track_id: u32, format: &MediaFormat) -> Result<()> {
        debug!("{}: upstream format now {}", self.name, format);
        self.format = Some(format.clone());
        Ok(())
    }

    fn output_format(&self) -> Option<MediaFormat> {
        self.format.clone()
    }

    fn can_accept(&self) -> bool {
        self.configured && self.pending.is_none() && !self.eof_forwarded
    }

    fn push(&mut self, frame: Frame) -> Result<()> {
        if !self.can_accept() {
            return Err(PipelineError::config(format!(
                "{} cannot accept a frame now",
                self.name
            )));
        }
        self.pending = Some(frame);
        Ok(())
    }

    fn step(&mut self) -> Result<StepResult> {
        if self.eof_forwarded {
            return Ok(StepResult::EofReached);
        }
        let Some(mut frame) = self.pending.take() else {
            return Ok(StepResult::NoDataYet);
        };

        if frame.is_end_of_stream() {
            self.eof_forwarded = true;
            return Ok(StepResult::Produced(frame));
        }

        let applies = self
            .effector
            .segment()
            .map_or(true, |seg| seg.contains(frame.pts_us));
        if applies {
            self.effector.apply(&mut frame)?;
        }
        Ok(StepResult::Produced(frame))
    }

    fn is_done(&self) -> bool {
        self.eof_forwarded
    }

    fn close(&mut self) {
        // No underlying resource; effects run in-process.
        self.pending = None;
    }
}
