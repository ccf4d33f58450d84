//! Source stage: reads samples from a concatenated, trimmed source list.

use crate::device::{Extractor, MediaEnv, SeekMode};
use crate::error::{PipelineError, Result};
use crate::stage::{Stage, StepResult};
use recut_core::{Frame, MediaFormat, MediaLocator, Segment, TrackKind};
use std::sync::Arc;
use tracing::{debug, trace};

/// Per-file plan derived from the source list snapshot: where the file is
/// and which sub-ranges of it to play.
#[derive(Debug, Clone)]
pub(crate) struct FilePlan {
    pub locator: MediaLocator,
    pub segments: Vec<Segment>,
}

/// Head of one track's stage chain.
///
/// Iterates files in order and segments within each file, seeking to each
/// segment start and dropping samples outside the range. Timestamps are
/// rebased onto the concatenated output timeline:
/// `pts = consumed_prior + (sample_time - segment.start)`, so downstream
/// progress is monotone across file and segment boundaries. Emits one EOF
/// frame after the last segment of the last file.
pub struct SourceStage {
    name: String,
    kind: TrackKind,
    track_id: u32,
    env: Arc<dyn MediaEnv>,
    files: Vec<FilePlan>,
    file_idx: usize,
    seg_idx: usize,
    /// Cumulative duration of fully consumed prior segments, in µs.
    consumed_prior_us: i64,
    extractor: Option<Box<dyn Extractor>>,
    format: Option<MediaFormat>,
    configured: bool,
    eof_emitted: bool,
    closed: bool,
    read_buf: Vec<u8>,
}

impl SourceStage {
    pub(crate) fn new(
        kind: TrackKind,
        track_id: u32,
        env: Arc<dyn MediaEnv>,
        files: Vec<FilePlan>,
    ) -> Self {
        Self {
            name: format!("{}-source", kind),
            kind,
            track_id,
            env,
            files,
            file_idx: 0,
            seg_idx: 0,
            consumed_prior_us: 0,
            extractor: None,
            format: None,
            configured: false,
            eof_emitted: false,
            closed: false,
            read_buf: Vec::new(),
        }
    }

    fn current_segment(&self) -> Segment {
        self.files[self.file_idx].segments[self.seg_idx]
    }

    /// Open the current file, select this stage's track, and seek to the
    /// current segment start.
    fn open_current(&mut self) -> Result<()> {
        let plan = &self.files[self.file_idx];
        let mut extractor = self.env.open_extractor(&plan.locator)?;

        let mut selected = None;
        for i in 0..extractor.track_count() {
            if extractor.track_format(i)?.kind == self.kind {
                selected = Some(i);
                break;
            }
        }
        let index = selected.ok_or_else(|| {
            PipelineError::config(format!("no {} track in {}", self.kind, plan.locator))
        })?;

        let format = extractor.track_format(index)?;
        if let Some(ref first) = self.format {
            // Concatenated inputs must agree on the track format.
            if format.mime != first.mime {
                return Err(PipelineError::config(format!(
                    "{} track format mismatch in {}: {} vs {}",
                    self.kind, plan.locator, format.mime, first.mime
                )));
            }
        } else {
            self.format = Some(format);
        }

        extractor.select_track(index)?;
        let seg = plan.segments[self.seg_idx];
        extractor.seek_to(seg.start_us, SeekMode::PreviousSync)?;
        debug!(
            "{}: opened {} (segment {}..{})",
            self.name, plan.locator, seg.start_us, seg.end_us
        );
        self.extractor = Some(extractor);
        Ok(())
    }

    /// Move to the next segment, crossing into the next file when the
    /// current one is exhausted. Returns false when nothing is left.
    fn advance_segment(&mut self) -> Result<bool> {
        self.consumed_prior_us += self.current_segment().duration_us();
        self.seg_idx += 1;

        if self.seg_idx >= self.files[self.file_idx].segments.len() {
            self.file_idx += 1;
            self.seg_idx = 0;
            self.extractor = None;
            if self.file_idx >= self.files.len() {
                return Ok(false);
            }
            self.open_current()?;
        } else {
            let seg = self.current_segment();
            if let Some(ref mut extractor) = self.extractor {
                extractor.seek_to(seg.start_us, SeekMode::PreviousSync)?;
            }
        }
        Ok(true)
    }

    /// Segment exhausted: advance, or emit the EOF sentinel when done.
    fn finish_segment(&mut self) -> Result<StepResult> {
        if self.advance_segment()? {
            Ok(StepResult::NoDataYet)
        } else {
            trace!("{}: end of source list", self.name);
            self.eof_emitted = true;
            Ok(StepResult::Produced(Frame::end_of_stream(self.track_id)))
        }
    }
}

impl Stage for SourceStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&mut self, _upstream: Option<&MediaFormat>) -> Result<()> {
        if self.configured {
            return Err(PipelineError::config(format!(
                "{} already configured",
                self.name
            )));
        }
        if self.files.is_empty() {
            return Err(PipelineError::config("source list is empty"));
        }
        self.open_current()?;
        self.configured = true;
        Ok(())
    }

    fn reconfigure(&mut self, _track_id: u32, _format: &MediaFormat) -> Result<()> {
        // Nothing upstream of a source.
        Ok(())
    }

    fn output_format(&self) -> Option<MediaFormat> {
        self.format.clone()
    }

    fn can_accept(&self) -> bool {
        false
    }

    fn push(&mut self, _frame: Frame) -> Result<()> {
        Err(PipelineError::config("source stage takes no input"))
    }

    fn step(&mut self) -> Result<StepResult> {
        if self.eof_emitted {
            return Ok(StepResult::EofReached);
        }
        if !self.configured {
            return Err(PipelineError::config(format!(
                "{} not configured",
                self.name
            )));
        }

        let seg = self.current_segment();
        let extractor = self
            .extractor
            .as_mut()
            .ok_or_else(|| PipelineError::config("source has no open extractor"))?;

        match extractor.read_sample(&mut self.read_buf)? {
            None => self.finish_segment(),
            Some(size) => {
                let time_us = extractor.sample_time_us();
                if time_us >= seg.end_us {
                    return self.finish_segment();
                }
                if time_us < seg.start_us {
                    // Still rolling forward from the pre-segment sync point.
                    extractor.advance();
                    return Ok(StepResult::NoDataYet);
                }

                let flags = extractor.sample_flags();
                let pts = self.consumed_prior_us + (time_us - seg.start_us);
                let payload = self.read_buf[..size].to_vec();
                extractor.advance();
                trace!("{}: sample at {}us -> pts {}us", self.name, time_us, pts);
                Ok(StepResult::Produced(
                    Frame::new(self.track_id, pts, payload).with_flags(flags),
                ))
            }
        }
    }

    fn is_done(&self) -> bool {
        self.eof_emitted
    }

    fn close(&mut self) {
        if !self.closed {
            self.extractor = None;
            self.closed = true;
        }
    }
}
