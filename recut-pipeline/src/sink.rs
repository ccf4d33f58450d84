//! Sink stage: multiplexes final encoded samples into the output container.

use crate::device::{BufferInfo, Muxer};
use crate::error::{PipelineError, Result};
use crate::stage::{Stage, StepResult};
use recut_core::{Frame, MediaFormat};
use std::collections::BTreeMap;
use tracing::{debug, trace};

struct SinkTrack {
    format: MediaFormat,
    muxer_index: Option<usize>,
    eof: bool,
}

/// Terminal stage shared by every track branch.
///
/// Tracks are registered during resolution and re-registered by pre-start
/// format changes; the muxer learns the final formats and starts lazily
/// before the first written sample, then finalizes once every track has
/// delivered its EOF frame. The underlying output resource is released
/// exactly once, on the success and error paths alike.
pub struct SinkStage {
    name: String,
    muxer: Option<Box<dyn Muxer>>,
    tracks: BTreeMap<u32, SinkTrack>,
    pending: Option<Frame>,
    configured: bool,
    started: bool,
    finalized: bool,
    closed: bool,
    frames_written: u64,
}

impl SinkStage {
    /// Wrap a muxer collaborator.
    pub fn new(name: impl Into<String>, muxer: Box<dyn Muxer>) -> Self {
        Self {
            name: name.into(),
            muxer: Some(muxer),
            tracks: BTreeMap::new(),
            pending: None,
            configured: false,
            started: false,
            finalized: false,
            closed: false,
            frames_written: 0,
        }
    }

    /// Register an output track with its negotiated format. The muxer sees
    /// the track when it starts, so a later pre-start format change only
    /// replaces the registration here.
    pub fn add_track(&mut self, track_id: u32, format: &MediaFormat) -> Result<()> {
        if self.started {
            return Err(PipelineError::config(format!(
                "{}: cannot add a track after the muxer started",
                self.name
            )));
        }
        debug!("{}: registered track {} as {}", self.name, track_id, format);
        self.tracks.insert(
            track_id,
            SinkTrack {
                format: format.clone(),
                muxer_index: None,
                eof: false,
            },
        );
        Ok(())
    }

    /// Number of frames written to the container so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn muxer_mut(&mut self) -> Result<&mut Box<dyn Muxer>> {
        self.muxer
            .as_mut()
            .ok_or_else(|| PipelineError::config("sink muxer already released"))
    }

    /// Register every track with the muxer and start it. Tracks register in
    /// ascending track-id order, so cross-track layout is stable for a
    /// given input.
    fn ensure_started(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        let formats: Vec<(u32, MediaFormat)> = self
            .tracks
            .iter()
            .map(|(id, t)| (*id, t.format.clone()))
            .collect();
        for (track_id, format) in formats {
            let index = self.muxer_mut()?.add_track(&format)?;
            if let Some(track) = self.tracks.get_mut(&track_id) {
                track.muxer_index = Some(index);
            }
        }
        self.muxer_mut()?.start()?;
        self.started = true;
        debug!("{}: muxer started with {} tracks", self.name, self.tracks.len());
        Ok(())
    }
}

impl Stage for SinkStage {
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
        // Track registration happens via add_track during resolution.
        self.configured = true;
        Ok(())
    }

    fn reconfigure(&mut self, track_id: u32, format: &MediaFormat) -> Result<()> {
        if self.started {
            return Err(PipelineError::config(format!(
                "{}: format change for track {} after the muxer started",
                self.name, track_id
            )));
        }
        let track = self.tracks.get_mut(&track_id).ok_or_else(|| {
            PipelineError::config(format!("{}: unknown track {}", self.name, track_id))
        })?;
        debug!(
            "{}: track {} re-registered as {}",
            self.name, track_id, format
        );
        track.format = format.clone();
        Ok(())
    }

    fn output_format(&self) -> Option<MediaFormat> {
        None
    }

    fn can_accept(&self) -> bool {
        self.pending.is_none() && !self.finalized
    }

    fn push(&mut self, frame: Frame) -> Result<()> {
        if !self.can_accept() {
            return Err(PipelineError::config(format!(
                "{} cannot accept a frame now",
                self.name
            )));
        }
        if !self.tracks.contains_key(&frame.track_id) {
            return Err(PipelineError::config(format!(
                "{}: frame for unregistered track {}",
                self.name, frame.track_id
            )));
        }
        self.pending = Some(frame);
        Ok(())
    }

    fn step(&mut self) -> Result<StepResult> {
        if self.finalized {
            return Ok(StepResult::EofReached);
        }
        let Some(mut frame) = self.pending.take() else {
            return Ok(StepResult::NoDataYet);
        };

        if frame.is_end_of_stream() {
            if let Some(track) = self.tracks.get_mut(&frame.track_id) {
                track.eof = true;
            }
            if self.tracks.values().all(|t| t.eof) {
                if self.started {
                    self.muxer_mut()?.stop()?;
                }
                self.finalized = true;
                debug!(
                    "{}: finalized after {} frames",
                    self.name, self.frames_written
                );
                return Ok(StepResult::EofReached);
            }
            return Ok(StepResult::NoDataYet);
        }

        if frame.is_codec_config() {
            // Configuration data travels in the track format, not as a sample.
            return Ok(StepResult::NoDataYet);
        }

        self.ensure_started()?;
        let muxer_index = self
            .tracks
            .get(&frame.track_id)
            .and_then(|t| t.muxer_index)
            .ok_or_else(|| {
                PipelineError::config(format!(
                    "{}: track {} never registered with the muxer",
                    self.name, frame.track_id
                ))
            })?;
        let info = BufferInfo {
            pts_us: frame.pts_us,
            flags: frame.flags,
            size: frame.size(),
        };
        let payload = frame.take_payload().unwrap_or_default();
        self.muxer_mut()?.write_sample(muxer_index, &payload, &info)?;
        self.frames_written += 1;
        trace!(
            "{}: wrote {} bytes for track {} at {}us",
            self.name,
            info.size,
            frame.track_id,
            info.pts_us
        );
        Ok(StepResult::NoDataYet)
    }

    fn is_done(&self) -> bool {
        self.finalized
    }

    fn close(&mut self) {
        if !self.closed {
            if let Some(mut muxer) = self.muxer.take() {
                muxer.release();
            }
            self.closed = true;
        }
    }
}
