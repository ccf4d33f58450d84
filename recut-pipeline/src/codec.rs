//! Decoder and encoder stages driving a codec collaborator.

use crate::device::{CodecDevice, CodecDirection, CodecEvent, MediaEnv};
use crate::error::{PipelineError, Result};
use crate::stage::{Stage, StepResult, STEP_TIMEOUT_US};
use recut_core::{Frame, FrameFlags, MediaFormat};
use std::sync::Arc;
use tracing::{debug, trace};

/// Shared feed/drain cycle for decoder and encoder stages.
///
/// Input side: hold at most one pending frame, queue it into the device
/// when an input buffer frees up. Output side: drain at most one output
/// buffer per step, translating device events into [`StepResult`]s.
struct CodecDriver {
    name: String,
    direction: CodecDirection,
    device: Option<Box<dyn CodecDevice>>,
    pending: Option<Frame>,
    track_id: u32,
    input_eof_queued: bool,
    eof_emitted: bool,
    output_format: Option<MediaFormat>,
    configured: bool,
    closed: bool,
}

impl CodecDriver {
    fn new(name: String, direction: CodecDirection) -> Self {
        Self {
            name,
            direction,
            device: None,
            pending: None,
            track_id: 0,
            input_eof_queued: false,
            eof_emitted: false,
            output_format: None,
            configured: false,
            closed: false,
        }
    }

    fn attach(&mut self, device: Box<dyn CodecDevice>, format: &MediaFormat) -> Result<()> {
        if self.configured {
            return Err(PipelineError::config(format!(
                "{} already configured",
                self.name
            )));
        }
        let mut device = device;
        device.configure(format, self.direction)?;
        device.start()?;
        self.device = Some(device);
        self.output_format = Some(format.clone());
        self.configured = true;
        debug!("{}: configured for {}", self.name, format);
        Ok(())
    }

    fn can_accept(&self) -> bool {
        self.configured && self.pending.is_none() && !self.input_eof_queued
    }

    fn push(&mut self, frame: Frame) -> Result<()> {
        if !self.can_accept() {
            return Err(PipelineError::config(format!(
                "{} cannot accept a frame now",
                self.name
            )));
        }
        self.track_id = frame.track_id;
        self.pending = Some(frame);
        Ok(())
    }

    fn step(&mut self) -> Result<StepResult> {
        if self.eof_emitted {
            return Ok(StepResult::EofReached);
        }
        let device = self
            .device
            .as_mut()
            .ok_or_else(|| PipelineError::config(format!("{} not configured", self.name)))?;

        // Feed phase: move the pending frame into the device if it has room.
        if let Some(mut frame) = self.pending.take() {
            match device.dequeue_input_buffer(STEP_TIMEOUT_US)? {
                Some(index) => {
                    if frame.is_end_of_stream() {
                        device.queue_input_buffer(index, &[], frame.pts_us, FrameFlags::EOF)?;
                        self.input_eof_queued = true;
                        trace!("{}: queued input EOF", self.name);
                    } else {
                        let payload = frame.take_payload().unwrap_or_default();
                        device.queue_input_buffer(index, &payload, frame.pts_us, frame.flags)?;
                    }
                }
                // No input buffer within the timeout: keep the frame for a
                // later tick.
                None => self.pending = Some(frame),
            }
        }

        // Drain phase: pull at most one output buffer.
        match device.dequeue_output_buffer(STEP_TIMEOUT_US)? {
            CodecEvent::Buffer { index, info } => {
                let data = device.output_buffer(index)?.to_vec();
                device.release_output_buffer(index, false)?;

                if info.flags.contains(FrameFlags::EOF) {
                    self.eof_emitted = true;
                    trace!("{}: output EOF", self.name);
                    return Ok(StepResult::Produced(Frame::end_of_stream(self.track_id)));
                }
                if info.flags.contains(FrameFlags::CODEC_CONFIG)
                    && self.direction == CodecDirection::Decode
                {
                    // Parameter sets are consumed by the decoder itself.
                    return Ok(StepResult::NoDataYet);
                }
                Ok(StepResult::Produced(
                    Frame::new(self.track_id, info.pts_us, data).with_flags(info.flags),
                ))
            }
            CodecEvent::TryAgain => Ok(StepResult::NoDataYet),
            CodecEvent::FormatChanged => {
                let format = device.output_format()?;
                debug!("{}: output format changed to {}", self.name, format);
                self.output_format = Some(format.clone());
                Ok(StepResult::FormatChanged(format))
            }
            CodecEvent::BuffersChanged => Ok(StepResult::NoDataYet),
        }
    }

    fn close(&mut self) {
        if !self.closed {
            if let Some(mut device) = self.device.take() {
                device.stop();
                device.release();
            }
            self.closed = true;
        }
    }
}

/// Decoder stage: compressed samples in, raw frames out.
///
/// Created unconfigured; the actual device is built from the upstream
/// (source) format during resolution.
pub struct DecoderStage {
    env: Arc<dyn MediaEnv>,
    driver: CodecDriver,
}

impl DecoderStage {
    /// Create a decoder stage that will obtain its device from `env` once
    /// the upstream format is known.
    pub fn new(env: Arc<dyn MediaEnv>, name: impl Into<String>) -> Self {
        Self {
            env,
            driver: CodecDriver::new(name.into(), CodecDirection::Decode),
        }
    }
}

impl Stage for DecoderStage {
    fn name(&self) -> &str {
        &self.driver.name
    }

    fn configure(&mut self, upstream: Option<&MediaFormat>) -> Result<()> {
        let format = upstream.ok_or_else(|| {
            PipelineError::config(format!("{} requires an upstream format", self.driver.name))
        })?;
        let device = self.env.create_decoder(format)?;
        self.driver.attach(device, format)
    }

    fn reconfigure(&mut self, _track_id: u32, format: &MediaFormat) -> Result<()> {
        if !self.driver.configured {
            return Err(PipelineError::config(format!(
                "{} reconfigured before configure",
                self.driver.name
            )));
        }
        debug!("{}: upstream format now {}", self.driver.name, format);
        Ok(())
    }

    fn output_format(&self) -> Option<MediaFormat> {
        self.driver.output_format.clone()
    }

    fn can_accept(&self) -> bool {
        self.driver.can_accept()
    }

    fn push(&mut self, frame: Frame) -> Result<()> {
        self.driver.push(frame)
    }

    fn step(&mut self) -> Result<StepResult> {
        self.driver.step()
    }

    fn is_done(&self) -> bool {
        self.driver.eof_emitted
    }

    fn close(&mut self) {
        self.driver.close();
    }
}

/// Encoder stage: raw frames in, compressed samples out.
///
/// Holds its target format from construction; the device is created during
/// resolution when the upstream chain has been negotiated.
pub struct EncoderStage {
    env: Arc<dyn MediaEnv>,
    target: MediaFormat,
    driver: CodecDriver,
}

impl EncoderStage {
    /// Create an encoder stage producing `target`.
    pub fn new(env: Arc<dyn MediaEnv>, name: impl Into<String>, target: MediaFormat) -> Self {
        Self {
            env,
            target,
            driver: CodecDriver::new(name.into(), CodecDirection::Encode),
        }
    }

    /// The configured target format.
    pub fn target(&self) -> &MediaFormat {
        &self.target
    }
}

impl Stage for EncoderStage {
    fn name(&self) -> &str {
        &self.driver.name
    }

    fn configure(&mut self, upstream: Option<&MediaFormat>) -> Result<()> {
        if let Some(upstream) = upstream {
            if upstream.kind != self.target.kind {
                return Err(PipelineError::config(format!(
                    "{}: upstream is {} but target is {}",
                    self.driver.name, upstream.kind, self.target.kind
                )));
            }
        }
        let device = self.env.create_encoder(&self.target)?;
        let target = self.target.clone();
        self.driver.attach(device, &target)
    }

    fn reconfigure(&mut self, _track_id: u32, format: &MediaFormat) -> Result<()> {
        if !self.driver.configured {
            return Err(PipelineError::config(format!(
                "{} reconfigured before configure",
                self.driver.name
            )));
        }
        if format.kind != self.target.kind {
            return Err(PipelineError::config(format!(
                "{}: cannot switch track kind mid-stream",
                self.driver.name
            )));
        }
        debug!("{}: upstream format now {}", self.driver.name, format);
        Ok(())
    }

    fn output_format(&self) -> Option<MediaFormat> {
        self.driver.output_format.clone()
    }

    fn can_accept(&self) -> bool {
        self.driver.can_accept()
    }

    fn push(&mut self, frame: Frame) -> Result<()> {
        self.driver.push(frame)
    }

    fn step(&mut self) -> Result<StepResult> {
        self.driver.step()
    }

    fn is_done(&self) -> bool {
        self.driver.eof_emitted
    }

    fn close(&mut self) {
        self.driver.close();
    }
}
