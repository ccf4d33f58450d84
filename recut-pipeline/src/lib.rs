//! Composition pipeline for the recut media engine.
//!
//! Provides the stage graph connecting sources, decoders, effectors,
//! encoders, and the sink, plus the cooperative step-execution engine
//! that drives a resolved graph to completion.

mod codec;
mod device;
mod effect;
mod error;
mod listener;
mod pipeline;
mod processor;
mod sink;
mod source;
mod stage;

pub use codec::{DecoderStage, EncoderStage};
pub use device::{
    BufferInfo, CodecDevice, CodecDirection, CodecEvent, Effector, Extractor, MediaEnv, Muxer,
    SeekMode,
};
pub use effect::EffectorStage;
pub use error::{PipelineError, Result};
pub use listener::{NullListener, ProgressListener};
pub use pipeline::{MediaSource, Pipeline, ResolvedGraph, TrackPresence, TrackUnit};
pub use processor::{CommandProcessor, ProcessorState};
pub use sink::SinkStage;
pub use source::SourceStage;
pub use stage::{Stage, StepResult, STEP_TIMEOUT_US, AUDIO_TRACK_ID, VIDEO_TRACK_ID};
