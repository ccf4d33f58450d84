//! # Recut
//!
//! A media composition engine: concatenate trimmed source files, apply
//! per-frame video effects, and transcode the result into a single output
//! container, with progress reported across the whole composition.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use recut::{MediaComposer, MediaFormat, MediaLocator};
//! use std::sync::Arc;
//!
//! let composer_env = platform_env(); // your MediaEnv implementation
//! let listener = Arc::new(LoggingListener::default());
//!
//! let mut composer = MediaComposer::new(
//!     composer_env,
//!     MediaLocator::path("out.mp4"),
//!     listener,
//! );
//! composer.add_source_file(MediaLocator::path("a.mp4"))?;
//! composer.add_source_file(MediaLocator::path("b.mp4"))?;
//! composer.set_target_video_format(MediaFormat::video("video/avc", 1280, 720));
//! composer.start()?;
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several crates:
//! - `recut-core`: frames, formats, and the trimmed source-list model
//! - `recut-pipeline`: the stage graph and the cooperative step engine
//!
//! This crate re-exports the most commonly used types and provides the
//! [`MediaComposer`] facade for driving a composition on a worker thread.

mod composer;

// Re-export core types
pub use recut_core::{
    CodecError, Error, FileId, Frame, FrameFlags, MediaFile, MediaFormat, MediaLocator, Segment,
    SourceList, TrackKind,
};

// Re-export pipeline types
pub use recut_pipeline::{
    BufferInfo, CodecDevice, CodecDirection, CodecEvent, CommandProcessor, DecoderStage,
    Effector, EffectorStage, EncoderStage, Extractor, MediaEnv, MediaSource, Muxer, NullListener,
    Pipeline, PipelineError, ProcessorState, ProgressListener, ResolvedGraph, Result, SeekMode,
    SinkStage, SourceStage, Stage, StepResult, TrackPresence, TrackUnit,
};

// High-level API
pub use composer::MediaComposer;
