//! # Recut Core
//!
//! Core types for the recut media composition engine.
//!
//! This crate provides the data model shared by every recut component:
//! - Error handling types
//! - Frame buffer abstraction exchanged between pipeline stages
//! - Track format descriptions
//! - Trimmed media sources and ordered source lists

pub mod error;
pub mod format;
pub mod frame;
pub mod source;

pub use error::{CodecError, Error, Result};
pub use format::{MediaFormat, TrackKind};
pub use frame::{Frame, FrameFlags};
pub use source::{FileId, MediaFile, MediaLocator, Segment, SourceList};
