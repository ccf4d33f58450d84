//! Pipeline construction and resolution.
//!
//! A [`Pipeline`] collects the declared stages and, on [`Pipeline::resolve`],
//! turns them into a concrete wired graph: one [`TrackUnit`] per track that
//! actually exists in the source and has a configured target, all converging
//! on a single sink.

use crate::codec::{DecoderStage, EncoderStage};
use crate::effect::EffectorStage;
use crate::error::{PipelineError, Result};
use crate::sink::SinkStage;
use crate::source::{FilePlan, SourceStage};
use crate::stage::{Stage, AUDIO_TRACK_ID, VIDEO_TRACK_ID};
use crate::MediaEnv;
use recut_core::{MediaFormat, SourceList, TrackKind};
use std::sync::Arc;
use tracing::{debug, info};

/// Which tracks the source actually contains, with their formats.
#[derive(Debug, Clone, Default)]
pub struct TrackPresence {
    /// Video track format of the first file, when present.
    pub video: Option<MediaFormat>,
    /// Audio track format of the first file, when present.
    pub audio: Option<MediaFormat>,
}

/// A snapshot of the source list bound to the capability environment.
///
/// Taken when the pipeline is built; later mutations of the caller's list
/// do not affect a running pipeline.
pub struct MediaSource {
    env: Arc<dyn MediaEnv>,
    files: Vec<FilePlan>,
    total_duration_us: i64,
}

impl MediaSource {
    /// Snapshot `sources` against `env`.
    pub fn new(env: Arc<dyn MediaEnv>, sources: &SourceList) -> Self {
        let files = sources
            .files()
            .iter()
            .map(|f| FilePlan {
                locator: f.locator.clone(),
                segments: f.effective_segments(),
            })
            .collect();
        Self {
            env,
            files,
            total_duration_us: sources.total_duration_us(),
        }
    }

    /// Total effective duration of the snapshot in microseconds.
    pub fn total_duration_us(&self) -> i64 {
        self.total_duration_us
    }

    /// Query which tracks exist in the source (presence is probed from the
    /// first file, never assumed).
    pub fn probe(&self) -> Result<TrackPresence> {
        let first = self
            .files
            .first()
            .ok_or_else(|| PipelineError::config("source list is empty"))?;
        let extractor = self.env.open_extractor(&first.locator)?;

        let mut presence = TrackPresence::default();
        for i in 0..extractor.track_count() {
            let format = extractor.track_format(i)?;
            match format.kind {
                TrackKind::Video if presence.video.is_none() => presence.video = Some(format),
                TrackKind::Audio if presence.audio.is_none() => presence.audio = Some(format),
                _ => {}
            }
        }
        Ok(presence)
    }

    fn create_stage(&self, kind: TrackKind, track_id: u32) -> SourceStage {
        SourceStage::new(kind, track_id, Arc::clone(&self.env), self.files.clone())
    }
}

/// One track's stage chain from source to the sink convergence point, with
/// a one-frame slot implicit in each stage.
pub struct TrackUnit {
    /// Track id shared by every frame in this unit.
    pub track_id: u32,
    /// Track kind, for diagnostics.
    pub kind: TrackKind,
    /// Stages in topological order: source, decoder, [effector], encoder.
    pub stages: Vec<Box<dyn Stage>>,
}

/// A fully wired stage graph, ready for execution.
pub struct ResolvedGraph {
    /// Track units in construction order (video before audio), which fixes
    /// the cross-track interleaving for a given input.
    pub units: Vec<TrackUnit>,
    /// The shared terminal stage.
    pub sink: SinkStage,
    /// Total effective source duration in microseconds.
    pub total_duration_us: i64,
}

impl ResolvedGraph {
    /// Close every stage in reverse construction order: the sink first, so
    /// the output container finalizes even on failure, then each unit's
    /// stages from encoder back to source.
    pub fn close_all(&mut self) {
        self.sink.close();
        for unit in self.units.iter_mut().rev() {
            for stage in unit.stages.iter_mut().rev() {
                stage.close();
            }
        }
    }
}

/// Declarative stage configuration, resolved into a [`ResolvedGraph`].
#[derive(Default)]
pub struct Pipeline {
    source: Option<MediaSource>,
    video_decoder: Option<DecoderStage>,
    audio_decoder: Option<DecoderStage>,
    effector: Option<EffectorStage>,
    video_encoder: Option<EncoderStage>,
    audio_encoder: Option<EncoderStage>,
    sink: Option<SinkStage>,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the media source.
    pub fn set_media_source(&mut self, source: MediaSource) {
        self.source = Some(source);
    }

    /// Add the video decoder.
    pub fn add_video_decoder(&mut self, decoder: DecoderStage) {
        self.video_decoder = Some(decoder);
    }

    /// Add the audio decoder.
    pub fn add_audio_decoder(&mut self, decoder: DecoderStage) {
        self.audio_decoder = Some(decoder);
    }

    /// Set the optional video effector.
    pub fn set_effector(&mut self, effector: EffectorStage) {
        self.effector = Some(effector);
    }

    /// Add the video encoder.
    pub fn add_video_encoder(&mut self, encoder: EncoderStage) {
        self.video_encoder = Some(encoder);
    }

    /// Add the audio encoder.
    pub fn add_audio_encoder(&mut self, encoder: EncoderStage) {
        self.audio_encoder = Some(encoder);
    }

    /// Set the sink.
    pub fn set_sink(&mut self, sink: SinkStage) {
        self.sink = Some(sink);
    }

    /// Resolve the declared configuration into a wired graph.
    ///
    /// Consumes the pipeline, so a graph can only be resolved once. On any
    /// failure every stage configured so far is closed before the error is
    /// returned, the sink included.
    pub fn resolve(mut self) -> Result<ResolvedGraph> {
        let source = self
            .source
            .take()
            .ok_or_else(|| PipelineError::unresolved("no media source set"))?;
        let mut sink = self
            .sink
            .take()
            .ok_or_else(|| PipelineError::unresolved("no sink set"))?;

        let total_duration_us = source.total_duration_us();
        let mut units: Vec<TrackUnit> = Vec::new();

        let result = Self::resolve_units(
            &source,
            &mut sink,
            self.video_decoder.take(),
            self.audio_decoder.take(),
            self.effector.take(),
            self.video_encoder.take(),
            self.audio_encoder.take(),
            &mut units,
        );

        match result {
            Ok(()) if units.is_empty() => {
                sink.close();
                Err(PipelineError::unresolved(
                    "no track produced a route from source to sink",
                ))
            }
            Ok(()) => {
                info!(
                    "pipeline resolved: {} track unit(s), {}us total",
                    units.len(),
                    total_duration_us
                );
                Ok(ResolvedGraph {
                    units,
                    sink,
                    total_duration_us,
                })
            }
            Err(e) => {
                // Unwind: release whatever got configured, sink first.
                sink.close();
                for unit in units.iter_mut().rev() {
                    for stage in unit.stages.iter_mut().rev() {
                        stage.close();
                    }
                }
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_units(
        source: &MediaSource,
        sink: &mut SinkStage,
        video_decoder: Option<DecoderStage>,
        audio_decoder: Option<DecoderStage>,
        effector: Option<EffectorStage>,
        video_encoder: Option<EncoderStage>,
        audio_encoder: Option<EncoderStage>,
        units: &mut Vec<TrackUnit>,
    ) -> Result<()> {
        let presence = source.probe()?;

        // A target format for an absent track is silently dropped; tracks
        // are optional independently of each other.
        if presence.video.is_some() {
            if let Some(encoder) = video_encoder {
                let decoder = video_decoder.ok_or_else(|| {
                    PipelineError::config("video encoder set without a video decoder")
                })?;
                let unit = Self::wire_unit(
                    source,
                    sink,
                    TrackKind::Video,
                    VIDEO_TRACK_ID,
                    decoder,
                    effector,
                    encoder,
                )?;
                units.push(unit);
            }
        } else if video_encoder.is_some() {
            debug!("no video track in source; dropping video branch");
        }

        if presence.audio.is_some() {
            if let Some(encoder) = audio_encoder {
                let decoder = audio_decoder.ok_or_else(|| {
                    PipelineError::config("audio encoder set without an audio decoder")
                })?;
                let unit = Self::wire_unit(
                    source,
                    sink,
                    TrackKind::Audio,
                    AUDIO_TRACK_ID,
                    decoder,
                    None,
                    encoder,
                )?;
                units.push(unit);
            }
        } else if audio_encoder.is_some() {
            debug!("no audio track in source; dropping audio branch");
        }

        Ok(())
    }

    /// Wire one track chain, configuring each stage with its upstream's
    /// negotiated output format, and register the branch with the sink.
    fn wire_unit(
        source: &MediaSource,
        sink: &mut SinkStage,
        kind: TrackKind,
        track_id: u32,
        decoder: DecoderStage,
        effector: Option<EffectorStage>,
        encoder: EncoderStage,
    ) -> Result<TrackUnit> {
        let mut stages: Vec<Box<dyn Stage>> = Vec::new();
        stages.push(Box::new(source.create_stage(kind, track_id)));
        stages.push(Box::new(decoder));
        if let Some(effector) = effector {
            stages.push(Box::new(effector));
        }
        stages.push(Box::new(encoder));

        let mut upstream: Option<MediaFormat> = None;
        for (i, stage) in stages.iter_mut().enumerate() {
            if let Err(e) = stage.configure(upstream.as_ref()) {
                // Close what this unit already configured; resolve() handles
                // the rest of the graph.
                for configured in stages.iter_mut().take(i + 1).rev() {
                    configured.close();
                }
                return Err(e);
            }
            upstream = stage.output_format();
        }

        let format = upstream.ok_or_else(|| {
            PipelineError::config(format!("{} chain produced no output format", kind))
        })?;
        sink.add_track(track_id, &format)?;
        debug!("wired {} unit: {} stages", kind, stages.len());

        Ok(TrackUnit {
            track_id,
            kind,
            stages,
        })
    }
}
