//! High-level composition API.

use recut_core::{MediaFile, MediaFormat, MediaLocator, SourceList};
use recut_pipeline::{
    CommandProcessor, DecoderStage, Effector, EffectorStage, EncoderStage, MediaEnv, MediaSource,
    Pipeline, PipelineError, ProgressListener, Result, SinkStage,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info};

/// Composes an ordered list of trimmed source files into one output file.
///
/// Sources are added up front; [`MediaComposer::start`] resolves the stage
/// graph synchronously and then drives it on a worker thread, reporting
/// lifecycle and progress events through the listener. The source list is
/// snapshotted at start, so later mutations never affect a running
/// composition. A composer drives at most one composition; it is not
/// reusable after `start`.
pub struct MediaComposer {
    env: Arc<dyn MediaEnv>,
    output: MediaLocator,
    listener: Arc<dyn ProgressListener>,
    sources: SourceList,
    video_target: Option<MediaFormat>,
    audio_target: Option<MediaFormat>,
    effector: Option<Box<dyn Effector>>,
    worker: Option<JoinHandle<()>>,
    cancel: Option<Arc<AtomicBool>>,
    pause: Option<Arc<AtomicBool>>,
}

impl MediaComposer {
    /// Create a composer writing to `output`, with collaborators supplied
    /// by `env` and events delivered to `listener`.
    pub fn new(
        env: Arc<dyn MediaEnv>,
        output: MediaLocator,
        listener: Arc<dyn ProgressListener>,
    ) -> Self {
        Self {
            env,
            output,
            listener,
            sources: SourceList::new(),
            video_target: None,
            audio_target: None,
            effector: None,
            worker: None,
            cancel: None,
            pause: None,
        }
    }

    /// Probe a file's native duration and build a [`MediaFile`] entry for
    /// it, without adding it to the composition.
    pub fn probe_source(&self, locator: MediaLocator) -> Result<MediaFile> {
        let extractor = self.env.open_extractor(&locator)?;
        let duration_us = extractor.duration_us();
        debug!("probed {}: {}us", locator, duration_us);
        Ok(MediaFile::new(locator, duration_us))
    }

    /// Probe and append a source file. Returns a handle usable with
    /// [`MediaComposer::remove_source_file`].
    pub fn add_source_file(&mut self, locator: MediaLocator) -> Result<MediaFile> {
        let file = self.probe_source(locator)?;
        let handle = file.clone();
        self.sources.append(file);
        Ok(handle)
    }

    /// Probe and insert a source file at `index`. An index past the end
    /// appends.
    pub fn insert_source_file(&mut self, index: usize, locator: MediaLocator) -> Result<MediaFile> {
        let file = self.probe_source(locator)?;
        let handle = file.clone();
        self.sources.insert(index, file);
        Ok(handle)
    }

    /// Append a pre-built entry, typically one carrying trim segments.
    pub fn add_source(&mut self, file: MediaFile) {
        self.sources.append(file);
    }

    /// Remove an entry by identity. Removing an absent entry is a no-op.
    pub fn remove_source_file(&mut self, file: &MediaFile) {
        self.sources.remove(file);
    }

    /// The current source list.
    pub fn sources(&self) -> &SourceList {
        &self.sources
    }

    /// Total effective duration of the composition in microseconds,
    /// recomputed from the current list on every call.
    pub fn duration_us(&self) -> i64 {
        self.sources.total_duration_us()
    }

    /// Set the target video format. Without one, no video track is
    /// produced.
    pub fn set_target_video_format(&mut self, format: MediaFormat) {
        self.video_target = Some(format);
    }

    /// Set the target audio format. Without one, no audio track is
    /// produced.
    pub fn set_target_audio_format(&mut self, format: MediaFormat) {
        self.audio_target = Some(format);
    }

    /// Set an optional video effect applied between decode and encode.
    pub fn set_effector(&mut self, effector: Box<dyn Effector>) {
        self.effector = Some(effector);
    }

    /// Whether a started composition is still running.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Resolve the stage graph and start processing on a worker thread.
    ///
    /// Configuration problems (an empty source list, a missing track,
    /// collaborator creation failures) surface synchronously from this
    /// call, with everything already constructed torn down. Runtime
    /// failures are delivered through the listener instead.
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Err(PipelineError::config("composition already started"));
        }
        if self.sources.is_empty() {
            return Err(PipelineError::config("no source files added"));
        }

        let mut pipeline = Pipeline::new();
        pipeline.set_media_source(MediaSource::new(Arc::clone(&self.env), &self.sources));
        if let Some(target) = &self.video_target {
            pipeline.add_video_decoder(DecoderStage::new(Arc::clone(&self.env), "video-decoder"));
            pipeline.add_video_encoder(EncoderStage::new(
                Arc::clone(&self.env),
                "video-encoder",
                target.clone(),
            ));
        }
        if let Some(target) = &self.audio_target {
            pipeline.add_audio_decoder(DecoderStage::new(Arc::clone(&self.env), "audio-decoder"));
            pipeline.add_audio_encoder(EncoderStage::new(
                Arc::clone(&self.env),
                "audio-encoder",
                target.clone(),
            ));
        }
        if let Some(effector) = self.effector.take() {
            pipeline.set_effector(EffectorStage::new("effector", effector));
        }
        let muxer = self.env.create_muxer(&self.output)?;
        pipeline.set_sink(SinkStage::new("sink", muxer));

        let graph = pipeline.resolve()?;
        info!("composition started: writing to {}", self.output);

        let mut processor = CommandProcessor::new(graph, Arc::clone(&self.listener));
        self.cancel = Some(processor.cancel_handle());
        self.pause = Some(processor.pause_handle());
        let worker = std::thread::Builder::new()
            .name("recut-composer".into())
            .spawn(move || processor.run())?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Cancel a running composition and wait for the worker to exit. The
    /// listener receives `on_media_stop` but never `on_media_done`. Idempotent.
    pub fn stop(&mut self) {
        if let Some(cancel) = &self.cancel {
            cancel.store(true, Ordering::SeqCst);
        }
        // Clear a pause so the worker can observe the cancellation.
        if let Some(pause) = &self.pause {
            pause.store(false, Ordering::SeqCst);
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    /// Wait for a started composition to finish on its own.
    pub fn wait(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    /// Suspend processing. The listener receives `on_media_pause`.
    pub fn pause(&mut self) {
        if let Some(pause) = &self.pause {
            pause.store(true, Ordering::SeqCst);
        }
    }

    /// Resume a paused composition.
    pub fn resume(&mut self) {
        if let Some(pause) = &self.pause {
            pause.store(false, Ordering::SeqCst);
        }
    }
}

impl Drop for MediaComposer {
    fn drop(&mut self) {
        self.stop();
    }
}
