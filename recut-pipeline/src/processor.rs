//! Cooperative execution engine for a resolved graph.

use crate::error::Result;
use crate::listener::ProgressListener;
use crate::pipeline::ResolvedGraph;
use crate::stage::{Stage, StepResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// How long an idle tick sleeps before polling the stages again.
const IDLE_TICK: Duration = Duration::from_millis(1);

/// Lifecycle of a [`CommandProcessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Ready,
    Running,
    Paused,
    Finished,
    Cancelled,
    Failed,
}

/// Single-threaded engine that drives every stage of a resolved graph by
/// repeated bounded steps.
///
/// Each tick walks the track units in construction order and each unit's
/// stages in topological order, stepping a stage only when its downstream
/// neighbour has a free slot. No stage call blocks longer than the codec
/// step timeout, so cancellation and pause are observed within one tick.
pub struct CommandProcessor {
    graph: ResolvedGraph,
    listener: Arc<dyn ProgressListener>,
    cancel: Arc<AtomicBool>,
    pause: Arc<AtomicBool>,
    state: ProcessorState,
    last_progress: f32,
    /// Highest output-timeline pts delivered to the sink, in µs.
    sunk_pts_us: i64,
}

impl CommandProcessor {
    /// Bind a resolved graph to a listener.
    pub fn new(graph: ResolvedGraph, listener: Arc<dyn ProgressListener>) -> Self {
        Self {
            graph,
            listener,
            cancel: Arc::new(AtomicBool::new(false)),
            pause: Arc::new(AtomicBool::new(false)),
            state: ProcessorState::Ready,
            last_progress: -1.0,
            sunk_pts_us: 0,
        }
    }

    /// Flag checked between steps; set it to stop the run.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Flag checked between steps; set it to suspend the run, clear it to
    /// resume.
    pub fn pause_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.pause)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProcessorState {
        self.state
    }

    /// Drive the graph to completion, cancellation, or failure.
    ///
    /// Progress is reported monotonically from an initial 0.0 to a final
    /// 1.0 on success. The sink is closed before any other stage on every
    /// exit path, so the output container finalizes even after an error.
    pub fn run(&mut self) {
        self.state = ProcessorState::Running;
        self.listener.on_media_start();
        self.report_progress(0.0, true);

        let outcome = self.drive();
        self.graph.close_all();

        match outcome {
            Ok(()) if self.cancel.load(Ordering::SeqCst) => {
                info!("processing cancelled");
                self.state = ProcessorState::Cancelled;
                self.listener.on_media_stop();
            }
            Ok(()) => {
                info!("processing finished, {} frames written", self.graph.sink.frames_written());
                self.state = ProcessorState::Finished;
                self.report_progress(1.0, true);
                self.listener.on_media_stop();
                self.listener.on_media_done();
            }
            Err(e) => {
                // Failure reports only the error; stop is reserved for
                // cancellation and normal completion.
                warn!("processing failed: {}", e);
                self.state = ProcessorState::Failed;
                self.listener.on_error(&e);
            }
        }
    }

    fn drive(&mut self) -> Result<()> {
        let mut was_paused = false;
        loop {
            if self.cancel.load(Ordering::SeqCst) {
                return Ok(());
            }
            if self.pause.load(Ordering::SeqCst) {
                if !was_paused {
                    debug!("processing paused");
                    self.state = ProcessorState::Paused;
                    self.listener.on_media_pause();
                    was_paused = true;
                }
                std::thread::sleep(IDLE_TICK);
                continue;
            }
            if was_paused {
                debug!("processing resumed");
                self.state = ProcessorState::Running;
                was_paused = false;
            }

            let moved = self.tick()?;

            if self.graph.sink.is_done() {
                return Ok(());
            }
            if !moved {
                std::thread::sleep(IDLE_TICK);
            }
        }
    }

    /// One pass over every unit: step each stage whose downstream neighbour
    /// can take a frame, route produced frames downstream, and step the
    /// shared sink. Returns whether any stage made progress.
    fn tick(&mut self) -> Result<bool> {
        let mut moved = false;
        let mut sunk = false;

        let graph = &mut self.graph;
        for unit in graph.units.iter_mut() {
            let track_id = unit.track_id;
            let n = unit.stages.len();
            // Source-first walk: a frame produced early in the chain can
            // traverse every later stage within the same tick.
            for i in 0..n {
                let last = i == n - 1;
                let downstream_free = if last {
                    graph.sink.can_accept()
                } else {
                    unit.stages[i + 1].can_accept()
                };
                if !downstream_free || unit.stages[i].is_done() {
                    continue;
                }

                match unit.stages[i].step()? {
                    StepResult::Produced(frame) => {
                        moved = true;
                        if last {
                            if !frame.is_end_of_stream() && !frame.is_codec_config() {
                                self.sunk_pts_us = self.sunk_pts_us.max(frame.pts_us);
                                sunk = true;
                            }
                            graph.sink.push(frame)?;
                        } else {
                            unit.stages[i + 1].push(frame)?;
                        }
                    }
                    StepResult::FormatChanged(format) => {
                        moved = true;
                        trace!("track {}: format change propagated", track_id);
                        if last {
                            graph.sink.reconfigure(track_id, &format)?;
                        } else {
                            unit.stages[i + 1].reconfigure(track_id, &format)?;
                        }
                    }
                    StepResult::NoDataYet | StepResult::EofReached => {}
                }
            }
        }

        if !graph.sink.is_done() {
            match graph.sink.step()? {
                StepResult::NoDataYet => {}
                _ => moved = true,
            }
        }
        if sunk {
            self.update_progress();
        }
        Ok(moved)
    }

    fn update_progress(&mut self) {
        let total = self.graph.total_duration_us;
        if total <= 0 {
            return;
        }
        let progress = (self.sunk_pts_us as f32 / total as f32).clamp(0.0, 1.0);
        self.report_progress(progress, false);
    }

    /// Report progress, never regressing. Intermediate reports are capped
    /// below 1.0; only the completion path reports exactly 1.0.
    fn report_progress(&mut self, progress: f32, forced: bool) {
        let progress = if forced {
            progress
        } else {
            progress.min(0.999)
        };
        if progress > self.last_progress || (forced && progress != self.last_progress) {
            self.last_progress = progress;
            self.listener.on_media_progress(progress);
        }
    }
}
