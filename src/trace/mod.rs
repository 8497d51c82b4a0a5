//! Step tracing boundary
//!
//! The chat frontend renders each pipeline step with its input, output and
//! timing. The orchestrator only sees the `TraceEmitter` trait, so the core
//! runs headless in tests and the CLI.

use crate::models::TraceStep;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info};

/// Open step, owned by whoever began it until it is ended
#[derive(Debug)]
pub struct StepHandle {
    name: String,
    input: String,
    output: String,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl StepHandle {
    pub fn open(name: &str) -> Self {
        Self {
            name: name.to_string(),
            input: String::new(),
            output: String::new(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn set_output(&mut self, text: impl Into<String>) {
        self.output = text.into();
    }

    /// Wall-clock time since the step was opened
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    fn close(self) -> TraceStep {
        let duration_ms = self.elapsed_ms();
        TraceStep {
            name: self.name,
            input: self.input,
            output: self.output,
            started_at: self.started_at,
            ended_at: Utc::now(),
            duration_ms,
        }
    }
}

/// Receiver of traced steps (chat UI, log, recorder)
pub trait TraceEmitter: Send + Sync {
    fn begin_step(&self, name: &str) -> StepHandle {
        StepHandle::open(name)
    }

    fn end_step(&self, step: TraceStep);
}

/// Scoped step: ends on `finish`, or on drop if the scope exits early
pub struct StepGuard<'a> {
    emitter: &'a dyn TraceEmitter,
    handle: Option<StepHandle>,
}

impl<'a> StepGuard<'a> {
    pub fn begin(emitter: &'a dyn TraceEmitter, name: &str) -> Self {
        Self {
            emitter,
            handle: Some(emitter.begin_step(name)),
        }
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        if let Some(handle) = self.handle.as_mut() {
            handle.set_input(text);
        }
    }

    pub fn set_output(&mut self, text: impl Into<String>) {
        if let Some(handle) = self.handle.as_mut() {
            handle.set_output(text);
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.handle.as_ref().map(StepHandle::elapsed_ms).unwrap_or(0.0)
    }

    /// Close the step and hand back the record that was emitted
    pub fn finish(mut self) -> Option<TraceStep> {
        self.close()
    }

    /// Drop the step without emitting it
    pub fn discard(mut self) {
        self.handle = None;
    }

    fn close(&mut self) -> Option<TraceStep> {
        let step = self.handle.take()?.close();
        self.emitter.end_step(step.clone());
        Some(step)
    }
}

impl Drop for StepGuard<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            if handle.output.is_empty() {
                handle.set_output("(step ended before producing output)");
            }
        }
        self.close();
    }
}

/// Mirrors steps into the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmitter;

impl TraceEmitter for LogEmitter {
    fn begin_step(&self, name: &str) -> StepHandle {
        debug!(step = name, "Step started");
        StepHandle::open(name)
    }

    fn end_step(&self, step: TraceStep) {
        info!(
            step = %step.name,
            duration_ms = step.duration_ms,
            output = %step.output,
            "Step completed"
        );
    }
}

/// Keeps every closed step in memory, in completion order
#[derive(Debug, Default)]
pub struct RecordingEmitter {
    steps: Mutex<Vec<TraceStep>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> Vec<TraceStep> {
        self.steps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn step_names(&self) -> Vec<String> {
        self.steps().into_iter().map(|s| s.name).collect()
    }
}

impl TraceEmitter for RecordingEmitter {
    fn end_step(&self, step: TraceStep) {
        self.steps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_emits_once() {
        let recorder = RecordingEmitter::new();

        let mut step = StepGuard::begin(&recorder, "SQL");
        step.set_input("revenue Q4_2024");
        step.set_output("SELECT ...");
        let closed = step.finish().unwrap();

        assert_eq!(closed.name, "SQL");
        assert_eq!(closed.input, "revenue Q4_2024");
        assert!(closed.ended_at >= closed.started_at);
        assert!(closed.duration_ms >= 0.0);
        assert_eq!(recorder.step_names(), vec!["SQL".to_string()]);
    }

    #[test]
    fn test_dropped_step_is_still_closed() {
        let recorder = RecordingEmitter::new();

        fn failing_step(emitter: &dyn TraceEmitter) -> Result<(), String> {
            let mut step = StepGuard::begin(emitter, "Data");
            step.set_input("lookup");
            let lookup: Result<f64, String> = Err("boom".to_string());
            let value = lookup?;
            step.set_output(value.to_string());
            Ok(())
        }

        assert!(failing_step(&recorder).is_err());

        let steps = recorder.steps();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].name, "Data");
        assert_eq!(steps[0].output, "(step ended before producing output)");
    }

    #[test]
    fn test_discarded_step_is_not_emitted() {
        let recorder = RecordingEmitter::new();

        let mut step = StepGuard::begin(&recorder, "Classification");
        step.set_input("hola");
        step.discard();

        assert!(recorder.steps().is_empty());
    }

    #[test]
    fn test_steps_recorded_in_order() {
        let recorder = RecordingEmitter::new();
        for name in ["Classification", "SQL", "Data"] {
            StepGuard::begin(&recorder, name).finish();
        }
        assert_eq!(recorder.step_names(), vec!["Classification", "SQL", "Data"]);
    }

    #[test]
    fn test_log_emitter_accepts_steps() {
        let emitter = LogEmitter;
        let mut step = StepGuard::begin(&emitter, "Explanation");
        step.set_output("ok");
        assert_eq!(step.finish().unwrap().output, "ok");
    }
}
