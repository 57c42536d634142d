#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use treemirror::{Flow, Transform};

/// One observed transform invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Whether `output.parent()` existed when the transform was called.
    pub parent_existed: bool,
}

#[derive(Debug, Default)]
struct Inner {
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    started: AtomicUsize,
}

/// A `Transform` that records every call and the peak number of concurrent
/// calls, with optional delay, stop and failure behaviour.
///
/// Clones share the same recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransform {
    inner: Arc<Inner>,
    delay: Duration,
    stop_on_call: Option<usize>,
    fail_on_name: Option<String>,
    write_output: bool,
}

impl RecordingTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Return `Flow::Stop` from the n-th call (1-based).
    pub fn stop_on_call(mut self, n: usize) -> Self {
        self.stop_on_call = Some(n);
        self
    }

    /// Fail for any input whose file name equals `name`.
    pub fn fail_on(mut self, name: &str) -> Self {
        self.fail_on_name = Some(name.to_string());
        self
    }

    /// Copy the input to the output as well as recording.
    pub fn writing_output(mut self) -> Self {
        self.write_output = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().expect("calls lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.calls.lock().expect("calls lock").len()
    }

    /// Input paths relative to `root`, sorted, with forward slashes.
    pub fn inputs_relative_to(&self, root: &Path) -> Vec<String> {
        let mut out: Vec<String> = self
            .calls()
            .iter()
            .map(|c| {
                c.input
                    .strip_prefix(root)
                    .unwrap_or(&c.input)
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        out.sort();
        out
    }

    pub fn peak_concurrency(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }

    /// Calls currently executing.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Calls started so far (including ones still running).
    pub fn started(&self) -> usize {
        self.inner.started.load(Ordering::SeqCst)
    }
}

impl Transform for RecordingTransform {
    fn transform(&self, input: &Path, output: &Path) -> anyhow::Result<Flow> {
        let n = self.inner.started.fetch_add(1, Ordering::SeqCst) + 1;
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(now, Ordering::SeqCst);

        let parent_existed = output.parent().is_some_and(Path::is_dir);

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let result = self.outcome(n, input, output);

        self.inner
            .calls
            .lock()
            .expect("calls lock")
            .push(Call {
                input: input.to_path_buf(),
                output: output.to_path_buf(),
                parent_existed,
            });
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl RecordingTransform {
    fn outcome(&self, n: usize, input: &Path, output: &Path) -> anyhow::Result<Flow> {
        if let Some(name) = &self.fail_on_name {
            if input.file_name().is_some_and(|f| f == name.as_str()) {
                anyhow::bail!("refusing to transform {}", name);
            }
        }
        if self.write_output {
            std::fs::copy(input, output)?;
        }
        if self.stop_on_call == Some(n) {
            return Ok(Flow::Stop);
        }
        Ok(Flow::Continue)
    }
}
