use std::time::{Duration, Instant};

/// Measures one operation. Stopping is idempotent, and a stopwatch dropped while still running
/// (an early return, `?`, or a panic unwinding through the scope) stops itself and logs the
/// elapsed time at `trace`.
#[derive(Debug)]
pub struct Stopwatch {
    label: &'static str,
    started: Instant,
    elapsed: Option<Duration>,
}

impl Stopwatch {
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            started: Instant::now(),
            elapsed: None,
        }
    }

    /// Elapsed time so far, or the final time once stopped.
    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }

    pub fn is_running(&self) -> bool {
        self.elapsed.is_none()
    }

    /// Stop and return the elapsed time. Later calls return the same value.
    pub fn stop(&mut self) -> Duration {
        *self.elapsed.get_or_insert_with(|| self.started.elapsed())
    }
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        if self.is_running() {
            let elapsed = self.stop();
            tracing::trace!(
                target: "nova.ai",
                label = self.label,
                elapsed_ms = elapsed.as_secs_f64() * 1_000.0,
                "stopwatch dropped while running"
            );
        }
    }
}
