use std::time::{Duration, Instant};
use sysinfo::System;
use tracing::debug;

/// Resident memory of the current process in MB, if it can be read
pub fn process_memory_mb() -> Option<u64> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_process(pid);
    system.process(pid).map(|p| p.memory() / 1024 / 1024)
}

/// Logs how long a pipeline stage took and the process memory afterwards.
///
/// The report is emitted when the timer is dropped, so early returns through
/// `?` are measured too.
pub struct StageTimer {
    start: Instant,
    stage: String,
}

impl StageTimer {
    pub fn new(stage: impl Into<String>) -> Self {
        let stage = stage.into();
        debug!("[PERF] {}_start", stage);
        Self {
            start: Instant::now(),
            stage,
        }
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        let mem = process_memory_mb()
            .map(|mb| mb.to_string())
            .unwrap_or_else(|| "?".to_string());
        debug!(
            "[PERF] {}_end | duration_ms={} | mem_mb={}",
            self.stage,
            self.start.elapsed().as_millis(),
            mem
        );
    }
}

#[macro_export]
macro_rules! timed_stage {
    ($name:expr, $block:block) => {{
        let _timer = $crate::monitoring::StageTimer::new($name);
        $block
    }};
}
