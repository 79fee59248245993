//! Worker metrics.

use metrics::{counter, histogram};

pub mod names {
    /// Windows created by scheduling passes.
    pub const WINDOWS_CREATED_TOTAL: &str = "clipreel_windows_created_total";

    /// Compiles by status.
    pub const COMPILES_TOTAL: &str = "clipreel_compiles_total";

    /// Wall time of a compile in seconds.
    pub const COMPILE_DURATION_SECONDS: &str = "clipreel_compile_duration_seconds";

    /// Per-clip soft failures by stage.
    pub const SOFT_ERRORS_TOTAL: &str = "clipreel_compile_soft_errors_total";

    /// Schedules that failed within a pass.
    pub const SCHEDULE_FAILURES_TOTAL: &str = "clipreel_schedule_failures_total";
}

pub fn record_windows_created(count: usize) {
    if count > 0 {
        counter!(names::WINDOWS_CREATED_TOTAL).increment(count as u64);
    }
}

pub fn record_compile(ok: bool, seconds: f64) {
    let status = if ok { "ok" } else { "failed" };
    counter!(names::COMPILES_TOTAL, "status" => status).increment(1);
    histogram!(names::COMPILE_DURATION_SECONDS, "status" => status).record(seconds);
}

pub fn record_soft_error(stage: &str) {
    counter!(names::SOFT_ERRORS_TOTAL, "stage" => stage.to_string()).increment(1);
}

pub fn record_schedule_failure(stage: &'static str) {
    counter!(names::SCHEDULE_FAILURES_TOTAL, "stage" => stage).increment(1);
}
