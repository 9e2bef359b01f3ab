//! Swap metrics from `/proc/meminfo`.
//!
//! Linux reports `SwapTotal:` and `SwapFree:` in kB. Other platforms have no
//! such file, so the report is simply unavailable there.

use std::path::PathBuf;

use roomcast_core::{MetricsError, MetricsSource, SwapUsage};

/// Default location of the kernel memory report.
pub const PROC_MEMINFO: &str = "/proc/meminfo";

/// Metric source reading swap usage from a meminfo-formatted file.
#[derive(Debug, Clone)]
pub struct ProcMeminfo {
    path: PathBuf,
}

impl ProcMeminfo {
    /// Source reading [`PROC_MEMINFO`].
    pub fn new() -> Self {
        Self::with_path(PROC_MEMINFO)
    }

    /// Source reading an arbitrary meminfo-formatted file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read and parse the current swap usage.
    pub fn swap_usage(&self) -> Result<SwapUsage, MetricsError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            MetricsError::Unavailable(format!("cannot read {}: {e}", self.path.display()))
        })?;

        parse_meminfo(&text).ok_or_else(|| {
            MetricsError::Unavailable(format!("no swap figures in {}", self.path.display()))
        })
    }
}

impl Default for ProcMeminfo {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSource for ProcMeminfo {
    fn swap_report(&self) -> Result<String, MetricsError> {
        self.swap_usage().map(|usage| usage.to_string())
    }
}

/// Extract swap totals (in bytes) from meminfo text.
///
/// Returns `None` unless both `SwapTotal` and `SwapFree` are present and
/// numeric.
pub fn parse_meminfo(text: &str) -> Option<SwapUsage> {
    let mut total = None;
    let mut free = None;

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("SwapTotal:") {
            total = parse_kb(rest);
        } else if let Some(rest) = line.strip_prefix("SwapFree:") {
            free = parse_kb(rest);
        }
        if total.is_some() && free.is_some() {
            break;
        }
    }

    Some(SwapUsage { total: total?, free: free? })
}

fn parse_kb(value: &str) -> Option<u64> {
    let kb: u64 = value.split_whitespace().next()?.parse().ok()?;
    kb.checked_mul(1024)
}
