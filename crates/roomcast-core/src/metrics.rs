//! Host metric source seam.
//!
//! The dispatcher treats metrics as an opaque report produced by the host.
//! How the host gathers them (platform files, OS APIs) is not its concern.
//! Any `Fn() -> Result<String, MetricsError>` closure is a source.

use std::fmt;

use crate::error::MetricsError;

/// Produces the swap usage report for `/getswap`.
pub trait MetricsSource: Send + Sync + 'static {
    /// One-line swap usage report.
    fn swap_report(&self) -> Result<String, MetricsError>;
}

impl<F> MetricsSource for F
where
    F: Fn() -> Result<String, MetricsError> + Send + Sync + 'static,
{
    fn swap_report(&self) -> Result<String, MetricsError> {
        self()
    }
}

/// Swap totals in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapUsage {
    /// Total swap space
    pub total: u64,
    /// Unused swap space
    pub free: u64,
}

impl fmt::Display for SwapUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SwapTotal: {}, SwapFree: {}", format_bytes(self.total), format_bytes(self.free))
    }
}

/// Human-readable byte count with 1024-based units and two decimals.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
