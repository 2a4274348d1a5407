//! Logging facilities for Horizon Collections.
//!
//! Horizon Collections uses the `tracing` crate for instrumentation. Nothing
//! is printed unless the host application installs a subscriber:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_collections=debug")
//!     .init();
//! ```
//!
//! Full rebuilds log at `debug`, incremental updates and signal emission at
//! `trace`, rejected configuration at `warn`.

use std::time::Instant;

/// Span names used throughout Horizon Collections for tracing.
pub mod span_names {
    /// Full view rebuild span.
    pub const REBUILD: &str = "horizon_collections::rebuild";
    /// Grouped view rebuild span.
    pub const REBUILD_GROUPS: &str = "horizon_collections::rebuild_groups";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_collections_core::signal";
    /// Flat and per-group views.
    pub const VIEW: &str = "horizon_collections::view";
    /// Grouped view aggregation.
    pub const GROUPED: &str = "horizon_collections::grouped";
    /// View source configuration.
    pub const VIEW_SOURCE: &str = "horizon_collections::view_source";
    /// Observable source collections.
    pub const SOURCE: &str = "horizon_collections::source";
    /// Performance spans.
    pub const PERF: &str = "horizon_collections::perf";
}

/// A guard that records how long an operation took.
///
/// Enters a `trace` span on creation and logs the elapsed time when dropped.
#[derive(Debug)]
pub struct PerfSpan {
    name: &'static str,
    started: Instant,
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::trace_span!(target: targets::PERF, "perf", operation = name);
        Self {
            name,
            started: Instant::now(),
            _span: span.entered(),
        }
    }

    /// The operation name this span was created with.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for PerfSpan {
    fn drop(&mut self) {
        tracing::trace!(
            target: targets::PERF,
            operation = self.name,
            elapsed_us = self.started.elapsed().as_micros() as u64,
            "operation finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        let span = PerfSpan::new(span_names::REBUILD);
        assert_eq!(span.name(), "horizon_collections::rebuild");
    }

    #[test]
    fn test_perf_span_with_subscriber() {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter("trace")
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let _span = PerfSpan::new(span_names::REBUILD_GROUPS);
        });
    }
}
