/*!
 * Structured Tracing
 * Subscriber setup and timed operation spans built on the tracing crate
 *
 * Features:
 * - Env-filtered output (`RUST_LOG`, default `info`)
 * - Optional JSON output for machine parsing
 * - Operation spans carrying a correlation id, item counts and duration
 */

use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Enables JSON output when set to `1` or `true`
pub const ENV_TRACE_JSON: &str = "VTASK_TRACE_JSON";

const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_millis(100);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - VTASK_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Structured tracing initialized");
    }
    installed
}

/// Timed span for executor-level operations (batch submission, shutdown)
///
/// Logs its duration when dropped; durations above the slow threshold are
/// reported at `warn`.
pub struct OperationSpan {
    span: tracing::Span,
    start: Instant,
    trace_id: String,
    slow_threshold: Option<Duration>,
}

impl OperationSpan {
    pub fn new(operation: &str) -> Self {
        let trace_id = Uuid::new_v4().to_string();

        let span = span!(
            Level::DEBUG,
            "operation",
            trace_id = %trace_id,
            operation = operation,
            items = tracing::field::Empty,
            duration_us = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            trace_id,
            slow_threshold: Some(DEFAULT_SLOW_THRESHOLD),
        }
    }

    /// Never report this operation as slow (e.g. drains that are expected
    /// to take as long as the tasks they wait on)
    pub fn without_slow_warning(mut self) -> Self {
        self.slow_threshold = None;
        self
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn record_items(&self, count: usize) {
        self.span.record("items", count);
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

impl Drop for OperationSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_us", duration.as_micros() as u64);

        match self.slow_threshold {
            Some(threshold) if duration > threshold => {
                warn!(
                    trace_id = %self.trace_id,
                    duration_ms = duration.as_millis() as u64,
                    slow = true,
                    "slow operation detected"
                );
            }
            _ => {
                debug!(
                    trace_id = %self.trace_id,
                    duration_us = duration.as_micros() as u64,
                    "operation completed"
                );
            }
        }
    }
}

/// Create a timed operation span
pub fn span_operation(name: &str) -> OperationSpan {
    OperationSpan::new(name)
}
