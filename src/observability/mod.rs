//! Observability
//!
//! Structured logging setup and lightweight sync counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::config::LoggingConfig;
use crate::error::{AppError, Result};

// ===== Sync Metrics =====

/// Counters for long-term memory synchronisation
#[derive(Clone, Default, Debug)]
pub struct SyncMetrics {
    pub persists_total: Arc<AtomicU64>,
    pub persist_failures_total: Arc<AtomicU64>,
    pub flushes_total: Arc<AtomicU64>,
    pub fetch_misses_total: Arc<AtomicU64>,
    pub corrupt_records_total: Arc<AtomicU64>,
    pub searches_total: Arc<AtomicU64>,
}

impl SyncMetrics {
    pub fn record_persist(&self, ok: bool) {
        self.persists_total.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.persist_failures_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_flush(&self) {
        self.flushes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_miss(&self) {
        self.fetch_misses_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_corrupt_record(&self) {
        self.corrupt_records_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_search(&self) {
        self.searches_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Prometheus text format
    pub fn gather(&self) -> String {
        format!(
            r#"# HELP profile_persists_total Profile writes to long-term memory
# TYPE profile_persists_total counter
profile_persists_total {}
# HELP profile_persist_failures_total Failed profile writes
# TYPE profile_persist_failures_total counter
profile_persist_failures_total {}
# HELP profile_flushes_total Flush attempts of dirty profiles
# TYPE profile_flushes_total counter
profile_flushes_total {}
# HELP profile_fetch_misses_total Profiles absent from long-term memory
# TYPE profile_fetch_misses_total counter
profile_fetch_misses_total {}
# HELP profile_corrupt_records_total Stored records that failed to deserialize
# TYPE profile_corrupt_records_total counter
profile_corrupt_records_total {}
# HELP profile_searches_total Semantic profile searches
# TYPE profile_searches_total counter
profile_searches_total {}
"#,
            self.persists_total.load(Ordering::Relaxed),
            self.persist_failures_total.load(Ordering::Relaxed),
            self.flushes_total.load(Ordering::Relaxed),
            self.fetch_misses_total.load(Ordering::Relaxed),
            self.corrupt_records_total.load(Ordering::Relaxed),
            self.searches_total.load(Ordering::Relaxed),
        )
    }
}

// ===== Structured Logging =====

/// Initialise the global tracing subscriber
///
/// `RUST_LOG` overrides the configured level. When `log_dir` is set, output goes
/// to a daily rolling file and the returned guard must be kept alive.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level = if config.level.is_empty() {
        "info"
    } else {
        config.level.as_str()
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},{}={}", level, service_name, level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_line_number(true);

    let (result, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, format!("{}.log", service_name));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let builder = builder.with_writer(writer).with_ansi(false);
            let result = if config.structured {
                builder.json().try_init()
            } else {
                builder.try_init()
            };
            (result, Some(guard))
        }
        None => {
            let result = if config.structured {
                builder.json().try_init()
            } else {
                builder.try_init()
            };
            (result, None)
        }
    };

    result.map_err(|e| AppError::Internal(format!("Failed to set tracing subscriber: {}", e)))?;
    Ok(guard)
}
