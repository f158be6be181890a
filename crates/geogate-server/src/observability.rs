//! Log output for the gateway.
//!
//! The level starts at `info` so configuration loading is visible, then moves
//! to `logging.level` once the config is read. `RUST_LOG`, when set, replaces
//! both. HTTP client and server internals stay at `warn` unless `RUST_LOG`
//! asks otherwise, since every proxied request would otherwise log several
//! connection-pool lines.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER: OnceLock<FilterHandle> = OnceLock::new();

const QUIET_DEPENDENCIES: &[&str] = &["hyper=warn", "hyper_util=warn", "h2=warn", "reqwest=warn"];

fn rust_log_set() -> bool {
    std::env::var_os("RUST_LOG").is_some()
}

/// Filter directives for `level` with transport crates held at `warn`.
fn gateway_directives(level: &str) -> String {
    std::iter::once(level)
        .chain(QUIET_DEPENDENCIES.iter().copied())
        .collect::<Vec<_>>()
        .join(",")
}

fn filter_for(level: &str) -> EnvFilter {
    if rust_log_set() {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
    }
    EnvFilter::new(gateway_directives(level))
}

pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing_with_level(level: &str) {
    let (filter, handle) = reload::Layer::new(filter_for(level));
    if FILTER.set(handle).is_err() {
        return;
    }

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}

/// Switch to the configured level. Returns `false` when nothing changed,
/// either because `RUST_LOG` is in charge or tracing was never initialised.
pub fn apply_logging_level(level: &str) -> bool {
    if rust_log_set() {
        return false;
    }
    FILTER
        .get()
        .is_some_and(|handle| handle.reload(EnvFilter::new(gateway_directives(level))).is_ok())
}
