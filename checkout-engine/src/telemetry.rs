//! `tracing` subscriber setup, in the idiom of `neard/src/cli.rs`'s
//! `init_logging`: a baked-in default filter with `RUST_LOG` able to add or
//! override directives, so running the checkout engine outside of a CLI
//! layer (standalone, or from its own test harness) still gets structured
//! logs without hand-rolling a subscriber at each call site.

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber. `tracing` only accepts one global
/// subscriber per process, so repeat calls (e.g. once per test) are silently
/// ignored rather than panicking.
pub fn init_tracing() {
    let mut env_filter = EnvFilter::new("checkout_engine=info");

    if let Ok(rust_log) = std::env::var("RUST_LOG") {
        for directive in rust_log.split(',').filter_map(|d| d.parse().ok()) {
            env_filter = env_filter.add_directive(directive);
        }
    }

    let _ = tracing_subscriber::fmt::Subscriber::builder()
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .with_env_filter(env_filter)
        .try_init();
}
