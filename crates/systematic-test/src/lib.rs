//! Harness helpers for the end-to-end scenario tests under `tests/it`.

use systematic_core::{Config, RunReport};

/// Runs `entry` under [`systematic::driver::explore`] with `config`, seeded
/// deterministically so a failing scenario reproduces across runs.
pub async fn run<F, Fut>(config: Config, seed: u64, entry: F) -> RunReport
where
    F: Fn(std::sync::Arc<systematic::Engine>, systematic_core::OperationId) -> Fut,
    Fut: std::future::Future<Output = systematic::OpResult<()>> + Send + 'static,
{
    systematic::driver::explore(config, seed, entry).await
}

#[ctor::ctor]
fn setup_tracing() {
    use tracing_subscriber::prelude::*;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
