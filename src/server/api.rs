//! Router construction and the blocking `serve` entry point

use super::handlers::{generate, health_check};
use super::state::{spawn_worker, AppState};
use super::{Result, ServerConfig, ServerError};
use crate::inference::{InferenceEngine, ModelRegistry, ModelVariant, VariantPaths};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::collections::BTreeMap;

/// Routes of the generation service
pub fn router(state: AppState, max_body_size: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/generate", post(generate))
        .layer(DefaultBodyLimit::max(max_body_size))
        .with_state(state)
}

/// Load the configured variants and serve until the process is stopped
pub fn serve(paths: BTreeMap<ModelVariant, VariantPaths>, config: ServerConfig) -> Result<()> {
    let samples = config.samples;
    let seed = config.seed;
    let (state, worker) = spawn_worker(
        move || {
            let engine = InferenceEngine::new(ModelRegistry::load(&paths)?).with_samples(samples);
            Ok(match seed {
                Some(seed) => engine.with_seed(seed),
                None => engine,
            })
        },
        config.queue_depth,
    )?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(config.address)
            .await
            .map_err(|e| ServerError::Bind(format!("{}: {e}", config.address)))?;
        tracing::info!(
            address = %config.address,
            models = ?state.variants(),
            samples,
            "serving"
        );
        axum::serve(listener, router(state, config.max_body_size)).await?;
        Ok::<(), ServerError>(())
    })?;

    // Router dropped; the worker drains its queue and exits
    let _ = worker.join();
    Ok(())
}
