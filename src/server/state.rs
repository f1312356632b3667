//! Inference worker and the handle shared by request handlers

use super::{Result, ServerError};
use crate::inference::{GenerateRequest, InferenceEngine, ModelVariant};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};

/// One request travelling to the worker, with the slot for its answer
pub struct GenerateJob {
    pub request: GenerateRequest,
    pub reply: oneshot::Sender<crate::Result<Vec<u8>>>,
}

/// Shared application state
///
/// Cloned into every handler; holds only the job queue, never the models.
#[derive(Clone)]
pub struct AppState {
    jobs: mpsc::Sender<GenerateJob>,
    variants: Arc<Vec<ModelVariant>>,
    started: Instant,
}

impl AppState {
    pub fn variants(&self) -> &[ModelVariant] {
        &self.variants
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Queue a request and wait for the worker's answer
    pub async fn submit(&self, request: GenerateRequest) -> Result<crate::Result<Vec<u8>>> {
        let (reply, answer) = oneshot::channel();
        self.jobs
            .send(GenerateJob { request, reply })
            .await
            .map_err(|_| ServerError::WorkerGone)?;
        answer.await.map_err(|_| ServerError::WorkerGone)
    }
}

/// Start the worker thread that owns the inference engine
///
/// `build` runs on the worker thread, because the loaded networks cannot
/// cross threads. Returns once the models are loaded, or with the loading
/// error. The thread exits when every `AppState` clone is dropped.
pub fn spawn_worker<F>(build: F, queue_depth: usize) -> Result<(AppState, JoinHandle<()>)>
where
    F: FnOnce() -> crate::Result<InferenceEngine> + Send + 'static,
{
    let (jobs, mut queue) = mpsc::channel::<GenerateJob>(queue_depth.max(1));
    let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel(1);

    let handle = std::thread::Builder::new()
        .name("boceto-inference".to_string())
        .spawn(move || {
            let mut engine = match build() {
                Ok(engine) => engine,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            if ready_tx.send(Ok(engine.registry().variants())).is_err() {
                return;
            }
            while let Some(job) = queue.blocking_recv() {
                let result = engine.handle(&job.request);
                if let Err(e) = &result {
                    tracing::warn!(variant = %job.request.variant, error = %e, "generation failed");
                }
                // The client may have disconnected
                let _ = job.reply.send(result);
            }
            tracing::debug!("inference worker stopped");
        })?;

    let variants = ready_rx.recv().map_err(|_| ServerError::WorkerGone)??;
    let state = AppState { jobs, variants: Arc::new(variants), started: Instant::now() };
    Ok((state, handle))
}

/// Engine with a tiny object pair, for handler tests
#[cfg(test)]
pub(super) fn test_engine() -> crate::Result<InferenceEngine> {
    use crate::inference::{ModelPair, ModelRegistry};
    use crate::model::{DiscriminatorConfig, GeneratorConfig, PatchDiscriminator, UNetGenerator};

    let pair = ModelPair::new(
        UNetGenerator::with_seed(GeneratorConfig { base_channels: 1, ..GeneratorConfig::default() }, 1),
        PatchDiscriminator::with_seed(DiscriminatorConfig::scaled_down(64), 2),
    );
    let mut registry = ModelRegistry::new();
    registry.insert(ModelVariant::Object, pair);
    Ok(InferenceEngine::new(registry).with_seed(4).with_samples(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::encode_png;
    use crate::Error;
    use image::RgbImage;

    #[test]
    fn test_startup_error_is_reported() {
        let result = spawn_worker(|| Err(Error::Checkpoint("missing".into())), 1);
        assert!(matches!(result, Err(ServerError::Startup(Error::Checkpoint(_)))));
    }

    #[tokio::test]
    async fn test_worker_answers_jobs() {
        let (state, _handle) = spawn_worker(test_engine, 2).unwrap();
        assert_eq!(state.variants(), &[ModelVariant::Object]);

        let png = encode_png(&RgbImage::new(16, 16)).unwrap();
        let answer = state.submit(GenerateRequest::new(png.clone(), ModelVariant::Object)).await.unwrap();
        assert!(answer.unwrap().starts_with(&[0x89, b'P', b'N', b'G']));

        let answer = state.submit(GenerateRequest::new(png, ModelVariant::Scene)).await.unwrap();
        assert!(matches!(answer, Err(Error::InvalidParameter(_))));
    }
}
