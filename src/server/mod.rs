//! HTTP generation endpoint
//!
//! `POST /generate?model_type=object|scene` takes the raw image bytes as the
//! body and answers with `image/png`; `GET /health` reports the loaded
//! variants.
//!
//! Networks are single-threaded, so one worker thread owns the
//! [`InferenceEngine`](crate::inference::InferenceEngine) and handlers submit
//! jobs to it over a channel.
//!
//! # Example
//!
//! ```ignore
//! use boceto::inference::{ModelVariant, VariantPaths};
//! use boceto::server::{serve, ServerConfig};
//! use std::collections::BTreeMap;
//!
//! let mut paths = BTreeMap::new();
//! paths.insert(ModelVariant::Scene, VariantPaths::from_checkpoints("gen.safetensors", "disc.safetensors")?);
//! serve(paths, ServerConfig::default())?;
//! ```

mod api;
mod handlers;
mod state;

pub use api::{router, serve};
pub use handlers::{generate, health_check, GenerateQuery};
pub use state::{spawn_worker, AppState, GenerateJob};

use crate::inference::DEFAULT_SAMPLES;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Bind error: {0}")]
    Bind(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model loading failed: {0}")]
    Startup(#[from] crate::Error),

    #[error("Inference worker stopped")]
    WorkerGone,
}

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: SocketAddr,
    /// Candidates drawn per request
    pub samples: usize,
    /// Sampling seed; `None` draws from OS entropy
    pub seed: Option<u64>,
    /// Jobs waiting for the worker before handlers block
    pub queue_depth: usize,
    /// Maximum upload size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([127, 0, 0, 1], 8000)),
            samples: DEFAULT_SAMPLES,
            seed: None,
            queue_depth: 16,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl ServerConfig {
    pub fn with_address(mut self, addr: SocketAddr) -> Self {
        self.address = addr;
        self
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Health check response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Variants that can be requested via `model_type`
    pub models: Vec<String>,
}

/// Body of every non-image response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.address.port(), 8000);
        assert_eq!(config.samples, 5);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_server_config_builders() {
        let addr: SocketAddr = "0.0.0.0:8080".parse().unwrap();
        let config = ServerConfig::default().with_address(addr).with_samples(2).with_seed(3);
        assert_eq!(config.address.port(), 8080);
        assert_eq!(config.samples, 2);
        assert_eq!(config.seed, Some(3));
    }

    #[test]
    fn test_health_response_serialize() {
        let health = HealthResponse {
            status: "healthy".to_string(),
            version: "0.3.0".to_string(),
            uptime_secs: 12,
            models: vec!["object".to_string()],
        };
        let json = serde_json::to_string(&health).unwrap();
        assert!(json.contains("\"models\":[\"object\"]"));
    }
}
