use crate::backend::BackendClient;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub backend_host: String,
    pub model: String,
    pub timeout: u64,
    pub stream_buffer: usize,
    pub generated_dir: PathBuf,
    pub upload_dir: PathBuf,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            backend_host: "http://localhost:11434".to_string(),
            model: "deepseek-coder".to_string(),
            timeout: 60,
            stream_buffer: 32,
            generated_dir: PathBuf::from("generated"),
            upload_dir: PathBuf::from("uploads"),
        }
    }
}

/// Shared by every worker. Everything except the selected model is fixed
/// after startup.
#[derive(Debug, Clone)]
pub struct AppState {
    pub backend: BackendClient,
    pub stream_buffer: usize,
    pub generated_dir: PathBuf,
    pub upload_dir: PathBuf,
    model: Arc<RwLock<String>>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> anyhow::Result<Self> {
        if config.model.trim().is_empty() {
            anyhow::bail!("Default model must not be empty");
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;
        Ok(Self {
            backend: BackendClient::new(client, config.backend_host),
            stream_buffer: config.stream_buffer,
            generated_dir: config.generated_dir,
            upload_dir: config.upload_dir,
            model: Arc::new(RwLock::new(config.model)),
        })
    }

    pub fn current_model(&self) -> String {
        match self.model.read() {
            Ok(model) => model.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_model(&self, model: impl Into<String>) {
        let model = model.into();
        log::info!("Switching model to {}", model);
        match self.model.write() {
            Ok(mut current) => *current = model,
            Err(poisoned) => *poisoned.into_inner() = model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_selection_is_shared_between_clones() {
        let state = AppState::new(RelayConfig::default()).unwrap();
        let worker_copy = state.clone();
        assert_eq!(worker_copy.current_model(), "deepseek-coder");
        state.set_model("llama3");
        assert_eq!(worker_copy.current_model(), "llama3");
    }

    #[test]
    fn rejects_blank_default_model() {
        let config = RelayConfig {
            model: "  ".to_string(),
            ..RelayConfig::default()
        };
        assert!(AppState::new(config).is_err());
    }
}
