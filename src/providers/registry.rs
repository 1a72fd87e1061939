use std::sync::Arc;

use crate::config::{ModelIdentifier, ProvidersConfig};
use crate::error::{Result, ServeError};
use crate::providers::ModelHandle;
use crate::providers::ollama::OllamaModel;
use crate::providers::openai::OpenAiModel;

/// Secrets needed by remote providers
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
}

impl Credentials {
    fn openai_key(&self) -> Option<&str> {
        self.openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// Builds model handles from identifiers
pub struct ModelRegistry {
    providers: ProvidersConfig,
    credentials: Credentials,
}

impl ModelRegistry {
    pub fn new(providers: &ProvidersConfig) -> Self {
        Self {
            credentials: Credentials {
                openai_api_key: providers.openai.api_key.clone(),
            },
            providers: providers.clone(),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Parse a symbolic name and resolve it
    pub fn resolve_name(&self, name: &str) -> Result<Arc<dyn ModelHandle>> {
        let identifier = ModelIdentifier::parse(name)?;
        self.resolve(&identifier)
    }

    /// Build a handle for `identifier`. Never touches the network.
    pub fn resolve(&self, identifier: &ModelIdentifier) -> Result<Arc<dyn ModelHandle>> {
        let handle: Arc<dyn ModelHandle> = match identifier {
            ModelIdentifier::OpenAi { model } => {
                let api_key = self
                    .credentials
                    .openai_key()
                    .ok_or_else(|| ServeError::MissingCredential("openai".to_string()))?;
                Arc::new(OpenAiModel::new(
                    model,
                    api_key.to_string(),
                    &self.providers.openai,
                )?)
            }
            ModelIdentifier::Ollama { model } => {
                Arc::new(OllamaModel::new(model, &self.providers.ollama)?)
            }
        };

        tracing::debug!("Resolved model {}", identifier);
        Ok(handle)
    }
}
