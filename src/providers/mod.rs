// Model handles and the registry that builds them
//
// A handle wraps one model on one backend. Handles are shared read-only
// between concurrent requests, so implementations must be Send + Sync.

use async_trait::async_trait;

use crate::error::Result;

pub mod ollama;
pub mod openai;
pub mod registry;
pub mod types;

pub use registry::{Credentials, ModelRegistry};
pub use types::{ChatMessage, Prompt, Role};

/// Callable text-generation unit
#[async_trait]
pub trait ModelHandle: Send + Sync {
    /// Send a rendered prompt and return the generated text.
    ///
    /// Failures surface as `ServeError::ModelInvocation` and are never
    /// retried here.
    async fn invoke(&self, prompt: &Prompt) -> Result<String>;

    /// Canonical `provider/model` name, for logging
    fn name(&self) -> &str;
}

/// Cap error bodies quoted back in invocation errors
pub(crate) fn error_excerpt(body: &str) -> String {
    crate::server::error_handling::truncate_str(body.trim(), 300)
}
