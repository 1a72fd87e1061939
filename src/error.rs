use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServeError>;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Missing credential for provider '{0}'")]
    MissingCredential(String),

    #[error("Invalid prompt template: {0}")]
    InvalidTemplate(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Missing input field: {0}")]
    MissingField(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model invocation failed: {0}")]
    ModelInvocation(String),

    #[error("Server returned {status}: {detail}")]
    Remote { status: u16, detail: String },

    #[error("Other error: {0}")]
    Other(String),
}

impl ServeError {
    /// Errors raised while building the server; these abort startup.
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self,
            ServeError::Config(_)
                | ServeError::UnknownModel(_)
                | ServeError::MissingCredential(_)
                | ServeError::InvalidTemplate(_)
        )
    }
}
