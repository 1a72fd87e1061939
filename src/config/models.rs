use std::fmt;

use crate::error::{Result, ServeError};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// Supported model backends, one case per provider
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelIdentifier {
    /// Remote chat-completion API, authenticated with an API key
    OpenAi { model: String },
    /// Local Ollama server, no credential
    Ollama { model: String },
}

impl ModelIdentifier {
    /// Parse a symbolic model name.
    ///
    /// Accepts the short names `openai`, `llama2` and `llama3`, or the
    /// provider-qualified forms `openai/<model>` and `ollama/<model>`.
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();

        if name.contains("//") {
            return Err(ServeError::UnknownModel(format!(
                "Model name must be in format 'provider/model', got: {}",
                name
            )));
        }

        if let Some((provider, model)) = name.split_once('/') {
            let model = model.trim();
            if model.is_empty() || model.starts_with('/') {
                return Err(ServeError::UnknownModel(format!(
                    "Model name must be in format 'provider/model', got: {}",
                    name
                )));
            }

            return match provider.trim().to_ascii_lowercase().as_str() {
                "openai" => Ok(Self::OpenAi {
                    model: model.to_string(),
                }),
                "ollama" => Ok(Self::Ollama {
                    model: model.to_string(),
                }),
                _ => Err(ServeError::UnknownModel(name.to_string())),
            };
        }

        match name.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi {
                model: DEFAULT_OPENAI_MODEL.to_string(),
            }),
            short @ ("llama2" | "llama3") => Ok(Self::Ollama {
                model: short.to_string(),
            }),
            _ => Err(ServeError::UnknownModel(name.to_string())),
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            Self::OpenAi { .. } => "openai",
            Self::Ollama { .. } => "ollama",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi { model } | Self::Ollama { model } => model,
        }
    }

    /// Whether the provider needs an API key to be resolved
    pub fn requires_credential(&self) -> bool {
        matches!(self, Self::OpenAi { .. })
    }
}

impl fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider(), self.model())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_names() {
        assert_eq!(
            ModelIdentifier::parse("openai").unwrap(),
            ModelIdentifier::OpenAi {
                model: "gpt-3.5-turbo".to_string()
            }
        );
        assert_eq!(
            ModelIdentifier::parse("llama3").unwrap(),
            ModelIdentifier::Ollama {
                model: "llama3".to_string()
            }
        );
        assert_eq!(
            ModelIdentifier::parse(" LLAMA2 ").unwrap(),
            ModelIdentifier::Ollama {
                model: "llama2".to_string()
            }
        );
    }

    #[test]
    fn test_parse_qualified_names() {
        let parsed = ModelIdentifier::parse("openai/gpt-4o").unwrap();
        assert_eq!(parsed.provider(), "openai");
        assert_eq!(parsed.model(), "gpt-4o");

        let parsed = ModelIdentifier::parse("ollama/mistral:7b").unwrap();
        assert_eq!(parsed.provider(), "ollama");
        assert_eq!(parsed.model(), "mistral:7b");
    }

    #[test]
    fn test_parse_unknown() {
        for name in ["", "gpt-4", "anthropic/claude-3", "openai/", "ollama//x", "/llama3"] {
            let result = ModelIdentifier::parse(name);
            assert!(
                matches!(result, Err(ServeError::UnknownModel(_))),
                "Expected UnknownModel for '{}'",
                name
            );
        }
    }

    #[test]
    fn test_double_slash_is_rejected() {
        for name in ["ollama//llama3", "openai//gpt-4o", "openai/ /gpt-4o", "ollama/llama3//q4"] {
            assert!(
                matches!(
                    ModelIdentifier::parse(name),
                    Err(ServeError::UnknownModel(_))
                ),
                "Expected UnknownModel for '{}'",
                name
            );
        }
    }

    #[test]
    fn test_display_is_canonical() {
        let parsed = ModelIdentifier::parse("openai").unwrap();
        assert_eq!(parsed.to_string(), "openai/gpt-3.5-turbo");
        assert_eq!(
            ModelIdentifier::parse(&parsed.to_string()).unwrap(),
            parsed
        );
    }

    #[test]
    fn test_credential_policy() {
        assert!(ModelIdentifier::parse("openai").unwrap().requires_credential());
        assert!(!ModelIdentifier::parse("llama3").unwrap().requires_credential());
    }
}
