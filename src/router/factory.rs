use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    config::{Config, ModelIdentifier, RouteConfig},
    error::{Result, ServeError},
    providers::{ModelHandle, ModelRegistry},
    router::{
        table::{RouteTable, normalize_path},
        template::PromptTemplate,
    },
    server::error_handling::PayloadLogMode,
};

/// Builds a route table from configuration
pub struct RouteTableFactory;

impl RouteTableFactory {
    /// Validate every configured route, resolve its model and register it.
    ///
    /// Each distinct model is resolved once and its handle shared by all
    /// routes that use it.
    pub fn from_config(config: &Config) -> Result<RouteTable> {
        let registry = ModelRegistry::new(&config.providers);
        Self::from_config_with_registry(config, &registry)
    }

    pub fn from_config_with_registry(config: &Config, registry: &ModelRegistry) -> Result<RouteTable> {
        let mut table = RouteTable::new();
        match PayloadLogMode::parse(&config.server.payload_log) {
            Some(mode) => table.set_payload_log(mode),
            None => warn!(
                "Invalid payload_log '{}', payload logging disabled",
                config.server.payload_log
            ),
        }

        let mut handles: FxHashMap<ModelIdentifier, Arc<dyn ModelHandle>> = FxHashMap::default();

        for route in &config.routes {
            let path = normalize_path(&route.path);
            if path.is_empty() {
                return Err(ServeError::Other(format!(
                    "Route path must not be empty, got: '{}'",
                    route.path
                )));
            }

            let template = Self::build_template(route)?;

            let model_name = route
                .model
                .as_deref()
                .unwrap_or(&config.routing.default_model);
            let identifier = ModelIdentifier::parse(model_name)?;

            let handle = match handles.get(&identifier) {
                Some(handle) => handle.clone(),
                None => {
                    let handle = registry.resolve(&identifier)?;
                    handles.insert(identifier.clone(), handle.clone());
                    handle
                }
            };

            info!(
                "Route /{} → {} (fields: {})",
                path,
                identifier,
                template.input_fields().join(", ")
            );
            table.register(path, template, handle);
        }

        Ok(table)
    }

    fn build_template(route: &RouteConfig) -> Result<PromptTemplate> {
        match (&route.template, route.messages.is_empty()) {
            (Some(template), true) => PromptTemplate::from_template(template),
            (None, false) => PromptTemplate::from_messages(
                route
                    .messages
                    .iter()
                    .map(|message| (message.role, message.content.as_str())),
            ),
            (Some(_), false) => Err(ServeError::InvalidTemplate(format!(
                "route '{}' sets both 'template' and 'messages'",
                route.path
            ))),
            (None, true) => Err(ServeError::InvalidTemplate(format!(
                "route '{}' needs a 'template' or 'messages'",
                route.path
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MessageConfig;
    use crate::providers::{Credentials, Role};

    fn route(path: &str, model: Option<&str>, template: Option<&str>) -> RouteConfig {
        RouteConfig {
            path: path.to_string(),
            model: model.map(str::to_string),
            template: template.map(str::to_string),
            messages: Vec::new(),
        }
    }

    fn create_test_config(routes: Vec<RouteConfig>) -> Config {
        let mut config = Config::default();
        config.routes = routes;
        config.routing.default_model = "llama3".to_string();
        config
    }

    #[test]
    fn test_builds_local_routes_without_credentials() {
        let config = create_test_config(vec![
            route("/poem", Some("llama2"), Some("Write about {topic}")),
            route("summary", None, Some("Summarize {text}")),
        ]);

        let table = RouteTableFactory::from_config(&config).unwrap();
        assert_eq!(table.paths(), vec!["poem", "summary"]);
        assert_eq!(table.route("summary").unwrap().model.name(), "ollama/llama3");
    }

    #[test]
    fn test_shared_model_is_resolved_once() {
        let config = create_test_config(vec![
            route("a", Some("llama3"), Some("{x}")),
            route("b", Some("ollama/llama3"), Some("{y}")),
        ]);

        let table = RouteTableFactory::from_config(&config).unwrap();
        let a = &table.route("a").unwrap().model;
        let b = &table.route("b").unwrap().model;
        assert!(Arc::ptr_eq(a, b));
    }

    #[test]
    fn test_messages_route() {
        let mut chat = route("chat", None, None);
        chat.messages = vec![
            MessageConfig {
                role: Role::System,
                content: "Be helpful.".to_string(),
            },
            MessageConfig {
                role: Role::User,
                content: "{user_input}".to_string(),
            },
        ];
        let table = RouteTableFactory::from_config(&create_test_config(vec![chat])).unwrap();
        assert_eq!(
            table.route("chat").unwrap().template.input_fields(),
            vec!["user_input"]
        );
    }

    #[test]
    fn test_payload_log_mode_is_per_table() {
        let mut full = create_test_config(vec![route("a", None, Some("{x}"))]);
        full.server.payload_log = "full".to_string();
        let mut quiet = create_test_config(vec![route("a", None, Some("{x}"))]);
        quiet.server.payload_log = "off".to_string();
        let mut bogus = create_test_config(vec![route("a", None, Some("{x}"))]);
        bogus.server.payload_log = "verbose".to_string();

        let full = RouteTableFactory::from_config(&full).unwrap();
        let quiet = RouteTableFactory::from_config(&quiet).unwrap();
        let bogus = RouteTableFactory::from_config(&bogus).unwrap();

        assert_eq!(full.payload_log(), PayloadLogMode::Full);
        assert_eq!(quiet.payload_log(), PayloadLogMode::Off);
        assert_eq!(bogus.payload_log(), PayloadLogMode::Off);
    }

    #[test]
    fn test_remote_route_without_key_aborts() {
        let config = create_test_config(vec![route("essay", Some("openai"), Some("{topic}"))]);
        let registry =
            ModelRegistry::new(&config.providers).with_credentials(Credentials::default());

        let result = RouteTableFactory::from_config_with_registry(&config, &registry);
        assert!(matches!(result, Err(ServeError::MissingCredential(_))));
    }

    #[test]
    fn test_invalid_route_definitions() {
        let cases = vec![
            route("", Some("llama3"), Some("{x}")),
            route("x", Some("llama3"), None),
            route("x", Some("nope"), Some("{x}")),
            route("x", Some("llama3"), Some("{x")),
        ];
        for case in cases {
            let path = case.path.clone();
            let result = RouteTableFactory::from_config(&create_test_config(vec![case]));
            assert!(result.is_err(), "Expected error for route '{}'", path);
        }
    }
}
