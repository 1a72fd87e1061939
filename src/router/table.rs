use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Result, ServeError};
use crate::providers::ModelHandle;
use crate::router::template::PromptTemplate;
use crate::server::error_handling::{self, PayloadLogMode};

/// A served prompt: template bound to a model under a path
#[derive(Clone)]
pub struct Route {
    pub path: String,
    pub template: PromptTemplate,
    pub model: Arc<dyn ModelHandle>,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("template", &self.template)
            .field("model", &self.model.name())
            .finish()
    }
}

/// Path → pipeline mapping.
///
/// Populated at startup, then shared read-only. `register` takes `&mut self`
/// so it cannot race with `dispatch` on a shared table.
#[derive(Default)]
pub struct RouteTable {
    routes: FxHashMap<String, Route>,
    payload_log: PayloadLogMode,
}

/// `/essay/`, `essay` and `/essay` all name the same route
pub fn normalize_path(path: &str) -> &str {
    path.trim().trim_matches('/')
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// How rendered prompts and outputs of this table are logged
    pub fn set_payload_log(&mut self, mode: PayloadLogMode) {
        self.payload_log = mode;
    }

    pub fn payload_log(&self) -> PayloadLogMode {
        self.payload_log
    }

    /// Insert or replace the route at `path`. The last registration wins.
    pub fn register(
        &mut self,
        path: impl AsRef<str>,
        template: PromptTemplate,
        model: Arc<dyn ModelHandle>,
    ) {
        let path = normalize_path(path.as_ref()).to_string();
        let route = Route {
            path: path.clone(),
            template,
            model,
        };

        if let Some(previous) = self.routes.insert(path.clone(), route) {
            warn!(
                "Route '/{}' re-registered: {} replaced by {}",
                path,
                previous.model.name(),
                self.routes[&path].model.name()
            );
        } else {
            debug!("Registered route '/{}'", path);
        }
    }

    pub fn route(&self, path: &str) -> Result<&Route> {
        let path = normalize_path(path);
        self.routes
            .get(path)
            .ok_or_else(|| ServeError::RouteNotFound(format!("/{}", path)))
    }

    /// Registered paths, sorted
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Run the pipeline at `path`: render the template with `fields`, then
    /// invoke the bound model. The output is returned verbatim and model
    /// errors propagate unchanged. No model call happens if lookup or
    /// rendering fails.
    pub async fn dispatch(&self, path: &str, fields: &FxHashMap<String, String>) -> Result<String> {
        let route = self.route(path)?;
        let prompt = route.template.render(fields)?;

        debug!(
            route = %route.path,
            model = %route.model.name(),
            "Dispatching prompt ({} chars)",
            prompt.text().len()
        );
        if let Some(prompt_log) = error_handling::prepare_payload_log(self.payload_log, &prompt) {
            debug!(target: "chainserve::prompt", "Rendered prompt: {}", prompt_log);
        }

        let output = route.model.invoke(&prompt).await?;

        if let Some(output_log) = error_handling::prepare_payload_log(self.payload_log, &output) {
            debug!(target: "chainserve::output", "Model output: {}", output_log);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Prompt;
    use async_trait::async_trait;

    struct Fixed(&'static str);

    #[async_trait]
    impl ModelHandle for Fixed {
        async fn invoke(&self, _prompt: &Prompt) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/essay/"), "essay");
        assert_eq!(normalize_path("essay"), "essay");
        assert_eq!(normalize_path(" /v1/poem "), "v1/poem");
    }

    #[test]
    fn test_register_and_lookup() {
        let mut table = RouteTable::new();
        assert!(table.is_empty());

        let template = PromptTemplate::from_template("{topic}").unwrap();
        table.register("/poem", template.clone(), Arc::new(Fixed("a")));
        table.register("essay", template, Arc::new(Fixed("b")));

        assert_eq!(table.len(), 2);
        assert_eq!(table.paths(), vec!["essay", "poem"]);
        assert_eq!(table.route("poem/").unwrap().model.name(), "a");
        assert!(matches!(
            table.route("missing"),
            Err(ServeError::RouteNotFound(p)) if p == "/missing"
        ));
    }

    #[tokio::test]
    async fn test_dispatch_returns_output_verbatim() {
        let mut table = RouteTable::new();
        table.register(
            "essay",
            PromptTemplate::from_template("{topic}").unwrap(),
            Arc::new(Fixed("  padded output\n")),
        );

        let mut fields = FxHashMap::default();
        fields.insert("topic".to_string(), "x".to_string());
        let output = table.dispatch("essay", &fields).await.unwrap();
        assert_eq!(output, "  padded output\n");
    }
}
