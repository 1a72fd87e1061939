use axum::{
    body::Bytes,
    extract::{Path, State},
    response::Json,
};
use futures_util::future::try_join_all;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::info;

use crate::{
    error::{Result, ServeError},
    router::Route,
    server::AppState,
};

/// `input` is either a field map or, for single-field templates, a bare string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InvokeInput {
    Text(String),
    Fields(Map<String, Value>),
}

#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    pub input: InvokeInput,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub output: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub inputs: Vec<InvokeInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub output: Vec<String>,
}

/// Split `essay/invoke` into (`essay`, `invoke`)
fn split_action(path: &str) -> Result<(&str, &str)> {
    let trimmed = path.trim_matches('/');
    trimmed
        .rsplit_once('/')
        .filter(|(route, _)| !route.is_empty())
        .ok_or_else(|| ServeError::RouteNotFound(format!("/{}", trimmed)))
}

/// Turn request input into the string fields a template renders from
pub fn input_to_fields(route: &Route, input: InvokeInput) -> Result<FxHashMap<String, String>> {
    match input {
        InvokeInput::Text(text) => match route.template.input_fields().as_slice() {
            [field] => Ok(FxHashMap::from_iter([(field.to_string(), text)])),
            fields => Err(ServeError::InvalidInput(format!(
                "a plain string input needs a single-field template, /{} expects: {}",
                route.path,
                fields.join(", ")
            ))),
        },
        InvokeInput::Fields(map) => map
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => {
                        return Err(ServeError::InvalidInput(format!(
                            "field '{}' must be a string",
                            key
                        )));
                    }
                };
                Ok((key, value))
            })
            .collect(),
    }
}

fn parse_body<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| ServeError::InvalidInput(format!("Invalid JSON in request body: {}", e)))
}

/// `POST /{path}/invoke` and `POST /{path}/batch`
pub async fn post_route(
    State(state): State<AppState>,
    Path(path): Path<String>,
    body: Bytes,
) -> Result<Json<Value>> {
    let (route_path, action) = split_action(&path)?;

    match action {
        "invoke" => {
            let route = state.table.route(route_path)?;
            let request: InvokeRequest = parse_body(&body)?;
            let fields = input_to_fields(route, request.input)?;

            info!("Invoke /{} → {}", route.path, route.model.name());
            let output = state.table.dispatch(route_path, &fields).await?;

            Ok(Json(serde_json::to_value(InvokeResponse { output })?))
        }
        "batch" => {
            let route = state.table.route(route_path)?;
            let request: BatchRequest = parse_body(&body)?;

            let expected = route.template.input_fields();
            let mut batch = Vec::with_capacity(request.inputs.len());
            for input in request.inputs {
                let fields = input_to_fields(route, input)?;
                if let Some(missing) = expected.iter().find(|f| !fields.contains_key(**f)) {
                    return Err(ServeError::MissingField(missing.to_string()));
                }
                batch.push(fields);
            }

            info!(
                "Batch /{} → {} ({} inputs)",
                route.path,
                route.model.name(),
                batch.len()
            );
            let output = try_join_all(
                batch
                    .iter()
                    .map(|fields| state.table.dispatch(route_path, fields)),
            )
            .await?;

            Ok(Json(serde_json::to_value(BatchResponse { output })?))
        }
        _ => Err(ServeError::RouteNotFound(format!("/{}", path.trim_matches('/')))),
    }
}

/// `GET /{path}/input_schema`
pub async fn get_route(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<Value>> {
    let (route_path, action) = split_action(&path)?;

    match action {
        "input_schema" => {
            let route = state.table.route(route_path)?;
            Ok(Json(input_schema(route)))
        }
        _ => Err(ServeError::RouteNotFound(format!("/{}", path.trim_matches('/')))),
    }
}

/// JSON schema describing the fields a route's template needs
pub fn input_schema(route: &Route) -> Value {
    let fields = route.template.input_fields();
    let properties: Map<String, Value> = fields
        .iter()
        .map(|field| {
            (
                field.to_string(),
                json!({ "title": field, "type": "string" }),
            )
        })
        .collect();

    json!({
        "title": format!("/{} input", route.path),
        "type": "object",
        "properties": properties,
        "required": fields,
    })
}

/// Health check with uptime and served routes
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let uptime = chrono::Utc::now() - state.started_at;

    Json(json!({
        "status": "healthy",
        "service": "chainserve",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": uptime.num_seconds(),
        "routes": state.table.paths(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_action() {
        assert_eq!(split_action("essay/invoke").unwrap(), ("essay", "invoke"));
        assert_eq!(split_action("/v1/poem/batch/").unwrap(), ("v1/poem", "batch"));
        assert!(split_action("invoke").is_err());
        assert!(split_action("/invoke").is_err());
    }

    #[test]
    fn test_invoke_input_shapes() {
        let req: InvokeRequest = serde_json::from_str(r#"{"input": {"topic": "caching"}}"#).unwrap();
        assert!(matches!(req.input, InvokeInput::Fields(ref m) if m["topic"] == "caching"));

        let req: InvokeRequest = serde_json::from_str(r#"{"input": "caching"}"#).unwrap();
        assert!(matches!(req.input, InvokeInput::Text(ref t) if t == "caching"));

        assert!(serde_json::from_str::<InvokeRequest>(r#"{"input": 3}"#).is_err());
    }
}
