//! Extraction of the platform envelope from inbound JSON bodies
//!
//! Missing optional fields never fail; only bodies that are not a JSON object,
//! or fields of the wrong JSON kind, are rejected.

use serde_json::{Map, Value};

use crate::{CoreError, HandlerSpec, Params, ProjectId, Result, Task, TrainEvent};

/// Normalized `/predict` request
#[derive(Debug, Clone, PartialEq)]
pub struct PredictRequest {
    pub tasks: Vec<Task>,
    pub label_config: Option<String>,
    pub project_id: Option<ProjectId>,
    /// Per-call context, split out of `params`
    pub context: Params,
    /// Remaining params (credentials and anything else)
    pub params: Params,
}

impl PredictRequest {
    pub fn from_value(body: Value) -> Result<Self> {
        let mut body = into_object(body)?;

        let tasks = match body.remove("tasks") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(tasks)) => tasks,
            Some(_) => return Err(invalid("tasks must be an array")),
        };
        let label_config = optional_string(body.remove("label_config"), "label_config")?;
        let project_id = optional_project(body.remove("project"))?
            .and_then(|project| ProjectId::from_composite(&project));
        let params = optional_object(body.remove("params"), "params")?.unwrap_or_default();
        let (context, params) = split_context(params)?;

        Ok(Self {
            tasks,
            label_config,
            project_id,
            context,
            params,
        })
    }

    pub fn handler_spec(&self) -> HandlerSpec {
        HandlerSpec::new(self.project_id.clone(), self.label_config.clone())
    }
}

/// Separate the ephemeral `context` from the rest of the params
fn split_context(mut params: Params) -> Result<(Params, Params)> {
    let context = optional_object(params.remove("context"), "params.context")?.unwrap_or_default();
    Ok((context, params))
}

/// Normalized `/setup` request
#[derive(Debug, Clone, PartialEq)]
pub struct SetupRequest {
    pub project_id: ProjectId,
    pub schema: Option<String>,
    pub extra_params: Option<Params>,
}

impl SetupRequest {
    pub fn from_value(body: Value) -> Result<Self> {
        let mut body = into_object(body)?;

        let project_id = optional_project(body.remove("project"))?
            .and_then(|project| ProjectId::from_composite(&project))
            .ok_or_else(|| invalid("project is required"))?;
        let schema = optional_string(body.remove("schema"), "schema")?;
        let extra_params = optional_object(body.remove("extra_params"), "extra_params")?
            .filter(|params| !params.is_empty());

        Ok(Self {
            project_id,
            schema,
            extra_params,
        })
    }

    pub fn handler_spec(&self) -> HandlerSpec {
        HandlerSpec::new(Some(self.project_id.clone()), self.schema.clone())
    }
}

/// Classified `/webhook` request
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookRequest {
    /// Action outside the training set; acknowledged without touching a handler
    Ignored { action: Option<String> },
    /// Training event routed to the handler's `fit`
    Train {
        event: TrainEvent,
        spec: HandlerSpec,
        /// Payload with `action` removed
        payload: Value,
    },
}

impl WebhookRequest {
    pub fn from_value(body: Value) -> Result<Self> {
        let mut body = into_object(body)?;

        let action = match body.remove("action") {
            Some(Value::String(action)) => action,
            Some(other) => {
                return Ok(Self::Ignored {
                    action: Some(other.to_string()),
                });
            }
            None => return Ok(Self::Ignored { action: None }),
        };
        let Some(event) = TrainEvent::from_action(&action) else {
            return Ok(Self::Ignored {
                action: Some(action),
            });
        };

        let project = body
            .get("project")
            .and_then(Value::as_object)
            .ok_or_else(|| invalid("project is required for training events"))?;
        let project_id = optional_project(project.get("id").cloned())?
            .map(ProjectId::from_string)
            .ok_or_else(|| invalid("project.id is required for training events"))?;
        let label_config = optional_string(project.get("label_config").cloned(), "label_config")?;

        Ok(Self::Train {
            event,
            spec: HandlerSpec::new(Some(project_id), label_config),
            payload: Value::Object(body),
        })
    }
}

fn into_object(body: Value) -> Result<Map<String, Value>> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(invalid("request body must be a JSON object")),
    }
}

fn optional_string(value: Option<Value>, field: &str) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(invalid(format!("{} must be a string", field))),
    }
}

fn optional_object(value: Option<Value>, field: &str) -> Result<Option<Params>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(invalid(format!("{} must be an object", field))),
    }
}

/// Projects arrive as strings but numeric ids are accepted too
fn optional_project(value: Option<Value>) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(invalid("project must be a string or a number")),
    }
}

fn invalid(msg: impl Into<String>) -> CoreError {
    CoreError::Validation(msg.into())
}
