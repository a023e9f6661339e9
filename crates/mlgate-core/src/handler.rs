//! The model handler capability
//!
//! A handler is the pluggable, project-scoped component that does the actual
//! inference and training. The gateway only ever talks to it through
//! [`ModelHandler`]; how it stores artifacts or parses label configs is its
//! own business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use strum_macros::{Display, EnumString};

use crate::{HandlerResult, PredictOutput, ProjectId};

/// Opaque task as sent by the platform
pub type Task = Value;

/// Free-form parameter mapping (`params`, `context`, `extra_params`)
pub type Params = Map<String, Value>;

/// Webhook actions that feed the handler's training entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TrainEvent {
    AnnotationCreated,
    AnnotationUpdated,
    AnnotationDeleted,
    StartTraining,
}

impl TrainEvent {
    pub const ALL: [TrainEvent; 4] = [
        TrainEvent::AnnotationCreated,
        TrainEvent::AnnotationUpdated,
        TrainEvent::AnnotationDeleted,
        TrainEvent::StartTraining,
    ];

    /// Parse a webhook action, `None` for anything outside the training set
    pub fn from_action(action: &str) -> Option<Self> {
        action.parse().ok()
    }
}

/// What a handler is constructed for
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerSpec {
    pub project_id: Option<ProjectId>,
    pub label_config: Option<String>,
}

impl HandlerSpec {
    pub fn new(project_id: Option<ProjectId>, label_config: Option<String>) -> Self {
        Self {
            project_id,
            label_config,
        }
    }
}

/// Core trait for model backends served by the gateway
///
/// Methods take `&self` so a handler can be shared behind an `Arc` when the
/// factory caches it; handlers that mutate configuration use interior
/// mutability.
#[async_trait]
pub trait ModelHandler: Send + Sync {
    /// Predict the given tasks
    async fn predict(
        &self,
        tasks: Vec<Task>,
        context: Params,
        params: Params,
    ) -> HandlerResult<PredictOutput>;

    /// Training entry point for webhook events
    async fn fit(&self, _event: TrainEvent, _payload: Value) -> HandlerResult<Value> {
        Ok(Value::Null)
    }

    /// Apply additional configuration sent by the platform on setup
    async fn set_extra_params(&self, _params: Params) -> HandlerResult<()> {
        Ok(())
    }

    /// Default version stamped on unversioned predictions
    async fn model_version(&self) -> Option<String> {
        None
    }

    /// Generic attribute accessor
    async fn get(&self, key: &str) -> HandlerResult<Option<Value>> {
        match key {
            "model_version" => Ok(self.model_version().await.map(Value::String)),
            _ => Ok(None),
        }
    }
}

/// Arc-wrapped handler for thread-safe sharing
pub type SharedHandler = Arc<dyn ModelHandler>;
