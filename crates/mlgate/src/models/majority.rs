//! Majority-label baseline
//!
//! Learns nothing but the annotation results a project's annotators pick most
//! often, and suggests that result for every task. Useful as a smoke-test
//! backend and as a floor for real models to beat.

use async_trait::async_trait;
use mlgate_core::{
    FnFactory, HandlerError, HandlerResult, HandlerSpec, ModelHandler, ModelResponse, Params,
    PredictOutput, Prediction, PredictionValue, ProjectId, SharedFactory, Task, TrainEvent,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::store::ProjectStore;

const ANNOTATIONS_KEY: &str = "annotations";
const MODEL_VERSION_KEY: &str = "model_version";
const ROUNDS_KEY: &str = "training_rounds";
const EXTRA_PARAMS_KEY: &str = "extra_params";

/// Configuration for the majority-label model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MajorityConfig {
    /// Version reported before the first training round
    pub base_version: String,

    /// Minimum share of annotations a result needs before it is suggested
    pub min_score: f64,
}

impl Default for MajorityConfig {
    fn default() -> Self {
        Self {
            base_version: "0.0.1".to_string(),
            min_score: 0.0,
        }
    }
}

pub struct MajorityLabelModel {
    project_id: Option<ProjectId>,
    label_config: Option<String>,
    store: Arc<dyn ProjectStore>,
    config: MajorityConfig,
}

impl MajorityLabelModel {
    pub fn new(spec: HandlerSpec, store: Arc<dyn ProjectStore>, config: MajorityConfig) -> Self {
        Self {
            project_id: spec.project_id,
            label_config: spec.label_config,
            store,
            config,
        }
    }

    /// Factory building one model per request on top of a shared store
    pub fn factory(store: Arc<dyn ProjectStore>, config: MajorityConfig) -> SharedFactory {
        Arc::new(FnFactory::new(
            move |spec: HandlerSpec| -> HandlerResult<MajorityLabelModel> {
                Ok(MajorityLabelModel::new(spec, store.clone(), config.clone()))
            },
        ))
    }

    fn project(&self) -> HandlerResult<&ProjectId> {
        self.project_id
            .as_ref()
            .ok_or_else(|| HandlerError::Invariant("model is not bound to a project".to_string()))
    }

    async fn annotations(&self, project: &ProjectId) -> HandlerResult<Map<String, Value>> {
        Ok(self
            .store
            .get_as::<Map<String, Value>>(project, ANNOTATIONS_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn extra_params(&self, project: &ProjectId) -> HandlerResult<Params> {
        match self.store.get(project, EXTRA_PARAMS_KEY).await? {
            Some(Value::Object(params)) => Ok(params),
            _ => Ok(Params::new()),
        }
    }

    async fn base_version(&self, project: &ProjectId) -> HandlerResult<String> {
        let extra = self.extra_params(project).await?;
        Ok(extra
            .get("base_version")
            .and_then(Value::as_str)
            .map_or_else(|| self.config.base_version.clone(), str::to_string))
    }

    async fn bump_version(&self, project: &ProjectId) -> HandlerResult<String> {
        let rounds = self
            .store
            .update(
                project,
                ROUNDS_KEY,
                Box::new(|current| json!(current.and_then(|v| v.as_u64()).unwrap_or(0) + 1)),
            )
            .await?;
        let version = format!("{}-{}", self.base_version(project).await?, rounds);
        self.store
            .set(project, MODEL_VERSION_KEY, Value::String(version.clone()))
            .await?;
        Ok(version)
    }

    async fn record_annotation(&self, project: &ProjectId, payload: &Value) -> HandlerResult<()> {
        let annotation = payload
            .get("annotation")
            .ok_or_else(|| HandlerError::failed("payload has no annotation"))?;
        let id = annotation_id(annotation)?;

        let cancelled = annotation
            .get("was_cancelled")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if cancelled {
            return self.forget_annotation(project, id).await;
        }

        let items: Vec<Value> = annotation
            .get("result")
            .and_then(Value::as_array)
            .map(|items| items.iter().cloned().map(strip_region_id).collect())
            .unwrap_or_default();

        self.store
            .update(
                project,
                ANNOTATIONS_KEY,
                Box::new(move |current| {
                    let mut annotations = into_map(current);
                    annotations.insert(id, Value::Array(items));
                    Value::Object(annotations)
                }),
            )
            .await?;
        Ok(())
    }

    async fn forget_annotation(&self, project: &ProjectId, id: String) -> HandlerResult<()> {
        self.store
            .update(
                project,
                ANNOTATIONS_KEY,
                Box::new(move |current| {
                    let mut annotations = into_map(current);
                    annotations.remove(&id);
                    Value::Object(annotations)
                }),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ModelHandler for MajorityLabelModel {
    async fn predict(
        &self,
        tasks: Vec<Task>,
        context: Params,
        _params: Params,
    ) -> HandlerResult<PredictOutput> {
        let best = match &self.project_id {
            Some(project) => {
                let min_score = self
                    .extra_params(project)
                    .await?
                    .get("min_score")
                    .and_then(Value::as_f64)
                    .unwrap_or(self.config.min_score);
                majority(&self.annotations(project).await?).filter(|(_, score)| *score >= min_score)
            }
            None => None,
        };

        tracing::debug!(
            project_id = ?self.project_id,
            tasks = tasks.len(),
            interactive = !context.is_empty(),
            has_suggestion = best.is_some(),
            "Predicting with majority label"
        );

        let predictions = tasks
            .iter()
            .map(|task| {
                let mut value = PredictionValue::default();
                if let Some(id) = task.get("id") {
                    value.extra.insert("task".to_string(), id.clone());
                }
                if let Some((item, score)) = &best {
                    value.result = vec![item.clone()];
                    value.score = Some(*score);
                }
                Prediction::Single(value)
            })
            .collect();

        Ok(ModelResponse::new(predictions).into())
    }

    async fn fit(&self, event: TrainEvent, payload: Value) -> HandlerResult<Value> {
        let project = self.project()?;

        match event {
            TrainEvent::AnnotationCreated | TrainEvent::AnnotationUpdated => {
                self.record_annotation(project, &payload).await?
            }
            TrainEvent::AnnotationDeleted => {
                let annotation = payload
                    .get("annotation")
                    .ok_or_else(|| HandlerError::failed("payload has no annotation"))?;
                self.forget_annotation(project, annotation_id(annotation)?)
                    .await?
            }
            TrainEvent::StartTraining => {}
        }

        let annotations = self.annotations(project).await?.len();
        let version = self.bump_version(project).await?;
        tracing::info!(
            project_id = %project,
            event = %event,
            annotations,
            model_version = %version,
            "Majority model updated"
        );

        Ok(json!({
            "model_version": version,
            "annotations": annotations,
        }))
    }

    async fn set_extra_params(&self, params: Params) -> HandlerResult<()> {
        let project = self.project()?;
        self.store
            .set(project, EXTRA_PARAMS_KEY, Value::Object(params))
            .await?;
        Ok(())
    }

    async fn model_version(&self) -> Option<String> {
        let Some(project) = &self.project_id else {
            return Some(self.config.base_version.clone());
        };

        let stored = match self.store.get(project, MODEL_VERSION_KEY).await {
            Ok(Some(Value::String(version))) => return Some(version),
            Ok(_) => self.base_version(project).await,
            Err(e) => Err(e.into()),
        };
        match stored {
            Ok(version) => Some(version),
            Err(e) => {
                tracing::warn!(project_id = %project, "Failed to read model version: {}", e);
                Some(self.config.base_version.clone())
            }
        }
    }

    async fn get(&self, key: &str) -> HandlerResult<Option<Value>> {
        match key {
            "model_version" => Ok(self.model_version().await.map(Value::String)),
            "label_config" => Ok(self.label_config.clone().map(Value::String)),
            "trained_at" => {
                let project = self.project()?;
                let entry = self.store.entry(project, MODEL_VERSION_KEY).await?;
                Ok(entry.map(|entry| Value::String(entry.updated_at.to_rfc3339())))
            }
            other => match &self.project_id {
                Some(project) => Ok(self.store.get(project, other).await?),
                None => Ok(None),
            },
        }
    }
}

/// Most common result item and the share of annotations containing it
///
/// Ties go to the item whose serialized form sorts first.
fn majority(annotations: &Map<String, Value>) -> Option<(Value, f64)> {
    if annotations.is_empty() {
        return None;
    }

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for items in annotations.values() {
        let distinct: BTreeSet<String> = items
            .as_array()
            .into_iter()
            .flatten()
            .map(Value::to_string)
            .collect();
        for item in distinct {
            *counts.entry(item).or_default() += 1;
        }
    }

    let mut best: Option<(&String, usize)> = None;
    for (item, count) in &counts {
        match best {
            Some((_, best_count)) if best_count >= *count => {}
            _ => best = Some((item, *count)),
        }
    }

    let (item, count) = best?;
    let value = serde_json::from_str(item).ok()?;
    Some((value, count as f64 / annotations.len() as f64))
}

fn annotation_id(annotation: &Value) -> HandlerResult<String> {
    match annotation.get("id") {
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(HandlerError::failed("annotation has no id")),
    }
}

/// Region ids are unique per annotation and would defeat counting
fn strip_region_id(mut item: Value) -> Value {
    if let Value::Object(map) = &mut item {
        map.remove("id");
    }
    item
}

fn into_map(value: Option<Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
