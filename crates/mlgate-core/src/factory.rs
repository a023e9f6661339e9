//! Handler resolution
//!
//! Every route that needs a handler goes through a [`HandlerFactory`], so
//! `/predict`, `/setup` and `/webhook` resolve handlers the same way.

use async_trait::async_trait;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

use crate::{HandlerResult, HandlerSpec, ModelHandler, ProjectId, SharedHandler};

/// Resolves a project-scoped handler
#[async_trait]
pub trait HandlerFactory: Send + Sync {
    /// Name of the handler type this factory produces
    fn model_class(&self) -> &str;

    /// Construct (or fetch) the handler for one project and label config
    async fn resolve(&self, spec: HandlerSpec) -> HandlerResult<SharedHandler>;
}

/// Arc-wrapped factory for thread-safe sharing
pub type SharedFactory = Arc<dyn HandlerFactory>;

/// Builds a fresh handler per call from a constructor closure
pub struct FnFactory<H, F> {
    model_class: String,
    constructor: F,
    _handler: PhantomData<fn() -> H>,
}

impl<H, F> FnFactory<H, F>
where
    H: ModelHandler + 'static,
    F: Fn(HandlerSpec) -> HandlerResult<H> + Send + Sync,
{
    /// Create a factory named after the handler type
    pub fn new(constructor: F) -> Self {
        Self {
            model_class: short_type_name::<H>().to_string(),
            constructor,
            _handler: PhantomData,
        }
    }

    /// Override the reported model class name
    pub fn with_model_class(mut self, model_class: impl Into<String>) -> Self {
        self.model_class = model_class.into();
        self
    }
}

#[async_trait]
impl<H, F> HandlerFactory for FnFactory<H, F>
where
    H: ModelHandler + 'static,
    F: Fn(HandlerSpec) -> HandlerResult<H> + Send + Sync,
{
    fn model_class(&self) -> &str {
        &self.model_class
    }

    async fn resolve(&self, spec: HandlerSpec) -> HandlerResult<SharedHandler> {
        tracing::debug!(
            project_id = ?spec.project_id,
            model_class = %self.model_class,
            "Constructing model handler"
        );
        let handler = (self.constructor)(spec)?;
        Ok(Arc::new(handler))
    }
}

/// Caches handlers by project id on top of another factory
///
/// At most one handler is constructed per project, even when the first
/// requests for a project arrive concurrently. Requests without a project id
/// always get a fresh handler, and failed constructions are retried on the
/// next request.
pub struct CachingFactory {
    inner: SharedFactory,
    handlers: Mutex<HashMap<ProjectId, Arc<OnceCell<SharedHandler>>>>,
}

impl CachingFactory {
    pub fn new(inner: SharedFactory) -> Self {
        Self {
            inner,
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Number of projects with a constructed handler
    pub async fn cached_projects(&self) -> usize {
        let handlers = self.handlers.lock().await;
        handlers.values().filter(|cell| cell.initialized()).count()
    }
}

#[async_trait]
impl HandlerFactory for CachingFactory {
    fn model_class(&self) -> &str {
        self.inner.model_class()
    }

    async fn resolve(&self, spec: HandlerSpec) -> HandlerResult<SharedHandler> {
        let Some(project_id) = spec.project_id.clone() else {
            return self.inner.resolve(spec).await;
        };

        // Hold the map lock only long enough to find the project's slot
        let cell = {
            let mut handlers = self.handlers.lock().await;
            handlers.entry(project_id).or_default().clone()
        };

        let handler = cell.get_or_try_init(|| self.inner.resolve(spec)).await?;
        Ok(handler.clone())
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
