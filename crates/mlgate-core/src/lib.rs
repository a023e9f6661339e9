//! # mlgate core
//!
//! The model-lifecycle contract of the gateway: the [`ModelHandler`]
//! capability, handler factories keyed by project identity, and the
//! normalization of platform requests and prediction responses.

pub mod error;
pub mod factory;
pub mod handler;
pub mod project;
pub mod request;
pub mod response;

pub use error::{CoreError, HandlerError, HandlerResult, Result};
pub use factory::{CachingFactory, FnFactory, HandlerFactory, SharedFactory};
pub use handler::{HandlerSpec, ModelHandler, Params, SharedHandler, Task, TrainEvent};
pub use project::ProjectId;
pub use request::{PredictRequest, SetupRequest, WebhookRequest};
pub use response::{
    ModelResponse, PredictOutput, Prediction, PredictionEnvelope, PredictionValue,
    normalize_predictions,
};
