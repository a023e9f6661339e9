//! Application layer for mlgate
//!
//! Provides the per-project state store that model handlers keep between
//! requests, and the handlers bundled with the gateway binary.

pub mod models;
pub mod store;

// Re-export core types
pub use mlgate_core::{
    CachingFactory, CoreError, FnFactory, HandlerError, HandlerFactory, HandlerResult,
    HandlerSpec, ModelHandler, ModelResponse, Params, PredictOutput, PredictRequest, Prediction,
    PredictionEnvelope, PredictionValue, ProjectId, SetupRequest, SharedFactory, SharedHandler,
    Task, TrainEvent, WebhookRequest, normalize_predictions,
};

pub use models::{MajorityConfig, MajorityLabelModel};
pub use store::{InMemoryProjectStore, ProjectStore, StoreError};

/// Prelude module for convenient imports
pub mod prelude {
    pub use mlgate_core::{
        HandlerResult, HandlerSpec, ModelHandler, ModelResponse, Params, PredictOutput, Task,
        TrainEvent,
    };
}
