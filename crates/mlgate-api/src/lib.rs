use axum::{
    Router,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
};
use mlgate::SharedFactory;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

pub use config::{ApiConfig, AuthConfig, CorsConfig};
pub use error::{ApiError, ApiResult};
pub use middleware::auth::BasicCredentials;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Builds (or returns the cached) handler for each request
    pub factory: SharedFactory,
    pub config: Arc<ApiConfig>,
    credentials: Option<Arc<BasicCredentials>>,
}

impl AppState {
    pub fn new(factory: SharedFactory, config: ApiConfig) -> Self {
        let credentials = config.auth.credentials().map(Arc::new);
        Self {
            factory,
            config: Arc::new(config),
            credentials,
        }
    }

    /// Credentials enforced by the auth middleware, if any
    pub fn credentials(&self) -> Option<&BasicCredentials> {
        self.credentials.as_deref()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::metrics::metrics,
        crate::routes::custom_inference::custom_inference,
        crate::routes::predict::predict,
        crate::routes::setup::setup,
        crate::routes::webhook::webhook,
    ),
    components(
        schemas(
            crate::routes::health::HealthResponse,
            crate::routes::setup::SetupResponse,
            crate::routes::webhook::WebhookResponse,
            crate::routes::custom_inference::CustomInferenceResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Liveness and metrics"),
        (name = "model", description = "Prediction, setup and training webhooks")
    )
)]
pub struct ApiDoc;

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allow_any_origin {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build API application
pub fn build_app(state: AppState) -> Router {
    let mut router = Router::new().merge(routes::routes());
    if state.config.enable_swagger {
        router = router
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    router
        .layer(from_fn_with_state(state.clone(), middleware::auth::auth_middleware))
        .layer(from_fn(middleware::logging::log_request))
        .layer(cors_layer(&state.config.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
