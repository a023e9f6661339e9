use clap::Parser;
use mlgate::{CachingFactory, InMemoryProjectStore, MajorityLabelModel};
use mlgate_api::{ApiConfig, AppState, build_app};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// mlgate API Server
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Host address to bind to
    #[arg(short = 'H', long, env = "MLGATE_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "MLGATE_PORT")]
    port: Option<u16>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "MLGATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Config file path
    #[arg(short, long, env = "MLGATE_CONFIG")]
    config_file: Option<PathBuf>,

    /// Basic auth username
    #[arg(long, env = "BASIC_AUTH_USER")]
    basic_auth_user: Option<String>,

    /// Basic auth password
    #[arg(long, env = "BASIC_AUTH_PASS", hide_env_values = true)]
    basic_auth_pass: Option<String>,

    /// Secret required by the /custom_inference smoke test
    #[arg(long, env = "CUSTOM_INFERENCE_SECRET", hide_env_values = true)]
    custom_inference_secret: Option<String>,

    /// Keep one handler per project
    #[arg(long, env = "MLGATE_CACHE_HANDLERS")]
    cache_handlers: Option<bool>,

    /// Disable Swagger UI
    #[arg(long, env = "MLGATE_DISABLE_SWAGGER", default_value_t = false)]
    disable_swagger: bool,
}

impl Cli {
    fn apply(self, config: &mut ApiConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }
        if let Some(username) = self.basic_auth_user {
            config.auth.username = Some(username);
        }
        if let Some(password) = self.basic_auth_pass {
            config.auth.password = Some(password);
        }
        if let Some(secret) = self.custom_inference_secret {
            config.auth.inference_secret = Some(secret);
        }
        if let Some(cache_handlers) = self.cache_handlers {
            config.cache_handlers = cache_handlers;
        }
        if self.disable_swagger {
            config.enable_swagger = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration, then override with CLI/env options
    let config_file = cli.config_file.clone();
    let mut config = ApiConfig::load(config_file.as_deref())?;
    cli.apply(&mut config);

    // Initialize logging
    let filter = format!(
        "mlgate_api={level},mlgate={level},tower_http=debug",
        level = config.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(path) = &config_file {
        info!("Configuration loaded from: {}", path.display());
    }

    let addr = config.socket_addr()?;

    // Bind the bundled handler on top of a process-wide project store
    let store = Arc::new(InMemoryProjectStore::new());
    let mut factory = MajorityLabelModel::factory(store, config.model.clone());
    if config.cache_handlers {
        factory = Arc::new(CachingFactory::new(factory));
    }
    let model_class = factory.model_class().to_string();
    let state = AppState::new(factory, config.clone());

    // Build application
    let app = build_app(state);

    // Start server
    info!("Starting server on: {}", addr);
    info!("Model class: {}", model_class);
    if config.enable_swagger {
        info!("Swagger UI: http://{}/swagger-ui", addr);
    }
    info!(
        "Basic authentication: {}",
        if config.auth.enabled() {
            "ENABLED"
        } else {
            "DISABLED"
        }
    );
    info!(
        "Handler caching: {}",
        if config.cache_handlers {
            "ENABLED"
        } else {
            "DISABLED"
        }
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
