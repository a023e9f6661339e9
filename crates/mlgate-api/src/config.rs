use mlgate::MajorityConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::middleware::auth::BasicCredentials;

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Host address
    pub host: String,

    /// Port number
    pub port: u16,

    /// CORS configuration
    pub cors: CorsConfig,

    /// Log level
    pub log_level: String,

    /// Enable Swagger UI
    pub enable_swagger: bool,

    /// Keep one handler per project instead of constructing one per request
    pub cache_handlers: bool,

    /// Basic authentication
    pub auth: AuthConfig,

    /// Bundled model settings
    pub model: MajorityConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9090,
            cors: CorsConfig::default(),
            log_level: "info".to_string(),
            enable_swagger: true,
            cache_handlers: false,
            auth: AuthConfig::default(),
            model: MajorityConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Convert to SocketAddr
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("Invalid address {}: {}", addr, e))
    }

    /// Load from configuration file
    pub fn load_from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))
    }

    /// Defaults when no file is given, otherwise the file's contents.
    ///
    /// A file that is given but cannot be read or parsed is an error.
    pub fn load(path: Option<&std::path::Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path)
                .map_err(|e| anyhow::anyhow!("{} ({})", e, path.display())),
            None => Ok(Self::default()),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins
    pub allowed_origins: Vec<String>,

    /// Allow any origin
    pub allow_any_origin: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            allow_any_origin: true, // Default to true for development
        }
    }
}

/// Authentication configuration
///
/// Basic auth protection is on only when both username and password are set.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,

    /// `?secret=` value required by `/custom_inference`; the route is closed without it
    pub inference_secret: Option<String>,
}

impl AuthConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            inference_secret: None,
        }
    }

    pub fn with_inference_secret(mut self, secret: impl Into<String>) -> Self {
        self.inference_secret = Some(secret.into());
        self
    }

    pub fn enabled(&self) -> bool {
        self.credentials().is_some()
    }

    /// Credentials to enforce, if protection is configured
    pub fn credentials(&self) -> Option<BasicCredentials> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(BasicCredentials::new(username, password))
            }
            _ => None,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("inference_secret", &self.inference_secret.as_ref().map(|_| "***"))
            .finish()
    }
}
