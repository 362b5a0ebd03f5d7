//! Configuration manager for jwtauth.

use std::fs::File;
use std::path::{Path, PathBuf};

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_TTL: i64 = 60 * 60 * 24 * 7; // 7 days.
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Socket address to listen on.
    pub address: String,
    #[serde(skip_deserializing)]
    version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to JsonWebToken configuration.
    #[serde(skip_serializing)]
    pub token: Token,
    /// Attributes of the `token` cookie.
    pub cookie: Cookie,
    /// Expose Prometheus metrics on `/metrics`.
    pub metrics: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: env!("CARGO_CRATE_NAME").to_owned(),
            address: DEFAULT_ADDRESS.to_owned(),
            version: VERSION.to_owned(),
            path: PathBuf::default(),
            token: Token::default(),
            cookie: Cookie::default(),
            metrics: false,
        }
    }
}

/// Json Web Token configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Token {
    /// Shared secret keying the MAC.
    pub secret: String,
    /// Default session duration, in seconds.
    pub ttl: i64,
    /// Algorithm of issued tokens. Must be HMAC based.
    pub algorithm: Algorithm,
}

impl Default for Token {
    fn default() -> Self {
        Self {
            secret: String::default(),
            ttl: DEFAULT_TTL,
            algorithm: Algorithm::HS256,
        }
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("secret", &"[redacted]")
            .field("ttl", &self.ttl)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// `SameSite` cookie attribute.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

/// Session cookie attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cookie {
    pub path: String,
    /// Only send the cookie over HTTPS.
    pub secure: bool,
    /// Hide the cookie from scripts.
    pub http_only: bool,
    pub same_site: SameSite,
}

impl Default for Cookie {
    fn default() -> Self {
        Self {
            path: "/".to_owned(),
            secure: false,
            http_only: true,
            same_site: SameSite::default(),
        }
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Application version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Self {
        let file_path = if self.path.is_file() {
            &self.path
        } else {
            &Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        match File::open(file_path) {
            Ok(file) => {
                let mut config: Configuration =
                    match serde_yaml::from_reader(file) {
                        Ok(config) => config,
                        Err(err) => {
                            return self.error(err);
                        },
                    };

                // set app version.
                config.version = VERSION.to_owned();
                config.path = file_path.to_owned();

                config
            },
            Err(err) => self.error(err),
        }
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found");
        Self::default()
    }

    /// Override the configured secret when `secret` is set and not empty.
    pub fn with_secret(mut self, secret: Option<String>) -> Self {
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            self.token.secret = secret;
        }
        self
    }
}
