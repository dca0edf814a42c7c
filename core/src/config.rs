//! Client configuration, loaded once and shared by every mapper.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://api.getport.io";

/// Immutable client configuration, built once and shared by every mapper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Bearer token sent as `Authorization`. Obtaining it is the caller's job.
    pub token: Option<String>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            user_agent: concat!("port-core/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
        .normalized()
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Load configuration from defaults, an optional `port-client` file, and
    /// `PORT_*` environment variables (e.g. `PORT_BASE_URL`, `PORT_TOKEN`).
    pub fn load() -> Result<Self, ApiError> {
        let mut builder = ::config::Config::builder();

        builder = builder.add_source(::config::Config::try_from(&ClientConfig::default())?);

        builder = builder.add_source(::config::File::with_name("port-client").required(false));

        builder = builder.add_source(
            ::config::Environment::with_prefix("PORT")
                .prefix_separator("_")
                .try_parsing(false),
        );

        let loaded: ClientConfig = builder.build()?.try_deserialize()?;
        if loaded.base_url.trim().is_empty() {
            return Err(ApiError::Config("base_url must not be empty".to_string()));
        }
        Ok(loaded.normalized())
    }

    fn normalized(mut self) -> Self {
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self
    }
}
