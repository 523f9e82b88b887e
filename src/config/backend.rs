use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

use crate::constants::DEFAULT_SCHEMA;
use crate::Error;
use crate::Result;

/// Hosted backend location.
///
/// Both `url` and `anon_key` may be absent; the resulting
/// [`BackendClient`](crate::BackendClient) is then `Unconfigured` rather
/// than failing validation, so the dashboard can still render offline.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`
    #[serde(default)]
    pub url: Option<String>,

    /// Public (anon) API key
    #[serde(default)]
    pub anon_key: Option<String>,

    /// Postgres schema the watched tables live in
    #[serde(default = "default_schema")]
    pub schema: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            schema: default_schema(),
        }
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<()> {
        if self.schema.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message("backend.schema cannot be empty".into())));
        }

        if let Some(raw) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            let url = Url::parse(raw)
                .map_err(|e| Error::Config(ConfigError::Message(format!("backend.url '{raw}' is invalid: {e}"))))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::Config(ConfigError::Message(format!(
                    "backend.url must use http or https, got '{}'",
                    url.scheme()
                ))));
            }
        }

        Ok(())
    }
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}
