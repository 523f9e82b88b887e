//! Handle to the hosted backend (REST, RPC and realtime endpoints).
//!
//! The handle is built once from configuration and injected where it is
//! needed. A missing URL or key yields [`BackendClient::Unconfigured`]
//! instead of a nullable global, so every caller decides what "offline"
//! means for it.

use tracing::warn;
use url::Url;

use crate::constants::PROTOCOL_VSN;
use crate::constants::REALTIME_PATH;
use crate::constants::REST_PATH;
use crate::constants::RPC_PATH;
use crate::BackendConfig;
use crate::BackendError;
use crate::Result;

#[derive(Debug, Clone)]
pub enum BackendClient {
    Unconfigured { reason: String },
    Ready(BackendHandle),
}

impl BackendClient {
    pub fn from_config(config: &BackendConfig) -> Self {
        let url = config.url.as_deref().map(str::trim).filter(|u| !u.is_empty());
        let key = config.anon_key.as_deref().map(str::trim).filter(|k| !k.is_empty());

        match (url, key) {
            (Some(url), Some(key)) => match BackendHandle::new(url, key, &config.schema) {
                Ok(handle) => BackendClient::Ready(handle),
                Err(e) => {
                    warn!(%url, ?e, "backend url rejected");
                    BackendClient::Unconfigured { reason: e.to_string() }
                }
            },
            (None, _) => BackendClient::Unconfigured {
                reason: "backend.url is not set".to_string(),
            },
            (_, None) => BackendClient::Unconfigured {
                reason: "backend.anon_key is not set".to_string(),
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, BackendClient::Ready(_))
    }

    /// The ready handle, or `BackendError::Unconfigured`
    pub fn handle(&self) -> Result<&BackendHandle> {
        match self {
            BackendClient::Ready(handle) => Ok(handle),
            BackendClient::Unconfigured { reason } => Err(BackendError::Unconfigured(reason.clone()).into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendHandle {
    base_url: Url,
    anon_key: String,
    schema: String,
}

impl BackendHandle {
    pub fn new(
        url: &str,
        anon_key: &str,
        schema: &str,
    ) -> Result<Self> {
        let base_url = Url::parse(url).map_err(BackendError::from)?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(BackendError::InvalidUrl(format!("unsupported scheme '{}'", base_url.scheme())).into());
        }
        if base_url.cannot_be_a_base() || base_url.host_str().is_none() {
            return Err(BackendError::InvalidUrl(url.to_string()).into());
        }

        Ok(Self {
            base_url,
            anon_key: anon_key.to_string(),
            schema: schema.to_string(),
        })
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `wss://<host>/realtime/v1/websocket?apikey=<key>&vsn=1.0.0`
    pub fn realtime_url(&self) -> Result<Url> {
        let mut url = self.endpoint(REALTIME_PATH);
        let scheme = if self.base_url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| BackendError::InvalidUrl(format!("cannot switch {} to {scheme}", self.base_url)))?;
        url.query_pairs_mut()
            .append_pair("apikey", &self.anon_key)
            .append_pair("vsn", PROTOCOL_VSN);
        Ok(url)
    }

    pub fn rest_url(
        &self,
        table: &str,
    ) -> Url {
        self.endpoint(&format!("{REST_PATH}/{table}"))
    }

    pub fn rpc_url(
        &self,
        function: &str,
    ) -> Url {
        self.endpoint(&format!("{RPC_PATH}/{function}"))
    }

    fn endpoint(
        &self,
        path: &str,
    ) -> Url {
        let mut url = self.base_url.clone();
        let base_path = self.base_url.path().trim_end_matches('/');
        url.set_path(&format!("{base_path}/{path}"));
        url.set_query(None);
        url.set_fragment(None);
        url
    }
}
