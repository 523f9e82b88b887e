//! Assembles and starts the realtime synchronisation layer.
//!
//! ## Example
//! ```ignore
//! let handle = RealtimeBuilder::new(Some("realtime.toml"), cache)?
//!     .notifier(Arc::new(ToastBridge::new(ui)))
//!     .start()?;
//!
//! handle.set_visibility(Visibility::Hidden).await?;
//! ```
//!
//! Without an explicit [`transport`](RealtimeBuilder::transport) the
//! builder connects to the configured backend over the Phoenix websocket
//! protocol, which requires `backend.url` and `backend.anon_key`.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::supervisor::Supervisor;
use crate::BackendClient;
use crate::ChangeTransport;
use crate::InvalidationRouter;
use crate::Notifier;
use crate::PhoenixTransport;
use crate::QueryCache;
use crate::RealtimeConfig;
use crate::RealtimeHandle;
use crate::Result;
use crate::SubscribeRequest;
use crate::TracingNotifier;

pub struct RealtimeBuilder {
    config: RealtimeConfig,
    cache: Arc<dyn QueryCache>,
    transport: Option<Arc<dyn ChangeTransport>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl RealtimeBuilder {
    /// Loads configuration from defaults, `CONFIG_PATH` and the environment,
    /// then applies `config_path` on top when given.
    pub fn new(
        config_path: Option<&str>,
        cache: Arc<dyn QueryCache>,
    ) -> Result<Self> {
        let mut config = RealtimeConfig::new()?;
        if let Some(path) = config_path {
            info!("with_override_config from: {}", path);
            config = config.with_override_config(path)?;
        }
        Ok(Self::from_config(config, cache))
    }

    pub fn from_config(
        config: RealtimeConfig,
        cache: Arc<dyn QueryCache>,
    ) -> Self {
        Self {
            config,
            cache,
            transport: None,
            notifier: None,
        }
    }

    /// Sets a custom change transport
    pub fn transport(
        mut self,
        transport: Arc<dyn ChangeTransport>,
    ) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets where INSERT toasts go; defaults to [`TracingNotifier`]
    pub fn notifier(
        mut self,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Validates the configuration and spawns the supervisor.
    ///
    /// Must be called inside a tokio runtime. The first connection attempt
    /// starts immediately.
    pub fn start(self) -> Result<RealtimeHandle> {
        let config = self.config.validate()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let backend = BackendClient::from_config(&config.backend);
                Arc::new(PhoenixTransport::new(backend.handle()?, &config.channel)?)
            }
        };
        let notifier = self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier));

        let router = InvalidationRouter::new(self.cache, notifier, &config.invalidation);
        let request = SubscribeRequest {
            topic: config.channel.topic.clone(),
            schema: config.backend.schema.clone(),
            tables: config.channel.table_ids(),
        };

        let (supervisor, handle) = Supervisor::new(
            transport,
            request,
            Duration::from_millis(config.channel.subscribe_timeout_ms),
            config.reconnect,
            router,
            config.channel.event_buffer,
        );
        supervisor.spawn();

        info!(
            topic = %config.channel.topic,
            tables = config.channel.tables.len(),
            "realtime synchronisation started"
        );
        Ok(handle)
    }
}
