//! Realtime cache synchronisation for the medical-equipment dashboard.
//!
//! Listens to row changes on the hosted Postgres backend over one realtime
//! channel and keeps the dashboard's query cache fresh: changes are mapped
//! to cache-key prefixes, debounced per prefix, and turned into
//! invalidate + refetch calls. A supervisor task reconnects with capped
//! exponential backoff and publishes the connection status for the UI.
//!
//! ```ignore
//! let handle = RealtimeBuilder::new(None, cache)?.start()?;
//! let mut status = handle.subscribe();
//! while status.changed().await.is_ok() {
//!     render_badge(status.borrow().status);
//! }
//! ```

mod backend;
mod builder;
mod cache;
mod channel;
mod config;
mod constants;
mod errors;
mod model;
mod notify;
mod router;
mod status;
mod supervisor;
mod transport;

pub use backend::*;
pub use builder::*;
pub use cache::*;
pub use channel::*;
pub use config::*;
pub use errors::*;
pub use model::*;
pub use notify::*;
pub use router::*;
pub use status::*;
pub use transport::*;


//-----------------------------------------------------------
// Test utils
