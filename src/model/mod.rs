mod cache_key;
mod event;
mod table;

pub use cache_key::*;
pub use event::*;
pub use table::*;
