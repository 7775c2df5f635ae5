//! Session establishment
//!
//! - `bootstrap`: load a cached session or create one through the service
//! - `cache`: in-process session cache keyed by (token, proxy)

pub mod bootstrap;
pub mod cache;

pub use bootstrap::{BootstrapOutcome, SessionBootstrapper};
pub use cache::{create_cache, MemorySessionCache, NoopSessionCache, SessionCache, SessionCacheKind};
