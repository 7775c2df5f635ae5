//! Remote service client
//!
//! - `caller`: one validated POST through a proxy
//! - `rotation`: round-robin choice of the ping endpoint

pub mod caller;
pub mod rotation;

pub use caller::{ApiCaller, CallerConfig, HttpApiCaller};
pub use rotation::EndpointRotator;
