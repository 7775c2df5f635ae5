//! Long-running services

pub mod driver;
pub mod pipeline;
pub mod shutdown;
pub mod status_report;

pub use driver::{DriverConfig, FanOutDriver, RoundReport, TokenDriver};
pub use pipeline::{PipelineExit, ProxyPipeline};
pub use shutdown::ShutdownHandle;
pub use status_report::StatusReporter;
