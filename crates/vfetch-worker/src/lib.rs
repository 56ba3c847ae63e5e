//! Job pipeline for vfetch.
//!
//! - [`fetch`]: retrieval, artifact watch and packaging hand-off
//! - [`packaging`]: supervised HLS packaging
//! - [`rotation`]: in-place artifact rotation
//! - [`retention`]: periodic expiry of old jobs
//! - [`service`]: the [`JobService`] facade used by the HTTP layer

pub mod config;
pub mod error;
pub mod fetch;
pub mod layout;
pub mod logging;
pub mod metrics;
pub mod packaging;
pub mod retention;
pub mod rotation;
pub mod service;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use fetch::{FetchOutcome, FetchRequest, FetchWorker};
pub use layout::JobLayout;
pub use logging::{JobLogger, Stage};
pub use packaging::PackagingStage;
pub use retention::{RetentionSweeper, SweepReport};
pub use rotation::RotationOperator;
pub use service::JobService;
