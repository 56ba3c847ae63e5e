//! Shared data models for the vfetch job pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs, job IDs and the status state machine
//! - Packaging outcome tracking
//! - Rotation angles and their transform descriptors
//! - Input validation for source URLs and job file names

pub mod error;
pub mod job;
pub mod rotation;
pub mod serde_utils;
pub mod utils;

use std::collections::HashMap;

pub use error::{ModelError, ModelResult};
pub use job::{Job, JobId, JobStatus, PackagingStatus};
pub use rotation::RotationAngle;
pub use utils::{validate_file_name, validate_source_url};

/// The full job mapping persisted as one snapshot.
pub type JobMap = HashMap<JobId, Job>;
