//! HTTP handlers.

pub mod health;
pub mod jobs;
pub mod media;

pub use health::*;
pub use jobs::*;
pub use media::*;
