pub mod app;
pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod logging;
pub mod observability;
pub mod storage;

pub use app::ActivityLogger;
pub use domain::{ActivityEvent, ActivityKind, Metadata};
pub use error::{ActivityError, Result};
