pub mod log_activity_use_case;

pub use log_activity_use_case::ActivityLogger;
