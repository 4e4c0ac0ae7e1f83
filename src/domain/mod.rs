pub mod activity;

pub use activity::{activity_aliases, ActivityEvent, ActivityKind, Metadata};
