//! Prometheus counters for the activity gate.
//!
//! The gate itself stays side-effect free; callers record the outcome they
//! observed through the helpers in [`activity`].

use once_cell::sync::OnceCell;
use std::fmt;

use crate::error::{ActivityError, Result};

/// All metric names used by the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    ActivitiesAccepted,
    ActivitiesRejected,
    ActivityWriteErrors,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::ActivitiesAccepted => "shop_activity_accepted_total",
            MetricName::ActivitiesRejected => "shop_activity_rejected_total",
            MetricName::ActivityWriteErrors => "shop_activity_write_errors_total",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        [
            MetricName::ActivitiesAccepted,
            MetricName::ActivitiesRejected,
            MetricName::ActivityWriteErrors,
        ]
        .into_iter()
    }

    /// Human readable description, used for `describe_counter!`
    pub fn description(&self) -> &'static str {
        match self {
            MetricName::ActivitiesAccepted => "Activities stored, labelled by canonical kind",
            MetricName::ActivitiesRejected => "Activities rejected for an unrecognized type",
            MetricName::ActivityWriteErrors => "Activities whose storage write failed",
        }
    }
}

static METRICS_HANDLE: OnceCell<metrics_exporter_prometheus::PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Calling it again is a no-op.
pub fn init() -> Result<()> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| ActivityError::Config(format!("Failed to install Prometheus recorder: {}", e)))?;
        for name in MetricName::all_metrics() {
            ::metrics::describe_counter!(name.as_str(), name.description());
        }
        Ok::<_, ActivityError>(handle)
    })?;
    Ok(())
}

/// Render the current metrics in Prometheus text format, if initialized
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

pub mod activity {
    use super::MetricName;
    use crate::domain::ActivityKind;

    pub fn accepted(kind: ActivityKind) {
        ::metrics::counter!(MetricName::ActivitiesAccepted.as_str(), "kind" => kind.as_str()).increment(1);
    }

    pub fn rejected() {
        ::metrics::counter!(MetricName::ActivitiesRejected.as_str()).increment(1);
    }

    pub fn write_error() {
        ::metrics::counter!(MetricName::ActivityWriteErrors.as_str()).increment(1);
    }
}
