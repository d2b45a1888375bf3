//! Telemetry acquisition.
//!
//! A [`Poller`] turns source queries into published values. It is used in two
//! places:
//!
//! - inline, by the render loop, once per frame ([`Scheduling::Inline`](crate::config::Scheduling))
//! - by the repeating tasks of the [`AcquisitionRuntime`]
//!
//! # Publish Policies
//!
//! | Policy | A query returns `None` |
//! |--------|------------------------|
//! | [`PublishPolicy::AllOrNothing`] | Nothing from the batch is published |
//! | [`PublishPolicy::PerMetric`] | Only that metric keeps its previous value |
//!
//! In both cases a failed read never clears or changes a published value.

mod runtime;

use std::sync::Arc;

use tracing::trace;

pub use runtime::AcquisitionRuntime;

use crate::config::PublishPolicy;
use crate::metric::Metric;
use crate::source::SharedConnection;
use crate::telemetry::TelemetryState;

/// Queries a connection and publishes into the shared telemetry state.
#[derive(Clone)]
pub struct Poller {
    connection: SharedConnection,
    telemetry: Arc<TelemetryState>,
    policy: PublishPolicy,
}

impl Poller {
    pub const fn new(
        connection: SharedConnection,
        telemetry: Arc<TelemetryState>,
        policy: PublishPolicy,
    ) -> Self {
        Self {
            connection,
            telemetry,
            policy,
        }
    }

    /// Query one metric and publish it on success.
    pub fn poll_metric(
        &self,
        metric: Metric,
    ) -> bool {
        let reading = self.connection.lock().query(metric);
        match reading {
            Some(value) => {
                self.telemetry.publish(metric, value);
                true
            }
            None => {
                trace!(%metric, "No reading");
                false
            }
        }
    }

    /// Query every metric back to back, then publish according to the policy.
    ///
    /// Returns the number of values published.
    pub fn poll_batch(
        &self,
        metrics: &[Metric],
    ) -> usize {
        let mut readings = [None; Metric::COUNT];
        {
            let mut source = self.connection.lock();
            for &metric in metrics {
                readings[metric.index()] = source.query(metric);
            }
        }

        let complete = metrics.iter().all(|m| readings[m.index()].is_some());
        if self.policy == PublishPolicy::AllOrNothing && !complete {
            trace!(metrics = metrics.len(), "Incomplete batch dropped");
            return 0;
        }

        let mut published = 0;
        for &metric in metrics {
            if let Some(value) = readings[metric.index()] {
                self.telemetry.publish(metric, value);
                published += 1;
            }
        }
        published
    }

    #[inline]
    pub const fn connection(&self) -> &SharedConnection { &self.connection }
}
