//! Tokio runtime for background acquisition.
//!
//! Each [`PollGroup`] of the profile runs as its own repeating task with its own
//! interval. Tasks never talk to each other; the only thing they share is the
//! [`TelemetryState`] they publish into and the connection slot they query.
//!
//! # Reconnect
//!
//! When the profile carries a [`ReconnectPlan`], a one-shot task waits for the
//! delay and then changes the transport speed:
//!
//! 1. stop the groups marked `restart_on_reconnect`
//! 2. close the current connection
//! 3. pause
//! 4. connect at the new speed and put the new handle into the shared slot
//! 5. restart the stopped groups
//!
//! Groups that are not restarted keep ticking throughout; they read "no data"
//! while the slot holds the closed connection and pick up the new handle on
//! their next tick. A failed connect is logged and left alone: nothing is
//! retried, stopped groups stay stopped and every value keeps its last reading.
//!
//! # Shutdown
//!
//! All tasks, including a pending reconnect, listen on a broadcast channel.
//! [`AcquisitionRuntime::shutdown`] signals it and drops the runtime without
//! waiting for tasks to drain.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio::sync::broadcast;
use tokio::task::{self, JoinHandle};
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, info, trace, warn};

use super::Poller;
use crate::config::{PollGroup, Profile, ReconnectPlan, Scheduling};
use crate::error::PanelError;
use crate::source::{Connector, SharedConnection};
use crate::telemetry::TelemetryState;

/// Background acquisition tasks and the runtime that drives them.
pub struct AcquisitionRuntime {
    /// Shutdown signal sender
    shutdown_tx: broadcast::Sender<()>,

    /// Runtime owning every task
    runtime: Runtime,
}

impl AcquisitionRuntime {
    /// Spawn the polling groups (background scheduling only) and the reconnect task.
    pub fn start(
        profile: &Profile,
        connector: Arc<dyn Connector>,
        connection: SharedConnection,
        telemetry: Arc<TelemetryState>,
    ) -> Result<Self, PanelError> {
        let groups = match profile.scheduling {
            Scheduling::Background => profile.groups.clone(),
            Scheduling::Inline => Vec::new(),
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(groups.len().max(1) + 1)
            .enable_time()
            .thread_name("acquisition-worker")
            .build()
            .map_err(PanelError::Runtime)?;

        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let poller = Poller::new(connection, telemetry, profile.publish);

        let mut restartable = Vec::new();
        let mut handles = Vec::new();
        for group in groups {
            info!(group = group.name, interval = ?group.interval, "Starting poll group");
            let handle = runtime.spawn(poll_group_task(group.clone(), poller.clone(), shutdown_tx.subscribe()));
            if group.restart_on_reconnect {
                restartable.push(group);
                handles.push(handle);
            }
        }

        if let Some(plan) = profile.reconnect {
            info!(delay = ?plan.delay, speed = plan.speed, "Scheduling reconnect");
            runtime.spawn(reconnect_task(
                plan,
                restartable,
                handles,
                poller,
                connector,
                shutdown_tx.clone(),
            ));
        }

        Ok(Self { shutdown_tx, runtime })
    }

    /// Signal every task and drop the runtime without draining.
    pub fn shutdown(self) {
        info!("Stopping acquisition");
        // Send only fails when every task has already exited
        let _ = self.shutdown_tx.send(());
        self.runtime.shutdown_background();
    }
}

/// Poll one group of metrics at its interval until shutdown.
async fn poll_group_task(
    group: PollGroup,
    poller: Poller,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(group.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let published = task::block_in_place(|| poller.poll_batch(&group.metrics));
                trace!(group = group.name, published, "Poll");
            }
            _ = shutdown.recv() => {
                debug!(group = group.name, "Poll group shutting down");
                break;
            }
        }
    }
}

/// Sleep that returns `false` if shutdown arrives first.
async fn sleep_or_shutdown(
    duration: Duration,
    shutdown: &mut broadcast::Receiver<()>,
) -> bool {
    tokio::select! {
        () = sleep(duration) => true,
        _ = shutdown.recv() => false,
    }
}

/// One-shot transport speed change.
async fn reconnect_task(
    plan: ReconnectPlan,
    restartable: Vec<PollGroup>,
    handles: Vec<JoinHandle<()>>,
    poller: Poller,
    connector: Arc<dyn Connector>,
    shutdown_tx: broadcast::Sender<()>,
) {
    let mut shutdown = shutdown_tx.subscribe();
    if !sleep_or_shutdown(plan.delay, &mut shutdown).await {
        debug!("Reconnect cancelled");
        return;
    }

    for handle in &handles {
        handle.abort();
    }
    let connection = poller.connection().clone();
    task::block_in_place(|| connection.lock().close());
    info!(speed = plan.speed, "Connection closed for speed change");

    if !sleep_or_shutdown(plan.pause, &mut shutdown).await {
        debug!("Reconnect cancelled");
        return;
    }

    match task::block_in_place(|| connector.connect(Some(plan.speed))) {
        Ok(source) => {
            *connection.lock() = source;
            info!(speed = plan.speed, groups = restartable.len(), "Reconnected");
            for group in restartable {
                tokio::spawn(poll_group_task(group, poller.clone(), shutdown_tx.subscribe()));
            }
        }
        Err(e) => warn!(speed = plan.speed, error = %e, "Reconnect failed, keeping last readings"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;
    use crate::acquisition::testing::ScriptedSource;
    use crate::config::PublishPolicy;
    use crate::error::SourceError;
    use crate::metric::Metric;
    use crate::source::{SourceHandle, share};

    /// Connector that hands out scripted sources and counts attempts.
    struct TestConnector {
        attempts: AtomicUsize,
        fail: bool,
        value: f64,
    }

    impl Connector for TestConnector {
        fn connect(
            &self,
            speed: Option<u32>,
        ) -> Result<SourceHandle, SourceError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SourceError::NoAdapter);
            }
            let mut source = ScriptedSource::new(Some(self.value));
            source.speed = speed;
            Ok(Box::new(source))
        }
    }

    fn connector(
        fail: bool,
        value: f64,
    ) -> Arc<TestConnector> {
        Arc::new(TestConnector {
            attempts: AtomicUsize::new(0),
            fail,
            value,
        })
    }

    fn group(
        name: &'static str,
        metrics: Vec<Metric>,
        interval_ms: u64,
        restart: bool,
    ) -> PollGroup {
        PollGroup {
            name,
            metrics,
            interval: Duration::from_millis(interval_ms),
            restart_on_reconnect: restart,
        }
    }

    fn background_profile(
        groups: Vec<PollGroup>,
        reconnect: Option<ReconnectPlan>,
    ) -> Profile {
        Profile {
            name: "test",
            metrics: Metric::ALL.to_vec(),
            scheduling: Scheduling::Background,
            publish: PublishPolicy::PerMetric,
            groups,
            reconnect,
            fps: 60,
        }
    }

    #[test]
    fn test_groups_poll_at_independent_cadences() {
        let telemetry = Arc::new(TelemetryState::new());
        let connection = share(Box::new(ScriptedSource::new(Some(1.0))));
        let profile = background_profile(
            vec![
                group("fast", vec![Metric::Rpm], 5, false),
                group("slow", vec![Metric::CoolantTemperature], 10_000, false),
            ],
            None,
        );

        let runtime =
            AcquisitionRuntime::start(&profile, connector(false, 1.0), connection, Arc::clone(&telemetry)).unwrap();
        thread::sleep(Duration::from_millis(200));
        runtime.shutdown();

        assert!(telemetry.update_count(Metric::Rpm) > 5, "Fast group should poll many times");
        assert_eq!(
            telemetry.update_count(Metric::CoolantTemperature),
            1,
            "Slow group polls once immediately, then waits its interval"
        );
        assert_eq!(telemetry.update_count(Metric::Speed), 0, "Speed is in no group");
    }

    #[test]
    fn test_inline_profile_spawns_no_groups() {
        let telemetry = Arc::new(TelemetryState::new());
        let connection = share(Box::new(ScriptedSource::new(Some(1.0))));
        let mut profile = background_profile(vec![group("fast", vec![Metric::Rpm], 5, false)], None);
        profile.scheduling = Scheduling::Inline;

        let runtime =
            AcquisitionRuntime::start(&profile, connector(false, 1.0), connection, Arc::clone(&telemetry)).unwrap();
        thread::sleep(Duration::from_millis(50));
        runtime.shutdown();

        assert_eq!(telemetry.update_count(Metric::Rpm), 0, "Inline polling belongs to the render loop");
    }

    #[test]
    fn test_shutdown_stops_polling() {
        let telemetry = Arc::new(TelemetryState::new());
        let connection = share(Box::new(ScriptedSource::new(Some(1.0))));
        let profile = background_profile(vec![group("fast", vec![Metric::Rpm], 2, false)], None);

        let runtime =
            AcquisitionRuntime::start(&profile, connector(false, 1.0), connection, Arc::clone(&telemetry)).unwrap();
        thread::sleep(Duration::from_millis(50));
        runtime.shutdown();
        // A poll already inside block_in_place may still finish
        thread::sleep(Duration::from_millis(10));

        let after_shutdown = telemetry.update_count(Metric::Rpm);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(telemetry.update_count(Metric::Rpm), after_shutdown, "No polls after shutdown");
    }

    #[test]
    fn test_reconnect_swaps_connection_speed() {
        let telemetry = Arc::new(TelemetryState::new());
        let connection = share(Box::new(ScriptedSource::new(Some(1.0))));
        let connector = connector(false, 2.0);
        let plan = ReconnectPlan {
            delay: Duration::from_millis(30),
            pause: Duration::from_millis(10),
            speed: 115_200,
        };
        let profile = background_profile(
            vec![
                group("rpm", vec![Metric::Rpm], 2, true),
                group("temperatures", vec![Metric::OilTemperature], 2, false),
            ],
            Some(plan),
        );

        let runtime = AcquisitionRuntime::start(
            &profile,
            connector.clone(),
            Arc::clone(&connection),
            Arc::clone(&telemetry),
        )
        .unwrap();
        thread::sleep(Duration::from_millis(250));
        runtime.shutdown();

        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1, "Reconnect happens exactly once");
        assert_eq!(connection.lock().speed(), Some(115_200));
        assert!(connection.lock().is_connected());
        assert_eq!(telemetry.value(Metric::Rpm), 2.0, "Restarted group reads the new connection");
        assert_eq!(
            telemetry.value(Metric::OilTemperature),
            2.0,
            "Group kept running picks up the new handle"
        );
    }

    #[test]
    fn test_failed_reconnect_keeps_last_readings() {
        let telemetry = Arc::new(TelemetryState::new());
        let connection = share(Box::new(ScriptedSource::new(Some(1500.0))));
        let connector = connector(true, 0.0);
        let plan = ReconnectPlan {
            delay: Duration::from_millis(30),
            pause: Duration::from_millis(5),
            speed: 115_200,
        };
        let profile = background_profile(vec![group("rpm", vec![Metric::Rpm], 2, true)], Some(plan));

        let runtime = AcquisitionRuntime::start(
            &profile,
            connector.clone(),
            Arc::clone(&connection),
            Arc::clone(&telemetry),
        )
        .unwrap();
        thread::sleep(Duration::from_millis(120));
        let settled = telemetry.update_count(Metric::Rpm);
        thread::sleep(Duration::from_millis(60));
        runtime.shutdown();

        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1, "Failed reconnect is not retried");
        assert!(!connection.lock().is_connected(), "Old connection stays closed");
        assert_eq!(telemetry.value(Metric::Rpm), 1500.0, "Last good reading is kept");
        assert_eq!(telemetry.update_count(Metric::Rpm), settled, "Stopped group is not restarted");
    }

    #[test]
    fn test_shutdown_cancels_pending_reconnect() {
        let telemetry = Arc::new(TelemetryState::new());
        let connection = share(Box::new(ScriptedSource::new(Some(1.0))));
        let connector = connector(false, 2.0);
        let plan = ReconnectPlan {
            delay: Duration::from_secs(60),
            pause: Duration::from_millis(1),
            speed: 115_200,
        };
        let profile = background_profile(Vec::new(), Some(plan));

        let runtime = AcquisitionRuntime::start(
            &profile,
            connector.clone(),
            Arc::clone(&connection),
            Arc::clone(&telemetry),
        )
        .unwrap();
        thread::sleep(Duration::from_millis(20));
        runtime.shutdown();

        assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);
        assert!(connection.lock().is_connected(), "Connection untouched");
    }
}
