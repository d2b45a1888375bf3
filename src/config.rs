//! Application configuration constants and variant profiles.
//!
//! Every number the panel depends on lives here as a `const`: display geometry,
//! gauge scaling, frame rates, polling cadences and the reconnect timing. The
//! per-variant differences (which metrics are tracked, how they are scheduled,
//! how a batch is published) are captured by [`Profile`] so that the rest of the
//! crate never branches on "which build is this".
//!
//! # Profile Selection
//!
//! There are no command line flags and no config file. The profile is picked at
//! build time with Cargo features:
//!
//! | Feature | Profile |
//! |---------|---------|
//! | `profile-full-panel` | [`Profile::full_panel`] |
//! | `profile-rpm-only` | [`Profile::rpm_only`] |
//! | *(none)* | [`Profile::threaded`] |

use std::time::Duration;

use crate::metric::Metric;

// =============================================================================
// Display Configuration
// =============================================================================

/// Display width in pixels.
pub const SCREEN_WIDTH: u32 = 800;

/// Display height in pixels.
pub const SCREEN_HEIGHT: u32 = 480;

/// Window title shown by the simulator frontend.
pub const WINDOW_TITLE: &str = "Custom Gauge";

// =============================================================================
// Gauge Configuration
// =============================================================================

/// RPM covered by each overlay layer of the bar graph.
pub const RPM_PER_LAYER: f64 = 348.0;

/// Number of pre-rendered overlay layers.
pub const LAYER_COUNT: usize = 25;

/// Directory holding `GAUGE_BG.bmp` and `RECTANGLE_{1..=25}.bmp`.
pub const ASSET_DIR: &str = "images";

// =============================================================================
// Timing Configuration
// =============================================================================

/// Frame rate of the full five-metric panel.
pub const FULL_PANEL_FPS: u32 = 30;

/// Frame rate of the RPM-only and threaded panels.
pub const FAST_PANEL_FPS: u32 = 60;

/// Polling interval for fast-changing metrics (RPM, speed).
pub const FAST_CADENCE: Duration = Duration::from_millis(10);

/// Polling interval for thermally damped metrics (oil and coolant temperature).
pub const SLOW_CADENCE: Duration = Duration::from_secs(10);

/// Delay after startup before the transport speed is changed.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Pause between closing the old connection and opening the new one.
pub const RECONNECT_PAUSE: Duration = Duration::from_secs(1);

/// Transport speed used after the one-shot reconnect.
pub const RECONNECT_BAUD: u32 = 115_200;

/// Default ELM327 adapter speed when none is requested.
pub const DEFAULT_BAUD: u32 = 38_400;

/// Frame time for a given rate. A rate of zero is treated as one frame per second.
pub const fn frame_time(fps: u32) -> Duration {
    let fps = if fps == 0 { 1 } else { fps };
    Duration::from_nanos(1_000_000_000 / fps as u64)
}

// =============================================================================
// Variant Policies
// =============================================================================

/// Where acquisition runs relative to the render loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheduling {
    /// One batch of queries on the render thread before each frame.
    ///
    /// A slow source stalls the frame by exactly one batch. Never put an
    /// unbounded polling loop here: the render loop would not draw a single frame.
    Inline,
    /// Repeating tasks on the acquisition runtime, one per [`PollGroup`].
    Background,
}

/// How the results of a batch of queries become visible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishPolicy {
    /// Publish only when every query in the batch returned a value.
    AllOrNothing,
    /// Publish each successful query on its own.
    PerMetric,
}

/// A set of metrics polled together at a fixed cadence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollGroup {
    pub name: &'static str,
    pub metrics: Vec<Metric>,
    pub interval: Duration,
    /// Whether the group is stopped and restarted on the new connection after a reconnect.
    pub restart_on_reconnect: bool,
}

/// One-shot transport speed change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPlan {
    pub delay: Duration,
    pub pause: Duration,
    pub speed: u32,
}

/// Complete description of one panel variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub name: &'static str,
    /// Metrics drawn on the panel, in legend order.
    pub metrics: Vec<Metric>,
    pub scheduling: Scheduling,
    pub publish: PublishPolicy,
    /// Polling groups for [`Scheduling::Background`]. Ignored when inline.
    pub groups: Vec<PollGroup>,
    pub reconnect: Option<ReconnectPlan>,
    pub fps: u32,
}

impl Profile {
    /// All five metrics, polled inline once per frame and published all-or-nothing.
    pub fn full_panel() -> Self {
        Self {
            name: "full-panel",
            metrics: Metric::ALL.to_vec(),
            scheduling: Scheduling::Inline,
            publish: PublishPolicy::AllOrNothing,
            groups: Vec::new(),
            reconnect: None,
            fps: FULL_PANEL_FPS,
        }
    }

    /// RPM only, polled every 10 ms on a background task.
    pub fn rpm_only() -> Self {
        Self {
            name: "rpm-only",
            metrics: vec![Metric::Rpm],
            scheduling: Scheduling::Background,
            publish: PublishPolicy::PerMetric,
            groups: vec![PollGroup {
                name: "rpm",
                metrics: vec![Metric::Rpm],
                interval: FAST_CADENCE,
                restart_on_reconnect: false,
            }],
            reconnect: None,
            fps: FAST_PANEL_FPS,
        }
    }

    /// Independent fast and slow polling loops plus a delayed transport speed change.
    ///
    /// Only the fast groups are stopped and restarted around the reconnect; the
    /// temperature group keeps its original task and schedule throughout.
    pub fn threaded() -> Self {
        Self {
            name: "threaded",
            metrics: vec![
                Metric::Rpm,
                Metric::Speed,
                Metric::OilTemperature,
                Metric::CoolantTemperature,
            ],
            scheduling: Scheduling::Background,
            publish: PublishPolicy::PerMetric,
            groups: vec![
                PollGroup {
                    name: "rpm",
                    metrics: vec![Metric::Rpm],
                    interval: FAST_CADENCE,
                    restart_on_reconnect: true,
                },
                PollGroup {
                    name: "speed",
                    metrics: vec![Metric::Speed],
                    interval: FAST_CADENCE,
                    restart_on_reconnect: true,
                },
                PollGroup {
                    name: "temperatures",
                    metrics: vec![Metric::OilTemperature, Metric::CoolantTemperature],
                    interval: SLOW_CADENCE,
                    restart_on_reconnect: false,
                },
            ],
            reconnect: Some(ReconnectPlan {
                delay: RECONNECT_DELAY,
                pause: RECONNECT_PAUSE,
                speed: RECONNECT_BAUD,
            }),
            fps: FAST_PANEL_FPS,
        }
    }

    /// Profile chosen by the enabled Cargo features.
    pub fn selected() -> Self {
        if cfg!(feature = "profile-full-panel") {
            Self::full_panel()
        } else if cfg!(feature = "profile-rpm-only") {
            Self::rpm_only()
        } else {
            Self::threaded()
        }
    }

    /// Target duration of one frame.
    #[inline]
    pub const fn frame_time(&self) -> Duration { frame_time(self.fps) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_time() {
        assert_eq!(frame_time(30), Duration::from_nanos(33_333_333));
        assert_eq!(frame_time(60), Duration::from_nanos(16_666_666));
        assert_eq!(frame_time(0), Duration::from_secs(1), "Zero FPS should not divide by zero");
    }

    #[test]
    fn test_full_panel_profile() {
        let profile = Profile::full_panel();
        assert_eq!(profile.metrics.len(), 5, "Full panel tracks every metric");
        assert_eq!(profile.scheduling, Scheduling::Inline);
        assert_eq!(profile.publish, PublishPolicy::AllOrNothing);
        assert_eq!(profile.fps, 30);
        assert!(profile.reconnect.is_none());
    }

    #[test]
    fn test_rpm_only_profile() {
        let profile = Profile::rpm_only();
        assert_eq!(profile.metrics, vec![Metric::Rpm]);
        assert_eq!(profile.scheduling, Scheduling::Background);
        assert_eq!(profile.groups.len(), 1);
        assert_eq!(profile.groups[0].interval, FAST_CADENCE);
        assert_eq!(profile.fps, 60);
    }

    #[test]
    fn test_threaded_profile_groups() {
        let profile = Profile::threaded();
        let fast: Vec<_> = profile.groups.iter().filter(|g| g.interval == FAST_CADENCE).collect();
        let slow: Vec<_> = profile.groups.iter().filter(|g| g.interval == SLOW_CADENCE).collect();

        assert_eq!(fast.len(), 2, "RPM and speed poll on their own fast loops");
        assert!(fast.iter().all(|g| g.restart_on_reconnect), "Fast loops follow the reconnect");
        assert_eq!(slow.len(), 1);
        assert!(!slow[0].restart_on_reconnect, "Temperature loop is never restarted");
        assert_eq!(profile.reconnect.map(|plan| plan.speed), Some(RECONNECT_BAUD));
    }

    #[test]
    fn test_groups_only_poll_tracked_metrics() {
        for profile in [Profile::full_panel(), Profile::rpm_only(), Profile::threaded()] {
            for group in &profile.groups {
                for metric in &group.metrics {
                    assert!(
                        profile.metrics.contains(metric),
                        "{} polls {metric} but never draws it",
                        profile.name
                    );
                }
            }
        }
    }
}
