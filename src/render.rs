//! Render loop.
//!
//! The [`Panel`] owns the frame buffer and draws a complete gauge frame on
//! every [`step`](Panel::step):
//!
//! | Phase | Work |
//! |-------|------|
//! | Events | Drain the frontend. `Quit` stops the panel before anything is drawn |
//! | Acquire | Inline scheduling only: one batch of queries |
//! | Compose | [`compose_frame`] from a fresh telemetry snapshot |
//! | Present | Hand the buffer to the frontend |
//! | Pace | Sleep until the frame boundary |
//!
//! The frontend is a trait so the loop runs headless in tests. The binary
//! plugs in the simulator window.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::SimulatorDisplay;
use tracing::{debug, info, trace};

use crate::acquisition::Poller;
use crate::assets::GaugeAssets;
use crate::config::{Profile, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::gauge::{FrameSummary, compose_frame};
use crate::metric::Metric;
use crate::telemetry::TelemetryState;

// =============================================================================
// Frontend
// =============================================================================

/// User-facing events the panel reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelEvent {
    /// Window closed.
    Quit,
    /// Anything else (key presses, mouse). Ignored.
    Other,
}

/// Where finished frames go and where events come from.
pub trait Frontend {
    fn present(
        &mut self,
        display: &SimulatorDisplay<Rgb565>,
    );

    /// Events since the last call.
    fn poll_events(&mut self) -> Vec<PanelEvent>;
}

// =============================================================================
// Panel State
// =============================================================================

/// Lifecycle of the render loop. `Stopped` is terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PanelState {
    #[default]
    Running,
    Stopped,
}

impl PanelState {
    #[inline]
    pub const fn is_running(self) -> bool { matches!(self, Self::Running) }

    /// Apply one event. Nothing leaves `Stopped`.
    #[must_use]
    pub const fn next(
        self,
        event: PanelEvent,
    ) -> Self {
        match (self, event) {
            (Self::Running, PanelEvent::Quit) | (Self::Stopped, _) => Self::Stopped,
            (Self::Running, PanelEvent::Other) => Self::Running,
        }
    }
}

// =============================================================================
// Frame Timing
// =============================================================================

/// Sleeps out the remainder of each frame.
#[derive(Clone, Copy, Debug)]
pub struct FramePacer {
    frame_time: Duration,
}

impl FramePacer {
    pub const fn new(frame_time: Duration) -> Self { Self { frame_time } }

    #[inline]
    pub const fn frame_time(&self) -> Duration { self.frame_time }

    /// Sleep until `frame_start + frame_time`. Returns the time slept.
    ///
    /// A frame that overran is not compensated; the next one simply starts late.
    pub fn pace(
        &self,
        frame_start: Instant,
    ) -> Duration {
        match self.frame_time.checked_sub(frame_start.elapsed()) {
            Some(remaining) if !remaining.is_zero() => {
                thread::sleep(remaining);
                remaining
            }
            _ => Duration::ZERO,
        }
    }
}

/// Frame timing statistics.
///
/// The FPS value is recomputed once per second from the frames counted in
/// that second, then logged at debug level.
#[derive(Clone, Debug)]
pub struct FrameStats {
    /// Total time of the last frame (render + sleep + overhead)
    pub frame_time_us: u32,
    /// Time spent polling and drawing in the last frame
    pub render_time_us: u32,
    /// Time spent sleeping in the last frame
    pub sleep_time_us: u32,
    pub frame_time_min_us: u32,
    pub frame_time_max_us: u32,
    frame_time_avg_us: f32,
    pub total_frames: u64,
    /// Frames counted in the last complete one-second window
    pub fps: u32,
    window_start: Instant,
    window_frames: u32,
}

impl FrameStats {
    /// Exponential moving average alpha.
    const EMA_ALPHA: f32 = 0.1;

    /// FPS recompute interval.
    const WINDOW: Duration = Duration::from_secs(1);

    pub fn new() -> Self { Self::starting_at(Instant::now()) }

    fn starting_at(start: Instant) -> Self {
        Self {
            frame_time_us: 0,
            render_time_us: 0,
            sleep_time_us: 0,
            frame_time_min_us: u32::MAX,
            frame_time_max_us: 0,
            frame_time_avg_us: 0.0,
            total_frames: 0,
            fps: 0,
            window_start: start,
            window_frames: 0,
        }
    }

    /// Record timing for a finished frame.
    pub fn record_frame(
        &mut self,
        total_time: Duration,
        render_time: Duration,
        sleep_time: Duration,
    ) {
        self.record_frame_at(Instant::now(), total_time, render_time, sleep_time);
    }

    fn record_frame_at(
        &mut self,
        now: Instant,
        total_time: Duration,
        render_time: Duration,
        sleep_time: Duration,
    ) {
        let total_us = total_time.as_micros() as u32;
        self.frame_time_us = total_us;
        self.render_time_us = render_time.as_micros() as u32;
        self.sleep_time_us = sleep_time.as_micros() as u32;

        self.frame_time_min_us = self.frame_time_min_us.min(total_us);
        self.frame_time_max_us = self.frame_time_max_us.max(total_us);

        if self.total_frames == 0 {
            self.frame_time_avg_us = total_us as f32;
        } else {
            self.frame_time_avg_us =
                Self::EMA_ALPHA.mul_add(total_us as f32, (1.0 - Self::EMA_ALPHA) * self.frame_time_avg_us);
        }
        self.total_frames += 1;
        self.window_frames += 1;

        if now.saturating_duration_since(self.window_start) >= Self::WINDOW {
            self.fps = self.window_frames;
            self.window_frames = 0;
            self.window_start = now;
            debug!(
                fps = self.fps,
                avg_us = self.frame_time_avg_us(),
                min_us = self.frame_time_min_us,
                max_us = self.frame_time_max_us,
                render_us = self.render_time_us,
                "Frame stats"
            );
        }
    }

    #[inline]
    pub const fn frame_time_avg_us(&self) -> u32 { self.frame_time_avg_us as u32 }
}

impl Default for FrameStats {
    fn default() -> Self { Self::new() }
}

// =============================================================================
// Panel
// =============================================================================

/// The gauge window's render loop.
pub struct Panel<F: Frontend> {
    display: SimulatorDisplay<Rgb565>,
    frontend: F,
    assets: GaugeAssets,
    telemetry: Arc<TelemetryState>,
    metrics: Vec<Metric>,
    inline: Option<Poller>,
    pacer: FramePacer,
    state: PanelState,
    stats: FrameStats,
    last_frame: Option<FrameSummary>,
}

impl<F: Frontend> Panel<F> {
    pub fn new(
        profile: &Profile,
        frontend: F,
        assets: GaugeAssets,
        telemetry: Arc<TelemetryState>,
    ) -> Self {
        Self {
            display: SimulatorDisplay::new(Size::new(SCREEN_WIDTH, SCREEN_HEIGHT)),
            frontend,
            assets,
            telemetry,
            metrics: profile.metrics.clone(),
            inline: None,
            pacer: FramePacer::new(profile.frame_time()),
            state: PanelState::Running,
            stats: FrameStats::new(),
            last_frame: None,
        }
    }

    /// Poll one batch on the render thread before every frame.
    #[must_use]
    pub fn with_inline_poller(
        mut self,
        poller: Poller,
    ) -> Self {
        self.inline = Some(poller);
        self
    }

    /// Run one frame. Returns the state after the frame.
    pub fn step(&mut self) -> PanelState {
        if !self.state.is_running() {
            return self.state;
        }

        let frame_start = Instant::now();
        for event in self.frontend.poll_events() {
            trace!(?event, "Panel event");
            self.state = self.state.next(event);
        }
        if !self.state.is_running() {
            info!(frames = self.stats.total_frames, "Panel stopped");
            return self.state;
        }

        if let Some(poller) = &self.inline {
            poller.poll_batch(&self.metrics);
        }

        let snapshot = self.telemetry.snapshot();
        let summary = match compose_frame(&mut self.display, &self.assets, &snapshot, &self.metrics) {
            Ok(summary) => summary,
            Err(never) => match never {},
        };
        trace!(layers = summary.layers, texts = summary.texts, "Composed frame");
        self.last_frame = Some(summary);
        let render_time = frame_start.elapsed();

        self.frontend.present(&self.display);

        let sleep_time = self.pacer.pace(frame_start);
        self.stats.record_frame(frame_start.elapsed(), render_time, sleep_time);
        self.state
    }

    /// Step until stopped. Display and frontend are released on return.
    pub fn run(mut self) -> FrameStats {
        info!(metrics = self.metrics.len(), frame_time = ?self.pacer.frame_time(), "Panel running");
        while self.step().is_running() {}
        self.stats
    }

    #[inline]
    pub const fn state(&self) -> PanelState { self.state }

    #[inline]
    pub const fn stats(&self) -> &FrameStats { &self.stats }

    #[inline]
    pub const fn display(&self) -> &SimulatorDisplay<Rgb565> { &self.display }

    /// What the most recently presented frame contained. `None` before the first frame.
    #[inline]
    pub const fn last_frame(&self) -> Option<FrameSummary> { self.last_frame }
}
