//! Gauge panel binary.
//!
//! Opens the telemetry source chosen at build time, loads the gauge images,
//! starts background acquisition when the profile needs it and runs the render
//! loop in a simulator window until the window is closed.
//!
//! Log verbosity follows `RUST_LOG` (default `info`), e.g.
//! `RUST_LOG=gauge_panel=debug` for once-per-second frame statistics.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics_simulator::{OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window};
use gauge_panel::acquisition::{AcquisitionRuntime, Poller};
use gauge_panel::assets::GaugeAssets;
use gauge_panel::config::{ASSET_DIR, Profile, Scheduling, WINDOW_TITLE};
use gauge_panel::render::{Frontend, Panel, PanelEvent};
use gauge_panel::source::{Connector, SourceConfig, TelemetrySource, share};
use gauge_panel::telemetry::TelemetryState;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Simulator window as the panel frontend.
struct WindowFrontend {
    window: Window,
    /// SDL window is created on the first update; events before that would panic.
    shown: bool,
}

impl WindowFrontend {
    fn new() -> Self {
        let output_settings = OutputSettingsBuilder::new().scale(1).build();
        Self {
            window: Window::new(WINDOW_TITLE, &output_settings),
            shown: false,
        }
    }
}

impl Frontend for WindowFrontend {
    fn present(
        &mut self,
        display: &SimulatorDisplay<Rgb565>,
    ) {
        self.window.update(display);
        self.shown = true;
    }

    fn poll_events(&mut self) -> Vec<PanelEvent> {
        if !self.shown {
            return Vec::new();
        }
        self.window
            .events()
            .map(|event| match event {
                SimulatorEvent::Quit => PanelEvent::Quit,
                _ => PanelEvent::Other,
            })
            .collect()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let profile = Profile::selected();
    let source_config = SourceConfig::selected();
    info!(profile = profile.name, source = ?source_config, "Starting gauge panel");

    let connector: Arc<dyn Connector> = Arc::new(source_config);
    let source = connector.connect(None).context("Failed to open telemetry source")?;
    info!(speed = ?source.speed(), "Telemetry source connected");
    let connection = share(source);

    let assets = GaugeAssets::load(Path::new(ASSET_DIR)).context("Failed to load gauge images")?;
    let telemetry = Arc::new(TelemetryState::new());

    let acquisition = if profile.scheduling == Scheduling::Background || profile.reconnect.is_some() {
        let runtime = AcquisitionRuntime::start(
            &profile,
            Arc::clone(&connector),
            Arc::clone(&connection),
            Arc::clone(&telemetry),
        )
        .context("Failed to start acquisition")?;
        Some(runtime)
    } else {
        None
    };

    let mut panel = Panel::new(&profile, WindowFrontend::new(), assets, Arc::clone(&telemetry));
    if profile.scheduling == Scheduling::Inline {
        panel = panel.with_inline_poller(Poller::new(Arc::clone(&connection), telemetry, profile.publish));
    }

    let stats = panel.run();
    info!(
        frames = stats.total_frames,
        avg_frame_us = stats.frame_time_avg_us(),
        "Window closed"
    );

    if let Some(runtime) = acquisition {
        runtime.shutdown();
    }
    connection.lock().close();
    info!("Shutdown complete");
    Ok(())
}
