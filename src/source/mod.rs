//! Telemetry sources.
//!
//! The panel never talks to a vehicle directly. It asks a [`TelemetrySource`]
//! for one metric at a time and gets back either a magnitude or "no reading".
//! Sources are opened through a [`Connector`] so the acquisition runtime can
//! tear a connection down and open a new one at a different transport speed.
//!
//! - [`SimulatedSource`]: randomized values for desk testing
//! - [`Elm327Source`]: serial ELM327 OBD-II adapter

mod elm327;
mod simulated;

use std::sync::Arc;

use parking_lot::Mutex;

pub use elm327::Elm327Source;
pub use simulated::SimulatedSource;

use crate::config::DEFAULT_BAUD;
use crate::error::SourceError;
use crate::metric::Metric;

/// A live link to a telemetry provider.
pub trait TelemetrySource: Send {
    /// Request one metric. `None` means no reading is available right now.
    fn query(
        &mut self,
        metric: Metric,
    ) -> Option<f64>;

    /// Release the link. Later queries return `None`.
    fn close(&mut self);

    fn is_connected(&self) -> bool;

    /// Configured transport speed, if the source has one.
    fn speed(&self) -> Option<u32>;
}

/// Boxed source as passed around by the acquisition side.
pub type SourceHandle = Box<dyn TelemetrySource>;

/// A connection shared by every polling task that uses it.
pub type SharedConnection = Arc<Mutex<SourceHandle>>;

/// Wrap a freshly opened source for sharing between tasks.
pub fn share(source: SourceHandle) -> SharedConnection { Arc::new(Mutex::new(source)) }

/// Opens telemetry sources, optionally at a specific transport speed.
pub trait Connector: Send + Sync {
    fn connect(
        &self,
        speed: Option<u32>,
    ) -> Result<SourceHandle, SourceError>;
}

/// Which source the panel reads from.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceConfig {
    /// Randomized values. `dropout` is the chance that a query yields no reading.
    Simulated { seed: Option<u64>, dropout: f64 },
    /// ELM327 adapter. Without a port, the first USB serial port is used.
    Elm327 { port: Option<String>, baud: Option<u32> },
}

impl SourceConfig {
    /// Source chosen by the enabled Cargo features.
    pub fn selected() -> Self {
        if cfg!(feature = "obd-adapter") {
            Self::Elm327 { port: None, baud: None }
        } else {
            Self::Simulated { seed: None, dropout: 0.0 }
        }
    }
}

impl Connector for SourceConfig {
    fn connect(
        &self,
        speed: Option<u32>,
    ) -> Result<SourceHandle, SourceError> {
        match self {
            Self::Simulated { seed, dropout } => {
                let source = match seed {
                    Some(seed) => SimulatedSource::seeded(*seed),
                    None => SimulatedSource::new(),
                };
                Ok(Box::new(source.with_dropout(*dropout).with_speed(speed)))
            }
            Self::Elm327 { port, baud } => {
                let baud = speed.or(*baud).unwrap_or(DEFAULT_BAUD);
                Ok(Box::new(Elm327Source::open(port.as_deref(), baud)?))
            }
        }
    }
}
