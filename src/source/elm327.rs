//! ELM327 serial OBD-II adapter.
//!
//! The adapter speaks an ASCII command protocol: a command line terminated by
//! `\r`, answered by one or more text lines and a `>` prompt. Mode 01 requests
//! (`010C` and friends) come back as `41 0C 1A F8`, where the bytes after the
//! echoed PID are the data bytes `A`, `B`, ... of the standard formulas.
//!
//! | Metric | PID | Formula |
//! |--------|-----|---------|
//! | RPM | `0C` | `(256A + B) / 4` |
//! | Speed | `0D` | `A` km/h |
//! | Oil temperature | `5C` | `A - 40` °C |
//! | Coolant temperature | `05` | `A - 40` °C |
//!
//! Oil pressure has no standard mode 01 PID, so it never yields a reading.

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort, SerialPortType};
use tracing::{debug, info, trace};

use super::TelemetrySource;
use crate::error::SourceError;
use crate::metric::Metric;

/// Read timeout for a single adapter response.
const READ_TIMEOUT: Duration = Duration::from_millis(1500);

/// Upper bound on a response, in case the prompt never arrives.
const MAX_RESPONSE_LEN: usize = 256;

/// Reset, echo off, linefeeds off, spaces off, automatic protocol.
const INIT_SEQUENCE: [&str; 5] = ["ATZ", "ATE0", "ATL0", "ATS0", "ATSP0"];

/// Mode 01 PID for a metric, if the standard defines one.
pub const fn pid(metric: Metric) -> Option<u8> {
    match metric {
        Metric::Rpm => Some(0x0C),
        Metric::Speed => Some(0x0D),
        Metric::OilTemperature => Some(0x5C),
        Metric::CoolantTemperature => Some(0x05),
        Metric::OilPressure => None,
    }
}

/// Extract the data bytes of a mode 01 reply for `pid`.
///
/// Accepts replies with or without spaces and ignores prompt, echo and status
/// lines such as `SEARCHING...`. Returns `None` for `NO DATA` and anything
/// that does not parse as hex.
pub fn parse_mode01(
    response: &str,
    pid: u8,
) -> Option<Vec<u8>> {
    let header = [0x41, pid];
    response
        .split(['\r', '\n', '>'])
        .filter_map(|line| {
            let hex: String = line.chars().filter(|c| !c.is_whitespace()).collect();
            if hex.is_empty() || !hex.is_ascii() || hex.len() % 2 != 0 {
                return None;
            }
            let bytes = (0..hex.len())
                .step_by(2)
                .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
                .collect::<Option<Vec<u8>>>()?;
            bytes.starts_with(&header).then(|| bytes[2..].to_vec())
        })
        .find(|data| !data.is_empty())
}

/// Apply the standard formula for a metric to its data bytes.
pub fn decode(
    metric: Metric,
    data: &[u8],
) -> Option<f64> {
    match (metric, data) {
        (Metric::Rpm, [a, b, ..]) => Some((f64::from(*a) * 256.0 + f64::from(*b)) / 4.0),
        (Metric::Speed, [a, ..]) => Some(f64::from(*a)),
        (Metric::OilTemperature | Metric::CoolantTemperature, [a, ..]) => Some(f64::from(*a) - 40.0),
        _ => None,
    }
}

/// First USB serial port, which is where ELM327 clones show up.
fn find_adapter() -> Result<String, SourceError> {
    let ports = serialport::available_ports()?;
    ports
        .iter()
        .find(|port| matches!(port.port_type, SerialPortType::UsbPort(_)))
        .or_else(|| ports.first())
        .map(|port| port.port_name.clone())
        .ok_or(SourceError::NoAdapter)
}

/// Serial ELM327 adapter.
pub struct Elm327Source {
    port: Option<Box<dyn SerialPort>>,
    port_name: String,
    baud: u32,
}

impl Elm327Source {
    /// Open and initialize the adapter. Without a port name the first USB serial port is used.
    pub fn open(
        port_name: Option<&str>,
        baud: u32,
    ) -> Result<Self, SourceError> {
        let port_name = match port_name {
            Some(name) => name.to_string(),
            None => find_adapter()?,
        };
        info!(port = %port_name, baud, "Opening ELM327 adapter");

        let port = serialport::new(&port_name, baud).timeout(READ_TIMEOUT).open()?;
        let mut source = Self::with_port(port, port_name, baud);

        for command in INIT_SEQUENCE {
            let reply = source.transact(command).map_err(|e| {
                debug!(command, error = %e, "Adapter init failed");
                SourceError::NoResponse { command: command.to_string() }
            })?;
            trace!(command, reply = reply.trim(), "Adapter init");
        }

        Ok(source)
    }

    /// Wrap an already opened port without running the init sequence.
    fn with_port(
        port: Box<dyn SerialPort>,
        port_name: String,
        baud: u32,
    ) -> Self {
        Self {
            port: Some(port),
            port_name,
            baud,
        }
    }

    /// Send one command and collect the reply up to the `>` prompt.
    ///
    /// Input left over from an earlier command (a reply that arrived after its
    /// read timed out) is discarded first, so every reply belongs to the
    /// command just sent. A reply without the prompt is an error.
    fn transact(
        &mut self,
        command: &str,
    ) -> io::Result<String> {
        let port = self.port.as_mut().ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        port.clear(ClearBuffer::Input)?;
        port.write_all(command.as_bytes())?;
        port.write_all(b"\r")?;

        let mut reply = Vec::with_capacity(64);
        let mut chunk = [0u8; 64];
        while !reply.contains(&b'>') && reply.len() < MAX_RESPONSE_LEN {
            let n = port.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            reply.extend_from_slice(&chunk[..n]);
        }

        if !reply.contains(&b'>') {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no prompt in adapter reply"));
        }
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }
}

impl TelemetrySource for Elm327Source {
    fn query(
        &mut self,
        metric: Metric,
    ) -> Option<f64> {
        let pid = pid(metric)?;
        let reply = match self.transact(&format!("01{pid:02X}")) {
            Ok(reply) => reply,
            Err(e) => {
                trace!(%metric, error = %e, "Query failed");
                return None;
            }
        };
        decode(metric, &parse_mode01(&reply, pid)?)
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!(port = %self.port_name, "Closed ELM327 adapter");
        }
    }

    fn is_connected(&self) -> bool { self.port.is_some() }

    fn speed(&self) -> Option<u32> { Some(self.baud) }
}
