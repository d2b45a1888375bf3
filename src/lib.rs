// Crate-level lints: Allow common graphics/telemetry patterns that pedantic lints flag
#![allow(clippy::cast_possible_truncation)] // f64->i64/usize and u128->u32 casts for text and timing
#![allow(clippy::cast_precision_loss)] // u32->f32 in frame statistics
#![allow(clippy::cast_possible_wrap)] // u32->i32 for pixel coordinates
#![allow(clippy::cast_sign_loss)] // f64->usize after the negative case is handled

//! OBD-II gauge panel.
//!
//! An 800 × 480 window showing engine RPM as a segmented bar plus numeric
//! readouts for RPM, speed, oil pressure, oil temperature and coolant
//! temperature. Values come from a telemetry source (a serial ELM327 adapter
//! or a randomized simulator) and are shared with the render loop through a
//! lock-free per-metric store.
//!
//! # Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  GAUGE_BG + RECTANGLE_1..25 (RPM bar)         RPM 620,90 │
//! │                                                          │
//! │  OIL TEMP 40,257                       OIL PRESS 670,250 │
//! │                     SPEED 300,330                        │
//! │  COOLANT 40,350                                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Variants
//!
//! | Profile | Metrics | Acquisition | Publish | FPS |
//! |---------|---------|-------------|---------|-----|
//! | `full_panel` | all five | inline, once per frame | all or nothing | 30 |
//! | `rpm_only` | RPM | background, 10 ms | per metric | 60 |
//! | `threaded` | RPM, speed, temperatures | background, 10 ms / 10 s, reconnect at 115200 | per metric | 60 |
//!
//! The variant is picked at build time with the `profile-full-panel` and
//! `profile-rpm-only` features (default: `threaded`). The `obd-adapter`
//! feature switches from the simulator to the serial adapter.

pub mod acquisition;
pub mod assets;
pub mod colors;
pub mod config;
pub mod error;
pub mod gauge;
pub mod metric;
pub mod render;
pub mod source;
pub mod styles;
pub mod telemetry;
