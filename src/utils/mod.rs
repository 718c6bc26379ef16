//! Utils Module
pub mod otel;

pub use otel::init_telemetry;
