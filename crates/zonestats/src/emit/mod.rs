//! Metrics emission: line protocol rendering and delivery.

mod influx;
mod line;

pub use influx::{Credentials, Emission, Emitter, InfluxTarget};
pub use line::LineBuilder;
