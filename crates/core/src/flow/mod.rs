//! Authorization flow orchestration

mod controller;
mod pending;
pub mod ports;
mod sink;

pub use controller::{FlowController, FlowPorts, Readiness};
pub use sink::OutcomeSink;
