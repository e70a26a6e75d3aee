//! # idswitch Core
//!
//! Flow orchestration - no HTTP, no platform code.
//!
//! This crate contains:
//! - The flow controller and its correlation table
//! - Port interfaces (traits) for discovery, keys, code exchange and agents
//! - Presentation selection and the app-switch resume contract
//!
//! ## Architecture Principles
//! - Only depends on `idswitch-common` and `idswitch-domain`
//! - All external effects via traits
//! - Pure, testable orchestration logic

pub mod flow;
pub mod presentation;
pub mod resume;

pub mod testing;

// Re-export specific items to avoid ambiguity
pub use flow::ports::{
    AgentLaunch, AuthorizationAgent, CodeExchange, KeySetSource, MetadataSource, TokenExchanger,
};
pub use flow::{FlowController, FlowPorts, OutcomeSink, Readiness};
pub use presentation::ports::BrowserProbe;
pub use presentation::select_presentation;
pub use resume::{AppSwitchResume, ResumeSignal};
