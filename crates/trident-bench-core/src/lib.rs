pub mod baseline;
pub mod config;
pub mod errors;
pub mod extract;
pub mod model;
pub mod orchestrator;
pub mod report;
pub mod telemetry;
