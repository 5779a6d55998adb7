// Page lock server library
// HTTP surface, configuration and startup wiring around pagelock-core

// Module declarations
pub mod api; // HTTP handlers and routes
pub mod error; // API error responses
pub mod metrics; // Metric descriptions and Prometheus recorder
pub mod model; // Application state and configuration
pub mod startup; // Logging, HTTP server and shutdown setup

pub use model::common::AppState;
pub use model::config::Configuration;
