pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator_factory;
pub mod registry_factory;
