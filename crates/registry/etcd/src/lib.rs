mod config;
mod registry;

pub use config::EtcdRegistryConfig;
pub use registry::EtcdRegistry;
