pub mod entry;
pub mod error;
pub mod prefix;
pub mod registry;
pub mod testing;

pub use entry::{FailedEntry, RegistryEntry};
pub use error::RegistryError;
pub use prefix::{RegistryLayout, RegistryPrefix};
pub use registry::Registry;
