mod registry;

pub use registry::MemoryRegistry;
