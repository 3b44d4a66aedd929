mod seed;
mod store;

pub use seed::CatalogSeed;
pub use store::MemoryStore;
