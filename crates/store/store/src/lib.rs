pub mod catalog;
pub mod error;
pub mod ledger;
pub mod release;
pub mod testing;

pub use catalog::CatalogStore;
pub use error::StoreError;
pub use ledger::EventLedger;
pub use release::ReleaseStore;
