pub mod config;
pub mod error;
pub mod executor;
pub mod retry;

pub use config::ExecutorConfig;
pub use error::TaskError;
pub use executor::{TaskExecutor, TaskOutcome};
pub use retry::{RetryPolicy, RetryStrategy};
