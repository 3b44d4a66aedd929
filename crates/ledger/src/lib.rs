pub mod reducer;
pub mod reporter;
pub mod view;

pub use reducer::{ReducedEvents, ReducerConfig, StatusReducer};
pub use reporter::EventReporter;
pub use view::{PublishEventsView, StepInfo};
