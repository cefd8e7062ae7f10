pub mod config;
pub mod coordinator;
pub mod fields;
pub mod observability;
pub mod pipeline;
pub mod sources;
pub mod status_server;
pub mod transform;

pub use coordinator::{CoordinatorError, PollStatus, PollingCoordinator};
pub use pipeline::{Envelope, FetchError, UsageSource};
