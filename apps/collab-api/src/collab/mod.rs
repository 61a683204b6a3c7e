pub mod connections;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod handler;
pub mod server;
pub mod sweeper;

pub use connections::{ConnectionTable, EventSink};
pub use coordinator::{CollabCoordinator, CollabStats, JoinResult, ProjectStatus};
pub use error::CollabError;
