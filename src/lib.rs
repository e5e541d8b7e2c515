pub mod config;
pub mod coordinator;
pub mod error;
pub mod intake;
pub mod network;
pub mod output;
pub mod pipeline;

pub use config::Configuration;
pub use coordinator::{Coordinator, CoordinatorBuilder, CoordinatorCommand};
pub use error::{AppError, RemoteError};
pub use pipeline::{ScoreSnapshot, ScoreState};
