mod connection;
pub mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::{Database, IN_MEMORY};
pub use models::{EstimationSummary, NewEstimation, ProvisionedUser, SavedEstimation, User};
