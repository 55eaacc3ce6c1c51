pub mod estimation;
pub mod user;

pub use estimation::{EstimationSummary, NewEstimation, SavedEstimation, REQUIRED_FIELDS};
pub use user::{ProvisionedUser, User};
