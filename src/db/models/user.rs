//! Account identity used for ownership checks.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A freshly provisioned user together with its bearer token. The token is
/// only ever returned here.
#[derive(Debug, Clone)]
pub struct ProvisionedUser {
    pub user: User,
    pub api_token: String,
}
