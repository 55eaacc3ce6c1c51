use anyhow::{bail, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_sql_error},
    models::{ProvisionedUser, User},
};

fn row_to_user(row: &Row) -> Result<User, rusqlite::Error> {
    let created_at: String = row.get("created_at")?;

    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        created_at: parse_datetime(&created_at, "created_at").map_err(to_sql_error)?,
    })
}

impl Database {
    /// Create a user with a fresh bearer token
    /// Returns an error if the username is empty or already taken
    pub async fn create_user(&self, username: String) -> Result<ProvisionedUser> {
        let username = username.trim().to_string();
        if username.is_empty() {
            bail!("username is required");
        }

        self.execute(move |conn| {
            let taken: Option<i64> = conn
                .query_row(
                    "SELECT id FROM users WHERE username = ?1",
                    params![username],
                    |row| row.get(0),
                )
                .optional()?;
            if taken.is_some() {
                bail!("username '{username}' is already taken");
            }

            let now = Utc::now();
            let api_token = Uuid::new_v4().simple().to_string();
            conn.execute(
                "INSERT INTO users (username, api_token, created_at) VALUES (?1, ?2, ?3)",
                params![username, api_token, now.to_rfc3339()],
            )?;

            let user_id = conn.last_insert_rowid();
            let user = conn.query_row(
                "SELECT id, username, created_at FROM users WHERE id = ?1",
                params![user_id],
                row_to_user,
            )?;

            Ok(ProvisionedUser { user, api_token })
        })
        .await
    }

    /// Resolve a bearer token to its user
    pub async fn find_user_by_token(&self, token: String) -> Result<Option<User>> {
        self.execute(move |conn| {
            let user = conn
                .query_row(
                    "SELECT id, username, created_at FROM users WHERE api_token = ?1",
                    params![token],
                    row_to_user,
                )
                .optional()?;
            Ok(user)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn created_user_resolves_by_token() {
        let db = Database::in_memory().unwrap();
        let provisioned = db.create_user("  ana ".into()).await.unwrap();
        assert_eq!(provisioned.user.username, "ana");
        assert_eq!(provisioned.api_token.len(), 32);

        let found = db
            .find_user_by_token(provisioned.api_token.clone())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, provisioned.user.id);
    }

    #[tokio::test]
    async fn unknown_token_resolves_to_none() {
        let db = Database::in_memory().unwrap();
        db.create_user("ana".into()).await.unwrap();

        assert!(db
            .find_user_by_token("not-a-token".into())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_and_blank_usernames_are_rejected() {
        let db = Database::in_memory().unwrap();
        db.create_user("ana".into()).await.unwrap();

        let err = db.create_user("ana".into()).await.unwrap_err();
        assert!(err.to_string().contains("already taken"));
        assert!(db.create_user("   ".into()).await.is_err());
    }
}
