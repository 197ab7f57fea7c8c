//! Refresh token tracking and revocation.
//!
//! Only refresh tokens are stored in the database. Access tokens are stateless
//! and short-lived, so revoking a session means deleting its refresh token row.

use sqlx::sqlite::SqlitePool;

use super::unix_now;

/// A tracked refresh token.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub jti: String,
    pub user_id: i64,
    pub last_ip: Option<String>,
    pub issued_at: i64,
    pub expires_at: i64,
}

pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a newly issued refresh token.
    pub async fn create(
        &self,
        jti: &str,
        user_id: i64,
        ip: Option<&str>,
        issued_at: u64,
        expires_at: u64,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO refresh_tokens (jti, user_id, last_ip, issued_at, expires_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(jti)
        .bind(user_id)
        .bind(ip)
        .bind(issued_at as i64)
        .bind(expires_at as i64)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a live (not expired) token by its JWT ID.
    pub async fn get_by_jti(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, jti, user_id, last_ip, issued_at, expires_at FROM refresh_tokens WHERE jti = ? AND expires_at > ?",
        )
        .bind(jti)
        .bind(unix_now())
        .fetch_optional(&self.pool)
        .await
    }

    /// Update the last IP address seen for a token.
    pub async fn update_ip(&self, jti: &str, ip: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE refresh_tokens SET last_ip = ? WHERE jti = ?")
            .bind(ip)
            .bind(jti)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Revoke a token by its JWT ID.
    pub async fn delete_by_jti(&self, jti: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE jti = ?")
            .bind(jti)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke every session of a user.
    pub async fn delete_all_by_user(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete all expired tokens.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?")
            .bind(unix_now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
