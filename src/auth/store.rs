//! Identity storage: the collaborator interface and its SQLite implementation

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{FromRow, SqlitePool};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::models::{Identity, Role};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unique constraint rejected the write
    #[error("duplicate {field}")]
    Duplicate { field: &'static str },

    #[error("no identity with id {id}")]
    Missing { id: String },

    /// Stored row violates the data model
    #[error("corrupt identity row: {0}")]
    Corrupt(String),

    #[error("identity store timed out after {0:?}")]
    Timeout(Duration),
}

/// Persistent identity records.
///
/// Implementations must enforce unique `email` and unique `user_id`; callers
/// pre-check with the `count_*` methods but rely on the constraint.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_by_id(&self, user_id: &str) -> Result<Option<Identity>, StoreError>;

    async fn create(&self, identity: &Identity) -> Result<(), StoreError>;

    /// Overwrite the stored token pair and bump `updated_at` in one statement
    async fn update_tokens(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn count_by_email(&self, email: &str) -> Result<i64, StoreError>;

    async fn count_by_phone(&self, phone: &str) -> Result<i64, StoreError>;

    /// One page ordered by creation time, plus the total number of identities
    async fn list(&self, offset: i64, limit: i64) -> Result<(i64, Vec<Identity>), StoreError>;
}

#[derive(FromRow)]
struct IdentityRow {
    user_id: String,
    email: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    password: String,
    user_type: String,
    avatar: Option<String>,
    token: Option<String>,
    refresh_token: Option<String>,
    created_at: String,
    updated_at: String,
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("{} '{}': {}", field, raw, e)))
}

/// Fixed-width UTC form, so text order is time order
fn sortable_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl TryFrom<IdentityRow> for Identity {
    type Error = StoreError;

    fn try_from(row: IdentityRow) -> Result<Self, Self::Error> {
        let user_type = row
            .user_type
            .parse::<Role>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(Identity {
            created_at: parse_timestamp("created_at", &row.created_at)?,
            updated_at: parse_timestamp("updated_at", &row.updated_at)?,
            user_id: row.user_id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            password: row.password,
            user_type,
            avatar: row.avatar,
            token: row.token,
            refresh_token: row.refresh_token,
        })
    }
}

/// Map a unique-constraint rejection to the column that caused it
fn classify_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let message = db_err.message();
        if db_err.is_unique_violation() || message.contains("UNIQUE constraint failed") {
            let field = if message.contains("email") {
                "email"
            } else if message.contains("user_id") {
                "user_id"
            } else {
                "record"
            };
            return StoreError::Duplicate { field };
        }
    }
    StoreError::Database(err)
}

#[derive(Debug, Clone)]
pub struct SqliteIdentityStore {
    pool: SqlitePool,
}

impl SqliteIdentityStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for SqliteIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        sqlx::query_as::<_, IdentityRow>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(Identity::try_from)
            .transpose()
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<Identity>, StoreError> {
        sqlx::query_as::<_, IdentityRow>("SELECT * FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Identity::try_from)
            .transpose()
    }

    async fn create(&self, identity: &Identity) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                user_id, email, first_name, last_name, phone, password, user_type,
                avatar, token, refresh_token, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&identity.user_id)
        .bind(&identity.email)
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(identity.phone.as_deref())
        .bind(&identity.password)
        .bind(identity.user_type.as_str())
        .bind(identity.avatar.as_deref())
        .bind(identity.token.as_deref())
        .bind(identity.refresh_token.as_deref())
        .bind(sortable_timestamp(&identity.created_at))
        .bind(sortable_timestamp(&identity.updated_at))
        .execute(&self.pool)
        .await
        .map_err(classify_write_error)?;

        debug!(user_id = %identity.user_id, "Inserted identity");
        Ok(())
    }

    async fn update_tokens(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET token = ?, refresh_token = ?, updated_at = ? WHERE user_id = ?",
        )
        .bind(access_token)
        .bind(refresh_token)
        .bind(sortable_timestamp(&updated_at))
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(user_id = %user_id, "Token update matched no identity");
            return Err(StoreError::Missing {
                id: user_id.to_string(),
            });
        }
        Ok(())
    }

    async fn count_by_email(&self, email: &str) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_by_phone(&self, phone: &str) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE phone = ?")
            .bind(phone)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<(i64, Vec<Identity>), StoreError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, IdentityRow>(
            "SELECT * FROM users ORDER BY created_at ASC, user_id ASC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let identities = rows
            .into_iter()
            .map(Identity::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((total, identities))
    }
}

/// Bounds every round trip of the wrapped store by a wall-clock budget
pub struct TimeoutStore<S> {
    inner: S,
    budget: Duration,
}

impl<S> TimeoutStore<S> {
    pub fn new(inner: S, budget: Duration) -> Self {
        Self { inner, budget }
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        match tokio::time::timeout(self.budget, fut).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    operation = operation,
                    budget_ms = self.budget.as_millis() as u64,
                    "Identity store round trip exceeded its budget"
                );
                Err(StoreError::Timeout(self.budget))
            }
        }
    }
}

#[async_trait]
impl<S: IdentityStore> IdentityStore for TimeoutStore<S> {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        self.bounded("find_by_email", self.inner.find_by_email(email)).await
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<Identity>, StoreError> {
        self.bounded("find_by_id", self.inner.find_by_id(user_id)).await
    }

    async fn create(&self, identity: &Identity) -> Result<(), StoreError> {
        self.bounded("create", self.inner.create(identity)).await
    }

    async fn update_tokens(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.bounded(
            "update_tokens",
            self.inner.update_tokens(user_id, access_token, refresh_token, updated_at),
        )
        .await
    }

    async fn count_by_email(&self, email: &str) -> Result<i64, StoreError> {
        self.bounded("count_by_email", self.inner.count_by_email(email)).await
    }

    async fn count_by_phone(&self, phone: &str) -> Result<i64, StoreError> {
        self.bounded("count_by_phone", self.inner.count_by_phone(phone)).await
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<(i64, Vec<Identity>), StoreError> {
        self.bounded("list", self.inner.list(offset, limit)).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    /// Single-connection in-memory database with the production schema
    pub async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::common::migrations::run_migrations(&pool)
            .await
            .unwrap();
        pool
    }

    pub fn sample_identity(user_id: &str, email: &str, role: Role) -> Identity {
        let now = Utc::now();
        Identity {
            user_id: user_id.to_string(),
            email: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone: Some(format!("555-{}", user_id)),
            password: "hash".to_string(),
            user_type: role,
            avatar: None,
            token: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }
}
