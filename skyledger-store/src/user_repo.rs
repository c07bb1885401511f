use sqlx::SqlitePool;
use tracing::info;

use skyledger_core::catalog::{NewUserRecord, UserAccount};
use skyledger_core::{BookingError, BookingResult, Masked, Role};

use crate::error::{storage, write_error};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    salt: String,
    role: String,
}

impl TryFrom<UserRow> for UserAccount {
    type Error = BookingError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(UserAccount {
            id: r.id,
            username: r.username,
            role: r.role.parse::<Role>()?,
            password_hash: Masked(r.password_hash),
            salt: r.salt,
        })
    }
}

const USER_COLUMNS: &str = "SELECT id, username, password_hash, salt, role FROM user_account";

#[derive(Clone)]
pub struct SqliteUsers {
    pool: SqlitePool,
}

impl SqliteUsers {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user: &NewUserRecord) -> BookingResult<UserAccount> {
        let id = sqlx::query("INSERT INTO user_account (username, password_hash, salt, role) VALUES (?, ?, ?, ?)")
            .bind(user.username.trim())
            .bind(user.password_hash.expose())
            .bind(&user.salt)
            .bind(user.role.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("user", e))?
            .last_insert_rowid();

        info!("Created user {} with role {}", user.username.trim(), user.role);
        self.get(id).await?.ok_or_else(|| BookingError::not_found("user", id))
    }

    pub async fn get(&self, id: i64) -> BookingResult<Option<UserAccount>> {
        let sql = format!("{} WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(UserAccount::try_from).transpose()
    }

    pub async fn find_by_username(&self, username: &str) -> BookingResult<Option<UserAccount>> {
        let sql = format!("{} WHERE username = ?", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(UserAccount::try_from).transpose()
    }

    pub async fn list(&self) -> BookingResult<Vec<UserAccount>> {
        let sql = format!("{} ORDER BY username", USER_COLUMNS);
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        rows.into_iter().map(UserAccount::try_from).collect()
    }

    pub async fn update(&self, id: i64, user: &NewUserRecord) -> BookingResult<UserAccount> {
        let updated = sqlx::query("UPDATE user_account SET username = ?, password_hash = ?, salt = ?, role = ? WHERE id = ?")
            .bind(user.username.trim())
            .bind(user.password_hash.expose())
            .bind(&user.salt)
            .bind(user.role.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("user", e))?
            .rows_affected();
        if updated == 0 {
            return Err(BookingError::not_found("user", id));
        }
        self.get(id).await?.ok_or_else(|| BookingError::not_found("user", id))
    }

    pub async fn delete(&self, id: i64) -> BookingResult<()> {
        let deleted = sqlx::query("DELETE FROM user_account WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage)?
            .rows_affected();
        if deleted == 0 {
            return Err(BookingError::not_found("user", id));
        }
        info!("Deleted user {}", id);
        Ok(())
    }
}
