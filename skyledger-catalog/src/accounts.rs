use rand::RngCore;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use skyledger_core::access::require;
use skyledger_core::catalog::{NewUserRecord, UserAccount};
use skyledger_core::{BookingError, BookingResult, Masked, Operation, Role};
use skyledger_store::SqliteUsers;

const SALT_BYTES: usize = 16;

/// Hex SHA-256 of `salt` followed by `password`.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// 16 random bytes, hex-encoded.
pub fn generate_salt<R: RngCore + ?Sized>(rng: &mut R) -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: Masked<String>,
    pub role: Role,
}

/// A new password gets a new salt.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub password: Option<Masked<String>>,
    pub role: Option<Role>,
}

fn check_username(username: &str) -> BookingResult<()> {
    if username.trim().is_empty() {
        return Err(BookingError::validation("username must not be empty"));
    }
    Ok(())
}

fn check_password(password: &str) -> BookingResult<()> {
    if password.is_empty() {
        return Err(BookingError::validation("password must not be empty"));
    }
    Ok(())
}

fn record(username: String, password: &str, role: Role) -> NewUserRecord {
    let salt = generate_salt(&mut rand::thread_rng());
    NewUserRecord {
        username,
        password_hash: Masked(hash_password(password, &salt)),
        salt,
        role,
    }
}

/// Administrator-managed user accounts and password login.
#[derive(Clone)]
pub struct AccountService {
    users: SqliteUsers,
}

impl AccountService {
    pub fn new(users: SqliteUsers) -> Self {
        Self { users }
    }

    pub async fn add_user(&self, role: Option<Role>, input: NewUser) -> BookingResult<UserAccount> {
        require(role, Operation::AddUser)?;
        check_username(&input.username)?;
        check_password(input.password.expose())?;
        self.users
            .create(&record(input.username, input.password.expose(), input.role))
            .await
    }

    pub async fn list_users(&self, role: Option<Role>) -> BookingResult<Vec<UserAccount>> {
        require(role, Operation::ListUsers)?;
        self.users.list().await
    }

    pub async fn update_user(&self, role: Option<Role>, id: i64, patch: UserPatch) -> BookingResult<UserAccount> {
        require(role, Operation::UpdateUser)?;
        let current = self
            .users
            .get(id)
            .await?
            .ok_or_else(|| BookingError::not_found("user", id))?;

        let username = patch.username.unwrap_or(current.username);
        check_username(&username)?;
        let role = patch.role.unwrap_or(current.role);

        let updated = match patch.password {
            Some(password) => {
                check_password(password.expose())?;
                record(username, password.expose(), role)
            }
            None => NewUserRecord {
                username,
                password_hash: current.password_hash,
                salt: current.salt,
                role,
            },
        };
        self.users.update(id, &updated).await
    }

    pub async fn delete_user(&self, role: Option<Role>, id: i64) -> BookingResult<()> {
        require(role, Operation::DeleteUser)?;
        self.users.delete(id).await
    }

    /// Unknown user and wrong password fail the same way.
    pub async fn authenticate(&self, username: &str, password: &str) -> BookingResult<UserAccount> {
        let denied = || BookingError::Unauthenticated("invalid username or password".to_string());

        let Some(user) = self.users.find_by_username(username).await? else {
            warn!("Login failed for unknown user");
            return Err(denied());
        };
        if hash_password(password, &user.salt) != *user.password_hash.expose() {
            warn!("Login failed for user {}", user.username);
            return Err(denied());
        }
        info!("User {} logged in as {}", user.username, user.role);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use skyledger_store::DbClient;

    async fn accounts() -> AccountService {
        let db = DbClient::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        AccountService::new(SqliteUsers::new(db.pool))
    }

    fn new_user(name: &str, password: &str, role: Role) -> NewUser {
        NewUser {
            username: name.into(),
            password: Masked(password.into()),
            role,
        }
    }

    #[test]
    fn test_hash_depends_on_salt() {
        let a = hash_password("hunter2", "00");
        let b = hash_password("hunter2", "01");
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(a, hash_password("hunter2", "00"));
    }

    #[test]
    fn test_salt_is_sixteen_bytes_hex() {
        let mut rng = StdRng::seed_from_u64(1);
        let salt = generate_salt(&mut rng);
        assert_eq!(salt.len(), SALT_BYTES * 2);
        assert!(salt.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_login_round_trip() {
        let accounts = accounts().await;
        let admin = Some(Role::Admin);
        let user = accounts.add_user(admin, new_user("agent", "s3cret", Role::Staff)).await.unwrap();
        assert_eq!(user.role, Role::Staff);

        let logged_in = accounts.authenticate("agent", "s3cret").await.unwrap();
        assert_eq!(logged_in.id, user.id);
        assert!(matches!(
            accounts.authenticate("agent", "wrong").await,
            Err(BookingError::Unauthenticated(_))
        ));
        assert!(matches!(
            accounts.authenticate("nobody", "s3cret").await,
            Err(BookingError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn test_password_change_resalts() {
        let accounts = accounts().await;
        let admin = Some(Role::Admin);
        let user = accounts.add_user(admin, new_user("agent", "old", Role::Staff)).await.unwrap();

        let renamed = accounts
            .update_user(admin, user.id, UserPatch { username: Some("agent2".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(renamed.salt, user.salt);
        accounts.authenticate("agent2", "old").await.unwrap();

        let changed = accounts
            .update_user(admin, user.id, UserPatch { password: Some(Masked("new".into())), ..Default::default() })
            .await
            .unwrap();
        assert_ne!(changed.salt, user.salt);
        accounts.authenticate("agent2", "new").await.unwrap();
        assert!(accounts.authenticate("agent2", "old").await.is_err());
    }

    #[tokio::test]
    async fn test_user_management_is_admin_only() {
        let accounts = accounts().await;
        assert!(matches!(
            accounts.add_user(Some(Role::Staff), new_user("x", "y", Role::Customer)).await,
            Err(BookingError::Forbidden { .. })
        ));
        assert!(matches!(accounts.list_users(None).await, Err(BookingError::Forbidden { .. })));
        assert!(matches!(
            accounts.add_user(Some(Role::Admin), new_user("x", "", Role::Customer)).await,
            Err(BookingError::Validation(_))
        ));
    }
}
