//! Database operations for the users and sessions tables.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use fairway_engine::{Principal, Role};
use sqlx::{PgPool, Row};

/// A stored user row from the database.
#[derive(Debug)]
pub struct StoredUser {
    pub uid: String,
    pub login_name: String,
    pub email: Option<String>,
    pub player_reg: Option<String>,
    pub role: String,
    /// Argon2 hash in PHC string format
    pub password_hash: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredUser {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredUser {
            uid: row.try_get("uid")?,
            login_name: row.try_get("login_name")?,
            email: row.try_get("email")?,
            player_reg: row.try_get("player_reg")?,
            role: row.try_get("role")?,
            password_hash: row.try_get("password_hash")?,
        })
    }
}

impl StoredUser {
    pub fn to_principal(&self) -> Principal {
        Principal {
            uid: self.uid.clone(),
            login_name: self.login_name.clone(),
            email: self.email.clone(),
            player_reg: self.player_reg.clone(),
        }
    }

    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }

    /// Check a sign-in secret against the stored hash.
    ///
    /// An unparseable stored hash never verifies.
    pub fn verify(&self, secret: &str) -> bool {
        match PasswordHash::new(&self.password_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(uid = %self.uid, "stored password hash is invalid: {}", e);
                false
            }
        }
    }
}

/// Argon2id hash of a secret with a fresh random salt, as a PHC string.
pub fn hash_secret(secret: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(secret.as_bytes(), &salt)?
        .to_string())
}

const USER_COLUMNS: &str = "uid, login_name, email, player_reg, role, password_hash";

/// Find a user by login name: exact match first, then uppercased.
///
/// Player accounts sign in with their registration number, which is stored
/// uppercase.
pub async fn find_user_by_login(
    pool: &PgPool,
    identifier: &str,
) -> Result<Option<StoredUser>, sqlx::Error> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE login_name = $1");

    if let Some(user) = sqlx::query_as::<_, StoredUser>(&query)
        .bind(identifier)
        .fetch_optional(pool)
        .await?
    {
        return Ok(Some(user));
    }

    let upper = identifier.to_uppercase();
    if upper == identifier {
        return Ok(None);
    }
    sqlx::query_as::<_, StoredUser>(&query)
        .bind(upper)
        .fetch_optional(pool)
        .await
}

pub async fn find_user_by_uid(pool: &PgPool, uid: &str) -> Result<Option<StoredUser>, sqlx::Error> {
    sqlx::query_as::<_, StoredUser>(&format!("SELECT {USER_COLUMNS} FROM users WHERE uid = $1"))
        .bind(uid)
        .fetch_optional(pool)
        .await
}

/// Fields for provisioning a new account.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub login_name: &'a str,
    pub email: Option<&'a str>,
    pub player_reg: Option<&'a str>,
    pub role: Role,
    /// Output of [`hash_secret`]
    pub password_hash: String,
}

/// Insert a user, returning the stored row.
pub async fn insert_user(pool: &PgPool, user: NewUser<'_>) -> Result<StoredUser, sqlx::Error> {
    let uid = uuid::Uuid::new_v4().to_string();

    sqlx::query_as::<_, StoredUser>(&format!(
        r#"
        INSERT INTO users (uid, login_name, email, player_reg, role, password_hash)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&uid)
    .bind(user.login_name)
    .bind(user.email)
    .bind(user.player_reg.map(str::to_uppercase))
    .bind(user.role.as_str())
    .bind(&user.password_hash)
    .fetch_one(pool)
    .await
}

/// Create the admin account `login_name`, or promote it and reset its secret
/// if it already exists.
pub async fn ensure_admin(
    pool: &PgPool,
    login_name: &str,
    password_hash: &str,
) -> Result<StoredUser, sqlx::Error> {
    let uid = uuid::Uuid::new_v4().to_string();

    sqlx::query_as::<_, StoredUser>(&format!(
        r#"
        INSERT INTO users (uid, login_name, role, password_hash)
        VALUES ($1, $2, 'admin', $3)
        ON CONFLICT (login_name) DO UPDATE SET
            role = 'admin',
            password_hash = EXCLUDED.password_hash
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&uid)
    .bind(login_name)
    .bind(password_hash)
    .fetch_one(pool)
    .await
}

/// Open a session for `uid` and return its bearer token.
pub async fn create_session(pool: &PgPool, uid: &str) -> Result<String, sqlx::Error> {
    let token = uuid::Uuid::new_v4().simple().to_string();

    sqlx::query("INSERT INTO sessions (token, uid) VALUES ($1, $2)")
        .bind(&token)
        .bind(uid)
        .execute(pool)
        .await?;

    Ok(token)
}

/// The user owning a session token.
pub async fn user_for_token(pool: &PgPool, token: &str) -> Result<Option<StoredUser>, sqlx::Error> {
    sqlx::query_as::<_, StoredUser>(
        r#"
        SELECT u.uid, u.login_name, u.email, u.player_reg, u.role, u.password_hash
        FROM sessions s
        JOIN users u ON u.uid = s.uid
        WHERE s.token = $1
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await
}

pub async fn delete_session(pool: &PgPool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}
