use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use log::info;
use rand::rngs::OsRng;
use std::sync::Arc;
use thiserror::Error;

use crate::{
    util::session_token, Database, DatabaseError, InnkeeperContext, InnkeeperEvent, NewSession,
    NewUser, PrimaryKey, SessionData, UpdatedUser, UserData,
};

pub struct Auth<Db> {
    context: InnkeeperContext<Db>,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// The account exists but cannot be used
    #[error("Account is deactivated")]
    AccountDisabled,
    #[error("An admin account already exists")]
    AdminExists,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

impl<Db> Auth<Db>
where
    Db: Database,
{
    const SESSION_DURATION_IN_DAYS: usize = 7;

    pub fn new(context: &InnkeeperContext<Db>) -> Self {
        Self {
            context: context.clone(),
            argon: Argon2::default(),
        }
    }

    /// Logs in a user, returning a new session
    pub async fn login(&self, credentials: Credentials) -> Result<SessionData, AuthError> {
        self.clear_expired().await?;

        let user = self
            .context
            .database
            .user_by_username(&credentials.username)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => AuthError::InvalidCredentials,
                err => AuthError::Db(err),
            })?;

        let stored_password = PasswordHash::parse(&user.password, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(credentials.password.as_bytes(), &stored_password)
            .map_err(|_| AuthError::InvalidCredentials)?;

        if !user.active {
            return Err(AuthError::AccountDisabled);
        }

        let expires_at = Utc::now() + Duration::days(Self::SESSION_DURATION_IN_DAYS as i64);

        let new_session = NewSession {
            token: session_token(),
            user_id: user.id,
            expires_at,
        };

        let new_session = self
            .context
            .database
            .create_session(new_session)
            .await
            .map_err(AuthError::Db)?;

        info!("User {} logged in", user.username);

        Ok(new_session)
    }

    /// Deletes the associated session, if it exists
    pub async fn logout(&self, token: &str) -> Result<(), DatabaseError> {
        self.context.database.delete_session_by_token(token).await
    }

    /// Creates a basic user
    pub async fn register(&self, new_user: NewPlainUser) -> Result<UserData, AuthError> {
        self.create_user(new_user, false).await
    }

    /// Creates an admin, if one doesn't already exist
    pub async fn register_admin(&self, new_user: NewPlainUser) -> Result<UserData, AuthError> {
        let has_admin = self
            .context
            .database
            .check_for_admin()
            .await
            .map_err(AuthError::Db)?;

        if has_admin {
            return Err(AuthError::AdminExists);
        }

        self.create_user(new_user, true).await
    }

    /// Updates a user's profile, re-hashing the password if one is supplied
    pub async fn update_profile(
        &self,
        updated_user: UpdatedProfile,
    ) -> Result<UserData, AuthError> {
        let password = updated_user
            .password
            .map(|p| self.hash_password(&p))
            .transpose()?;

        self.context
            .database
            .update_user(UpdatedUser {
                id: updated_user.id,
                first_name: updated_user.first_name,
                last_name: updated_user.last_name,
                phone: updated_user.phone,
                password,
                active: None,
            })
            .await
            .map_err(AuthError::Db)
    }

    /// Deletes a user completely, along with their sessions and bookings
    pub async fn delete_user(&self, user_id: PrimaryKey) -> Result<(), DatabaseError> {
        self.context.database.delete_user(user_id).await
    }

    /// Returns a session if it exists
    pub async fn session(&self, token: &str) -> Result<SessionData, DatabaseError> {
        self.context.database.session_by_token(token).await
    }

    async fn create_user(
        &self,
        new_user: NewPlainUser,
        admin: bool,
    ) -> Result<UserData, AuthError> {
        let hashed_password = self.hash_password(&new_user.password)?;

        let user = self
            .context
            .database
            .create_user(NewUser {
                username: new_user.username,
                email: new_user.email,
                password: hashed_password,
                first_name: new_user.first_name,
                last_name: new_user.last_name,
                phone: new_user.phone,
                admin,
            })
            .await
            .map_err(AuthError::Db)?;

        info!("User {} registered", user.username);
        self.context
            .emit(InnkeeperEvent::UserRegistered { user_id: user.id });

        Ok(user)
    }

    fn hash_password(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::HashError(e.to_string()))
    }

    async fn clear_expired(&self) -> Result<(), AuthError> {
        self.context
            .database
            .clear_expired_sessions()
            .await
            .map_err(AuthError::Db)
    }
}

#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug)]
pub struct NewPlainUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug)]
pub struct UpdatedProfile {
    pub id: PrimaryKey,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    /// Plaintext, hashed before it reaches the database
    pub password: Option<String>,
}

#[cfg(test)]
mod test {
    use crate::{AuthError, Credentials, Innkeeper, MemoryDatabase, NewPlainUser};

    fn plain_user(username: &str) -> NewPlainUser {
        NewPlainUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "hunter22".to_string(),
            first_name: None,
            last_name: None,
            phone: None,
        }
    }

    #[tokio::test]
    async fn register_and_login() {
        let innkeeper = Innkeeper::new(MemoryDatabase::new());

        let user = innkeeper.auth.register(plain_user("john")).await.unwrap();
        assert_ne!(user.password, "hunter22", "plaintext must not be stored");

        let session = innkeeper
            .auth
            .login(Credentials {
                username: "john".to_string(),
                password: "hunter22".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(session.user.id, user.id);

        let resolved = innkeeper.auth.session(&session.token).await.unwrap();
        assert_eq!(resolved.user.username, "john");

        innkeeper.auth.logout(&session.token).await.unwrap();
        assert!(innkeeper.auth.session(&session.token).await.is_err());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let innkeeper = Innkeeper::new(MemoryDatabase::new());
        innkeeper.auth.register(plain_user("mary")).await.unwrap();

        let result = innkeeper
            .auth
            .login(Credentials {
                username: "mary".to_string(),
                password: "not-the-password".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let innkeeper = Innkeeper::new(MemoryDatabase::new());
        innkeeper.auth.register(plain_user("sam")).await.unwrap();

        let mut duplicate = plain_user("sam");
        duplicate.email = "other@example.com".to_string();

        let result = innkeeper.auth.register(duplicate).await;
        assert!(matches!(
            result,
            Err(AuthError::Db(crate::DatabaseError::Conflict { .. }))
        ));
    }

    #[tokio::test]
    async fn only_one_admin_can_be_bootstrapped() {
        let innkeeper = Innkeeper::new(MemoryDatabase::new());

        let admin = innkeeper
            .auth
            .register_admin(plain_user("admin"))
            .await
            .unwrap();
        assert!(admin.admin);

        let result = innkeeper.auth.register_admin(plain_user("admin2")).await;
        assert!(matches!(result, Err(AuthError::AdminExists)));
    }
}
