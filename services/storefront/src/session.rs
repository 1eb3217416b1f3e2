//! Session management
//!
//! A session is the user's profile cached under an opaque bearer token. It is
//! the storefront's only notion of identity: whoever holds the token acts as
//! that user until logout or expiry.

use anyhow::anyhow;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use chrono::{DateTime, Utc};
use common::{StoreError, cache::SessionCache};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{ShopError, ShopResult},
    models::{LoginCredentials, RegisterRequest, Role, User, UserProfile},
    repositories::{UserRepository, user::MAX_WRITE_ATTEMPTS},
    validation::{validate_email, validate_name, validate_password},
};

/// A live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

/// Session store backed by the session cache
#[derive(Clone)]
pub struct SessionStore {
    users: UserRepository,
    cache: SessionCache,
    ttl_seconds: u64,
}

impl SessionStore {
    pub fn new(users: UserRepository, cache: SessionCache, ttl_seconds: u64) -> Self {
        Self {
            users,
            cache,
            ttl_seconds,
        }
    }

    fn key(token: &str) -> String {
        format!("session:{}", token)
    }

    async fn persist(&self, token: &str, profile: &UserProfile) -> ShopResult<()> {
        let blob = serde_json::to_string(profile).map_err(anyhow::Error::from)?;
        self.cache
            .set(&Self::key(token), &blob, Some(self.ttl_seconds))
            .await?;
        Ok(())
    }

    /// Check credentials and open a session
    ///
    /// Nothing is cached unless every check passes.
    pub async fn login(&self, credentials: &LoginCredentials) -> ShopResult<Session> {
        let email = credentials.email.trim();
        if email.is_empty() || credentials.password.is_empty() {
            return Err(ShopError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        info!("Login attempt for user: {}", email);

        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(ShopError::UserNotFound)?;

        if !verify_password(&user.password, &credentials.password)? {
            warn!("Invalid credentials for user: {}", email);
            return Err(ShopError::InvalidCredentials);
        }

        if user.is_blocked {
            warn!("Blocked user attempted to log in: {}", email);
            return Err(ShopError::UserBlocked);
        }

        let token = Uuid::new_v4().to_string();
        let profile = user.profile();
        self.persist(&token, &profile).await?;

        info!("User {} logged in", user.id);
        Ok(Session {
            token,
            user: profile,
        })
    }

    /// Create a new account; the caller still has to log in
    pub async fn register(&self, request: &RegisterRequest) -> ShopResult<UserProfile> {
        self.register_at(request, Utc::now()).await
    }

    async fn register_at(
        &self,
        request: &RegisterRequest,
        now: DateTime<Utc>,
    ) -> ShopResult<UserProfile> {
        let email = request.email.trim();

        validate_name(&request.name).map_err(ShopError::Validation)?;
        validate_email(email).map_err(ShopError::Validation)?;
        validate_password(&request.password).map_err(ShopError::Validation)?;

        if self.users.find_by_email(email).await?.is_some() {
            return Err(ShopError::UserExists);
        }

        let mut user = User {
            id: String::new(),
            name: request.name.trim().to_string(),
            email: email.to_string(),
            password: hash_password(&request.password)?,
            role: Role::User,
            is_blocked: false,
            cart: Vec::new(),
            wishlist: Vec::new(),
            orders: Vec::new(),
            address: None,
            created_at: Some(now),
            version: 0,
        };

        // Millisecond timestamp id, bumped past ids already taken
        let mut candidate = now.timestamp_millis();
        let mut attempt = 0;
        let created = loop {
            user.id = candidate.to_string();
            candidate += 1;
            if self.users.find_by_id(&user.id).await?.is_some() {
                continue;
            }

            attempt += 1;
            match self.users.create(&user).await {
                Ok(created) => break created,
                Err(StoreError::Status { status: 409, .. }) if attempt < MAX_WRITE_ATTEMPTS => {
                    warn!("User id {} was taken concurrently, retrying", user.id);
                }
                Err(e) => return Err(e.into()),
            }
        };
        info!("Registered user {}", created.id);
        Ok(created.profile())
    }

    pub async fn logout(&self, token: &str) -> ShopResult<()> {
        self.cache.delete(&Self::key(token)).await?;
        Ok(())
    }

    /// Cached session for a token, without touching the record store
    pub async fn load(&self, token: &str) -> ShopResult<Option<Session>> {
        let Some(blob) = self.cache.get(&Self::key(token)).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<UserProfile>(&blob) {
            Ok(user) => Ok(Some(Session {
                token: token.to_string(),
                user,
            })),
            Err(e) => {
                warn!("Dropping unreadable session blob: {}", e);
                self.logout(token).await?;
                Ok(None)
            }
        }
    }

    /// Cached session brought up to date with the user record
    ///
    /// Blocking, role changes and profile edits take effect on the next
    /// request instead of at the next login. A session whose user record is
    /// gone is dropped.
    pub async fn refresh(&self, token: &str) -> ShopResult<Option<Session>> {
        let Some(session) = self.load(token).await? else {
            return Ok(None);
        };

        match self.users.find_by_id(&session.user.id).await? {
            Some(user) => {
                let profile = user.profile();
                if profile != session.user {
                    self.persist(token, &profile).await?;
                }
                Ok(Some(Session {
                    token: session.token,
                    user: profile,
                }))
            }
            None => {
                warn!("Session user {} no longer exists", session.user.id);
                self.logout(token).await?;
                Ok(None)
            }
        }
    }
}

fn hash_password(password: &str) -> ShopResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(hash)
}

/// Verify against an Argon2 PHC string, or verbatim for legacy plaintext records
fn verify_password(stored: &str, candidate: &str) -> ShopResult<bool> {
    if !stored.starts_with("$argon2") {
        return Ok(stored == candidate);
    }

    let parsed_hash =
        PasswordHash::new(stored).map_err(|e| anyhow!("Failed to parse password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed_hash)
        .is_ok())
}
