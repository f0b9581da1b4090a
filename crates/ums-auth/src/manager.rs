//! Authentication manager

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::AuthError;
use crate::password::PasswordEncoder;
use crate::user_details::{UserDetails, UserDetailsService};

/// Checks submitted credentials against stored users
#[derive(Clone)]
pub struct AuthenticationManager {
    users: Arc<dyn UserDetailsService>,
    encoder: PasswordEncoder,
    /// Hash verified when the username is unknown, so both paths cost the same
    dummy_hash: String,
}

impl AuthenticationManager {
    pub fn new(users: Arc<dyn UserDetailsService>, encoder: PasswordEncoder) -> Result<Self, AuthError> {
        let dummy_hash = encoder.encode("timing-attack-prevention")?;
        Ok(Self {
            users,
            encoder,
            dummy_hash,
        })
    }

    pub fn encoder(&self) -> PasswordEncoder {
        self.encoder
    }

    pub fn user_details(&self) -> &Arc<dyn UserDetailsService> {
        &self.users
    }

    /// Authenticate a username/password pair
    ///
    /// Unknown users, wrong passwords and disabled accounts all fail with
    /// [`AuthError::InvalidCredentials`].
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<UserDetails, AuthError> {
        debug!("Authentication attempt for user: {}", username);

        let user = self.users.load_user_by_username(username).await?;

        let hash = match &user {
            Some(u) => u.password_hash.clone(),
            None => self.dummy_hash.clone(),
        };

        let password_valid = self.verify(password, hash).await?;

        match user {
            Some(u) if password_valid && u.enabled => {
                metrics::counter!("ums_login_attempts_total", "outcome" => "success").increment(1);
                info!("User {} authenticated", u.username);
                Ok(u)
            }
            _ => {
                metrics::counter!("ums_login_attempts_total", "outcome" => "failure").increment(1);
                debug!("Authentication failed for user: {}", username);
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Hash a password on a blocking thread
    pub async fn encode_password(&self, password: &str) -> Result<String, AuthError> {
        let encoder = self.encoder;
        let password = password.to_string();
        tokio::task::spawn_blocking(move || encoder.encode(&password))
            .await
            .map_err(|e| AuthError::PasswordHash(format!("hashing task failed: {}", e)))?
    }

    async fn verify(&self, password: &str, hash: String) -> Result<bool, AuthError> {
        let encoder = self.encoder;
        let password = password.to_string();
        tokio::task::spawn_blocking(move || encoder.matches(&password, &hash))
            .await
            .map_err(|e| AuthError::PasswordHash(format!("verification task failed: {}", e)))?
    }
}
