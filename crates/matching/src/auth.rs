//! Registration, email verification and bearer sessions.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use db::models::{AccountRow, NewAccount};
use db::{DbError, Store};
use realtime::{AuthEventKind, AuthEvents};

use crate::notifier::Notifier;
use crate::settings::AuthSettings;
use crate::{validation, MatchingError};

/// Sign-up form.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignUpOutcome {
    pub user_id: Uuid,
    pub email: String,
    /// Outside the service area: stored, but no code was sent.
    pub waitlisted: bool,
    pub verification_expires_at: Option<DateTime<Utc>>,
}

/// An authenticated session as handed to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    events: AuthEvents,
    notifier: Arc<dyn Notifier>,
    settings: AuthSettings,
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

fn random_hex() -> String {
    Uuid::new_v4().simple().to_string()
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn new_verification_code() -> String {
    format!("{:06}", Uuid::new_v4().as_u128() % 1_000_000)
}

fn new_session_token() -> String {
    random_hex() + &random_hex()
}

impl AuthService {
    pub fn new(
        store: Arc<dyn Store>,
        events: AuthEvents,
        notifier: Arc<dyn Notifier>,
        settings: AuthSettings,
    ) -> Self {
        Self { store, events, notifier, settings }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Create an account.  Inside the service area a verification code is
    /// sent; outside it the account is waitlisted.
    #[instrument(skip_all, fields(email = %form.email))]
    pub async fn sign_up(&self, form: Registration) -> Result<SignUpOutcome, MatchingError> {
        let first_name = validation::name("first_name", &form.first_name)?;
        let last_name = validation::name("last_name", &form.last_name)?;
        let email = validation::email(&form.email)?;
        validation::password(&form.password)?;
        let postal_code = validation::postal_code(&form.postal_code)?;

        if self.store.find_account_by_email(&email).await?.is_some() {
            return Err(MatchingError::Conflict("an account with this email already exists".into()));
        }

        let waitlisted = !self.settings.service_area.contains(&postal_code);
        let (code, expires_at) = if waitlisted {
            (None, None)
        } else {
            let expires_at = Utc::now() + Duration::minutes(self.settings.verification_ttl_minutes);
            (Some(new_verification_code()), Some(expires_at))
        };

        let salt = random_hex();
        let account = self
            .store
            .create_account(NewAccount {
                email: email.clone(),
                password_hash: hash_password(&salt, &form.password),
                password_salt: salt,
                verification_code: code.clone(),
                verification_expires_at: expires_at,
                waitlisted,
                first_name,
                last_name,
                postal_code,
            })
            .await?;

        if let (Some(code), Some(expires_at)) = (code, expires_at) {
            self.notifier.send_verification_code(&email, &code, expires_at).await?;
            info!(user_id = %account.id, "account created, verification pending");
        } else {
            info!(user_id = %account.id, "account created outside the service area, waitlisted");
        }

        Ok(SignUpOutcome {
            user_id: account.id,
            email,
            waitlisted,
            verification_expires_at: expires_at,
        })
    }

    /// Check a six-digit code and open the first session.
    #[instrument(skip(self, code))]
    pub async fn verify(&self, email: &str, code: &str) -> Result<Session, MatchingError> {
        let email = validation::email(email)?;
        let code = validation::verification_code(code)?;
        let invalid = || MatchingError::validation("code", "invalid or expired verification code");

        let account = self.store.find_account_by_email(&email).await?.ok_or_else(invalid)?;
        if account.verified_at.is_some() {
            return Err(MatchingError::Conflict("account is already verified".into()));
        }
        if account.waitlisted {
            return Err(MatchingError::forbidden("we do not serve your area yet"));
        }
        let expired = account.verification_expires_at.map_or(true, |at| Utc::now() >= at);
        if account.verification_code.as_deref() != Some(code.as_str()) || expired {
            warn!(user_id = %account.id, expired, "verification failed");
            return Err(invalid());
        }

        let account = self.store.mark_verified(account.id, Utc::now()).await?;
        info!(user_id = %account.id, "account verified");
        self.open_session(&account).await
    }

    /// Issue a fresh code, replacing the previous one.
    #[instrument(skip(self))]
    pub async fn resend_verification(&self, email: &str) -> Result<DateTime<Utc>, MatchingError> {
        let email = validation::email(email)?;
        let account = self
            .store
            .find_account_by_email(&email)
            .await?
            .ok_or(MatchingError::NotFound("account"))?;
        if account.verified_at.is_some() {
            return Err(MatchingError::Conflict("account is already verified".into()));
        }
        if account.waitlisted {
            return Err(MatchingError::forbidden("we do not serve your area yet"));
        }

        let code = new_verification_code();
        let expires_at = Utc::now() + Duration::minutes(self.settings.verification_ttl_minutes);
        self.store.set_verification_code(account.id, &code, expires_at).await?;
        self.notifier.send_verification_code(&email, &code, expires_at).await?;
        Ok(expires_at)
    }

    /// Wrong email and wrong password are indistinguishable to the caller.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, MatchingError> {
        let email = email.trim().to_lowercase();
        let account = self
            .store
            .find_account_by_email(&email)
            .await?
            .ok_or(MatchingError::Unauthorized)?;
        if hash_password(&account.password_salt, password) != account.password_hash {
            warn!(user_id = %account.id, "sign-in with wrong password");
            return Err(MatchingError::Unauthorized);
        }
        if account.waitlisted {
            return Err(MatchingError::forbidden("we do not serve your area yet"));
        }
        if account.verified_at.is_none() {
            return Err(MatchingError::forbidden("email address is not verified"));
        }
        self.open_session(&account).await
    }

    /// Resolve a bearer token.
    pub async fn get_session(&self, token: &str) -> Result<Session, MatchingError> {
        let session = self
            .store
            .find_session(token)
            .await?
            .ok_or(MatchingError::Unauthorized)?;
        if session.expires_at <= Utc::now() {
            return Err(MatchingError::Unauthorized);
        }
        let account = self.store.get_account(session.user_id).await.map_err(|err| match err {
            DbError::NotFound => MatchingError::Unauthorized,
            other => other.into(),
        })?;
        Ok(Session {
            token: session.token,
            user_id: session.user_id,
            email: account.email,
            expires_at: session.expires_at,
        })
    }

    #[instrument(skip_all, fields(user_id = %session.user_id))]
    pub async fn sign_out(&self, session: &Session) -> Result<(), MatchingError> {
        self.store.delete_session(&session.token).await.map_err(|err| match err {
            DbError::NotFound => MatchingError::Unauthorized,
            other => other.into(),
        })?;
        self.events.publish(session.user_id, AuthEventKind::SignedOut);
        info!("signed out");
        Ok(())
    }

    async fn open_session(&self, account: &AccountRow) -> Result<Session, MatchingError> {
        let expires_at = Utc::now() + Duration::hours(self.settings.session_ttl_hours);
        let row = self
            .store
            .create_session(account.id, &new_session_token(), expires_at)
            .await?;
        self.events.publish(account.id, AuthEventKind::SignedIn);
        info!(user_id = %account.id, "session opened");
        Ok(Session {
            token: row.token,
            user_id: row.user_id,
            email: account.email.clone(),
            expires_at: row.expires_at,
        })
    }
}
