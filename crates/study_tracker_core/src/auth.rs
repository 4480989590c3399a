//! crates/study_tracker_core/src/auth.rs
//!
//! Passwordless sign-in: a single-use link is mailed to the user, and
//! following it opens a browser session.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::AuthSession;
use crate::ports::{Clock, DatabaseService, MagicLinkSender, PortResult};
use crate::validation::EmailAddress;

/// Lifetimes and the base URL used to build sign-in links.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub base_url: String,
    pub magic_link_ttl: Duration,
    pub session_ttl: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            magic_link_ttl: Duration::minutes(15),
            session_ttl: Duration::days(7),
        }
    }
}

/// The link that was handed to the sender for one request.
#[derive(Debug, Clone)]
pub struct MagicLinkIssued {
    pub email: String,
    pub url: String,
}

#[derive(Clone)]
pub struct AuthService {
    db: Arc<dyn DatabaseService>,
    sender: Arc<dyn MagicLinkSender>,
    clock: Arc<dyn Clock>,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        sender: Arc<dyn MagicLinkSender>,
        clock: Arc<dyn Clock>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            db,
            sender,
            clock,
            settings,
        }
    }

    pub async fn request_magic_link(&self, email: &EmailAddress) -> PortResult<MagicLinkIssued> {
        let now = self.clock.now();
        self.purge_expired(now).await;

        let token = Uuid::new_v4().simple().to_string();
        let expires_at = now + self.settings.magic_link_ttl;
        self.db
            .create_magic_link(&token, email.as_str(), expires_at)
            .await?;

        let url = format!(
            "{}/auth/verify?token={}",
            self.settings.base_url.trim_end_matches('/'),
            token
        );
        self.sender.send_magic_link(email.as_str(), &url).await?;
        info!(email = email.as_str(), "Magic link issued");
        Ok(MagicLinkIssued {
            email: email.as_str().to_string(),
            url,
        })
    }

    /// Consumes the token and opens a session for its owner, creating the
    /// user on first sign-in.
    pub async fn verify_magic_link(&self, token: &str) -> PortResult<AuthSession> {
        let now = self.clock.now();
        let email = self.db.consume_magic_link(token, now).await?;
        let user = self.db.get_or_create_user_by_email(&email).await?;

        let session_id = Uuid::new_v4().to_string();
        let session = self
            .db
            .create_auth_session(&session_id, user.id, now + self.settings.session_ttl)
            .await?;
        info!(user_id = %user.id, "Signed in via magic link");
        Ok(session)
    }

    /// Resolves a session cookie to the user behind it.
    pub async fn authenticate(&self, session_id: &str) -> PortResult<Uuid> {
        self.db
            .validate_auth_session(session_id, self.clock.now())
            .await
    }

    pub async fn sign_out(&self, session_id: &str) -> PortResult<()> {
        self.db.delete_auth_session(session_id).await
    }

    pub fn session_ttl(&self) -> Duration {
        self.settings.session_ttl
    }

    /// Clears out spent links and sessions. Sign-in goes ahead even if this fails.
    async fn purge_expired(&self, now: DateTime<Utc>) {
        match self.db.purge_expired_auth(now).await {
            Ok(0) => {}
            Ok(removed) => debug!(removed, "Purged expired sign-in records"),
            Err(e) => warn!(error = ?e, "Failed to purge expired sign-in records"),
        }
    }
}
