//! services/api/src/adapters/mailer.rs
//!
//! The `MagicLinkSender` adapter. Delivery is handed to the log; wiring a
//! real mail provider means adding another implementation of the port.

use async_trait::async_trait;
use study_tracker_core::ports::{MagicLinkSender, PortResult};
use tracing::info;

/// Writes each sign-in link to the application log instead of mailing it.
#[derive(Clone, Debug, Default)]
pub struct LogMailer;

impl LogMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MagicLinkSender for LogMailer {
    async fn send_magic_link(&self, email: &str, url: &str) -> PortResult<()> {
        info!(%email, %url, "Magic link ready for delivery");
        Ok(())
    }
}
