//! Per-target login credentials.
//!
//! Held only for the duration of one target's run, never logged in full and
//! zeroed when dropped.

use serde::Deserialize;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

const REDACTED: &str = "***";

/// Username and secret for one target.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    username: String,
    #[serde(alias = "password")]
    secret: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// True when either half is blank.
    pub fn is_incomplete(&self) -> bool {
        self.username.trim().is_empty() || self.secret.is_empty()
    }

    /// Username safe for logs: `j***@example.com`, `a***`.
    pub fn masked_username(&self) -> String {
        let mut chars = self.username.chars();
        let Some(first) = chars.next() else {
            return REDACTED.to_string();
        };
        match self.username.split_once('@') {
            Some((_, domain)) => format!("{}{}@{}", first, REDACTED, domain),
            None => format!("{}{}", first, REDACTED),
        }
    }

    /// Remove every occurrence of the secret and the username from `message`.
    pub fn scrub(&self, message: &str) -> String {
        let mut scrubbed = message.to_string();
        if !self.secret.is_empty() {
            scrubbed = scrubbed.replace(&self.secret, REDACTED);
        }
        if !self.username.is_empty() {
            scrubbed = scrubbed.replace(&self.username, &self.masked_username());
        }
        scrubbed
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.masked_username())
            .field("secret", &REDACTED)
            .finish()
    }
}
