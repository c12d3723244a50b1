use std::fmt;

use chrono::{DateTime, Utc};

use crate::model::ids::Username;
use crate::model::progress::UserProgress;

/// Opaque password digest. Produced and checked by whoever hashes passwords.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    #[must_use]
    pub fn new(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(***)")
    }
}

/// A registered user and the progress they own.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub username: Username,
    pub password_hash: PasswordHash,
    pub created_at: DateTime<Utc>,
    pub progress: UserProgress,
}

impl UserAccount {
    /// A fresh account with empty progress.
    #[must_use]
    pub fn new(username: Username, password_hash: PasswordHash, created_at: DateTime<Utc>) -> Self {
        Self {
            username,
            password_hash,
            created_at,
            progress: UserProgress::new(),
        }
    }
}
