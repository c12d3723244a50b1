use std::sync::Arc;

use sha2::{Digest, Sha256};

use qbank_core::Clock;
use qbank_core::model::{PasswordHash, UserAccount, Username};
use storage::UserStore;

use crate::context::SessionContext;
use crate::error::AccountError;
use crate::progress::ProgressStore;

/// Turns a password into the stored digest and checks candidates against it.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> PasswordHash;

    fn verify(&self, password: &str, stored: &PasswordHash) -> bool {
        self.hash(password).as_str() == stored.as_str()
    }
}

/// Unsalted hex-encoded SHA-256, the digest existing user files carry.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256PasswordHasher;

impl PasswordHasher for Sha256PasswordHasher {
    fn hash(&self, password: &str) -> PasswordHash {
        PasswordHash::new(hex::encode(Sha256::digest(password.as_bytes())))
    }
}

/// Signup, login and logout.
#[derive(Clone)]
pub struct AccountService {
    clock: Clock,
    users: Arc<dyn UserStore>,
    progress: ProgressStore,
    hasher: Arc<dyn PasswordHasher>,
}

impl AccountService {
    #[must_use]
    pub fn new(clock: Clock, users: Arc<dyn UserStore>) -> Self {
        Self {
            clock,
            progress: ProgressStore::new(Arc::clone(&users)),
            users,
            hasher: Arc::new(Sha256PasswordHasher),
        }
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Register a new account with empty progress.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidUsername` or `EmptyPassword` for bad
    /// input, `UsernameTaken` if the name exists, or `Storage` if the store
    /// cannot be read or written.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserAccount, AccountError> {
        let username = Username::new(username)?;
        if password.is_empty() {
            return Err(AccountError::EmptyPassword);
        }
        let mut users = self.users.read_all().await?;
        if users.contains_key(&username) {
            return Err(AccountError::UsernameTaken(username));
        }

        let account = UserAccount::new(
            username.clone(),
            self.hasher.hash(password),
            self.clock.now(),
        );
        users.insert(username.clone(), account.clone());
        self.users.write_all(&users).await?;
        tracing::info!(%username, "account created");
        Ok(account)
    }

    /// Authenticate and open a session context holding the stored progress.
    ///
    /// Progress is read through [`ProgressStore::load`] once the password
    /// checks out, so a progress read failure degrades to empty progress
    /// instead of rejecting the login.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::UnknownUser`, `InvalidPassword`, or `Storage`
    /// if the store cannot be read.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionContext, AccountError> {
        let username = Username::new(username)?;
        let users = self.users.read_all().await?;
        let Some(account) = users.get(&username) else {
            return Err(AccountError::UnknownUser(username));
        };
        if !self.hasher.verify(password, &account.password_hash) {
            tracing::warn!(%username, "login rejected");
            return Err(AccountError::InvalidPassword);
        }

        let progress = self.progress.load(&username).await;
        tracing::info!(%username, attempted = progress.attempted().len(), "logged in");
        Ok(SessionContext::new(username, progress, self.clock.now()))
    }

    /// Final checkpoint, then drop the context.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Persistence` if the checkpoint fails. The
    /// context is dropped either way; to retry a failed save, checkpoint
    /// through [`AccountService::progress_store`] before logging out.
    pub async fn logout(&self, ctx: SessionContext) -> Result<(), AccountError> {
        self.progress.checkpoint(&ctx).await?;
        tracing::info!(username = %ctx.username(), "logged out");
        Ok(())
    }

    #[must_use]
    pub fn progress_store(&self) -> &ProgressStore {
        &self.progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_digest_matches_known_vector() {
        let hash = Sha256PasswordHasher.hash("password");
        assert_eq!(
            hash.as_str(),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
        assert!(Sha256PasswordHasher.verify("password", &hash));
        assert!(!Sha256PasswordHasher.verify("Password", &hash));
    }
}
