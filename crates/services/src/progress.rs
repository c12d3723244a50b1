use std::sync::Arc;

use qbank_core::model::{UserProgress, Username};
use storage::UserStore;

use crate::context::SessionContext;
use crate::error::PersistenceError;

/// Reads and checkpoints per-user progress against a whole-mapping store.
#[derive(Clone)]
pub struct ProgressStore {
    users: Arc<dyn UserStore>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Stored progress for `username`, as read at login.
    ///
    /// Never fails: an unreadable store or an unknown user yields empty
    /// progress so login is not blocked.
    pub async fn load(&self, username: &Username) -> UserProgress {
        match self.users.read_all().await {
            Ok(mut users) => match users.remove(username) {
                Some(account) => account.progress,
                None => {
                    tracing::warn!(%username, "no stored account, using empty progress");
                    UserProgress::default()
                }
            },
            Err(err) => {
                tracing::warn!(%username, error = %err, "progress unreadable, using empty progress");
                UserProgress::default()
            }
        }
    }

    /// Flush the context's progress to durable storage.
    ///
    /// Re-reads the whole mapping, replaces this user's progress, and writes
    /// the mapping back. Concurrent writers race; the last write wins.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the store cannot be read or written, or
    /// holds no account for the user.
    pub async fn checkpoint(&self, ctx: &SessionContext) -> Result<(), PersistenceError> {
        let username = ctx.username();
        let mut users = self
            .users
            .read_all()
            .await
            .map_err(|source| PersistenceError::Read {
                username: username.clone(),
                source,
            })?;
        let Some(account) = users.get_mut(username) else {
            return Err(PersistenceError::MissingAccount(username.clone()));
        };
        account.progress = ctx.progress().clone();

        self.users
            .write_all(&users)
            .await
            .map_err(|source| PersistenceError::Write {
                username: username.clone(),
                source,
            })?;
        tracing::info!(
            %username,
            attempted = ctx.progress().attempted().len(),
            marked = ctx.progress().marked().len(),
            "progress checkpointed"
        );
        Ok(())
    }
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStore").finish_non_exhaustive()
    }
}
