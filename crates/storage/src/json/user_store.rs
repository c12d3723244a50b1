use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use qbank_core::Clock;
use qbank_core::model::Username;

use super::mapping::{UserRecord, ser};
use super::{read_optional, write_replacing};
use crate::repository::{StorageError, UserDirectory, UserStore};

/// `users.json`: one object keyed by username.
///
/// Every write re-serializes the whole mapping. A missing file reads as no
/// users. Records are decoded one at a time: an entry with a bad name or a
/// damaged account is skipped with a warning, so one corrupt record does not
/// lock out every other user.
#[derive(Debug, Clone)]
pub struct JsonUserStore {
    path: PathBuf,
    clock: Clock,
}

impl JsonUserStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            clock: Clock::system(),
        }
    }

    /// Clock used to stamp `last_saved`.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl UserStore for JsonUserStore {
    async fn read_all(&self) -> Result<UserDirectory, StorageError> {
        let Some(raw) = read_optional(&self.path).await? else {
            tracing::debug!(path = %self.path.display(), "user store missing, starting empty");
            return Ok(UserDirectory::new());
        };
        let records: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(&raw).map_err(ser)?;

        let mut users = UserDirectory::new();
        for (name, record) in records {
            let username = match Username::new(name.as_str()) {
                Ok(u) => u,
                Err(err) => {
                    tracing::warn!(key = %name, error = %err, "skipping user with invalid name");
                    continue;
                }
            };
            let account = serde_json::from_value::<UserRecord>(record)
                .map_err(ser)
                .and_then(|record| record.into_account(username.clone()));
            match account {
                Ok(account) => {
                    users.insert(username, account);
                }
                Err(err) => {
                    tracing::warn!(user = %username, error = %err, "skipping unreadable account");
                }
            }
        }
        Ok(users)
    }

    async fn write_all(&self, users: &UserDirectory) -> Result<(), StorageError> {
        let saved_at = self.clock.now();
        let records = users
            .iter()
            .map(|(name, account)| {
                Ok((name.as_str(), UserRecord::from_account(account, saved_at)?))
            })
            .collect::<Result<BTreeMap<_, _>, StorageError>>()?;
        let body = serde_json::to_vec_pretty(&records).map_err(ser)?;
        write_replacing(&self.path, &body).await?;
        tracing::debug!(path = %self.path.display(), users = users.len(), "wrote user store");
        Ok(())
    }
}
