use chrono::{DateTime, Utc};

use qbank_core::model::{UserProgress, Username};

/// The signed-in user and their in-memory progress.
///
/// Created by `AccountService::login`, handed to every quiz operation, and
/// consumed by `AccountService::logout`. Nothing else holds user state.
#[derive(Debug, Clone)]
pub struct SessionContext {
    username: Username,
    progress: UserProgress,
    logged_in_at: DateTime<Utc>,
}

impl SessionContext {
    #[must_use]
    pub fn new(username: Username, progress: UserProgress, logged_in_at: DateTime<Utc>) -> Self {
        Self {
            username,
            progress,
            logged_in_at,
        }
    }

    #[must_use]
    pub fn username(&self) -> &Username {
        &self.username
    }

    #[must_use]
    pub fn progress(&self) -> &UserProgress {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut UserProgress {
        &mut self.progress
    }

    #[must_use]
    pub fn logged_in_at(&self) -> DateTime<Utc> {
        self.logged_in_at
    }
}
