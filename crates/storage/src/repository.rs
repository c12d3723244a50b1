use async_trait::async_trait;
use qbank_core::model::{Question, QuestionId, UserAccount, Username};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid question record at position {index} (id {id}): {reason}")]
    InvalidRecord {
        index: usize,
        id: String,
        reason: String,
    },

    #[error("question id {0} appears more than once")]
    DuplicateQuestion(QuestionId),
}

/// Every registered user, keyed by username.
pub type UserDirectory = BTreeMap<Username, UserAccount>;

/// Read-only source of the question bank.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Load and validate every question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bank is missing, unreadable, or holds an
    /// invalid or duplicated record.
    async fn load_questions(&self) -> Result<Vec<Question>, StorageError>;
}

/// Whole-mapping user store.
///
/// Reads and writes always cover every user. There is no locking: two
/// processes writing the same store concurrently race and the last write wins.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Read every account.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store exists but cannot be read or parsed.
    async fn read_all(&self) -> Result<UserDirectory, StorageError>;

    /// Replace the stored mapping with `users`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the mapping cannot be written.
    async fn write_all(&self, users: &UserDirectory) -> Result<(), StorageError>;
}

/// Reject banks that reuse an id.
///
/// # Errors
///
/// Returns `StorageError::DuplicateQuestion` naming the first repeated id.
pub fn ensure_unique_ids(questions: &[Question]) -> Result<(), StorageError> {
    let mut seen = HashSet::with_capacity(questions.len());
    for q in questions {
        if !seen.insert(q.id()) {
            return Err(StorageError::DuplicateQuestion(q.id().clone()));
        }
    }
    Ok(())
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<Vec<Question>>>,
    users: Arc<Mutex<UserDirectory>>,
    question_loads: Arc<AtomicUsize>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_questions(questions: Vec<Question>) -> Self {
        Self {
            questions: Arc::new(Mutex::new(questions)),
            ..Self::default()
        }
    }

    /// How many times `load_questions` has been called.
    #[must_use]
    pub fn question_loads(&self) -> usize {
        self.question_loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionSource for InMemoryRepository {
    async fn load_questions(&self) -> Result<Vec<Question>, StorageError> {
        self.question_loads.fetch_add(1, Ordering::SeqCst);
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Io(e.to_string()))?;
        ensure_unique_ids(&guard)?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl UserStore for InMemoryRepository {
    async fn read_all(&self) -> Result<UserDirectory, StorageError> {
        let guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn write_all(&self, users: &UserDirectory) -> Result<(), StorageError> {
        let mut guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Io(e.to_string()))?;
        *guard = users.clone();
        Ok(())
    }
}

/// Bundle of the repositories the services layer needs.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionSource>,
    pub users: Arc<dyn UserStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory(questions: Vec<Question>) -> Self {
        let repo = InMemoryRepository::with_questions(questions);
        let source: Arc<dyn QuestionSource> = Arc::new(repo.clone());
        let users: Arc<dyn UserStore> = Arc::new(repo);
        Self {
            questions: source,
            users,
        }
    }
}
