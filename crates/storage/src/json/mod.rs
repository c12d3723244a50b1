//! File-backed adapters using the JSON layout of `questions.json` and `users.json`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::repository::{QuestionSource, Storage, StorageError, UserStore};

mod mapping;
mod question_bank;
mod user_store;

pub use question_bank::{JsonQuestionBank, parse_question_bank};
pub use user_store::JsonUserStore;

fn io_error(path: &Path, err: &std::io::Error) -> StorageError {
    StorageError::Io(format!("{}: {err}", path.display()))
}

/// Read a file, treating a missing file as `None`.
async fn read_optional(path: &Path) -> Result<Option<String>, StorageError> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_error(path, &err)),
    }
}

/// Replace `path` with `contents` via a sibling temp file and a rename, so a
/// failed write never leaves a truncated file behind.
async fn write_replacing(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(parent, &e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|e| io_error(&tmp, &e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| io_error(path, &e))
}

impl Storage {
    /// Build a `Storage` backed by the two JSON files.
    #[must_use]
    pub fn json_files(questions_path: impl Into<PathBuf>, users_path: impl Into<PathBuf>) -> Self {
        let questions: Arc<dyn QuestionSource> = Arc::new(JsonQuestionBank::new(questions_path));
        let users: Arc<dyn UserStore> = Arc::new(JsonUserStore::new(users_path));
        Self { questions, users }
    }
}
