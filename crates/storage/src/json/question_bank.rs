use std::path::{Path, PathBuf};

use async_trait::async_trait;
use qbank_core::model::Question;

use super::mapping::{QuestionRecord, record_id_hint, ser};
use super::read_optional;
use crate::repository::{QuestionSource, StorageError, ensure_unique_ids};

/// Question bank stored as a JSON array of question objects.
#[derive(Debug, Clone)]
pub struct JsonQuestionBank {
    path: PathBuf,
}

impl JsonQuestionBank {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl QuestionSource for JsonQuestionBank {
    async fn load_questions(&self) -> Result<Vec<Question>, StorageError> {
        let raw = read_optional(&self.path)
            .await?
            .ok_or_else(|| StorageError::NotFound(self.path.display().to_string()))?;
        let questions = parse_question_bank(&raw)?;
        tracing::debug!(
            path = %self.path.display(),
            count = questions.len(),
            "loaded question bank"
        );
        Ok(questions)
    }
}

/// Parse and validate a bank document.
///
/// Each record is decoded on its own so a bad entry is reported with its
/// position and id instead of as an anonymous parse failure.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for non-JSON input or a top level that
/// is not an array, `StorageError::InvalidRecord` for the first bad record, and
/// `StorageError::DuplicateQuestion` if an id repeats.
pub fn parse_question_bank(raw: &str) -> Result<Vec<Question>, StorageError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(raw).map_err(ser)?;

    let mut questions = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        let id = record_id_hint(&value);
        let record: QuestionRecord =
            serde_json::from_value(value).map_err(|e| StorageError::InvalidRecord {
                index,
                id: id.clone(),
                reason: e.to_string(),
            })?;
        let question = record
            .into_draft()
            .validate()
            .map_err(|e| StorageError::InvalidRecord {
                index,
                id,
                reason: e.to_string(),
            })?;
        questions.push(question);
    }

    ensure_unique_ids(&questions)?;
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records_with_optional_metadata() {
        let raw = r#"[
            {"id": 1, "question": "Q1", "options": ["a", "b"], "answer": "B",
             "system": "Renal", "subject": "Physiology", "difficulty": 3,
             "explanation": "because", "educational_objective": "learn"},
            {"id": "two", "question": "Q2", "options": ["a"], "answer": "A"}
        ]"#;
        let questions = parse_question_bank(raw).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id().as_str(), "1");
        assert_eq!(questions[0].difficulty(), Some("3"));
        assert_eq!(questions[1].system(), "General");
    }

    #[test]
    fn non_json_is_a_serialization_error() {
        assert!(matches!(
            parse_question_bank("not json"),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn missing_field_names_the_record() {
        let raw = r#"[
            {"id": "a", "question": "Q", "options": ["x"], "answer": "A"},
            {"id": "b", "options": ["x"], "answer": "A"}
        ]"#;
        match parse_question_bank(raw) {
            Err(StorageError::InvalidRecord { index, id, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(id, "b");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn answer_outside_options_names_the_record() {
        let raw = r#"[{"id": 9, "question": "Q", "options": ["x", "y"], "answer": "E"}]"#;
        assert!(matches!(
            parse_question_bank(raw),
            Err(StorageError::InvalidRecord { index: 0, ref id, .. }) if id == "9"
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let raw = r#"[
            {"id": 1, "question": "Q", "options": ["x"], "answer": "A"},
            {"id": "1", "question": "Q again", "options": ["x"], "answer": "A"}
        ]"#;
        assert!(matches!(
            parse_question_bank(raw),
            Err(StorageError::DuplicateQuestion(_))
        ));
    }
}
