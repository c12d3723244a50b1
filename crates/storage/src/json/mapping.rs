use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDateTime, Utc};
use qbank_core::model::{
    CategoryStats, CategoryTable, PasswordHash, ProgressParts, QuestionDraft, QuestionId,
    UserAccount, UserProgress, Username,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// A JSON string or number. Bank files are not consistent about which they use
/// for ids and difficulty levels.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
        }
    }
}

fn ids_from_scalars<'de, D>(deserializer: D) -> Result<BTreeSet<QuestionId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Scalar>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|s| QuestionId::new(String::from(s)))
        .collect())
}

//
// ─── QUESTION BANK ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionRecord {
    pub id: Scalar,
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Scalar>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub educational_objective: Option<String>,
}

impl QuestionRecord {
    pub(crate) fn into_draft(self) -> QuestionDraft {
        QuestionDraft {
            id: QuestionId::new(String::from(self.id)),
            question: self.question,
            options: self.options,
            answer: self.answer,
            system: self.system,
            subject: self.subject,
            topic: self.topic,
            difficulty: self.difficulty.map(String::from),
            explanation: self.explanation,
            educational_objective: self.educational_objective,
        }
    }
}

/// Best-effort id of a raw record, for error messages.
pub(crate) fn record_id_hint(value: &serde_json::Value) -> String {
    match value.get("id") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(_) | None => "<missing>".to_owned(),
    }
}

//
// ─── USERS ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct CounterRecord {
    pub correct: u32,
    pub total: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct ProgressRecord {
    #[serde(default, deserialize_with = "ids_from_scalars")]
    pub questions_attempted: BTreeSet<QuestionId>,
    #[serde(default, deserialize_with = "ids_from_scalars")]
    pub correct_questions: BTreeSet<QuestionId>,
    #[serde(default, deserialize_with = "ids_from_scalars")]
    pub incorrect_questions: BTreeSet<QuestionId>,
    #[serde(default, deserialize_with = "ids_from_scalars")]
    pub marked_questions: BTreeSet<QuestionId>,
    #[serde(default)]
    pub performance_by_system: BTreeMap<String, CounterRecord>,
    #[serde(default)]
    pub performance_by_subject: BTreeMap<String, CounterRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_saved: Option<String>,
}

fn table_to_records(table: &CategoryTable) -> BTreeMap<String, CounterRecord> {
    table
        .iter()
        .map(|(name, stats)| {
            (
                name.clone(),
                CounterRecord {
                    correct: stats.correct(),
                    total: stats.total(),
                },
            )
        })
        .collect()
}

fn records_to_table(
    records: BTreeMap<String, CounterRecord>,
) -> Result<CategoryTable, StorageError> {
    records
        .into_iter()
        .map(|(name, rec)| {
            let stats = CategoryStats::from_persisted(&name, rec.correct, rec.total).map_err(ser)?;
            Ok((name, stats))
        })
        .collect()
}

impl ProgressRecord {
    pub(crate) fn from_progress(progress: &UserProgress, saved_at: Option<DateTime<Utc>>) -> Self {
        Self {
            questions_attempted: progress.attempted().clone(),
            correct_questions: progress.correct().clone(),
            incorrect_questions: progress.incorrect().clone(),
            marked_questions: progress.marked().clone(),
            performance_by_system: table_to_records(progress.performance_by_system()),
            performance_by_subject: table_to_records(progress.performance_by_subject()),
            last_saved: saved_at.map(|t| t.to_rfc3339()),
        }
    }

    pub(crate) fn into_progress(self) -> Result<UserProgress, StorageError> {
        let parts = ProgressParts {
            attempted: self.questions_attempted,
            correct: self.correct_questions,
            incorrect: self.incorrect_questions,
            marked: self.marked_questions,
            performance_by_system: records_to_table(self.performance_by_system)?,
            performance_by_subject: records_to_table(self.performance_by_subject)?,
        };
        UserProgress::from_persisted(parts).map_err(ser)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct UserRecord {
    pub password_hash: String,
    pub created_at: String,
    /// Kept as raw JSON so a damaged progress object can be replaced with
    /// empty progress without rejecting the whole account.
    #[serde(default)]
    pub progress: serde_json::Value,
}

impl UserRecord {
    pub(crate) fn from_account(
        account: &UserAccount,
        saved_at: DateTime<Utc>,
    ) -> Result<Self, StorageError> {
        let progress = ProgressRecord::from_progress(&account.progress, Some(saved_at));
        Ok(Self {
            password_hash: account.password_hash.as_str().to_owned(),
            created_at: account.created_at.to_rfc3339(),
            progress: serde_json::to_value(progress).map_err(ser)?,
        })
    }

    pub(crate) fn into_account(self, username: Username) -> Result<UserAccount, StorageError> {
        let created_at = parse_timestamp(&self.created_at)?;
        let progress = decode_progress(&username, self.progress);
        Ok(UserAccount {
            username,
            password_hash: PasswordHash::new(self.password_hash),
            created_at,
            progress,
        })
    }
}

fn decode_progress(username: &Username, raw: serde_json::Value) -> UserProgress {
    if raw.is_null() {
        return UserProgress::new();
    }
    let decoded = serde_json::from_value::<ProgressRecord>(raw)
        .map_err(ser)
        .and_then(ProgressRecord::into_progress);
    match decoded {
        Ok(progress) => progress,
        Err(err) => {
            tracing::warn!(user = %username, error = %err, "discarding unreadable progress record");
            UserProgress::new()
        }
    }
}

/// Parse RFC 3339, falling back to a naive ISO timestamp read as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| StorageError::Serialization(format!("invalid timestamp {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qbank_core::time::fixed_now;

    #[test]
    fn naive_and_rfc3339_timestamps_parse() {
        let naive = parse_timestamp("2024-03-01T09:30:00.123456").unwrap();
        assert_eq!(naive.to_rfc3339(), "2024-03-01T09:30:00.123456+00:00");
        let zoned = parse_timestamp("2024-03-01T10:30:00+01:00").unwrap();
        assert_eq!(zoned, parse_timestamp("2024-03-01T09:30:00").unwrap());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn numeric_ids_in_progress_lists_are_accepted() {
        let raw = serde_json::json!({
            "questions_attempted": [3, "1", 2],
            "correct_questions": [3],
            "incorrect_questions": ["1"],
        });
        let record: ProgressRecord = serde_json::from_value(raw).unwrap();
        let progress = record.into_progress().unwrap();
        let ids: Vec<_> = progress.attempted().iter().map(QuestionId::as_str).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn damaged_progress_degrades_to_empty() {
        let record = UserRecord {
            password_hash: "h".into(),
            created_at: fixed_now().to_rfc3339(),
            progress: serde_json::json!({
                "questions_attempted": ["1"],
                "correct_questions": ["1"],
                "incorrect_questions": ["1"],
            }),
        };
        let account = record.into_account(Username::new("dana").unwrap()).unwrap();
        assert!(account.progress.attempted().is_empty());
    }

    #[test]
    fn progress_lists_serialize_sorted() {
        let mut progress = UserProgress::new();
        progress.mark(QuestionId::new("b"));
        progress.mark(QuestionId::new("a"));
        let value = serde_json::to_value(ProgressRecord::from_progress(&progress, None)).unwrap();
        assert_eq!(value["marked_questions"], serde_json::json!(["a", "b"]));
        assert!(value.get("last_saved").is_none());
    }
}
