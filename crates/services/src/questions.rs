use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::OnceCell;

use qbank_core::model::{Question, QuestionId};
use storage::QuestionSource;

use crate::error::LoadError;

/// The loaded, immutable question bank with lookup indexes.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
    by_id: HashMap<QuestionId, usize>,
    systems: Vec<String>,
    subjects: Vec<String>,
}

impl QuestionBank {
    /// # Errors
    ///
    /// Returns `LoadError::Empty` if `questions` is empty.
    pub fn from_questions(questions: Vec<Question>) -> Result<Self, LoadError> {
        if questions.is_empty() {
            return Err(LoadError::Empty);
        }
        let mut by_id = HashMap::with_capacity(questions.len());
        for (i, q) in questions.iter().enumerate() {
            by_id.entry(q.id().clone()).or_insert(i);
        }
        let systems = distinct(questions.iter().map(Question::system));
        let subjects = distinct(questions.iter().map(Question::subject));
        Ok(Self {
            questions,
            by_id,
            systems,
            subjects,
        })
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn get(&self, id: &QuestionId) -> Option<&Question> {
        self.by_id.get(id).map(|&i| &self.questions[i])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Sorted, deduplicated system names.
    #[must_use]
    pub fn distinct_systems(&self) -> &[String] {
        &self.systems
    }

    /// Sorted, deduplicated subject names.
    #[must_use]
    pub fn distinct_subjects(&self) -> &[String] {
        &self.subjects
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Loads the bank once per process and hands out the cached copy afterwards.
///
/// A failed load is not cached; the next call tries the source again.
pub struct QuestionRepository {
    source: Arc<dyn QuestionSource>,
    cache: OnceCell<Arc<QuestionBank>>,
}

impl QuestionRepository {
    #[must_use]
    pub fn new(source: Arc<dyn QuestionSource>) -> Self {
        Self {
            source,
            cache: OnceCell::new(),
        }
    }

    /// # Errors
    ///
    /// Returns `LoadError` if the source fails or yields no questions.
    pub async fn load(&self) -> Result<Arc<QuestionBank>, LoadError> {
        let bank = self
            .cache
            .get_or_try_init(|| async {
                let questions = self.source.load_questions().await?;
                let bank = QuestionBank::from_questions(questions)?;
                tracing::info!(
                    questions = bank.len(),
                    systems = bank.distinct_systems().len(),
                    subjects = bank.distinct_subjects().len(),
                    "question bank loaded"
                );
                Ok::<_, LoadError>(Arc::new(bank))
            })
            .await?;
        Ok(Arc::clone(bank))
    }
}

impl std::fmt::Debug for QuestionRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestionRepository")
            .field("loaded", &self.cache.initialized())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qbank_core::model::QuestionDraft;
    use storage::{InMemoryRepository, StorageError};

    fn build_question(id: &str, system: &str, subject: &str) -> Question {
        QuestionDraft {
            id: QuestionId::new(id),
            question: format!("Q{id}"),
            options: vec!["a".into(), "b".into()],
            answer: "A".into(),
            system: Some(system.into()),
            subject: Some(subject.into()),
            ..QuestionDraft::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn distinct_views_are_sorted_and_deduplicated() {
        let bank = QuestionBank::from_questions(vec![
            build_question("1", "Renal", "Physiology"),
            build_question("2", "Cardio", "Pathology"),
            build_question("3", "Renal", "Pathology"),
        ])
        .unwrap();
        assert_eq!(bank.distinct_systems(), ["Cardio", "Renal"]);
        assert_eq!(bank.distinct_subjects(), ["Pathology", "Physiology"]);
        assert_eq!(bank.get(&QuestionId::new("3")).unwrap().system(), "Renal");
        assert!(bank.get(&QuestionId::new("9")).is_none());
    }

    #[test]
    fn empty_bank_is_a_load_error() {
        assert!(matches!(
            QuestionBank::from_questions(Vec::new()),
            Err(LoadError::Empty)
        ));
    }

    #[tokio::test]
    async fn repeated_loads_hit_the_cache() {
        let source = InMemoryRepository::with_questions(vec![build_question("1", "Renal", "X")]);
        let repo = QuestionRepository::new(Arc::new(source.clone()));

        let first = repo.load().await.unwrap();
        let second = repo.load().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.question_loads(), 1);
    }

    #[tokio::test]
    async fn failed_loads_are_retried() {
        let source = InMemoryRepository::with_questions(vec![
            build_question("1", "Renal", "X"),
            build_question("1", "Renal", "X"),
        ]);
        let repo = QuestionRepository::new(Arc::new(source.clone()));

        let err = repo.load().await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::Source(StorageError::DuplicateQuestion(_))
        ));
        let _ = repo.load().await;
        assert_eq!(source.question_loads(), 2);
    }
}
