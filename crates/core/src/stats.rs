//! Read-only accuracy tables derived from a user's progress.

use std::collections::BTreeMap;

use crate::model::{CategoryStats, CategoryTable, UserProgress, percentage};

/// Totals across every question the user has attempted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverallStats {
    pub attempted: usize,
    pub correct: usize,
    pub incorrect: usize,
    /// Percentage of attempted questions whose latest answer was correct.
    pub accuracy: f64,
}

/// One row of a per-system or per-subject table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryAccuracy {
    pub correct: u32,
    pub total: u32,
    /// 0 when `total == 0`.
    pub accuracy: f64,
}

impl CategoryAccuracy {
    #[must_use]
    pub fn has_attempts(&self) -> bool {
        self.total > 0
    }
}

impl From<CategoryStats> for CategoryAccuracy {
    fn from(stats: CategoryStats) -> Self {
        Self {
            correct: stats.correct(),
            total: stats.total(),
            accuracy: stats.accuracy(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    pub overall: OverallStats,
    pub by_system: BTreeMap<String, CategoryAccuracy>,
    pub by_subject: BTreeMap<String, CategoryAccuracy>,
}

impl PerformanceSummary {
    /// System rows worth rendering: those with at least one answer.
    pub fn systems_with_attempts(&self) -> impl Iterator<Item = (&str, &CategoryAccuracy)> {
        attempted_rows(&self.by_system)
    }

    /// Subject rows worth rendering: those with at least one answer.
    pub fn subjects_with_attempts(&self) -> impl Iterator<Item = (&str, &CategoryAccuracy)> {
        attempted_rows(&self.by_subject)
    }
}

fn attempted_rows(
    table: &BTreeMap<String, CategoryAccuracy>,
) -> impl Iterator<Item = (&str, &CategoryAccuracy)> {
    table
        .iter()
        .filter(|(_, row)| row.has_attempts())
        .map(|(name, row)| (name.as_str(), row))
}

fn accuracy_table(table: &CategoryTable) -> BTreeMap<String, CategoryAccuracy> {
    table
        .iter()
        .map(|(name, stats)| (name.clone(), CategoryAccuracy::from(*stats)))
        .collect()
}

/// Build the overall, per-system and per-subject tables for `progress`.
#[must_use]
pub fn summarize(progress: &UserProgress) -> PerformanceSummary {
    let attempted = progress.attempted().len();
    let correct = progress.correct().len();
    let incorrect = progress.incorrect().len();
    let accuracy = percentage(
        u32::try_from(correct).unwrap_or(u32::MAX),
        u32::try_from(attempted).unwrap_or(u32::MAX),
    );

    PerformanceSummary {
        overall: OverallStats {
            attempted,
            correct,
            incorrect,
            accuracy,
        },
        by_system: accuracy_table(progress.performance_by_system()),
        by_subject: accuracy_table(progress.performance_by_subject()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CategoryStats, ProgressParts, Question, QuestionDraft, QuestionId, UserProgress,
    };

    fn question(id: &str, system: &str, subject: &str) -> Question {
        QuestionDraft {
            id: QuestionId::new(id),
            question: "?".into(),
            options: vec!["a".into(), "b".into()],
            answer: "B".into(),
            system: Some(system.into()),
            subject: Some(subject.into()),
            ..QuestionDraft::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn empty_progress_reports_zero_accuracy() {
        let summary = summarize(&UserProgress::new());
        assert_eq!(summary.overall.attempted, 0);
        assert_eq!(summary.overall.accuracy, 0.0);
        assert!(summary.by_system.is_empty());
    }

    #[test]
    fn summary_mirrors_progress_counters() {
        let mut progress = UserProgress::new();
        progress.record_answer(&question("1", "Renal", "Physiology"), true);
        progress.record_answer(&question("2", "Renal", "Pathology"), false);
        progress.record_answer(&question("3", "Neuro", "Pathology"), true);
        progress.record_answer(&question("4", "Neuro", "Pathology"), true);

        let summary = summarize(&progress);

        assert_eq!(summary.overall.attempted, 4);
        assert_eq!(summary.overall.correct, 3);
        assert_eq!(summary.overall.incorrect, 1);
        assert!((summary.overall.accuracy - 75.0).abs() < f64::EPSILON);

        let renal = summary.by_system["Renal"];
        assert_eq!((renal.correct, renal.total), (1, 2));
        assert!((renal.accuracy - 50.0).abs() < f64::EPSILON);

        let pathology = summary.by_subject["Pathology"];
        assert_eq!((pathology.correct, pathology.total), (2, 3));
    }

    #[test]
    fn zero_total_rows_are_kept_but_not_rendered() {
        let mut parts = ProgressParts::default();
        parts.performance_by_system.insert(
            "Cardio".into(),
            CategoryStats::from_persisted("Cardio", 0, 0).unwrap(),
        );
        parts.performance_by_system.insert(
            "Renal".into(),
            CategoryStats::from_persisted("Renal", 1, 4).unwrap(),
        );
        let progress = UserProgress::from_persisted(parts).unwrap();

        let summary = summarize(&progress);

        assert_eq!(summary.by_system["Cardio"].accuracy, 0.0);
        let rendered: Vec<_> = summary.systems_with_attempts().map(|(n, _)| n).collect();
        assert_eq!(rendered, vec!["Renal"]);
    }
}
