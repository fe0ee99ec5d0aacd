use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Question difficulty tier. A closed enum so a typo in a point table is a
/// compile error, not a silently zero-weighted level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Easy,
    Medium,
    Hard,
    Boss,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Easy, Level::Medium, Level::Hard, Level::Boss];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Easy => "easy",
            Level::Medium => "medium",
            Level::Hard => "hard",
            Level::Boss => "boss",
        }
    }
}

/// One value per difficulty level. Exhaustive by construction: every level is
/// always present, there is no "missing key" state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LevelMap<T> {
    pub easy: T,
    pub medium: T,
    pub hard: T,
    pub boss: T,
}

impl<T> LevelMap<T> {
    pub fn get(&self, level: Level) -> &T {
        match level {
            Level::Easy => &self.easy,
            Level::Medium => &self.medium,
            Level::Hard => &self.hard,
            Level::Boss => &self.boss,
        }
    }

    pub fn get_mut(&mut self, level: Level) -> &mut T {
        match level {
            Level::Easy => &mut self.easy,
            Level::Medium => &mut self.medium,
            Level::Hard => &mut self.hard,
            Level::Boss => &mut self.boss,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Level, &T)> {
        Level::ALL.iter().map(move |l| (*l, self.get(*l)))
    }
}

/// Per-level attempt tally inside a performance record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LevelTally {
    pub attempts: u32,
    pub correct: u32,
    pub points: f64,
}

/// One graded attempt kept in the momentum window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentAttempt {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub is_correct: bool,
    pub points_earned: f64,
}

/// Result of grading one answer. `partial_credit` is only ever non-zero for
/// multi-choice questions; a fully correct answer has `partial_credit == 1.0`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResult {
    pub is_correct: bool,
    pub partial_credit: f64,
}

impl GradeResult {
    pub fn incorrect() -> Self {
        Self {
            is_correct: false,
            partial_credit: 0.0,
        }
    }

    pub fn correct() -> Self {
        Self {
            is_correct: true,
            partial_credit: 1.0,
        }
    }
}

/// Queue entry of a Mix session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub kind: ActivityKind,
    pub flashcard_id: String,
    pub level: Level,
    pub is_follow_up: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    FlashcardReview,
    Question,
}

/// Readiness scope: an exam timetable or a canonical (sorted, de-duplicated)
/// deck id set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ReadinessScope {
    Exam { exam_id: String },
    Decks { deck_ids: Vec<String> },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PillarSums {
    pub coverage: f64,
    pub accuracy: f64,
    pub momentum: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeakFlashcard {
    pub flashcard_id: String,
    pub accuracy_score: f64,
}

/// Aggregated readiness over a scope. Recomputable at any time from the
/// performance records; the persisted copy is a cache, never a source of truth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessRecord {
    pub user_id: String,
    pub scope: ReadinessScope,
    pub overall_score: f64,
    pub coverage_factor: f64,
    pub accuracy_factor: f64,
    pub momentum_factor: f64,
    pub raw_sums: PillarSums,
    pub theoretical_max: PillarSums,
    pub weak_flashcards: Vec<WeakFlashcard>,
    pub flashcards_started: u32,
    pub flashcards_total: u32,
    pub last_calculated: DateTime<Utc>,
}
