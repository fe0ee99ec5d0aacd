pub const META: &str = "meta";

pub const FLASHCARDS: &str = "flashcards";
pub const FLASHCARD_DECK_INDEX: &str = "flashcard_deck_idx";
pub const FLASHCARD_LECTURE_INDEX: &str = "flashcard_lecture_idx";
pub const QUESTIONS: &str = "questions";
pub const QUESTION_LEVEL_INDEX: &str = "question_level_idx";
pub const EXAMS: &str = "exams";

pub const PERFORMANCE_RECORDS: &str = "performance_records";
pub const QUESTION_ATTEMPTS: &str = "question_attempts";
pub const MIX_SESSIONS: &str = "mix_sessions";
pub const READINESS_RECORDS: &str = "readiness_records";
