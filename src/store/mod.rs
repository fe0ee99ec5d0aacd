pub mod keys;
pub mod migrate;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub meta: sled::Tree,
    pub flashcards: sled::Tree,
    pub flashcard_deck_index: sled::Tree,
    pub flashcard_lecture_index: sled::Tree,
    pub questions: sled::Tree,
    pub question_level_index: sled::Tree,
    pub exams: sled::Tree,
    pub performance_records: sled::Tree,
    pub question_attempts: sled::Tree,
    pub mix_sessions: sled::Tree,
    pub readiness_records: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("conflict: entity={entity}, key={key}")]
    Conflict { entity: String, key: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("migration error at version {version}: {message}")]
    Migration { version: u32, message: String },
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let meta = db.open_tree(trees::META)?;
        let flashcards = db.open_tree(trees::FLASHCARDS)?;
        let flashcard_deck_index = db.open_tree(trees::FLASHCARD_DECK_INDEX)?;
        let flashcard_lecture_index = db.open_tree(trees::FLASHCARD_LECTURE_INDEX)?;
        let questions = db.open_tree(trees::QUESTIONS)?;
        let question_level_index = db.open_tree(trees::QUESTION_LEVEL_INDEX)?;
        let exams = db.open_tree(trees::EXAMS)?;
        let performance_records = db.open_tree(trees::PERFORMANCE_RECORDS)?;
        let question_attempts = db.open_tree(trees::QUESTION_ATTEMPTS)?;
        let mix_sessions = db.open_tree(trees::MIX_SESSIONS)?;
        let readiness_records = db.open_tree(trees::READINESS_RECORDS)?;

        Ok(Self {
            db,
            meta,
            flashcards,
            flashcard_deck_index,
            flashcard_lecture_index,
            questions,
            question_level_index,
            exams,
            performance_records,
            question_attempts,
            mix_sessions,
            readiness_records,
        })
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        migrate::run(self)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
