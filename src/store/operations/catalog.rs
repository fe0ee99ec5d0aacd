use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sled::Transactional;

use crate::engine::types::Level;
use crate::store::keys;
use crate::store::{Store, StoreError};

/// Deterministic content hash of a question. Authoring pipelines derive the
/// `Question.hash` key from this, so re-ingesting the same material
/// de-duplicates instead of piling up variants.
pub fn question_content_hash(prompt: &str, options: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    for option in options {
        hasher.update([0u8]);
        hasher.update(option.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// One study flashcard. Relevance is assigned at authoring time and drives
/// master ordering in Mix sessions and discovery-phase quiz building.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: String,
    pub course_id: String,
    pub deck_id: String,
    pub lecture_id: String,
    pub front: String,
    pub back: String,
    pub relevance_score: f64,
}

/// Answer key, tagged by question type. The grading rules live in
/// `engine::grading`; this is only the stored shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AnswerSpec {
    SingleChoice {
        answer: String,
    },
    MultiChoice {
        answers: Vec<String>,
    },
    Sequencing {
        order: Vec<String>,
    },
    Categorization {
        categories: BTreeMap<String, Vec<String>>,
    },
    Matching {
        pairs: Vec<MatchPair>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchPair {
    pub left: String,
    pub right: String,
}

/// A generated question, keyed by its content hash. The hash also
/// de-duplicates what a session has already asked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub hash: String,
    pub course_id: String,
    pub deck_id: String,
    pub source_flashcard_id: String,
    pub level: Level,
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: AnswerSpec,
    pub explanation: String,
}

/// An exam timetable entry: the lectures the exam covers resolve, through
/// the flashcard lecture index, to the readiness scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub lecture_ids: Vec<String>,
}

impl Store {
    pub fn put_flashcard(&self, flashcard: &Flashcard) -> Result<(), StoreError> {
        let key = keys::flashcard_key(&flashcard.id);
        let deck_index_key = keys::flashcard_deck_index_key(
            &flashcard.course_id,
            &flashcard.deck_id,
            &flashcard.id,
        )?;
        let lecture_index_key = keys::flashcard_lecture_index_key(
            &flashcard.course_id,
            &flashcard.lecture_id,
            &flashcard.id,
        )?;
        let value = Self::serialize(flashcard)?;

        (
            &self.flashcards,
            &self.flashcard_deck_index,
            &self.flashcard_lecture_index,
        )
            .transaction(|(tx_cards, tx_deck_idx, tx_lecture_idx)| {
                tx_cards.insert(key.as_bytes(), value.as_slice())?;
                tx_deck_idx.insert(deck_index_key.as_bytes(), &[] as &[u8])?;
                tx_lecture_idx.insert(lecture_index_key.as_bytes(), &[] as &[u8])?;
                Ok(())
            })
            .map_err(map_tx_error)?;
        Ok(())
    }

    pub fn get_flashcard(&self, flashcard_id: &str) -> Result<Option<Flashcard>, StoreError> {
        let key = keys::flashcard_key(flashcard_id);
        match self.flashcards.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// All flashcards of one deck.
    pub fn load_flashcards(
        &self,
        course_id: &str,
        deck_id: &str,
    ) -> Result<Vec<Flashcard>, StoreError> {
        let prefix = keys::flashcard_deck_prefix(course_id, deck_id)?;
        self.collect_indexed_flashcards(&self.flashcard_deck_index, &prefix)
    }

    /// All flashcards derived from the given lectures, for exam scope
    /// resolution.
    pub fn flashcards_for_lectures(
        &self,
        course_id: &str,
        lecture_ids: &[String],
    ) -> Result<Vec<Flashcard>, StoreError> {
        let mut flashcards = Vec::new();
        for lecture_id in lecture_ids {
            let prefix = keys::flashcard_lecture_prefix(course_id, lecture_id)?;
            flashcards
                .extend(self.collect_indexed_flashcards(&self.flashcard_lecture_index, &prefix)?);
        }
        Ok(flashcards)
    }

    fn collect_indexed_flashcards(
        &self,
        index: &sled::Tree,
        prefix: &str,
    ) -> Result<Vec<Flashcard>, StoreError> {
        let mut flashcards = Vec::new();
        for item in index.scan_prefix(prefix.as_bytes()) {
            let (k, _) = item?;
            let key_str = String::from_utf8(k.to_vec()).unwrap_or_default();
            let Some(flashcard_id) = key_str.rsplit(':').next() else {
                continue;
            };
            if let Some(flashcard) = self.get_flashcard(flashcard_id)? {
                flashcards.push(flashcard);
            }
        }
        Ok(flashcards)
    }

    pub fn put_question(&self, question: &Question) -> Result<(), StoreError> {
        let key = keys::question_key(&question.hash);
        let index_key = keys::question_level_index_key(
            &question.course_id,
            &question.deck_id,
            question.level,
            &question.source_flashcard_id,
            &question.hash,
        )?;
        let value = Self::serialize(question)?;

        (&self.questions, &self.question_level_index)
            .transaction(|(tx_questions, tx_index)| {
                tx_questions.insert(key.as_bytes(), value.as_slice())?;
                tx_index.insert(index_key.as_bytes(), &[] as &[u8])?;
                Ok(())
            })
            .map_err(map_tx_error)?;
        Ok(())
    }

    pub fn get_question(&self, question_hash: &str) -> Result<Option<Question>, StoreError> {
        let key = keys::question_key(question_hash);
        match self.questions.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// All questions of one deck at one level.
    pub fn load_questions(
        &self,
        course_id: &str,
        deck_id: &str,
        level: Level,
    ) -> Result<Vec<Question>, StoreError> {
        let prefix = keys::question_level_prefix(course_id, deck_id, level)?;
        self.collect_indexed_questions(&prefix)
    }

    /// Questions of a single flashcard at one level.
    pub fn questions_for_flashcard(
        &self,
        course_id: &str,
        deck_id: &str,
        level: Level,
        flashcard_id: &str,
    ) -> Result<Vec<Question>, StoreError> {
        let prefix = keys::question_flashcard_prefix(course_id, deck_id, level, flashcard_id)?;
        self.collect_indexed_questions(&prefix)
    }

    fn collect_indexed_questions(&self, prefix: &str) -> Result<Vec<Question>, StoreError> {
        let mut questions = Vec::new();
        for item in self.question_level_index.scan_prefix(prefix.as_bytes()) {
            let (k, _) = item?;
            let key_str = String::from_utf8(k.to_vec()).unwrap_or_default();
            let Some(hash) = key_str.rsplit(':').next() else {
                continue;
            };
            if let Some(question) = self.get_question(hash)? {
                questions.push(question);
            }
        }
        Ok(questions)
    }

    pub fn put_exam(&self, exam: &Exam) -> Result<(), StoreError> {
        let key = keys::exam_key(&exam.id);
        self.exams.insert(key.as_bytes(), Self::serialize(exam)?)?;
        Ok(())
    }

    pub fn get_exam(&self, exam_id: &str) -> Result<Option<Exam>, StoreError> {
        let key = keys::exam_key(exam_id);
        match self.exams.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }
}

fn map_tx_error(error: sled::transaction::TransactionError<()>) -> StoreError {
    match error {
        sled::transaction::TransactionError::Abort(()) => {
            StoreError::Sled(sled::Error::Unsupported("transaction aborted".into()))
        }
        sled::transaction::TransactionError::Storage(se) => StoreError::Sled(se),
    }
}
