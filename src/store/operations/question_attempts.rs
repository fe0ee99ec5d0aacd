use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// Last graded outcome per (user, question hash). Drives the second
/// selection tier (previously answered incorrectly) and the freshness
/// multiplier of reinforcement sampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAttempt {
    pub user_id: String,
    pub question_hash: String,
    pub is_correct: bool,
    pub last_attempted: DateTime<Utc>,
}

impl Store {
    pub fn get_question_attempt(
        &self,
        user_id: &str,
        question_hash: &str,
    ) -> Result<Option<QuestionAttempt>, StoreError> {
        let key = keys::question_attempt_key(user_id, question_hash)?;
        match self.question_attempts.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn upsert_question_attempt(&self, attempt: &QuestionAttempt) -> Result<(), StoreError> {
        let key = keys::question_attempt_key(&attempt.user_id, &attempt.question_hash)?;
        self.question_attempts
            .insert(key.as_bytes(), Self::serialize(attempt)?)?;
        Ok(())
    }
}
